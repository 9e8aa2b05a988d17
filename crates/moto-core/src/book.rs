//! # Shop Book
//!
//! The whole shop held in memory: master data, documents and the two
//! ledgers, mutated only through methods that keep them consistent.
//!
//! ## Commit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ShopBook::commit()                               │
//! │                                                                         │
//! │  1. select rows being replaced   (by Link, or a single manual row)     │
//! │  2. deltas = new posting − replaced rows                               │
//! │  3. check   branches, payment sources, parts, stock levels             │
//! │        │                                                                │
//! │        └── any error ──► return Err, NOTHING has changed               │
//! │  4. drop replaced rows, apply deltas, append new rows                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Creating a document is a commit replacing nothing. Editing replaces the
//! document's rows with its new posting. Deleting replaces them with an
//! empty posting and skips the stock guard.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::assets::{build_capital_investment, build_fixed_asset};
use crate::catalog::{apply_part_update, build_part, build_payment_source, validate_branch};
use crate::customer::{
    add_points, apply_customer_update, build_customer, due_for_oil_change, loyalty_points_for,
    record_service, remove_points,
};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::ledger::{
    self, apply_balance_delta, apply_stock_delta, check_stock_levels, combine_balance_deltas,
    combine_stock_deltas, net_balance_deltas, net_stock_deltas, PartCatalog, Posting,
};
use crate::purchasing::{build_goods_receipt, goods_receipt_posting};
use crate::report::{self, BusinessSnapshot, LowStockItem, Period, ReportData, ReportFilter, RevenueSummary};
use crate::sales::{build_sale, sale_posting};
use crate::types::{
    Branch, CapitalInvestment, CashTransaction, Customer, FixedAsset, GoodsReceipt,
    GoodsReceiptDraft, InventoryTransaction, InventoryUpdate, Link, NewCapitalInvestment,
    NewCashTransaction, NewCustomer, NewFixedAsset, NewInventoryTransaction, NewPart,
    NewPaymentSource, Part, PartUpdate, PaymentSource, Sale, SaleDraft, TransferRequest,
    WorkOrder, WorkOrderDraft, WorkOrderStatus,
};
use crate::validation::{validate_price, validate_quantity};
use crate::workorder::{
    build_work_order, ensure_part_unused, set_status, settle, work_order_posting,
};
use crate::{
    DEFAULT_LOW_STOCK_THRESHOLD, DEFAULT_LOYALTY_POINT_VALUE, DEFAULT_OIL_CHANGE_INTERVAL_DAYS,
};

// =============================================================================
// Settings
// =============================================================================

/// Business switches of a shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSettings {
    /// Let outbound postings take branch stock below zero.
    pub allow_negative_stock: bool,
    /// Stock strictly below this is reported as low.
    pub low_stock_threshold: i64,
    pub oil_change_interval_days: i64,
    /// Money spent per loyalty point.
    pub loyalty_point_value: i64,
}

impl Default for BookSettings {
    fn default() -> Self {
        BookSettings {
            allow_negative_stock: false,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            oil_change_interval_days: DEFAULT_OIL_CHANGE_INTERVAL_DAYS,
            loyalty_point_value: DEFAULT_LOYALTY_POINT_VALUE,
        }
    }
}

/// Which existing ledger rows a commit replaces.
#[derive(Debug, Clone, Copy)]
enum Replace<'a> {
    Nothing,
    Document(&'a Link),
    InventoryRow(&'a str),
    CashRow(&'a str),
}

impl Replace<'_> {
    fn selects_inventory(&self, tx: &InventoryTransaction) -> bool {
        match self {
            Replace::Nothing | Replace::CashRow(_) => false,
            Replace::Document(link) => link.owns_inventory(tx),
            Replace::InventoryRow(id) => tx.id == *id,
        }
    }

    fn selects_cash(&self, tx: &CashTransaction) -> bool {
        match self {
            Replace::Nothing | Replace::InventoryRow(_) => false,
            Replace::Document(link) => link.owns_cash(tx),
            Replace::CashRow(id) => tx.id == *id,
        }
    }
}

fn linked_error(id: &str, link: &Link) -> CoreError {
    CoreError::LinkedTransaction {
        id: id.to_string(),
        link: link.to_string(),
    }
}

// =============================================================================
// ShopBook
// =============================================================================

/// The shop's books.
///
/// ## Invariants
/// - `Part.stock[b]` equals the replay of every inventory row at `b`
/// - `PaymentSource.balance[b]` equals the replay of every cash row at `b`
/// - Every row linked to a document belongs to a document that exists
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShopBook {
    settings: BookSettings,
    branches: Vec<Branch>,
    parts: Vec<Part>,
    inventory: Vec<InventoryTransaction>,
    cash: Vec<CashTransaction>,
    payment_sources: Vec<PaymentSource>,
    sales: Vec<Sale>,
    receipts: Vec<GoodsReceipt>,
    work_orders: Vec<WorkOrder>,
    customers: Vec<Customer>,
    fixed_assets: Vec<FixedAsset>,
    capital: Vec<CapitalInvestment>,
}

impl ShopBook {
    pub fn new(settings: BookSettings) -> Self {
        ShopBook {
            settings,
            ..ShopBook::default()
        }
    }

    pub fn settings(&self) -> &BookSettings {
        &self.settings
    }

    // -------------------------------------------------------------------------
    // Commit
    // -------------------------------------------------------------------------

    /// Replaces the rows selected by `replace` with `posting`.
    ///
    /// Every check runs before the first mutation. With `guarded` the stock
    /// levels after the change must not go negative (unless the settings
    /// allow it).
    fn commit(&mut self, replace: Replace<'_>, posting: Posting, guarded: bool) -> CoreResult<()> {
        let stock = combine_stock_deltas(
            &net_stock_deltas(self.inventory.iter().filter(|tx| replace.selects_inventory(tx))),
            &posting.stock_deltas(),
        );
        let balance = combine_balance_deltas(
            &net_balance_deltas(self.cash.iter().filter(|tx| replace.selects_cash(tx))),
            &posting.balance_deltas(),
        );

        for tx in &posting.inventory {
            self.require_branch(&tx.branch_id)?;
        }
        for tx in &posting.cash {
            self.require_branch(&tx.branch_id)?;
        }
        for (source_id, _) in balance.keys() {
            self.require_payment_source(source_id)?;
        }
        check_stock_levels(
            self.parts.as_slice(),
            &stock,
            self.settings.allow_negative_stock || !guarded,
        )?;

        self.inventory.retain(|tx| !replace.selects_inventory(tx));
        self.cash.retain(|tx| !replace.selects_cash(tx));

        for ((part_id, branch_id), delta) in &stock {
            if let Some(part) = self.parts.iter_mut().find(|p| &p.id == part_id) {
                apply_stock_delta(part, branch_id, *delta);
            }
        }
        for ((source_id, branch_id), delta) in &balance {
            if let Some(source) = self.payment_sources.iter_mut().find(|s| &s.id == source_id) {
                apply_balance_delta(source, branch_id, *delta);
            }
        }

        self.inventory.extend(posting.inventory);
        self.cash.extend(posting.cash);
        Ok(())
    }

    /// Whether stock and balances equal the replay of the ledgers.
    pub fn verify_consistency(&self) -> bool {
        let replayed_stock = net_stock_deltas(&self.inventory);
        let stock_ok = self.parts.iter().all(|part| {
            let mut branches: Vec<&String> = part.stock.keys().collect();
            branches.extend(
                replayed_stock
                    .keys()
                    .filter(|(p, _)| p == &part.id)
                    .map(|(_, b)| b),
            );
            branches.into_iter().all(|b| {
                let replayed = replayed_stock
                    .get(&(part.id.clone(), b.clone()))
                    .copied()
                    .unwrap_or(0);
                part.stock_at(b) == replayed
            })
        });

        let replayed_balance = net_balance_deltas(&self.cash);
        let balance_ok = self.payment_sources.iter().all(|source| {
            let mut branches: Vec<&String> = source.balance.keys().collect();
            branches.extend(
                replayed_balance
                    .keys()
                    .filter(|(s, _)| s == &source.id)
                    .map(|(_, b)| b),
            );
            branches.into_iter().all(|b| {
                let replayed = replayed_balance
                    .get(&(source.id.clone(), b.clone()))
                    .copied()
                    .unwrap_or_default();
                source.balance_at(b) == replayed
            })
        });

        stock_ok && balance_ok
    }

    // -------------------------------------------------------------------------
    // Branches
    // -------------------------------------------------------------------------

    pub fn add_branch(&mut self, branch: Branch) -> CoreResult<()> {
        validate_branch(&branch)?;
        if self.branch(&branch.id).is_some() {
            return Err(ValidationError::Duplicate {
                field: "branch".to_string(),
                value: branch.id,
            }
            .into());
        }
        self.branches.push(branch);
        Ok(())
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn branch(&self, id: &str) -> Option<&Branch> {
        self.branches.iter().find(|b| b.id == id)
    }

    fn require_branch(&self, id: &str) -> CoreResult<&Branch> {
        self.branch(id)
            .ok_or_else(|| CoreError::BranchNotFound(id.to_string()))
    }

    // -------------------------------------------------------------------------
    // Parts
    // -------------------------------------------------------------------------

    fn ensure_unique_sku(&self, sku: &str, except_id: Option<&str>) -> CoreResult<()> {
        let sku = sku.trim();
        let taken = self
            .parts
            .iter()
            .any(|p| p.sku == sku && Some(p.id.as_str()) != except_id);
        if taken {
            return Err(ValidationError::Duplicate {
                field: "sku".to_string(),
                value: sku.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Adds a part; its opening stock is posted as inbound transactions.
    pub fn add_part(&mut self, draft: NewPart) -> CoreResult<Part> {
        let part = build_part(&draft)?;
        self.ensure_unique_sku(&part.sku, None)?;
        let posting = ledger::opening_stock(&part, &draft.opening_stock, draft.date)?;

        let id = part.id.clone();
        self.parts.push(part);
        if let Err(err) = self.commit(Replace::Nothing, posting, false) {
            self.parts.retain(|p| p.id != id);
            return Err(err);
        }
        self.parts.require_part(&id).cloned()
    }

    pub fn update_part(&mut self, id: &str, update: PartUpdate) -> CoreResult<Part> {
        self.ensure_unique_sku(&update.sku, Some(id))?;
        let part = self
            .parts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| CoreError::PartNotFound(id.to_string()))?;
        apply_part_update(part, update)?;
        Ok(part.clone())
    }

    /// Removes a part together with its inventory history. Refused while a
    /// work order lists the part.
    pub fn delete_part(&mut self, id: &str) -> CoreResult<()> {
        let part = self.parts.require_part(id)?;
        ensure_part_unused(&self.work_orders, part)?;
        self.parts.retain(|p| p.id != id);
        self.inventory.retain(|tx| tx.part_id != id);
        Ok(())
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn part(&self, id: &str) -> Option<&Part> {
        self.parts.find_part(id)
    }

    pub fn part_by_sku(&self, sku: &str) -> Option<&Part> {
        self.parts.iter().find(|p| p.sku == sku)
    }

    // -------------------------------------------------------------------------
    // Inventory
    // -------------------------------------------------------------------------

    /// Records a manual stock movement.
    pub fn record_inventory(
        &mut self,
        draft: NewInventoryTransaction,
    ) -> CoreResult<InventoryTransaction> {
        let part = self.parts.require_part(&draft.part_id)?;
        let row = ledger::manual_inventory(draft, part)?;
        self.commit(
            Replace::Nothing,
            Posting {
                inventory: vec![row.clone()],
                cash: Vec::new(),
            },
            true,
        )?;
        Ok(row)
    }

    /// Edits a manual stock movement: the old delta is reversed and the new
    /// one applied.
    pub fn update_inventory(
        &mut self,
        id: &str,
        update: InventoryUpdate,
    ) -> CoreResult<InventoryTransaction> {
        let existing = self
            .inventory_transaction(id)
            .ok_or_else(|| CoreError::InventoryTransactionNotFound(id.to_string()))?;
        if let Some(link) = existing.link() {
            return Err(linked_error(id, &link));
        }
        validate_quantity(update.quantity)?;
        validate_price("unit_price", update.unit_price)?;

        let mut row = existing.clone();
        row.quantity = update.quantity;
        row.unit_price = update.unit_price;
        row.total_price = update.unit_price * update.quantity;
        row.date = update.date;
        row.notes = update.notes;

        self.commit(
            Replace::InventoryRow(id),
            Posting {
                inventory: vec![row.clone()],
                cash: Vec::new(),
            },
            true,
        )?;
        Ok(row)
    }

    /// Deletes a manual stock movement. Deleting a transfer leg deletes the
    /// whole transfer; other linked rows are refused.
    pub fn delete_inventory(&mut self, id: &str) -> CoreResult<()> {
        let existing = self
            .inventory_transaction(id)
            .ok_or_else(|| CoreError::InventoryTransactionNotFound(id.to_string()))?;
        match existing.link() {
            None => self.commit(Replace::InventoryRow(id), Posting::new(), false),
            Some(Link::Transfer(transfer_id)) => self.delete_transfer(&transfer_id),
            Some(link) => Err(linked_error(id, &link)),
        }
    }

    /// Moves stock between branches. Returns the transfer id.
    pub fn transfer_stock(&mut self, request: TransferRequest) -> CoreResult<String> {
        self.require_branch(&request.from_branch)?;
        self.require_branch(&request.to_branch)?;
        let part = self.parts.require_part(&request.part_id)?;
        let (transfer_id, posting) = ledger::transfer(request, part)?;
        self.commit(Replace::Nothing, posting, true)?;
        Ok(transfer_id)
    }

    pub fn delete_transfer(&mut self, transfer_id: &str) -> CoreResult<()> {
        let link = Link::Transfer(transfer_id.to_string());
        if !self.inventory.iter().any(|tx| link.owns_inventory(tx)) {
            return Err(CoreError::TransferNotFound(transfer_id.to_string()));
        }
        self.commit(Replace::Document(&link), Posting::new(), false)
    }

    pub fn inventory(&self) -> &[InventoryTransaction] {
        &self.inventory
    }

    pub fn inventory_transaction(&self, id: &str) -> Option<&InventoryTransaction> {
        self.inventory.iter().find(|tx| tx.id == id)
    }

    /// Movements of one part, oldest first.
    pub fn inventory_for_part(&self, part_id: &str) -> Vec<&InventoryTransaction> {
        let mut rows: Vec<&InventoryTransaction> = self
            .inventory
            .iter()
            .filter(|tx| tx.part_id == part_id)
            .collect();
        rows.sort_by_key(|tx| (tx.date, tx.created_at));
        rows
    }

    // -------------------------------------------------------------------------
    // Cash
    // -------------------------------------------------------------------------

    /// Adds a payment source; its opening balance is posted as income.
    pub fn add_payment_source(&mut self, draft: NewPaymentSource) -> CoreResult<PaymentSource> {
        let source = build_payment_source(&draft)?;
        let posting = ledger::opening_balance(&source, &draft.opening_balance, draft.date)?;

        let id = source.id.clone();
        self.payment_sources.push(source);
        if let Err(err) = self.commit(Replace::Nothing, posting, false) {
            self.payment_sources.retain(|s| s.id != id);
            return Err(err);
        }
        self.require_payment_source(&id).cloned()
    }

    pub fn payment_sources(&self) -> &[PaymentSource] {
        &self.payment_sources
    }

    pub fn payment_source(&self, id: &str) -> Option<&PaymentSource> {
        self.payment_sources.iter().find(|s| s.id == id)
    }

    fn require_payment_source(&self, id: &str) -> CoreResult<&PaymentSource> {
        self.payment_source(id)
            .ok_or_else(|| CoreError::PaymentSourceNotFound(id.to_string()))
    }

    pub fn record_cash(&mut self, draft: NewCashTransaction) -> CoreResult<CashTransaction> {
        let row = ledger::manual_cash(draft)?;
        self.commit(
            Replace::Nothing,
            Posting {
                inventory: Vec::new(),
                cash: vec![row.clone()],
            },
            true,
        )?;
        Ok(row)
    }

    /// Replaces a manual cash entry. Source, branch, flow and amount may all
    /// change.
    pub fn update_cash(
        &mut self,
        id: &str,
        draft: NewCashTransaction,
    ) -> CoreResult<CashTransaction> {
        let existing = self
            .cash_transaction(id)
            .ok_or_else(|| CoreError::CashTransactionNotFound(id.to_string()))?;
        if let Some(link) = existing.link() {
            return Err(linked_error(id, &link));
        }
        let created_at = existing.created_at;

        let mut row = ledger::manual_cash(draft)?;
        row.id = id.to_string();
        row.created_at = created_at;

        self.commit(
            Replace::CashRow(id),
            Posting {
                inventory: Vec::new(),
                cash: vec![row.clone()],
            },
            true,
        )?;
        Ok(row)
    }

    pub fn delete_cash(&mut self, id: &str) -> CoreResult<()> {
        let existing = self
            .cash_transaction(id)
            .ok_or_else(|| CoreError::CashTransactionNotFound(id.to_string()))?;
        if let Some(link) = existing.link() {
            return Err(linked_error(id, &link));
        }
        self.commit(Replace::CashRow(id), Posting::new(), false)
    }

    pub fn cash_transactions(&self) -> &[CashTransaction] {
        &self.cash
    }

    pub fn cash_transaction(&self, id: &str) -> Option<&CashTransaction> {
        self.cash.iter().find(|tx| tx.id == id)
    }

    // -------------------------------------------------------------------------
    // Sales
    // -------------------------------------------------------------------------

    /// Checks out a sale: stock out, income in, loyalty points to the
    /// customer.
    pub fn create_sale(&mut self, draft: SaleDraft) -> CoreResult<Sale> {
        self.require_branch(&draft.branch_id)?;
        self.require_payment_source(&draft.payment_source_id)?;
        if let Some(customer_id) = &draft.customer_id {
            self.require_customer(customer_id)?;
        }

        let sale = build_sale(draft, self.parts.as_slice())?;
        self.commit(Replace::Nothing, sale_posting(&sale), true)?;

        let points = loyalty_points_for(sale.total, self.settings.loyalty_point_value);
        if let Some(customer) = self.customer_mut(sale.customer_id.as_deref()) {
            add_points(customer, points);
        }
        self.sales.push(sale.clone());
        Ok(sale)
    }

    /// Deletes a sale and reverts everything it posted.
    pub fn delete_sale(&mut self, id: &str) -> CoreResult<()> {
        let sale = self
            .sale(id)
            .cloned()
            .ok_or_else(|| CoreError::SaleNotFound(id.to_string()))?;
        self.commit(
            Replace::Document(&Link::Sale(sale.id.clone())),
            Posting::new(),
            false,
        )?;

        let points = loyalty_points_for(sale.total, self.settings.loyalty_point_value);
        if let Some(customer) = self.customer_mut(sale.customer_id.as_deref()) {
            remove_points(customer, points);
        }
        self.sales.retain(|s| s.id != id);
        Ok(())
    }

    pub fn sales(&self) -> &[Sale] {
        &self.sales
    }

    pub fn sale(&self, id: &str) -> Option<&Sale> {
        self.sales.iter().find(|s| s.id == id)
    }

    // -------------------------------------------------------------------------
    // Goods Receipts
    // -------------------------------------------------------------------------

    /// Receives a delivery. With `update_cost_price` each part takes the
    /// unit cost of its last line as its new cost price.
    pub fn receive_goods(&mut self, draft: GoodsReceiptDraft) -> CoreResult<GoodsReceipt> {
        self.require_branch(&draft.branch_id)?;
        if let Some(source_id) = &draft.payment_source_id {
            self.require_payment_source(source_id)?;
        }

        let receipt = build_goods_receipt(&draft, self.parts.as_slice())?;
        self.commit(Replace::Nothing, goods_receipt_posting(&receipt), true)?;

        if draft.update_cost_price {
            for item in &receipt.items {
                if let Some(part) = self.parts.iter_mut().find(|p| p.id == item.part_id) {
                    part.cost_price = item.unit_cost;
                }
            }
        }
        self.receipts.push(receipt.clone());
        Ok(receipt)
    }

    /// Deletes a receipt and reverts its stock and expense. Never blocked by
    /// stock levels.
    pub fn delete_goods_receipt(&mut self, id: &str) -> CoreResult<()> {
        if self.goods_receipt(id).is_none() {
            return Err(CoreError::GoodsReceiptNotFound(id.to_string()));
        }
        self.commit(
            Replace::Document(&Link::GoodsReceipt(id.to_string())),
            Posting::new(),
            false,
        )?;
        self.receipts.retain(|r| r.id != id);
        Ok(())
    }

    pub fn goods_receipts(&self) -> &[GoodsReceipt] {
        &self.receipts
    }

    pub fn goods_receipt(&self, id: &str) -> Option<&GoodsReceipt> {
        self.receipts.iter().find(|r| r.id == id)
    }

    // -------------------------------------------------------------------------
    // Work Orders
    // -------------------------------------------------------------------------

    /// Opens a work order, issuing its parts from stock.
    pub fn create_work_order(
        &mut self,
        draft: WorkOrderDraft,
        today: NaiveDate,
    ) -> CoreResult<WorkOrder> {
        self.require_branch(&draft.branch_id)?;
        if let Some(customer_id) = &draft.customer_id {
            self.require_customer(customer_id)?;
        }

        let order = build_work_order(draft, self.parts.as_slice(), None, today)?;
        self.commit(Replace::Nothing, work_order_posting(&order), true)?;

        if let Some(customer) = self.customer_mut(order.customer_id.as_deref()) {
            record_service(customer, order.odometer, order.received_on);
        }
        self.work_orders.push(order.clone());
        Ok(order)
    }

    /// Rebuilds a work order from a draft and re-posts it.
    pub fn update_work_order(
        &mut self,
        id: &str,
        draft: WorkOrderDraft,
        today: NaiveDate,
    ) -> CoreResult<WorkOrder> {
        let existing = self.require_work_order(id)?.clone();
        self.require_branch(&draft.branch_id)?;
        if let Some(customer_id) = &draft.customer_id {
            self.require_customer(customer_id)?;
        }

        let order = build_work_order(draft, self.parts.as_slice(), Some(&existing), today)?;
        self.repost_work_order(order)
    }

    pub fn set_work_order_status(
        &mut self,
        id: &str,
        status: WorkOrderStatus,
        today: NaiveDate,
    ) -> CoreResult<WorkOrder> {
        let order = self
            .work_orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| CoreError::WorkOrderNotFound(id.to_string()))?;
        set_status(order, status, today);
        Ok(order.clone())
    }

    /// Records payment of a work order. Settling again moves the income to
    /// the new source and date.
    pub fn settle_work_order(
        &mut self,
        id: &str,
        payment_source_id: &str,
        paid_on: NaiveDate,
    ) -> CoreResult<WorkOrder> {
        self.require_payment_source(payment_source_id)?;
        let mut order = self.require_work_order(id)?.clone();
        settle(&mut order, payment_source_id, paid_on);
        self.repost_work_order(order)
    }

    fn repost_work_order(&mut self, order: WorkOrder) -> CoreResult<WorkOrder> {
        self.commit(
            Replace::Document(&Link::WorkOrder(order.id.clone())),
            work_order_posting(&order),
            true,
        )?;
        if let Some(slot) = self.work_orders.iter_mut().find(|o| o.id == order.id) {
            *slot = order.clone();
        }
        Ok(order)
    }

    /// Deletes a work order, returning its parts to stock and reverting any
    /// settlement.
    pub fn delete_work_order(&mut self, id: &str) -> CoreResult<()> {
        self.require_work_order(id)?;
        self.commit(
            Replace::Document(&Link::WorkOrder(id.to_string())),
            Posting::new(),
            false,
        )?;
        self.work_orders.retain(|o| o.id != id);
        Ok(())
    }

    pub fn work_orders(&self) -> &[WorkOrder] {
        &self.work_orders
    }

    pub fn work_order(&self, id: &str) -> Option<&WorkOrder> {
        self.work_orders.iter().find(|o| o.id == id)
    }

    fn require_work_order(&self, id: &str) -> CoreResult<&WorkOrder> {
        self.work_order(id)
            .ok_or_else(|| CoreError::WorkOrderNotFound(id.to_string()))
    }

    // -------------------------------------------------------------------------
    // Customers
    // -------------------------------------------------------------------------

    pub fn add_customer(&mut self, draft: NewCustomer) -> CoreResult<Customer> {
        let customer = build_customer(draft)?;
        self.customers.push(customer.clone());
        Ok(customer)
    }

    pub fn update_customer(&mut self, id: &str, draft: NewCustomer) -> CoreResult<Customer> {
        let customer = self
            .customers
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| CoreError::CustomerNotFound(id.to_string()))?;
        apply_customer_update(customer, draft)?;
        Ok(customer.clone())
    }

    /// Removes a customer. Sales and work orders keep the name they
    /// recorded.
    pub fn delete_customer(&mut self, id: &str) -> CoreResult<()> {
        self.require_customer(id)?;
        self.customers.retain(|c| c.id != id);
        Ok(())
    }

    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    pub fn customer(&self, id: &str) -> Option<&Customer> {
        self.customers.iter().find(|c| c.id == id)
    }

    fn require_customer(&self, id: &str) -> CoreResult<&Customer> {
        self.customer(id)
            .ok_or_else(|| CoreError::CustomerNotFound(id.to_string()))
    }

    fn customer_mut(&mut self, id: Option<&str>) -> Option<&mut Customer> {
        let id = id?;
        self.customers.iter_mut().find(|c| c.id == id)
    }

    pub fn customers_due_for_oil_change(&self, today: NaiveDate) -> Vec<&Customer> {
        self.customers
            .iter()
            .filter(|c| due_for_oil_change(c, today, self.settings.oil_change_interval_days))
            .collect()
    }

    // -------------------------------------------------------------------------
    // Assets & Capital
    // -------------------------------------------------------------------------

    pub fn add_fixed_asset(&mut self, draft: NewFixedAsset) -> CoreResult<FixedAsset> {
        self.require_branch(&draft.branch_id)?;
        let asset = build_fixed_asset(draft)?;
        self.fixed_assets.push(asset.clone());
        Ok(asset)
    }

    pub fn delete_fixed_asset(&mut self, id: &str) -> CoreResult<()> {
        if !self.fixed_assets.iter().any(|a| a.id == id) {
            return Err(CoreError::FixedAssetNotFound(id.to_string()));
        }
        self.fixed_assets.retain(|a| a.id != id);
        Ok(())
    }

    pub fn fixed_assets(&self) -> &[FixedAsset] {
        &self.fixed_assets
    }

    pub fn add_capital_investment(
        &mut self,
        draft: NewCapitalInvestment,
    ) -> CoreResult<CapitalInvestment> {
        self.require_branch(&draft.branch_id)?;
        let investment = build_capital_investment(draft)?;
        self.capital.push(investment.clone());
        Ok(investment)
    }

    pub fn delete_capital_investment(&mut self, id: &str) -> CoreResult<()> {
        if !self.capital.iter().any(|c| c.id == id) {
            return Err(CoreError::CapitalInvestmentNotFound(id.to_string()));
        }
        self.capital.retain(|c| c.id != id);
        Ok(())
    }

    pub fn capital_investments(&self) -> &[CapitalInvestment] {
        &self.capital
    }

    // -------------------------------------------------------------------------
    // Reports
    // -------------------------------------------------------------------------

    pub fn report_data(&self) -> ReportData<'_> {
        ReportData {
            parts: &self.parts,
            sales: &self.sales,
            work_orders: &self.work_orders,
            cash: &self.cash,
            payment_sources: &self.payment_sources,
            fixed_assets: &self.fixed_assets,
            capital: &self.capital,
        }
    }

    pub fn revenue_by_period(&self, filter: &ReportFilter, period: Period) -> Vec<RevenueSummary> {
        let lines = report::revenue_lines(&self.work_orders, &self.sales, filter);
        report::group_by_period(&lines, period)
    }

    pub fn revenue_by_branch(&self, filter: &ReportFilter) -> Vec<RevenueSummary> {
        let lines = report::revenue_lines(&self.work_orders, &self.sales, filter);
        report::group_by_branch(&lines)
    }

    pub fn low_stock(&self, branch_id: &str) -> Vec<LowStockItem> {
        report::low_stock(&self.parts, branch_id, self.settings.low_stock_threshold)
    }

    pub fn business_snapshot(
        &self,
        branch_id: &str,
        filter: &ReportFilter,
    ) -> CoreResult<BusinessSnapshot> {
        let branch = self.require_branch(branch_id)?;
        Ok(report::business_snapshot(
            &self.report_data(),
            branch,
            filter,
            self.settings.low_stock_threshold,
        ))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
