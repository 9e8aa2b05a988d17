//! # Domain Types
//!
//! Core domain types used throughout the shop.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Catalog & stock            Cash                  Service               │
//! │  ───────────────            ────                  ───────               │
//! │  Part                       PaymentSource         WorkOrder             │
//! │   └ stock[branch]            └ balance[branch]     ├ parts_used[]       │
//! │  InventoryTransaction       CashTransaction        └ quotation_items[]  │
//! │                                                   Customer              │
//! │  Documents (post ledger rows)                                           │
//! │  ─────────────────────────────                                          │
//! │  Sale ─────────► out × items + income                                   │
//! │  GoodsReceipt ─► in × items  (+ expense when paid)                      │
//! │  Transfer ─────► out @from + in @to                                     │
//! │  WorkOrder ────► out × parts (+ income when settled)                    │
//! │                                                                         │
//! │  Plain rows: FixedAsset, CapitalInvestment                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every entity has a UUID v4 `id`. Parts also carry a unique business
//! key (`sku`). Branches use short human ids (`HN`, `HCM`).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Branch
// =============================================================================

/// A store location. Stock and balances are tracked per branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Branch {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
}

// =============================================================================
// Part
// =============================================================================

/// A spare part or consumable in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Part {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit, unique across the catalog.
    pub sku: String,

    pub name: String,

    /// Free-form grouping ("Oil", "Brakes", "Tyres").
    pub category: String,

    /// Purchase cost per unit.
    pub cost_price: Money,

    /// Retail price per unit.
    pub selling_price: Money,

    /// Quantity on hand per branch. Only the ledger writes this.
    pub stock: BTreeMap<String, i64>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Part {
    /// Quantity on hand at a branch (zero when never stocked there).
    pub fn stock_at(&self, branch_id: &str) -> i64 {
        self.stock.get(branch_id).copied().unwrap_or(0)
    }

    /// Quantity on hand across all branches.
    pub fn total_stock(&self) -> i64 {
        self.stock.values().sum()
    }

    /// Selling price minus cost price.
    pub fn unit_margin(&self) -> Money {
        self.selling_price - self.cost_price
    }
}

// =============================================================================
// Inventory
// =============================================================================

/// Direction of an inventory movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InventoryDirection {
    /// Goods in (purchase, opening stock, transfer destination).
    In,
    /// Goods out (sale, work order, transfer source, write-off).
    Out,
}

impl InventoryDirection {
    /// +1 for inbound, -1 for outbound.
    #[inline]
    pub const fn sign(&self) -> i64 {
        match self {
            InventoryDirection::In => 1,
            InventoryDirection::Out => -1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryDirection::In => "in",
            InventoryDirection::Out => "out",
        }
    }
}

/// One stock movement of one part at one branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventoryTransaction {
    pub id: String,
    pub direction: InventoryDirection,
    pub part_id: String,
    /// Part name at time of posting (frozen).
    pub part_name: String,
    /// Always positive; direction gives the sign.
    pub quantity: i64,
    pub unit_price: Money,
    pub total_price: Money,
    pub branch_id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub sale_id: Option<String>,
    pub transfer_id: Option<String>,
    pub receipt_id: Option<String>,
    pub work_order_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl InventoryTransaction {
    /// Signed change this row applies to `Part.stock[branch_id]`.
    #[inline]
    pub fn stock_delta(&self) -> i64 {
        self.direction.sign() * self.quantity
    }

    /// The document that owns this row, if any.
    pub fn link(&self) -> Option<Link> {
        if let Some(id) = &self.sale_id {
            return Some(Link::Sale(id.clone()));
        }
        if let Some(id) = &self.receipt_id {
            return Some(Link::GoodsReceipt(id.clone()));
        }
        if let Some(id) = &self.transfer_id {
            return Some(Link::Transfer(id.clone()));
        }
        self.work_order_id.clone().map(Link::WorkOrder)
    }
}

// =============================================================================
// Cash
// =============================================================================

/// Whether money came in or went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CashFlow {
    Income,
    Expense,
}

impl CashFlow {
    /// +1 for income, -1 for expense.
    #[inline]
    pub const fn sign(&self) -> i64 {
        match self {
            CashFlow::Income => 1,
            CashFlow::Expense => -1,
        }
    }
}

/// What a cash transaction was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CashCategory {
    OpeningBalance,
    RetailSale,
    Service,
    GoodsPurchase,
    Salary,
    Rent,
    Utilities,
    Other,
}

impl CashCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CashCategory::OpeningBalance => "opening_balance",
            CashCategory::RetailSale => "retail_sale",
            CashCategory::Service => "service",
            CashCategory::GoodsPurchase => "goods_purchase",
            CashCategory::Salary => "salary",
            CashCategory::Rent => "rent",
            CashCategory::Utilities => "utilities",
            CashCategory::Other => "other",
        }
    }
}

/// One movement of money on a payment source at a branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashTransaction {
    pub id: String,
    pub flow: CashFlow,
    pub category: CashCategory,
    /// Always positive; flow gives the sign.
    pub amount: Money,
    /// Customer or supplier name.
    pub contact: Option<String>,
    pub payment_source_id: String,
    pub branch_id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub sale_id: Option<String>,
    pub receipt_id: Option<String>,
    pub work_order_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl CashTransaction {
    /// Signed change this row applies to `PaymentSource.balance[branch_id]`.
    #[inline]
    pub fn balance_delta(&self) -> Money {
        self.amount * self.flow.sign()
    }

    /// The document that owns this row, if any.
    pub fn link(&self) -> Option<Link> {
        if let Some(id) = &self.sale_id {
            return Some(Link::Sale(id.clone()));
        }
        if let Some(id) = &self.receipt_id {
            return Some(Link::GoodsReceipt(id.clone()));
        }
        self.work_order_id.clone().map(Link::WorkOrder)
    }
}

/// A named cash drawer or bank account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentSource {
    pub id: String,
    pub name: String,
    /// Balance per branch. Only the ledger writes this.
    pub balance: BTreeMap<String, Money>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl PaymentSource {
    pub fn balance_at(&self, branch_id: &str) -> Money {
        self.balance.get(branch_id).copied().unwrap_or_default()
    }

    pub fn total_balance(&self) -> Money {
        self.balance.values().sum()
    }
}

// =============================================================================
// Document Links
// =============================================================================

/// Reference from a ledger row to the document that posted it.
///
/// Rows with a link are reverted together when their document is deleted
/// or re-posted; they cannot be edited on their own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Link {
    Sale(String),
    GoodsReceipt(String),
    Transfer(String),
    WorkOrder(String),
}

impl Link {
    pub fn id(&self) -> &str {
        match self {
            Link::Sale(id) | Link::GoodsReceipt(id) | Link::Transfer(id) | Link::WorkOrder(id) => {
                id
            }
        }
    }

    /// Whether an inventory row belongs to this document.
    pub fn owns_inventory(&self, tx: &InventoryTransaction) -> bool {
        let field = match self {
            Link::Sale(_) => &tx.sale_id,
            Link::GoodsReceipt(_) => &tx.receipt_id,
            Link::Transfer(_) => &tx.transfer_id,
            Link::WorkOrder(_) => &tx.work_order_id,
        };
        field.as_deref() == Some(self.id())
    }

    /// Whether a cash row belongs to this document.
    pub fn owns_cash(&self, tx: &CashTransaction) -> bool {
        let field = match self {
            Link::Sale(_) => &tx.sale_id,
            Link::GoodsReceipt(_) => &tx.receipt_id,
            Link::Transfer(_) => return false,
            Link::WorkOrder(_) => &tx.work_order_id,
        };
        field.as_deref() == Some(self.id())
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Link::Sale(id) => write!(f, "sale {}", id),
            Link::GoodsReceipt(id) => write!(f, "goods receipt {}", id),
            Link::Transfer(id) => write!(f, "transfer {}", id),
            Link::WorkOrder(id) => write!(f, "work order {}", id),
        }
    }
}

// =============================================================================
// Retail Sale
// =============================================================================

/// A line of a retail sale.
/// Uses snapshot pattern to freeze part data at time of sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleItem {
    pub part_id: String,
    pub sku: String,
    pub part_name: String,
    pub quantity: i64,
    /// Price charged per unit.
    pub unit_price: Money,
    /// Cost price per unit at time of sale, for profit reports.
    pub cost_price: Money,
}

impl SaleItem {
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }

    #[inline]
    pub fn line_cost(&self) -> Money {
        self.cost_price * self.quantity
    }
}

/// A counter sale of parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub branch_id: String,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub items: Vec<SaleItem>,
    /// Σ line totals.
    pub subtotal: Money,
    pub discount: Money,
    /// subtotal − discount.
    pub total: Money,
    pub payment_source_id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Sale {
    pub fn cost(&self) -> Money {
        self.items.iter().map(SaleItem::line_cost).sum()
    }
}

// =============================================================================
// Goods Receipt
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReceiptItem {
    pub part_id: String,
    pub part_name: String,
    pub quantity: i64,
    pub unit_cost: Money,
}

impl ReceiptItem {
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_cost * self.quantity
    }
}

/// A delivery of parts from a supplier.
///
/// Paid when `payment_source_id` is set; the expense is then posted on
/// that source at the receipt's branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GoodsReceipt {
    pub id: String,
    pub branch_id: String,
    pub supplier: String,
    pub items: Vec<ReceiptItem>,
    pub total: Money,
    pub payment_source_id: Option<String>,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Work Orders
// =============================================================================

/// Where a repair job is in its life.
///
/// ```text
/// received ──► in_repair ──► done ──► returned
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderStatus {
    #[default]
    Received,
    InRepair,
    Done,
    Returned,
}

impl WorkOrderStatus {
    /// The forward transition, `None` once returned.
    pub const fn next(&self) -> Option<WorkOrderStatus> {
        match self {
            WorkOrderStatus::Received => Some(WorkOrderStatus::InRepair),
            WorkOrderStatus::InRepair => Some(WorkOrderStatus::Done),
            WorkOrderStatus::Done => Some(WorkOrderStatus::Returned),
            WorkOrderStatus::Returned => None,
        }
    }

    /// Done or returned: the work counts as revenue.
    pub const fn is_completed(&self) -> bool {
        matches!(self, WorkOrderStatus::Done | WorkOrderStatus::Returned)
    }
}

/// A catalog part consumed by a work order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PartUsage {
    pub part_id: String,
    pub part_name: String,
    pub quantity: i64,
    /// Price charged per unit.
    pub price: Money,
    /// Cost price per unit at time of use.
    pub cost_price: Money,
}

impl PartUsage {
    #[inline]
    pub fn line_total(&self) -> Money {
        self.price * self.quantity
    }

    #[inline]
    pub fn line_cost(&self) -> Money {
        self.cost_price * self.quantity
    }
}

/// An ad hoc priced line outside the parts catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QuotationItem {
    pub description: String,
    pub quantity: i64,
    pub unit_price: Money,
}

impl QuotationItem {
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

/// A service ticket from intake to return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WorkOrder {
    pub id: String,
    pub branch_id: String,
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub vehicle: Option<String>,
    pub license_plate: Option<String>,
    pub odometer: Option<i64>,
    pub issue_description: String,
    pub technician: Option<String>,
    pub status: WorkOrderStatus,
    pub parts_used: Vec<PartUsage>,
    pub quotation_items: Vec<QuotationItem>,
    pub labor_cost: Money,
    pub discount: Money,
    /// Stored redundantly; see `workorder::compute_total`.
    pub total: Money,
    /// Set once the customer has paid.
    pub payment_source_id: Option<String>,
    #[ts(as = "Option<String>")]
    pub paid_on: Option<NaiveDate>,
    #[ts(as = "String")]
    pub received_on: NaiveDate,
    #[ts(as = "Option<String>")]
    pub completed_on: Option<NaiveDate>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl WorkOrder {
    pub fn is_paid(&self) -> bool {
        self.payment_source_id.is_some() && self.paid_on.is_some()
    }

    /// Date used by reports: completion date, else intake date.
    pub fn revenue_date(&self) -> NaiveDate {
        self.completed_on.unwrap_or(self.received_on)
    }
}

// =============================================================================
// Customers
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub vehicle: Option<String>,
    pub license_plate: Option<String>,
    pub loyalty_points: i64,
    pub last_service_odometer: Option<i64>,
    #[ts(as = "Option<String>")]
    pub last_service_date: Option<NaiveDate>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Assets & Capital
// =============================================================================

/// Equipment or fit-out owned by a branch (lifts, compressors, tools).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FixedAsset {
    pub id: String,
    pub name: String,
    pub price: Money,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub branch_id: String,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Owner money put into a branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CapitalInvestment {
    pub id: String,
    pub description: String,
    pub amount: Money,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub branch_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Input Drafts
// =============================================================================
// What the front end sends. Ids, snapshots and totals are filled in by the
// book or the repositories.

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewPart {
    pub sku: String,
    pub name: String,
    pub category: String,
    pub cost_price: Money,
    pub selling_price: Money,
    /// Opening stock per branch, posted as inbound transactions.
    #[serde(default)]
    pub opening_stock: BTreeMap<String, i64>,
    #[ts(as = "String")]
    pub date: NaiveDate,
}

/// Catalog fields of a part. Stock is not editable here.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PartUpdate {
    pub sku: String,
    pub name: String,
    pub category: String,
    pub cost_price: Money,
    pub selling_price: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewInventoryTransaction {
    pub direction: InventoryDirection,
    pub part_id: String,
    pub quantity: i64,
    /// Defaults to cost price (in) or selling price (out).
    pub unit_price: Option<Money>,
    pub branch_id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventoryUpdate {
    pub quantity: i64,
    pub unit_price: Money,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransferRequest {
    pub part_id: String,
    pub quantity: i64,
    pub from_branch: String,
    pub to_branch: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub notes: Option<String>,
}

/// Manual cash entry, also the full replacement on edit.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCashTransaction {
    pub flow: CashFlow,
    pub category: CashCategory,
    pub amount: Money,
    pub contact: Option<String>,
    pub payment_source_id: String,
    pub branch_id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewPaymentSource {
    pub name: String,
    /// Opening balance per branch, posted as income transactions.
    #[serde(default)]
    pub opening_balance: BTreeMap<String, Money>,
    #[ts(as = "String")]
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLineDraft {
    pub part_id: String,
    pub quantity: i64,
    /// Overrides the part's selling price.
    pub unit_price: Option<Money>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleDraft {
    pub branch_id: String,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub items: Vec<SaleLineDraft>,
    #[serde(default)]
    pub discount: Money,
    pub payment_source_id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReceiptLineDraft {
    pub part_id: String,
    pub quantity: i64,
    pub unit_cost: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GoodsReceiptDraft {
    pub branch_id: String,
    pub supplier: String,
    pub items: Vec<ReceiptLineDraft>,
    /// Set when the delivery is paid on receipt.
    pub payment_source_id: Option<String>,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub notes: Option<String>,
    /// Copy each line's unit cost onto the part's cost price.
    #[serde(default)]
    pub update_cost_price: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PartUsageDraft {
    pub part_id: String,
    pub quantity: i64,
    /// Overrides the part's selling price.
    pub price: Option<Money>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WorkOrderDraft {
    pub branch_id: String,
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub vehicle: Option<String>,
    pub license_plate: Option<String>,
    pub odometer: Option<i64>,
    pub issue_description: String,
    pub technician: Option<String>,
    #[serde(default)]
    pub status: WorkOrderStatus,
    #[serde(default)]
    pub parts: Vec<PartUsageDraft>,
    #[serde(default)]
    pub quotation_items: Vec<QuotationItem>,
    #[serde(default)]
    pub labor_cost: Money,
    #[serde(default)]
    pub discount: Money,
    #[ts(as = "String")]
    pub received_on: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCustomer {
    pub name: String,
    pub phone: String,
    pub vehicle: Option<String>,
    pub license_plate: Option<String>,
    pub last_service_odometer: Option<i64>,
    #[ts(as = "Option<String>")]
    pub last_service_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewFixedAsset {
    pub name: String,
    pub price: Money,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub branch_id: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCapitalInvestment {
    pub description: String,
    pub amount: Money,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub branch_id: String,
}

// =============================================================================
// Unit Tests
// =============================================================================
