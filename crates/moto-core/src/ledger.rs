//! # Ledger Module
//!
//! The one place where stock counts and payment-source balances change.
//!
//! ## Postings
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Ledger Posting Flow                               │
//! │                                                                         │
//! │  Document (sale, receipt, transfer, work order, manual entry)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Posting { inventory: [InventoryTransaction], cash: [CashTransaction] } │
//! │       │                                                                 │
//! │       ├──► net_stock_deltas()   (part, branch) → Σ ±quantity            │
//! │       └──► net_balance_deltas() (source, branch) → Σ ±amount            │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │  check_stock_levels() ── rejects overdraft before anything changes     │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │  apply deltas + append rows        (ShopBook in memory, moto-db in SQL)│
//! │                                                                         │
//! │  Edit   = remove old rows (inverse deltas) + apply new posting         │
//! │  Delete = remove rows (inverse deltas), never guarded                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - `Part.stock[b] == Σ in.quantity − Σ out.quantity` over rows at `b`
//! - `PaymentSource.balance[b] == Σ income.amount − Σ expense.amount` over rows at `b`

use chrono::{NaiveDate, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{
    CashCategory, CashFlow, CashTransaction, InventoryDirection, InventoryTransaction,
    NewCashTransaction, NewInventoryTransaction, Part, PaymentSource, TransferRequest,
};
use crate::validation::{validate_amount, validate_price, validate_quantity};

/// `(part_id, branch_id)`
pub type StockKey = (String, String);

/// `(payment_source_id, branch_id)`
pub type BalanceKey = (String, String);

// =============================================================================
// Part Lookup
// =============================================================================

/// Read access to parts by id, for posting builders and stock checks.
pub trait PartCatalog {
    fn find_part(&self, id: &str) -> Option<&Part>;

    fn require_part(&self, id: &str) -> CoreResult<&Part> {
        self.find_part(id)
            .ok_or_else(|| CoreError::PartNotFound(id.to_string()))
    }
}

impl PartCatalog for [Part] {
    fn find_part(&self, id: &str) -> Option<&Part> {
        self.iter().find(|p| p.id == id)
    }
}

impl PartCatalog for Vec<Part> {
    fn find_part(&self, id: &str) -> Option<&Part> {
        self.as_slice().find_part(id)
    }
}

impl PartCatalog for BTreeMap<String, Part> {
    fn find_part(&self, id: &str) -> Option<&Part> {
        self.get(id)
    }
}

// =============================================================================
// Posting
// =============================================================================

/// The ledger rows one document produces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Posting {
    pub inventory: Vec<InventoryTransaction>,
    pub cash: Vec<CashTransaction>,
}

impl Posting {
    pub fn new() -> Self {
        Posting::default()
    }

    pub fn is_empty(&self) -> bool {
        self.inventory.is_empty() && self.cash.is_empty()
    }

    pub fn stock_deltas(&self) -> BTreeMap<StockKey, i64> {
        net_stock_deltas(&self.inventory)
    }

    pub fn balance_deltas(&self) -> BTreeMap<BalanceKey, Money> {
        net_balance_deltas(&self.cash)
    }

    /// Appends another posting's rows.
    pub fn extend(&mut self, other: Posting) {
        self.inventory.extend(other.inventory);
        self.cash.extend(other.cash);
    }
}

// =============================================================================
// Delta Arithmetic
// =============================================================================

/// Net stock change per (part, branch) of a set of inventory rows.
///
/// Also the replay of a full history: replaying every row from empty gives
/// the stock each part should have.
pub fn net_stock_deltas<'a, I>(rows: I) -> BTreeMap<StockKey, i64>
where
    I: IntoIterator<Item = &'a InventoryTransaction>,
{
    let mut deltas = BTreeMap::new();
    for tx in rows {
        *deltas
            .entry((tx.part_id.clone(), tx.branch_id.clone()))
            .or_insert(0) += tx.stock_delta();
    }
    deltas
}

/// Net balance change per (payment source, branch) of a set of cash rows.
pub fn net_balance_deltas<'a, I>(rows: I) -> BTreeMap<BalanceKey, Money>
where
    I: IntoIterator<Item = &'a CashTransaction>,
{
    let mut deltas = BTreeMap::new();
    for tx in rows {
        *deltas
            .entry((tx.payment_source_id.clone(), tx.branch_id.clone()))
            .or_insert_with(Money::zero) += tx.balance_delta();
    }
    deltas
}

/// `after − before`, keeping only keys with a non-zero result.
///
/// Used for edits: the rows being replaced are `before`, the new posting
/// is `after`.
pub fn combine_stock_deltas(
    before: &BTreeMap<StockKey, i64>,
    after: &BTreeMap<StockKey, i64>,
) -> BTreeMap<StockKey, i64> {
    let mut combined = after.clone();
    for (key, delta) in before {
        *combined.entry(key.clone()).or_insert(0) -= delta;
    }
    combined.retain(|_, d| *d != 0);
    combined
}

/// `after − before` for balances, keeping only non-zero keys.
pub fn combine_balance_deltas(
    before: &BTreeMap<BalanceKey, Money>,
    after: &BTreeMap<BalanceKey, Money>,
) -> BTreeMap<BalanceKey, Money> {
    let mut combined = after.clone();
    for (key, delta) in before {
        *combined.entry(key.clone()).or_insert_with(Money::zero) -= *delta;
    }
    combined.retain(|_, d| !d.is_zero());
    combined
}

/// Inverts every delta (the reversal of a set of rows).
pub fn invert_stock_deltas(deltas: &BTreeMap<StockKey, i64>) -> BTreeMap<StockKey, i64> {
    deltas.iter().map(|(k, d)| (k.clone(), -d)).collect()
}

pub fn invert_balance_deltas(deltas: &BTreeMap<BalanceKey, Money>) -> BTreeMap<BalanceKey, Money> {
    deltas.iter().map(|(k, d)| (k.clone(), -*d)).collect()
}

// =============================================================================
// Applying Deltas
// =============================================================================

/// Adds `delta` to `part.stock[branch_id]`.
pub fn apply_stock_delta(part: &mut Part, branch_id: &str, delta: i64) {
    if delta == 0 {
        return;
    }
    *part.stock.entry(branch_id.to_string()).or_insert(0) += delta;
    part.updated_at = Utc::now();
}

/// Adds `delta` to `source.balance[branch_id]`.
pub fn apply_balance_delta(source: &mut PaymentSource, branch_id: &str, delta: Money) {
    if delta.is_zero() {
        return;
    }
    *source
        .balance
        .entry(branch_id.to_string())
        .or_insert_with(Money::zero) += delta;
}

/// Rejects any negative delta that would take branch stock below zero.
///
/// Positive deltas and reversals never fail. With `allow_negative` the
/// check only verifies that every part exists.
pub fn check_stock_levels<C>(
    catalog: &C,
    deltas: &BTreeMap<StockKey, i64>,
    allow_negative: bool,
) -> CoreResult<()>
where
    C: PartCatalog + ?Sized,
{
    for ((part_id, branch_id), delta) in deltas {
        let part = catalog.require_part(part_id)?;
        if allow_negative || *delta >= 0 {
            continue;
        }
        let available = part.stock_at(branch_id);
        if available + delta < 0 {
            return Err(CoreError::InsufficientStock {
                sku: part.sku.clone(),
                branch_id: branch_id.clone(),
                available,
                requested: -delta,
            });
        }
    }
    Ok(())
}

// =============================================================================
// Row Builders
// =============================================================================

/// Builds an inventory row with a fresh id and no link.
pub fn inventory_row(
    direction: InventoryDirection,
    part: &Part,
    quantity: i64,
    unit_price: Money,
    branch_id: &str,
    date: NaiveDate,
    notes: Option<String>,
) -> InventoryTransaction {
    snapshot_row(
        direction,
        (&part.id, &part.name),
        quantity,
        unit_price,
        branch_id,
        date,
        notes,
    )
}

/// Same as [`inventory_row`] from a frozen `(part_id, part_name)` snapshot,
/// for documents that no longer hold the live part.
pub fn snapshot_row(
    direction: InventoryDirection,
    (part_id, part_name): (&str, &str),
    quantity: i64,
    unit_price: Money,
    branch_id: &str,
    date: NaiveDate,
    notes: Option<String>,
) -> InventoryTransaction {
    InventoryTransaction {
        id: Uuid::new_v4().to_string(),
        direction,
        part_id: part_id.to_string(),
        part_name: part_name.to_string(),
        quantity,
        unit_price,
        total_price: unit_price * quantity,
        branch_id: branch_id.to_string(),
        date,
        notes,
        sale_id: None,
        transfer_id: None,
        receipt_id: None,
        work_order_id: None,
        created_at: Utc::now(),
    }
}

/// Builds a cash row with a fresh id and no link.
pub fn cash_row(draft: NewCashTransaction) -> CashTransaction {
    CashTransaction {
        id: Uuid::new_v4().to_string(),
        flow: draft.flow,
        category: draft.category,
        amount: draft.amount,
        contact: draft.contact,
        payment_source_id: draft.payment_source_id,
        branch_id: draft.branch_id,
        date: draft.date,
        notes: draft.notes,
        sale_id: None,
        receipt_id: None,
        work_order_id: None,
        created_at: Utc::now(),
    }
}

/// A manual stock adjustment (count correction, write-off, ad hoc purchase).
pub fn manual_inventory(
    draft: NewInventoryTransaction,
    part: &Part,
) -> CoreResult<InventoryTransaction> {
    validate_quantity(draft.quantity)?;
    let unit_price = draft.unit_price.unwrap_or(match draft.direction {
        InventoryDirection::In => part.cost_price,
        InventoryDirection::Out => part.selling_price,
    });
    validate_price("unit_price", unit_price)?;

    Ok(inventory_row(
        draft.direction,
        part,
        draft.quantity,
        unit_price,
        &draft.branch_id,
        draft.date,
        draft.notes,
    ))
}

/// A manual income or expense entry.
pub fn manual_cash(draft: NewCashTransaction) -> CoreResult<CashTransaction> {
    validate_amount(draft.amount)?;
    Ok(cash_row(draft))
}

/// Opening stock for a new part: one inbound row per branch with qty > 0.
pub fn opening_stock(
    part: &Part,
    stock: &BTreeMap<String, i64>,
    date: NaiveDate,
) -> CoreResult<Posting> {
    let mut posting = Posting::new();
    for (branch_id, qty) in stock {
        if *qty == 0 {
            continue;
        }
        validate_quantity(*qty)?;
        posting.inventory.push(inventory_row(
            InventoryDirection::In,
            part,
            *qty,
            part.cost_price,
            branch_id,
            date,
            Some("Opening stock".to_string()),
        ));
    }
    Ok(posting)
}

/// Opening balance for a new payment source: one income row per branch.
pub fn opening_balance(
    source: &PaymentSource,
    balance: &BTreeMap<String, Money>,
    date: NaiveDate,
) -> CoreResult<Posting> {
    let mut posting = Posting::new();
    for (branch_id, amount) in balance {
        if amount.is_zero() {
            continue;
        }
        validate_amount(*amount)?;
        posting.cash.push(cash_row(NewCashTransaction {
            flow: CashFlow::Income,
            category: CashCategory::OpeningBalance,
            amount: *amount,
            contact: None,
            payment_source_id: source.id.clone(),
            branch_id: branch_id.clone(),
            date,
            notes: Some("Opening balance".to_string()),
        }));
    }
    Ok(posting)
}

/// A branch-to-branch transfer: out at `from_branch`, in at `to_branch`,
/// both carrying the returned transfer id.
pub fn transfer(request: TransferRequest, part: &Part) -> CoreResult<(String, Posting)> {
    validate_quantity(request.quantity)?;
    if request.from_branch == request.to_branch {
        return Err(CoreError::SameBranchTransfer(request.from_branch));
    }

    let transfer_id = Uuid::new_v4().to_string();
    let note = request
        .notes
        .clone()
        .unwrap_or_else(|| format!("Transfer {} → {}", request.from_branch, request.to_branch));

    let mut out = inventory_row(
        InventoryDirection::Out,
        part,
        request.quantity,
        part.cost_price,
        &request.from_branch,
        request.date,
        Some(note.clone()),
    );
    out.transfer_id = Some(transfer_id.clone());

    let mut inbound = inventory_row(
        InventoryDirection::In,
        part,
        request.quantity,
        part.cost_price,
        &request.to_branch,
        request.date,
        Some(note),
    );
    inbound.transfer_id = Some(transfer_id.clone());

    Ok((
        transfer_id,
        Posting {
            inventory: vec![out, inbound],
            cash: Vec::new(),
        },
    ))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    }

    fn part(stock: &[(&str, i64)]) -> Part {
        Part {
            id: "p-1".to_string(),
            sku: "BRAKE-PAD".to_string(),
            name: "Brake pad".to_string(),
            category: "Brakes".to_string(),
            cost_price: Money::new(60_000),
            selling_price: Money::new(95_000),
            stock: stock.iter().map(|(b, q)| (b.to_string(), *q)).collect(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn source() -> PaymentSource {
        PaymentSource {
            id: "cash".to_string(),
            name: "Cash drawer".to_string(),
            balance: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_net_stock_deltas_sum_per_key() {
        let p = part(&[]);
        let rows = vec![
            inventory_row(InventoryDirection::In, &p, 10, p.cost_price, "HN", date(), None),
            inventory_row(InventoryDirection::Out, &p, 3, p.selling_price, "HN", date(), None),
            inventory_row(InventoryDirection::In, &p, 2, p.cost_price, "HCM", date(), None),
        ];
        let deltas = net_stock_deltas(&rows);
        assert_eq!(deltas[&("p-1".to_string(), "HN".to_string())], 7);
        assert_eq!(deltas[&("p-1".to_string(), "HCM".to_string())], 2);
    }

    #[test]
    fn test_combine_drops_zero_keys() {
        let key = ("p-1".to_string(), "HN".to_string());
        let before = BTreeMap::from([(key.clone(), -3)]);
        let after = BTreeMap::from([(key.clone(), -3)]);
        assert!(combine_stock_deltas(&before, &after).is_empty());

        let after = BTreeMap::from([(key.clone(), -5)]);
        assert_eq!(combine_stock_deltas(&before, &after)[&key], -2);
    }

    #[test]
    fn test_check_stock_levels_rejects_overdraft() {
        let parts = vec![part(&[("HN", 2)])];
        let deltas = BTreeMap::from([(("p-1".to_string(), "HN".to_string()), -3)]);

        let err = check_stock_levels(&parts, &deltas, false).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock {
                available: 2,
                requested: 3,
                ..
            }
        ));

        assert!(check_stock_levels(&parts, &deltas, true).is_ok());
    }

    #[test]
    fn test_check_stock_levels_unknown_part() {
        let parts: Vec<Part> = Vec::new();
        let deltas = BTreeMap::from([(("ghost".to_string(), "HN".to_string()), 1)]);
        assert!(matches!(
            check_stock_levels(&parts, &deltas, false),
            Err(CoreError::PartNotFound(_))
        ));
    }

    #[test]
    fn test_apply_balance_delta() {
        let mut s = source();
        apply_balance_delta(&mut s, "HN", Money::new(500));
        apply_balance_delta(&mut s, "HN", Money::new(-200));
        assert_eq!(s.balance_at("HN").amount(), 300);
        assert_eq!(s.balance_at("HCM").amount(), 0);
    }

    #[test]
    fn test_transfer_builds_two_linked_legs() {
        let p = part(&[("HN", 5)]);
        let (id, posting) = transfer(
            TransferRequest {
                part_id: p.id.clone(),
                quantity: 2,
                from_branch: "HN".to_string(),
                to_branch: "HCM".to_string(),
                date: date(),
                notes: None,
            },
            &p,
        )
        .unwrap();

        assert_eq!(posting.inventory.len(), 2);
        assert!(posting
            .inventory
            .iter()
            .all(|tx| tx.transfer_id.as_deref() == Some(id.as_str())));
        let deltas = posting.stock_deltas();
        assert_eq!(deltas[&("p-1".to_string(), "HN".to_string())], -2);
        assert_eq!(deltas[&("p-1".to_string(), "HCM".to_string())], 2);
    }

    #[test]
    fn test_transfer_same_branch_rejected() {
        let p = part(&[("HN", 5)]);
        let result = transfer(
            TransferRequest {
                part_id: p.id.clone(),
                quantity: 1,
                from_branch: "HN".to_string(),
                to_branch: "HN".to_string(),
                date: date(),
                notes: None,
            },
            &p,
        );
        assert!(matches!(result, Err(CoreError::SameBranchTransfer(_))));
    }

    #[test]
    fn test_manual_inventory_default_prices() {
        let p = part(&[]);
        let inbound = manual_inventory(
            NewInventoryTransaction {
                direction: InventoryDirection::In,
                part_id: p.id.clone(),
                quantity: 4,
                unit_price: None,
                branch_id: "HN".to_string(),
                date: date(),
                notes: None,
            },
            &p,
        )
        .unwrap();
        assert_eq!(inbound.unit_price, p.cost_price);
        assert_eq!(inbound.total_price.amount(), 240_000);

        let outbound = manual_inventory(
            NewInventoryTransaction {
                direction: InventoryDirection::Out,
                part_id: p.id.clone(),
                quantity: 1,
                unit_price: None,
                branch_id: "HN".to_string(),
                date: date(),
                notes: None,
            },
            &p,
        )
        .unwrap();
        assert_eq!(outbound.unit_price, p.selling_price);
    }

    #[test]
    fn test_opening_balance_skips_zero() {
        let s = source();
        let posting = opening_balance(
            &s,
            &BTreeMap::from([
                ("HN".to_string(), Money::new(1_000_000)),
                ("HCM".to_string(), Money::zero()),
            ]),
            date(),
        )
        .unwrap();
        assert_eq!(posting.cash.len(), 1);
        assert_eq!(posting.cash[0].category, CashCategory::OpeningBalance);
        assert_eq!(posting.cash[0].balance_delta().amount(), 1_000_000);
    }
}
