//! # Ledger Repository
//!
//! SQL side of `moto_core::ledger`: the only code that writes
//! `part_stock` and `payment_source_balances`.
//!
//! ## Commit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  commit(conn, before, after, allow_negative)                            │
//! │                                                                         │
//! │  before = rows being replaced (loaded by id or by link)                 │
//! │  after  = rows of the new posting                                       │
//! │                                                                         │
//! │  1. combine deltas      after − before, per (part, branch) and          │
//! │                         per (source, branch)                            │
//! │  2. checks              branches, payment sources, stock levels         │
//! │  3. DELETE before rows                                                  │
//! │  4. INSERT after rows                                                   │
//! │  5. UPSERT running totals                                               │
//! │                                                                         │
//! │  Callers run this inside one SQL transaction with the document          │
//! │  row itself, so a failed check leaves nothing behind.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Helpers here take `&mut SqliteConnection` so they work both on a pooled
//! connection and inside a transaction.

use chrono::{DateTime, NaiveDate, Utc};
use moto_core::ledger::{check_stock_levels, combine_balance_deltas, combine_stock_deltas};
use moto_core::{
    CashCategory, CashFlow, CashTransaction, CoreError, InventoryDirection, InventoryTransaction,
    Link, Money, Posting,
};
use sqlx::{FromRow, SqliteConnection};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::part::load_parts;

// =============================================================================
// Row Types
// =============================================================================

pub(crate) const INVENTORY_COLUMNS: &str = "id, direction, part_id, part_name, quantity, \
     unit_price, total_price, branch_id, date, notes, sale_id, transfer_id, receipt_id, \
     work_order_id, created_at";

#[derive(Debug, FromRow)]
pub(crate) struct InventoryRow {
    id: String,
    direction: InventoryDirection,
    part_id: String,
    part_name: String,
    quantity: i64,
    unit_price: i64,
    total_price: i64,
    branch_id: String,
    date: NaiveDate,
    notes: Option<String>,
    sale_id: Option<String>,
    transfer_id: Option<String>,
    receipt_id: Option<String>,
    work_order_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<InventoryRow> for InventoryTransaction {
    fn from(row: InventoryRow) -> Self {
        InventoryTransaction {
            id: row.id,
            direction: row.direction,
            part_id: row.part_id,
            part_name: row.part_name,
            quantity: row.quantity,
            unit_price: Money::new(row.unit_price),
            total_price: Money::new(row.total_price),
            branch_id: row.branch_id,
            date: row.date,
            notes: row.notes,
            sale_id: row.sale_id,
            transfer_id: row.transfer_id,
            receipt_id: row.receipt_id,
            work_order_id: row.work_order_id,
            created_at: row.created_at,
        }
    }
}

pub(crate) const CASH_COLUMNS: &str = "id, flow, category, amount, contact, payment_source_id, \
     branch_id, date, notes, sale_id, receipt_id, work_order_id, created_at";

#[derive(Debug, FromRow)]
pub(crate) struct CashRow {
    id: String,
    flow: CashFlow,
    category: CashCategory,
    amount: i64,
    contact: Option<String>,
    payment_source_id: String,
    branch_id: String,
    date: NaiveDate,
    notes: Option<String>,
    sale_id: Option<String>,
    receipt_id: Option<String>,
    work_order_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<CashRow> for CashTransaction {
    fn from(row: CashRow) -> Self {
        CashTransaction {
            id: row.id,
            flow: row.flow,
            category: row.category,
            amount: Money::new(row.amount),
            contact: row.contact,
            payment_source_id: row.payment_source_id,
            branch_id: row.branch_id,
            date: row.date,
            notes: row.notes,
            sale_id: row.sale_id,
            receipt_id: row.receipt_id,
            work_order_id: row.work_order_id,
            created_at: row.created_at,
        }
    }
}

// =============================================================================
// Lookups
// =============================================================================

pub(crate) async fn fetch_inventory(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<InventoryTransaction>> {
    let sql = format!(
        "SELECT {} FROM inventory_transactions WHERE id = ?1",
        INVENTORY_COLUMNS
    );
    let row = sqlx::query_as::<_, InventoryRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(Into::into))
}

pub(crate) async fn fetch_cash(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<CashTransaction>> {
    let sql = format!("SELECT {} FROM cash_transactions WHERE id = ?1", CASH_COLUMNS);
    let row = sqlx::query_as::<_, CashRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(Into::into))
}

fn inventory_link_column(link: &Link) -> &'static str {
    match link {
        Link::Sale(_) => "sale_id",
        Link::GoodsReceipt(_) => "receipt_id",
        Link::Transfer(_) => "transfer_id",
        Link::WorkOrder(_) => "work_order_id",
    }
}

fn cash_link_column(link: &Link) -> Option<&'static str> {
    match link {
        Link::Sale(_) => Some("sale_id"),
        Link::GoodsReceipt(_) => Some("receipt_id"),
        Link::Transfer(_) => None,
        Link::WorkOrder(_) => Some("work_order_id"),
    }
}

/// Every ledger row a document posted.
pub(crate) async fn linked_rows(conn: &mut SqliteConnection, link: &Link) -> DbResult<Posting> {
    let sql = format!(
        "SELECT {} FROM inventory_transactions WHERE {} = ?1 ORDER BY created_at",
        INVENTORY_COLUMNS,
        inventory_link_column(link)
    );
    let inventory = sqlx::query_as::<_, InventoryRow>(&sql)
        .bind(link.id())
        .fetch_all(&mut *conn)
        .await?;

    let cash = match cash_link_column(link) {
        Some(column) => {
            let sql = format!(
                "SELECT {} FROM cash_transactions WHERE {} = ?1 ORDER BY created_at",
                CASH_COLUMNS, column
            );
            sqlx::query_as::<_, CashRow>(&sql)
                .bind(link.id())
                .fetch_all(&mut *conn)
                .await?
        }
        None => Vec::new(),
    };

    Ok(Posting {
        inventory: inventory.into_iter().map(Into::into).collect(),
        cash: cash.into_iter().map(Into::into).collect(),
    })
}

pub(crate) async fn require_branch(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    let found: Option<String> = sqlx::query_scalar("SELECT id FROM branches WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    match found {
        Some(_) => Ok(()),
        None => Err(CoreError::BranchNotFound(id.to_string()).into()),
    }
}

pub(crate) async fn require_payment_source(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    let found: Option<String> = sqlx::query_scalar("SELECT id FROM payment_sources WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    match found {
        Some(_) => Ok(()),
        None => Err(CoreError::PaymentSourceNotFound(id.to_string()).into()),
    }
}

pub(crate) async fn require_customer(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    let found: Option<String> = sqlx::query_scalar("SELECT id FROM customers WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    match found {
        Some(_) => Ok(()),
        None => Err(CoreError::CustomerNotFound(id.to_string()).into()),
    }
}

pub(crate) fn linked_error(id: &str, link: &Link) -> CoreError {
    CoreError::LinkedTransaction {
        id: id.to_string(),
        link: link.to_string(),
    }
}

// =============================================================================
// Commit
// =============================================================================

/// Replaces the `before` rows with the `after` rows and moves the running
/// totals by the difference.
///
/// All checks run before the first write. With `allow_negative` the stock
/// check only verifies that the parts exist; deletes and reversals pass
/// `true` so they are never blocked.
pub(crate) async fn commit(
    conn: &mut SqliteConnection,
    before: &Posting,
    after: &Posting,
    allow_negative: bool,
) -> DbResult<()> {
    let stock = combine_stock_deltas(&before.stock_deltas(), &after.stock_deltas());
    let balance = combine_balance_deltas(&before.balance_deltas(), &after.balance_deltas());

    let branches = after
        .inventory
        .iter()
        .map(|tx| tx.branch_id.as_str())
        .chain(after.cash.iter().map(|tx| tx.branch_id.as_str()));
    for branch_id in branches {
        require_branch(conn, branch_id).await?;
    }
    for (source_id, _) in balance.keys() {
        require_payment_source(conn, source_id).await?;
    }
    let parts = load_parts(conn, stock.keys().map(|(part_id, _)| part_id.as_str())).await?;
    check_stock_levels(parts.as_slice(), &stock, allow_negative)?;

    for tx in &before.inventory {
        sqlx::query("DELETE FROM inventory_transactions WHERE id = ?1")
            .bind(&tx.id)
            .execute(&mut *conn)
            .await?;
    }
    for tx in &before.cash {
        sqlx::query("DELETE FROM cash_transactions WHERE id = ?1")
            .bind(&tx.id)
            .execute(&mut *conn)
            .await?;
    }
    for tx in &after.inventory {
        insert_inventory(conn, tx).await?;
    }
    for tx in &after.cash {
        insert_cash(conn, tx).await?;
    }

    let now = Utc::now();
    for ((part_id, branch_id), delta) in &stock {
        sqlx::query(
            r#"
            INSERT INTO part_stock (part_id, branch_id, quantity)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(part_id, branch_id) DO UPDATE SET quantity = quantity + excluded.quantity
            "#,
        )
        .bind(part_id)
        .bind(branch_id)
        .bind(*delta)
        .execute(&mut *conn)
        .await?;

        sqlx::query("UPDATE parts SET updated_at = ?2 WHERE id = ?1")
            .bind(part_id)
            .bind(now)
            .execute(&mut *conn)
            .await?;
    }
    for ((source_id, branch_id), delta) in &balance {
        sqlx::query(
            r#"
            INSERT INTO payment_source_balances (payment_source_id, branch_id, balance)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(payment_source_id, branch_id) DO UPDATE SET balance = balance + excluded.balance
            "#,
        )
        .bind(source_id)
        .bind(branch_id)
        .bind(delta.amount())
        .execute(&mut *conn)
        .await?;
    }

    debug!(
        removed = before.inventory.len() + before.cash.len(),
        added = after.inventory.len() + after.cash.len(),
        stock_keys = stock.len(),
        balance_keys = balance.len(),
        "Ledger posting committed"
    );
    Ok(())
}

async fn insert_inventory(conn: &mut SqliteConnection, tx: &InventoryTransaction) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO inventory_transactions (
            id, direction, part_id, part_name, quantity,
            unit_price, total_price, branch_id, date, notes,
            sale_id, transfer_id, receipt_id, work_order_id, created_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5,
            ?6, ?7, ?8, ?9, ?10,
            ?11, ?12, ?13, ?14, ?15
        )
        "#,
    )
    .bind(&tx.id)
    .bind(tx.direction)
    .bind(&tx.part_id)
    .bind(&tx.part_name)
    .bind(tx.quantity)
    .bind(tx.unit_price.amount())
    .bind(tx.total_price.amount())
    .bind(&tx.branch_id)
    .bind(tx.date)
    .bind(&tx.notes)
    .bind(&tx.sale_id)
    .bind(&tx.transfer_id)
    .bind(&tx.receipt_id)
    .bind(&tx.work_order_id)
    .bind(tx.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_cash(conn: &mut SqliteConnection, tx: &CashTransaction) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO cash_transactions (
            id, flow, category, amount, contact,
            payment_source_id, branch_id, date, notes,
            sale_id, receipt_id, work_order_id, created_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5,
            ?6, ?7, ?8, ?9,
            ?10, ?11, ?12, ?13
        )
        "#,
    )
    .bind(&tx.id)
    .bind(tx.flow)
    .bind(tx.category)
    .bind(tx.amount.amount())
    .bind(&tx.contact)
    .bind(&tx.payment_source_id)
    .bind(&tx.branch_id)
    .bind(tx.date)
    .bind(&tx.notes)
    .bind(&tx.sale_id)
    .bind(&tx.receipt_id)
    .bind(&tx.work_order_id)
    .bind(tx.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

// =============================================================================
// Consistency
// =============================================================================

/// Running totals that disagree with the replay of the transaction rows.
///
/// Returns `(kind, key, recorded, replayed)` for every mismatch; empty
/// when the ledger is consistent.
pub(crate) async fn mismatches(
    conn: &mut SqliteConnection,
) -> DbResult<Vec<(String, String, i64, i64)>> {
    let stock: Vec<(String, String, i64, i64)> = sqlx::query_as(
        r#"
        SELECT part_id, branch_id, recorded, replayed FROM (
            SELECT k.part_id, k.branch_id,
                   COALESCE((SELECT quantity FROM part_stock s
                             WHERE s.part_id = k.part_id AND s.branch_id = k.branch_id), 0) AS recorded,
                   COALESCE((SELECT SUM(CASE direction WHEN 'in' THEN quantity ELSE -quantity END)
                             FROM inventory_transactions t
                             WHERE t.part_id = k.part_id AND t.branch_id = k.branch_id), 0) AS replayed
            FROM (
                SELECT part_id, branch_id FROM part_stock
                UNION
                SELECT part_id, branch_id FROM inventory_transactions
            ) k
        ) WHERE recorded <> replayed
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    let balance: Vec<(String, String, i64, i64)> = sqlx::query_as(
        r#"
        SELECT payment_source_id, branch_id, recorded, replayed FROM (
            SELECT k.payment_source_id, k.branch_id,
                   COALESCE((SELECT balance FROM payment_source_balances b
                             WHERE b.payment_source_id = k.payment_source_id
                               AND b.branch_id = k.branch_id), 0) AS recorded,
                   COALESCE((SELECT SUM(CASE flow WHEN 'income' THEN amount ELSE -amount END)
                             FROM cash_transactions c
                             WHERE c.payment_source_id = k.payment_source_id
                               AND c.branch_id = k.branch_id), 0) AS replayed
            FROM (
                SELECT payment_source_id, branch_id FROM payment_source_balances
                UNION
                SELECT payment_source_id, branch_id FROM cash_transactions
            ) k
        ) WHERE recorded <> replayed
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(stock
        .into_iter()
        .map(|(p, b, r, x)| ("stock".to_string(), format!("{}@{}", p, b), r, x))
        .chain(
            balance
                .into_iter()
                .map(|(s, b, r, x)| ("balance".to_string(), format!("{}@{}", s, b), r, x)),
        )
        .collect())
}
