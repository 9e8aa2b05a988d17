//! # Sale Repository
//!
//! Retail checkouts over the counter.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE                                                              │
//! │     └── build_sale()      → prices lines against the catalog            │
//! │     └── INSERT sales + sale_items                                       │
//! │     └── commit()          → stock out per line, income for the total    │
//! │     └── loyalty points    → added to the customer                       │
//! │                                                                         │
//! │  2. (OPTIONAL) DELETE                                                   │
//! │     └── commit()          → every linked row reverted                   │
//! │     └── loyalty points    → taken back                                  │
//! │                                                                         │
//! │  All steps of one call share a single SQL transaction.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sales are not edited; a wrong sale is deleted and rung up again.

use chrono::{DateTime, NaiveDate, Utc};
use moto_core::customer::{add_points, loyalty_points_for, remove_points};
use moto_core::sales::{build_sale, sale_posting};
use moto_core::{BookSettings, CoreError, Link, Money, Posting, Sale, SaleDraft, SaleItem};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::info;

use crate::error::DbResult;
use crate::repository::customer::{load_customer, store_customer};
use crate::repository::ledger::{
    commit, linked_rows, require_branch, require_customer, require_payment_source,
};
use crate::repository::part::load_parts;

const SALE_COLUMNS: &str = "id, branch_id, customer_id, customer_name, subtotal, discount, \
     total, payment_source_id, date, notes, created_at";

#[derive(Debug, FromRow)]
struct SaleRow {
    id: String,
    branch_id: String,
    customer_id: Option<String>,
    customer_name: Option<String>,
    subtotal: i64,
    discount: i64,
    total: i64,
    payment_source_id: String,
    date: NaiveDate,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl SaleRow {
    fn into_sale(self, items: Vec<SaleItem>) -> Sale {
        Sale {
            id: self.id,
            branch_id: self.branch_id,
            customer_id: self.customer_id,
            customer_name: self.customer_name,
            items,
            subtotal: Money::new(self.subtotal),
            discount: Money::new(self.discount),
            total: Money::new(self.total),
            payment_source_id: self.payment_source_id,
            date: self.date,
            notes: self.notes,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct SaleItemRow {
    part_id: String,
    sku: String,
    part_name: String,
    quantity: i64,
    unit_price: i64,
    cost_price: i64,
}

impl From<SaleItemRow> for SaleItem {
    fn from(row: SaleItemRow) -> Self {
        SaleItem {
            part_id: row.part_id,
            sku: row.sku,
            part_name: row.part_name,
            quantity: row.quantity,
            unit_price: Money::new(row.unit_price),
            cost_price: Money::new(row.cost_price),
        }
    }
}

async fn items_of(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleItem>> {
    let rows = sqlx::query_as::<_, SaleItemRow>(
        r#"
        SELECT part_id, sku, part_name, quantity, unit_price, cost_price
        FROM sale_items WHERE sale_id = ?1 ORDER BY line_no
        "#,
    )
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub(crate) async fn load_sale(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
    let sql = format!("SELECT {} FROM sales WHERE id = ?1", SALE_COLUMNS);
    let row = sqlx::query_as::<_, SaleRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    match row {
        Some(row) => {
            let items = items_of(conn, &row.id).await?;
            Ok(Some(row.into_sale(items)))
        }
        None => Ok(None),
    }
}

/// Every sale with its lines, oldest first.
pub(crate) async fn load_all_sales(conn: &mut SqliteConnection) -> DbResult<Vec<Sale>> {
    let sql = format!("SELECT {} FROM sales ORDER BY date, created_at", SALE_COLUMNS);
    let rows = sqlx::query_as::<_, SaleRow>(&sql)
        .fetch_all(&mut *conn)
        .await?;

    let mut sales = Vec::with_capacity(rows.len());
    for row in rows {
        let items = items_of(conn, &row.id).await?;
        sales.push(row.into_sale(items));
    }
    Ok(sales)
}

async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sales (
            id, branch_id, customer_id, customer_name, subtotal, discount,
            total, payment_source_id, date, notes, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.branch_id)
    .bind(&sale.customer_id)
    .bind(&sale.customer_name)
    .bind(sale.subtotal.amount())
    .bind(sale.discount.amount())
    .bind(sale.total.amount())
    .bind(&sale.payment_source_id)
    .bind(sale.date)
    .bind(&sale.notes)
    .bind(sale.created_at)
    .execute(&mut *conn)
    .await?;

    for (line_no, item) in sale.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO sale_items (
                sale_id, line_no, part_id, sku, part_name, quantity, unit_price, cost_price
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&sale.id)
        .bind(line_no as i64)
        .bind(&item.part_id)
        .bind(&item.sku)
        .bind(&item.part_name)
        .bind(item.quantity)
        .bind(item.unit_price.amount())
        .bind(item.cost_price.amount())
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Repository for retail sales.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
    settings: BookSettings,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool, settings: BookSettings) -> Self {
        SaleRepository { pool, settings }
    }

    /// Checks out a sale: stock out, income in, loyalty points to the
    /// customer.
    pub async fn create(&self, draft: SaleDraft) -> DbResult<Sale> {
        let mut tx = self.pool.begin().await?;
        require_branch(&mut tx, &draft.branch_id).await?;
        require_payment_source(&mut tx, &draft.payment_source_id).await?;
        if let Some(customer_id) = &draft.customer_id {
            require_customer(&mut tx, customer_id).await?;
        }

        let parts = load_parts(&mut tx, draft.items.iter().map(|l| l.part_id.as_str())).await?;
        let sale = build_sale(draft, parts.as_slice())?;

        insert_sale(&mut tx, &sale).await?;
        commit(
            &mut tx,
            &Posting::new(),
            &sale_posting(&sale),
            self.settings.allow_negative_stock,
        )
        .await?;

        let points = loyalty_points_for(sale.total, self.settings.loyalty_point_value);
        if let Some(customer_id) = &sale.customer_id {
            if let Some(mut customer) = load_customer(&mut tx, customer_id).await? {
                add_points(&mut customer, points);
                store_customer(&mut tx, &customer).await?;
            }
        }
        tx.commit().await?;

        info!(
            id = %sale.id,
            branch_id = %sale.branch_id,
            lines = sale.items.len(),
            total = sale.total.amount(),
            points,
            "Sale created"
        );
        Ok(sale)
    }

    /// Deletes a sale and reverts everything it posted.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let sale = load_sale(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(id.to_string()))?;

        let before = linked_rows(&mut tx, &Link::Sale(sale.id.clone())).await?;
        commit(&mut tx, &before, &Posting::new(), true).await?;

        let points = loyalty_points_for(sale.total, self.settings.loyalty_point_value);
        if let Some(customer_id) = &sale.customer_id {
            if let Some(mut customer) = load_customer(&mut tx, customer_id).await? {
                remove_points(&mut customer, points);
                store_customer(&mut tx, &customer).await?;
            }
        }

        sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(&sale.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(id = %id, "Sale deleted");
        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        load_sale(&mut conn, id).await
    }

    pub async fn list(&self) -> DbResult<Vec<Sale>> {
        let mut conn = self.pool.acquire().await?;
        load_all_sales(&mut conn).await
    }
}
