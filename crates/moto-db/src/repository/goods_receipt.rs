//! # Goods Receipt Repository
//!
//! Supplier deliveries. Stock comes in at the receiving branch; when the
//! delivery is paid on receipt an expense leaves the chosen payment source.

use chrono::{DateTime, NaiveDate, Utc};
use moto_core::purchasing::{build_goods_receipt, goods_receipt_posting};
use moto_core::{
    BookSettings, CoreError, GoodsReceipt, GoodsReceiptDraft, Link, Money, Posting, ReceiptItem,
};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::error::DbResult;
use crate::repository::ledger::{commit, linked_rows, require_branch, require_payment_source};
use crate::repository::part::load_parts;

const RECEIPT_COLUMNS: &str =
    "id, branch_id, supplier, total, payment_source_id, date, notes, created_at";

#[derive(Debug, FromRow)]
struct ReceiptRow {
    id: String,
    branch_id: String,
    supplier: String,
    total: i64,
    payment_source_id: Option<String>,
    date: NaiveDate,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl ReceiptRow {
    fn into_receipt(self, items: Vec<ReceiptItem>) -> GoodsReceipt {
        GoodsReceipt {
            id: self.id,
            branch_id: self.branch_id,
            supplier: self.supplier,
            items,
            total: Money::new(self.total),
            payment_source_id: self.payment_source_id,
            date: self.date,
            notes: self.notes,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ReceiptItemRow {
    part_id: String,
    part_name: String,
    quantity: i64,
    unit_cost: i64,
}

impl From<ReceiptItemRow> for ReceiptItem {
    fn from(row: ReceiptItemRow) -> Self {
        ReceiptItem {
            part_id: row.part_id,
            part_name: row.part_name,
            quantity: row.quantity,
            unit_cost: Money::new(row.unit_cost),
        }
    }
}

async fn items_of(conn: &mut SqliteConnection, receipt_id: &str) -> DbResult<Vec<ReceiptItem>> {
    let rows = sqlx::query_as::<_, ReceiptItemRow>(
        r#"
        SELECT part_id, part_name, quantity, unit_cost
        FROM goods_receipt_items WHERE receipt_id = ?1 ORDER BY line_no
        "#,
    )
    .bind(receipt_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

async fn load_receipt(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<GoodsReceipt>> {
    let sql = format!("SELECT {} FROM goods_receipts WHERE id = ?1", RECEIPT_COLUMNS);
    let row = sqlx::query_as::<_, ReceiptRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    match row {
        Some(row) => {
            let items = items_of(conn, &row.id).await?;
            Ok(Some(row.into_receipt(items)))
        }
        None => Ok(None),
    }
}

async fn insert_receipt(conn: &mut SqliteConnection, receipt: &GoodsReceipt) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO goods_receipts (
            id, branch_id, supplier, total, payment_source_id, date, notes, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&receipt.id)
    .bind(&receipt.branch_id)
    .bind(&receipt.supplier)
    .bind(receipt.total.amount())
    .bind(&receipt.payment_source_id)
    .bind(receipt.date)
    .bind(&receipt.notes)
    .bind(receipt.created_at)
    .execute(&mut *conn)
    .await?;

    for (line_no, item) in receipt.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO goods_receipt_items (
                receipt_id, line_no, part_id, part_name, quantity, unit_cost
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&receipt.id)
        .bind(line_no as i64)
        .bind(&item.part_id)
        .bind(&item.part_name)
        .bind(item.quantity)
        .bind(item.unit_cost.amount())
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Repository for goods receipts.
#[derive(Debug, Clone)]
pub struct GoodsReceiptRepository {
    pool: SqlitePool,
    settings: BookSettings,
}

impl GoodsReceiptRepository {
    pub fn new(pool: SqlitePool, settings: BookSettings) -> Self {
        GoodsReceiptRepository { pool, settings }
    }

    /// Receives a delivery. With `update_cost_price` each part takes the
    /// unit cost of its last line as its new cost price.
    pub async fn receive(&self, draft: GoodsReceiptDraft) -> DbResult<GoodsReceipt> {
        let mut tx = self.pool.begin().await?;
        require_branch(&mut tx, &draft.branch_id).await?;
        if let Some(source_id) = &draft.payment_source_id {
            require_payment_source(&mut tx, source_id).await?;
        }

        let parts = load_parts(&mut tx, draft.items.iter().map(|l| l.part_id.as_str())).await?;
        let receipt = build_goods_receipt(&draft, parts.as_slice())?;

        insert_receipt(&mut tx, &receipt).await?;
        commit(
            &mut tx,
            &Posting::new(),
            &goods_receipt_posting(&receipt),
            self.settings.allow_negative_stock,
        )
        .await?;

        if draft.update_cost_price {
            let latest: BTreeMap<&str, Money> = receipt
                .items
                .iter()
                .map(|item| (item.part_id.as_str(), item.unit_cost))
                .collect();
            let now = Utc::now();
            for (part_id, cost) in &latest {
                sqlx::query("UPDATE parts SET cost_price = ?2, updated_at = ?3 WHERE id = ?1")
                    .bind(*part_id)
                    .bind(cost.amount())
                    .bind(now)
                    .execute(&mut *tx)
                    .await?;
            }
            debug!(parts = latest.len(), "Cost prices updated from receipt");
        }
        tx.commit().await?;

        info!(
            id = %receipt.id,
            supplier = %receipt.supplier,
            branch_id = %receipt.branch_id,
            total = receipt.total.amount(),
            paid = receipt.payment_source_id.is_some(),
            "Goods received"
        );
        Ok(receipt)
    }

    /// Deletes a receipt and reverts its stock and expense. Never blocked by
    /// stock levels.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        if load_receipt(&mut tx, id).await?.is_none() {
            return Err(CoreError::GoodsReceiptNotFound(id.to_string()).into());
        }

        let before = linked_rows(&mut tx, &Link::GoodsReceipt(id.to_string())).await?;
        commit(&mut tx, &before, &Posting::new(), true).await?;

        sqlx::query("DELETE FROM goods_receipts WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(id = %id, "Goods receipt deleted");
        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<GoodsReceipt>> {
        let mut conn = self.pool.acquire().await?;
        load_receipt(&mut conn, id).await
    }

    /// Every receipt, oldest first.
    pub async fn list(&self) -> DbResult<Vec<GoodsReceipt>> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!(
            "SELECT {} FROM goods_receipts ORDER BY date, created_at",
            RECEIPT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ReceiptRow>(&sql)
            .fetch_all(&mut *conn)
            .await?;

        let mut receipts = Vec::with_capacity(rows.len());
        for row in rows {
            let items = items_of(&mut conn, &row.id).await?;
            receipts.push(row.into_receipt(items));
        }
        Ok(receipts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use moto_core::{
        Branch, InventoryDirection, NewInventoryTransaction, NewPart, NewPaymentSource, Part,
        PaymentSource, ReceiptLineDraft,
    };

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
    }

    async fn setup() -> (Database, Part, PaymentSource) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.branches()
            .create(Branch {
                id: "HCM".to_string(),
                name: "Hồ Chí Minh".to_string(),
                address: None,
            })
            .await
            .unwrap();
        let part = db
            .parts()
            .create(NewPart {
                sku: "CHAIN-428".to_string(),
                name: "Chain 428H".to_string(),
                category: "Drive".to_string(),
                cost_price: Money::new(150_000),
                selling_price: Money::new(220_000),
                opening_stock: BTreeMap::new(),
                date: date(),
            })
            .await
            .unwrap();
        let bank = db
            .cash()
            .create_source(NewPaymentSource {
                name: "Techcombank".to_string(),
                opening_balance: [("HCM".to_string(), Money::new(5_000_000))]
                    .into_iter()
                    .collect(),
                date: date(),
            })
            .await
            .unwrap();
        (db, part, bank)
    }

    fn delivery(part: &Part, source: Option<&PaymentSource>) -> GoodsReceiptDraft {
        GoodsReceiptDraft {
            branch_id: "HCM".to_string(),
            supplier: "Phụ tùng Sài Gòn".to_string(),
            items: vec![
                ReceiptLineDraft {
                    part_id: part.id.clone(),
                    quantity: 5,
                    unit_cost: Money::new(140_000),
                },
                ReceiptLineDraft {
                    part_id: part.id.clone(),
                    quantity: 5,
                    unit_cost: Money::new(145_000),
                },
            ],
            payment_source_id: source.map(|s| s.id.clone()),
            date: date(),
            notes: None,
            update_cost_price: true,
        }
    }

    #[tokio::test]
    async fn test_paid_receipt_posts_stock_and_expense() {
        let (db, part, bank) = setup().await;
        let receipt = db
            .goods_receipts()
            .receive(delivery(&part, Some(&bank)))
            .await
            .unwrap();
        assert_eq!(receipt.total.amount(), 1_425_000);

        let part = db.parts().get_by_id(&part.id).await.unwrap().unwrap();
        assert_eq!(part.stock_at("HCM"), 10);
        // last line wins
        assert_eq!(part.cost_price.amount(), 145_000);

        let bank = db.cash().get_source(&bank.id).await.unwrap().unwrap();
        assert_eq!(bank.balance_at("HCM").amount(), 3_575_000);

        let stored = db.goods_receipts().get_by_id(&receipt.id).await.unwrap().unwrap();
        assert_eq!(stored.items, receipt.items);
    }

    #[tokio::test]
    async fn test_unpaid_receipt_has_no_cash_row() {
        let (db, part, bank) = setup().await;
        let mut draft = delivery(&part, None);
        draft.update_cost_price = false;
        db.goods_receipts().receive(draft).await.unwrap();

        let part = db.parts().get_by_id(&part.id).await.unwrap().unwrap();
        assert_eq!(part.cost_price.amount(), 150_000);
        let bank = db.cash().get_source(&bank.id).await.unwrap().unwrap();
        assert_eq!(bank.balance_at("HCM").amount(), 5_000_000);
    }

    #[tokio::test]
    async fn test_delete_never_blocked_by_stock() {
        let (db, part, bank) = setup().await;
        let receipt = db
            .goods_receipts()
            .receive(delivery(&part, Some(&bank)))
            .await
            .unwrap();

        db.inventory()
            .record(NewInventoryTransaction {
                direction: InventoryDirection::Out,
                part_id: part.id.clone(),
                quantity: 8,
                unit_price: None,
                branch_id: "HCM".to_string(),
                date: date(),
                notes: None,
            })
            .await
            .unwrap();

        db.goods_receipts().delete(&receipt.id).await.unwrap();
        let part = db.parts().get_by_id(&part.id).await.unwrap().unwrap();
        assert_eq!(part.stock_at("HCM"), -8);
        let bank = db.cash().get_source(&bank.id).await.unwrap().unwrap();
        assert_eq!(bank.balance_at("HCM").amount(), 5_000_000);
        assert!(db.reports().verify_ledger().await.unwrap());

        let err = db.goods_receipts().delete(&receipt.id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::GoodsReceiptNotFound(_))
        ));
    }
}
