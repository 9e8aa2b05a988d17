//! # Part Repository
//!
//! Catalog of spare parts and their per-branch stock.
//!
//! Stock is never written here: new parts post their opening stock through
//! the ledger, and every later change comes from an inventory row.

use chrono::{DateTime, Utc};
use moto_core::catalog::{apply_part_update, build_part};
use moto_core::workorder::ensure_part_unused;
use moto_core::{ledger, CoreError, Money, NewPart, Part, PartUpdate, Posting, ValidationError};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::ledger::{commit, require_branch};
use crate::repository::work_order::load_all_work_orders;

const PART_COLUMNS: &str =
    "id, sku, name, category, cost_price, selling_price, created_at, updated_at";

#[derive(Debug, FromRow)]
struct PartRow {
    id: String,
    sku: String,
    name: String,
    category: String,
    cost_price: i64,
    selling_price: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PartRow {
    fn into_part(self, stock: BTreeMap<String, i64>) -> Part {
        Part {
            id: self.id,
            sku: self.sku,
            name: self.name,
            category: self.category,
            cost_price: Money::new(self.cost_price),
            selling_price: Money::new(self.selling_price),
            stock,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

// =============================================================================
// Loading (shared with the ledger)
// =============================================================================

async fn stock_of(conn: &mut SqliteConnection, part_id: &str) -> DbResult<BTreeMap<String, i64>> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT branch_id, quantity FROM part_stock WHERE part_id = ?1")
            .bind(part_id)
            .fetch_all(&mut *conn)
            .await?;
    Ok(rows.into_iter().collect())
}

pub(crate) async fn load_part(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Part>> {
    let sql = format!("SELECT {} FROM parts WHERE id = ?1", PART_COLUMNS);
    let row = sqlx::query_as::<_, PartRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    match row {
        Some(row) => {
            let stock = stock_of(conn, &row.id).await?;
            Ok(Some(row.into_part(stock)))
        }
        None => Ok(None),
    }
}

/// Loads the given parts, skipping ids that don't exist (the caller's
/// stock check reports them).
pub(crate) async fn load_parts<'a, I>(conn: &mut SqliteConnection, ids: I) -> DbResult<Vec<Part>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut parts: Vec<Part> = Vec::new();
    for id in ids {
        if parts.iter().any(|p| p.id == id) {
            continue;
        }
        if let Some(part) = load_part(conn, id).await? {
            parts.push(part);
        }
    }
    Ok(parts)
}

/// Every part with its stock, ordered by SKU.
pub(crate) async fn load_all_parts(conn: &mut SqliteConnection) -> DbResult<Vec<Part>> {
    let sql = format!("SELECT {} FROM parts ORDER BY sku", PART_COLUMNS);
    let rows = sqlx::query_as::<_, PartRow>(&sql)
        .fetch_all(&mut *conn)
        .await?;

    let stock_rows: Vec<(String, String, i64)> =
        sqlx::query_as("SELECT part_id, branch_id, quantity FROM part_stock")
            .fetch_all(&mut *conn)
            .await?;
    let mut stock: BTreeMap<String, BTreeMap<String, i64>> = BTreeMap::new();
    for (part_id, branch_id, quantity) in stock_rows {
        stock.entry(part_id).or_default().insert(branch_id, quantity);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let part_stock = stock.remove(&row.id).unwrap_or_default();
            row.into_part(part_stock)
        })
        .collect())
}

async fn ensure_unique_sku(
    conn: &mut SqliteConnection,
    sku: &str,
    except_id: Option<&str>,
) -> DbResult<()> {
    let existing: Option<String> = sqlx::query_scalar("SELECT id FROM parts WHERE sku = ?1")
        .bind(sku)
        .fetch_optional(&mut *conn)
        .await?;
    match existing {
        Some(id) if Some(id.as_str()) != except_id => Err(CoreError::from(
            ValidationError::Duplicate {
                field: "sku".to_string(),
                value: sku.to_string(),
            },
        )
        .into()),
        _ => Ok(()),
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the parts catalog.
#[derive(Debug, Clone)]
pub struct PartRepository {
    pool: SqlitePool,
}

impl PartRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PartRepository { pool }
    }

    /// Adds a part and posts its opening stock in the same transaction.
    pub async fn create(&self, draft: NewPart) -> DbResult<Part> {
        let part = build_part(&draft)?;
        debug!(id = %part.id, sku = %part.sku, "Creating part");

        let mut tx = self.pool.begin().await?;
        ensure_unique_sku(&mut tx, &part.sku, None).await?;
        for branch_id in draft.opening_stock.keys() {
            require_branch(&mut tx, branch_id).await?;
        }

        sqlx::query(
            r#"
            INSERT INTO parts (
                id, sku, name, category, cost_price, selling_price, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&part.id)
        .bind(&part.sku)
        .bind(&part.name)
        .bind(&part.category)
        .bind(part.cost_price.amount())
        .bind(part.selling_price.amount())
        .bind(part.created_at)
        .bind(part.updated_at)
        .execute(&mut *tx)
        .await?;

        let opening = ledger::opening_stock(&part, &draft.opening_stock, draft.date)?;
        commit(&mut tx, &Posting::new(), &opening, true).await?;

        let created = load_part(&mut tx, &part.id)
            .await?
            .ok_or_else(|| DbError::not_found("Part", &part.id))?;
        tx.commit().await?;

        info!(id = %created.id, sku = %created.sku, stock = created.total_stock(), "Part created");
        Ok(created)
    }

    /// Updates catalog fields. Stock is untouched.
    pub async fn update(&self, id: &str, update: PartUpdate) -> DbResult<Part> {
        let mut tx = self.pool.begin().await?;
        let mut part = load_part(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::PartNotFound(id.to_string()))?;
        ensure_unique_sku(&mut tx, update.sku.trim(), Some(id)).await?;
        apply_part_update(&mut part, update)?;

        sqlx::query(
            r#"
            UPDATE parts SET
                sku = ?2, name = ?3, category = ?4,
                cost_price = ?5, selling_price = ?6, updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&part.id)
        .bind(&part.sku)
        .bind(&part.name)
        .bind(&part.category)
        .bind(part.cost_price.amount())
        .bind(part.selling_price.amount())
        .bind(part.updated_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        debug!(id = %part.id, sku = %part.sku, "Part updated");
        Ok(part)
    }

    /// Removes a part together with its stock and inventory history.
    /// Refused with `PartInUse` while a work order lists the part.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let part = load_part(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::PartNotFound(id.to_string()))?;
        let orders = load_all_work_orders(&mut tx).await?;
        ensure_part_unused(&orders, &part)?;

        sqlx::query("DELETE FROM parts WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(id = %id, sku = %part.sku, "Part deleted");
        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Part>> {
        let mut conn = self.pool.acquire().await?;
        load_part(&mut conn, id).await
    }

    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Part>> {
        let mut conn = self.pool.acquire().await?;
        let id: Option<String> = sqlx::query_scalar("SELECT id FROM parts WHERE sku = ?1")
            .bind(sku)
            .fetch_optional(&mut *conn)
            .await?;
        match id {
            Some(id) => load_part(&mut conn, &id).await,
            None => Ok(None),
        }
    }

    /// All parts ordered by SKU.
    pub async fn list(&self) -> DbResult<Vec<Part>> {
        let mut conn = self.pool.acquire().await?;
        load_all_parts(&mut conn).await
    }

    /// Parts whose SKU, name or category contains `query` (case-insensitive).
    pub async fn search(&self, query: &str, limit: i64) -> DbResult<Vec<Part>> {
        let pattern = format!("%{}%", query.trim());
        let mut conn = self.pool.acquire().await?;
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT id FROM parts
            WHERE sku LIKE ?1 OR name LIKE ?1 OR category LIKE ?1
            ORDER BY sku
            LIMIT ?2
            "#,
        )
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;

        load_parts(&mut conn, ids.iter().map(String::as_str)).await
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM parts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::NaiveDate;
    use moto_core::Branch;

    async fn setup() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for (id, name) in [("HN", "Hà Nội"), ("HCM", "Hồ Chí Minh")] {
            db.branches()
                .create(Branch {
                    id: id.to_string(),
                    name: name.to_string(),
                    address: None,
                })
                .await
                .unwrap();
        }
        db
    }

    fn oil(stock: &[(&str, i64)]) -> NewPart {
        NewPart {
            sku: "OIL-10W40".to_string(),
            name: "Motul 3000 10W40".to_string(),
            category: "Oil".to_string(),
            cost_price: Money::new(90_000),
            selling_price: Money::new(120_000),
            opening_stock: stock.iter().map(|(b, q)| (b.to_string(), *q)).collect(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_create_posts_opening_stock() {
        let db = setup().await;
        let part = db.parts().create(oil(&[("HN", 10), ("HCM", 4)])).await.unwrap();

        assert_eq!(part.stock_at("HN"), 10);
        assert_eq!(part.stock_at("HCM"), 4);

        let rows = db.inventory().for_part(&part.id).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.notes.as_deref() == Some("Opening stock")));
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected() {
        let db = setup().await;
        db.parts().create(oil(&[])).await.unwrap();
        let err = db.parts().create(oil(&[])).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::Duplicate { .. }))
        ));
        assert_eq!(db.parts().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_branch_rolls_back_part() {
        let db = setup().await;
        let err = db.parts().create(oil(&[("DN", 3)])).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::BranchNotFound(_))));
        assert_eq!(db.parts().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_keeps_stock() {
        let db = setup().await;
        let part = db.parts().create(oil(&[("HN", 10)])).await.unwrap();
        let updated = db
            .parts()
            .update(
                &part.id,
                PartUpdate {
                    sku: "OIL-10W40".to_string(),
                    name: "Motul 3100 10W40".to_string(),
                    category: "Oil".to_string(),
                    cost_price: Money::new(95_000),
                    selling_price: Money::new(130_000),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.stock_at("HN"), 10);

        let found = db.parts().get_by_sku("OIL-10W40").await.unwrap().unwrap();
        assert_eq!(found.name, "Motul 3100 10W40");
        assert_eq!(found.selling_price.amount(), 130_000);
    }

    #[tokio::test]
    async fn test_search_and_delete() {
        let db = setup().await;
        let part = db.parts().create(oil(&[("HN", 2)])).await.unwrap();

        let hits = db.parts().search("motul", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(db.parts().search("brake", 10).await.unwrap().is_empty());

        db.parts().delete(&part.id).await.unwrap();
        assert!(db.parts().get_by_id(&part.id).await.unwrap().is_none());
        assert!(db.inventory().for_part(&part.id).await.unwrap().is_empty());
        assert!(matches!(
            db.parts().delete(&part.id).await,
            Err(DbError::Domain(CoreError::PartNotFound(_)))
        ));
    }
}
