//! # Inventory Repository
//!
//! Manual stock movements and branch transfers.
//!
//! ## Operations
//! ```text
//! record(draft)        → 1 row, stock ± quantity          (guarded)
//! update(id, update)   → old row out, new row in          (guarded on the net change)
//! delete(id)           → row out, stock restored          (never blocked)
//! transfer(request)    → out @from + in @to, one transfer id
//! delete_transfer(id)  → both legs out
//! ```
//!
//! Rows posted by a sale, receipt or work order are refused here; they
//! change only through their document. Deleting one leg of a transfer
//! deletes the whole transfer.

use moto_core::ledger::{manual_inventory, transfer};
use moto_core::validation::{validate_price, validate_quantity};
use moto_core::{
    BookSettings, CoreError, InventoryTransaction, InventoryUpdate, Link, NewInventoryTransaction,
    Posting, TransferRequest,
};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;
use crate::repository::ledger::{
    commit, fetch_inventory, linked_error, linked_rows, require_branch, InventoryRow,
    INVENTORY_COLUMNS,
};
use crate::repository::part::load_part;

/// Repository for inventory transactions.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
    settings: BookSettings,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool, settings: BookSettings) -> Self {
        InventoryRepository { pool, settings }
    }

    /// Records a manual stock movement.
    pub async fn record(&self, draft: NewInventoryTransaction) -> DbResult<InventoryTransaction> {
        let mut tx = self.pool.begin().await?;
        let part = load_part(&mut tx, &draft.part_id)
            .await?
            .ok_or_else(|| CoreError::PartNotFound(draft.part_id.clone()))?;
        let row = manual_inventory(draft, &part)?;

        let posting = Posting {
            inventory: vec![row.clone()],
            cash: Vec::new(),
        };
        commit(
            &mut tx,
            &Posting::new(),
            &posting,
            self.settings.allow_negative_stock,
        )
        .await?;
        tx.commit().await?;

        info!(
            id = %row.id,
            part_id = %row.part_id,
            branch_id = %row.branch_id,
            delta = row.stock_delta(),
            "Inventory transaction recorded"
        );
        Ok(row)
    }

    /// Edits a manual movement: the old delta is reversed and the new one
    /// applied in one step.
    pub async fn update(
        &self,
        id: &str,
        update: InventoryUpdate,
    ) -> DbResult<InventoryTransaction> {
        let mut tx = self.pool.begin().await?;
        let existing = fetch_inventory(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::InventoryTransactionNotFound(id.to_string()))?;
        if let Some(link) = existing.link() {
            return Err(linked_error(id, &link).into());
        }
        validate_quantity(update.quantity).map_err(CoreError::from)?;
        validate_price("unit_price", update.unit_price).map_err(CoreError::from)?;

        let mut row = existing.clone();
        row.quantity = update.quantity;
        row.unit_price = update.unit_price;
        row.total_price = update.unit_price * update.quantity;
        row.date = update.date;
        row.notes = update.notes;

        let before = Posting {
            inventory: vec![existing],
            cash: Vec::new(),
        };
        let after = Posting {
            inventory: vec![row.clone()],
            cash: Vec::new(),
        };
        commit(&mut tx, &before, &after, self.settings.allow_negative_stock).await?;
        tx.commit().await?;

        debug!(id = %row.id, quantity = row.quantity, "Inventory transaction updated");
        Ok(row)
    }

    /// Deletes a manual movement and restores the stock it moved.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let existing = fetch_inventory(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::InventoryTransactionNotFound(id.to_string()))?;

        let before = match existing.link() {
            None => Posting {
                inventory: vec![existing],
                cash: Vec::new(),
            },
            Some(link @ Link::Transfer(_)) => linked_rows(&mut tx, &link).await?,
            Some(link) => return Err(linked_error(id, &link).into()),
        };
        commit(&mut tx, &before, &Posting::new(), true).await?;
        tx.commit().await?;

        info!(id = %id, rows = before.inventory.len(), "Inventory transaction deleted");
        Ok(())
    }

    /// Moves stock between branches. Returns the transfer id.
    pub async fn transfer(&self, request: TransferRequest) -> DbResult<String> {
        let mut tx = self.pool.begin().await?;
        require_branch(&mut tx, &request.from_branch).await?;
        require_branch(&mut tx, &request.to_branch).await?;
        let part = load_part(&mut tx, &request.part_id)
            .await?
            .ok_or_else(|| CoreError::PartNotFound(request.part_id.clone()))?;

        let (transfer_id, posting) = transfer(request, &part)?;
        commit(
            &mut tx,
            &Posting::new(),
            &posting,
            self.settings.allow_negative_stock,
        )
        .await?;
        tx.commit().await?;

        info!(transfer_id = %transfer_id, part_id = %part.id, "Stock transferred");
        Ok(transfer_id)
    }

    /// Deletes both legs of a transfer.
    pub async fn delete_transfer(&self, transfer_id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let before = linked_rows(&mut tx, &Link::Transfer(transfer_id.to_string())).await?;
        if before.inventory.is_empty() {
            return Err(CoreError::TransferNotFound(transfer_id.to_string()).into());
        }
        commit(&mut tx, &before, &Posting::new(), true).await?;
        tx.commit().await?;

        info!(transfer_id = %transfer_id, "Transfer deleted");
        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<InventoryTransaction>> {
        let mut conn = self.pool.acquire().await?;
        fetch_inventory(&mut conn, id).await
    }

    /// Movements of one part, oldest first.
    pub async fn for_part(&self, part_id: &str) -> DbResult<Vec<InventoryTransaction>> {
        let sql = format!(
            "SELECT {} FROM inventory_transactions WHERE part_id = ?1 ORDER BY date, created_at",
            INVENTORY_COLUMNS
        );
        let rows = sqlx::query_as::<_, InventoryRow>(&sql)
            .bind(part_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Every movement, oldest first.
    pub async fn list(&self) -> DbResult<Vec<InventoryTransaction>> {
        let sql = format!(
            "SELECT {} FROM inventory_transactions ORDER BY date, created_at",
            INVENTORY_COLUMNS
        );
        let rows = sqlx::query_as::<_, InventoryRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use chrono::NaiveDate;
    use moto_core::{Branch, InventoryDirection, Money, NewPart, Part};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    }

    async fn setup(settings: BookSettings) -> (Database, Part) {
        let db = Database::new(DbConfig::in_memory())
            .await
            .unwrap()
            .with_settings(settings);
        for id in ["HN", "HCM"] {
            db.branches()
                .create(Branch {
                    id: id.to_string(),
                    name: id.to_string(),
                    address: None,
                })
                .await
                .unwrap();
        }
        let part = db
            .parts()
            .create(NewPart {
                sku: "PAD-01".to_string(),
                name: "Brake pad".to_string(),
                category: "Brakes".to_string(),
                cost_price: Money::new(60_000),
                selling_price: Money::new(95_000),
                opening_stock: [("HN".to_string(), 10)].into_iter().collect(),
                date: date(),
            })
            .await
            .unwrap();
        (db, part)
    }

    fn outbound(part: &Part, quantity: i64) -> NewInventoryTransaction {
        NewInventoryTransaction {
            direction: InventoryDirection::Out,
            part_id: part.id.clone(),
            quantity,
            unit_price: None,
            branch_id: "HN".to_string(),
            date: date(),
            notes: None,
        }
    }

    async fn stock(db: &Database, part: &Part, branch: &str) -> i64 {
        db.parts()
            .get_by_id(&part.id)
            .await
            .unwrap()
            .unwrap()
            .stock_at(branch)
    }

    #[tokio::test]
    async fn test_outbound_then_delete_restores_stock() {
        let (db, part) = setup(BookSettings::default()).await;

        let row = db.inventory().record(outbound(&part, 3)).await.unwrap();
        assert_eq!(stock(&db, &part, "HN").await, 7);

        db.inventory().delete(&row.id).await.unwrap();
        assert_eq!(stock(&db, &part, "HN").await, 10);
        assert!(db.reports().verify_ledger().await.unwrap());
    }

    #[tokio::test]
    async fn test_overdraft_rejected_and_nothing_written() {
        let (db, part) = setup(BookSettings::default()).await;

        let err = db.inventory().record(outbound(&part, 11)).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock {
                available: 10,
                requested: 11,
                ..
            })
        ));
        assert_eq!(stock(&db, &part, "HN").await, 10);
        assert_eq!(db.inventory().for_part(&part.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_negative_stock_allowed_by_setting() {
        let settings = BookSettings {
            allow_negative_stock: true,
            ..BookSettings::default()
        };
        let (db, part) = setup(settings).await;
        db.inventory().record(outbound(&part, 12)).await.unwrap();
        assert_eq!(stock(&db, &part, "HN").await, -2);
    }

    #[tokio::test]
    async fn test_update_applies_net_change() {
        let (db, part) = setup(BookSettings::default()).await;
        let row = db.inventory().record(outbound(&part, 3)).await.unwrap();

        let updated = db
            .inventory()
            .update(
                &row.id,
                InventoryUpdate {
                    quantity: 5,
                    unit_price: Money::new(90_000),
                    date: date(),
                    notes: Some("recount".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.total_price.amount(), 450_000);
        assert_eq!(stock(&db, &part, "HN").await, 5);

        // 5 → 10 takes the last 5; only the net change is checked

        db.inventory()
            .update(
                &row.id,
                InventoryUpdate {
                    quantity: 10,
                    unit_price: Money::new(90_000),
                    date: date(),
                    notes: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(stock(&db, &part, "HN").await, 0);
    }

    #[tokio::test]
    async fn test_transfer_and_delete_by_leg() {
        let (db, part) = setup(BookSettings::default()).await;
        let transfer_id = db
            .inventory()
            .transfer(TransferRequest {
                part_id: part.id.clone(),
                quantity: 4,
                from_branch: "HN".to_string(),
                to_branch: "HCM".to_string(),
                date: date(),
                notes: None,
            })
            .await
            .unwrap();
        assert_eq!(stock(&db, &part, "HN").await, 6);
        assert_eq!(stock(&db, &part, "HCM").await, 4);

        let legs: Vec<InventoryTransaction> = db
            .inventory()
            .for_part(&part.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|r| r.transfer_id.as_deref() == Some(transfer_id.as_str()))
            .collect();
        assert_eq!(legs.len(), 2);

        db.inventory().delete(&legs[0].id).await.unwrap();
        assert_eq!(stock(&db, &part, "HN").await, 10);
        assert_eq!(stock(&db, &part, "HCM").await, 0);
        assert!(matches!(
            db.inventory().delete_transfer(&transfer_id).await,
            Err(DbError::Domain(CoreError::TransferNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_transfer_to_unknown_branch() {
        let (db, part) = setup(BookSettings::default()).await;
        let err = db
            .inventory()
            .transfer(TransferRequest {
                part_id: part.id.clone(),
                quantity: 1,
                from_branch: "HN".to_string(),
                to_branch: "DN".to_string(),
                date: date(),
                notes: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::BranchNotFound(_))));
    }
}
