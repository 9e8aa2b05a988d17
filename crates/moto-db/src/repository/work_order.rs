//! # Work Order Repository
//!
//! Service tickets for bikes brought into the workshop.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create(draft)   → parts issued from stock, customer's visit stamped    │
//! │  update(draft)   → linked rows replaced by the rebuilt order's rows     │
//! │  set_status()    → received → in_repair → done → returned               │
//! │                    (stamps completed_on; nothing posted)                │
//! │  settle()        → service income on the chosen source, dated paid_on   │
//! │  delete()        → parts back to stock, income reverted                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Part lines and quotation lines are stored as JSON arrays on the order
//! row; the ledger rows carry `work_order_id`.

use chrono::{DateTime, NaiveDate, Utc};
use moto_core::customer::record_service;
use moto_core::workorder::{build_work_order, set_status, settle, work_order_posting};
use moto_core::{
    BookSettings, CoreError, Link, Money, PartUsage, Posting, QuotationItem, WorkOrder,
    WorkOrderDraft, WorkOrderStatus,
};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::DbResult;
use crate::repository::customer::{load_customer, store_customer};
use crate::repository::ledger::{
    commit, linked_rows, require_branch, require_customer, require_payment_source,
};
use crate::repository::part::load_parts;

const WORK_ORDER_COLUMNS: &str = "id, branch_id, customer_id, customer_name, customer_phone, \
     vehicle, license_plate, odometer, issue_description, technician, status, parts_used, \
     quotation_items, labor_cost, discount, total, payment_source_id, paid_on, received_on, \
     completed_on, created_at, updated_at";

#[derive(Debug, FromRow)]
struct WorkOrderRow {
    id: String,
    branch_id: String,
    customer_id: Option<String>,
    customer_name: String,
    customer_phone: Option<String>,
    vehicle: Option<String>,
    license_plate: Option<String>,
    odometer: Option<i64>,
    issue_description: String,
    technician: Option<String>,
    status: WorkOrderStatus,
    parts_used: String,
    quotation_items: String,
    labor_cost: i64,
    discount: i64,
    total: i64,
    payment_source_id: Option<String>,
    paid_on: Option<NaiveDate>,
    received_on: NaiveDate,
    completed_on: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl WorkOrderRow {
    fn into_order(self) -> DbResult<WorkOrder> {
        let parts_used: Vec<PartUsage> = serde_json::from_str(&self.parts_used)?;
        let quotation_items: Vec<QuotationItem> = serde_json::from_str(&self.quotation_items)?;
        Ok(WorkOrder {
            id: self.id,
            branch_id: self.branch_id,
            customer_id: self.customer_id,
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            vehicle: self.vehicle,
            license_plate: self.license_plate,
            odometer: self.odometer,
            issue_description: self.issue_description,
            technician: self.technician,
            status: self.status,
            parts_used,
            quotation_items,
            labor_cost: Money::new(self.labor_cost),
            discount: Money::new(self.discount),
            total: Money::new(self.total),
            payment_source_id: self.payment_source_id,
            paid_on: self.paid_on,
            received_on: self.received_on,
            completed_on: self.completed_on,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub(crate) async fn load_work_order(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<WorkOrder>> {
    let sql = format!("SELECT {} FROM work_orders WHERE id = ?1", WORK_ORDER_COLUMNS);
    let row = sqlx::query_as::<_, WorkOrderRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    row.map(WorkOrderRow::into_order).transpose()
}

/// Every work order, oldest first.
pub(crate) async fn load_all_work_orders(conn: &mut SqliteConnection) -> DbResult<Vec<WorkOrder>> {
    let sql = format!(
        "SELECT {} FROM work_orders ORDER BY received_on, created_at",
        WORK_ORDER_COLUMNS
    );
    let rows = sqlx::query_as::<_, WorkOrderRow>(&sql)
        .fetch_all(&mut *conn)
        .await?;
    rows.into_iter().map(WorkOrderRow::into_order).collect()
}

async fn require_work_order(conn: &mut SqliteConnection, id: &str) -> DbResult<WorkOrder> {
    load_work_order(conn, id)
        .await?
        .ok_or_else(|| CoreError::WorkOrderNotFound(id.to_string()).into())
}

/// Inserts the order or overwrites every column of an existing one.
async fn save_work_order(conn: &mut SqliteConnection, order: &WorkOrder) -> DbResult<()> {
    let parts_used = serde_json::to_string(&order.parts_used)?;
    let quotation_items = serde_json::to_string(&order.quotation_items)?;

    sqlx::query(
        r#"
        INSERT INTO work_orders (
            id, branch_id, customer_id, customer_name, customer_phone,
            vehicle, license_plate, odometer, issue_description, technician,
            status, parts_used, quotation_items, labor_cost, discount,
            total, payment_source_id, paid_on, received_on, completed_on,
            created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5,
            ?6, ?7, ?8, ?9, ?10,
            ?11, ?12, ?13, ?14, ?15,
            ?16, ?17, ?18, ?19, ?20,
            ?21, ?22
        )
        ON CONFLICT(id) DO UPDATE SET
            branch_id = excluded.branch_id,
            customer_id = excluded.customer_id,
            customer_name = excluded.customer_name,
            customer_phone = excluded.customer_phone,
            vehicle = excluded.vehicle,
            license_plate = excluded.license_plate,
            odometer = excluded.odometer,
            issue_description = excluded.issue_description,
            technician = excluded.technician,
            status = excluded.status,
            parts_used = excluded.parts_used,
            quotation_items = excluded.quotation_items,
            labor_cost = excluded.labor_cost,
            discount = excluded.discount,
            total = excluded.total,
            payment_source_id = excluded.payment_source_id,
            paid_on = excluded.paid_on,
            received_on = excluded.received_on,
            completed_on = excluded.completed_on,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&order.id)
    .bind(&order.branch_id)
    .bind(&order.customer_id)
    .bind(&order.customer_name)
    .bind(&order.customer_phone)
    .bind(&order.vehicle)
    .bind(&order.license_plate)
    .bind(order.odometer)
    .bind(&order.issue_description)
    .bind(&order.technician)
    .bind(order.status)
    .bind(parts_used)
    .bind(quotation_items)
    .bind(order.labor_cost.amount())
    .bind(order.discount.amount())
    .bind(order.total.amount())
    .bind(&order.payment_source_id)
    .bind(order.paid_on)
    .bind(order.received_on)
    .bind(order.completed_on)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Repository for work orders.
#[derive(Debug, Clone)]
pub struct WorkOrderRepository {
    pool: SqlitePool,
    settings: BookSettings,
}

impl WorkOrderRepository {
    pub fn new(pool: SqlitePool, settings: BookSettings) -> Self {
        WorkOrderRepository { pool, settings }
    }

    /// Opens a work order, issuing its parts from stock.
    pub async fn create(&self, draft: WorkOrderDraft, today: NaiveDate) -> DbResult<WorkOrder> {
        let mut tx = self.pool.begin().await?;
        require_branch(&mut tx, &draft.branch_id).await?;
        if let Some(customer_id) = &draft.customer_id {
            require_customer(&mut tx, customer_id).await?;
        }

        let parts = load_parts(&mut tx, draft.parts.iter().map(|l| l.part_id.as_str())).await?;
        let order = build_work_order(draft, parts.as_slice(), None, today)?;

        save_work_order(&mut tx, &order).await?;
        commit(
            &mut tx,
            &Posting::new(),
            &work_order_posting(&order),
            self.settings.allow_negative_stock,
        )
        .await?;

        if let Some(customer_id) = &order.customer_id {
            if let Some(mut customer) = load_customer(&mut tx, customer_id).await? {
                record_service(&mut customer, order.odometer, order.received_on);
                store_customer(&mut tx, &customer).await?;
            }
        }
        tx.commit().await?;

        info!(
            id = %order.id,
            branch_id = %order.branch_id,
            customer = %order.customer_name,
            total = order.total.amount(),
            "Work order created"
        );
        Ok(order)
    }

    /// Rebuilds a work order from a draft and re-posts it. Status changes
    /// in the draft follow the same rules as [`Self::set_status`].
    pub async fn update(
        &self,
        id: &str,
        draft: WorkOrderDraft,
        today: NaiveDate,
    ) -> DbResult<WorkOrder> {
        let mut tx = self.pool.begin().await?;
        let existing = require_work_order(&mut tx, id).await?;
        require_branch(&mut tx, &draft.branch_id).await?;
        if let Some(customer_id) = &draft.customer_id {
            require_customer(&mut tx, customer_id).await?;
        }

        let parts = load_parts(&mut tx, draft.parts.iter().map(|l| l.part_id.as_str())).await?;
        let order = build_work_order(draft, parts.as_slice(), Some(&existing), today)?;
        self.repost(&mut tx, &order).await?;
        tx.commit().await?;

        debug!(id = %order.id, total = order.total.amount(), "Work order updated");
        Ok(order)
    }

    /// Moves an order along its status cycle. Nothing is posted.
    pub async fn set_status(
        &self,
        id: &str,
        status: WorkOrderStatus,
        today: NaiveDate,
    ) -> DbResult<WorkOrder> {
        let mut tx = self.pool.begin().await?;
        let mut order = require_work_order(&mut tx, id).await?;
        let from = order.status;
        set_status(&mut order, status, today);
        save_work_order(&mut tx, &order).await?;
        tx.commit().await?;

        info!(id = %order.id, ?from, to = ?order.status, "Work order status changed");
        Ok(order)
    }

    /// Records payment of a work order. Settling again moves the income to
    /// the new source and date.
    pub async fn settle(
        &self,
        id: &str,
        payment_source_id: &str,
        paid_on: NaiveDate,
    ) -> DbResult<WorkOrder> {
        let mut tx = self.pool.begin().await?;
        require_payment_source(&mut tx, payment_source_id).await?;
        let mut order = require_work_order(&mut tx, id).await?;
        settle(&mut order, payment_source_id, paid_on);
        self.repost(&mut tx, &order).await?;
        tx.commit().await?;

        info!(
            id = %order.id,
            source = %payment_source_id,
            %paid_on,
            total = order.total.amount(),
            "Work order settled"
        );
        Ok(order)
    }

    async fn repost(&self, conn: &mut SqliteConnection, order: &WorkOrder) -> DbResult<()> {
        let before = linked_rows(conn, &Link::WorkOrder(order.id.clone())).await?;
        save_work_order(conn, order).await?;
        commit(
            conn,
            &before,
            &work_order_posting(order),
            self.settings.allow_negative_stock,
        )
        .await
    }

    /// Deletes a work order, returning its parts to stock and reverting any
    /// settlement.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        require_work_order(&mut tx, id).await?;

        let before = linked_rows(&mut tx, &Link::WorkOrder(id.to_string())).await?;
        commit(&mut tx, &before, &Posting::new(), true).await?;

        sqlx::query("DELETE FROM work_orders WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(id = %id, "Work order deleted");
        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<WorkOrder>> {
        let mut conn = self.pool.acquire().await?;
        load_work_order(&mut conn, id).await
    }

    pub async fn list(&self) -> DbResult<Vec<WorkOrder>> {
        let mut conn = self.pool.acquire().await?;
        load_all_work_orders(&mut conn).await
    }

    /// Orders currently in `status`, oldest first.
    pub async fn list_by_status(&self, status: WorkOrderStatus) -> DbResult<Vec<WorkOrder>> {
        let sql = format!(
            "SELECT {} FROM work_orders WHERE status = ?1 ORDER BY received_on, created_at",
            WORK_ORDER_COLUMNS
        );
        let rows = sqlx::query_as::<_, WorkOrderRow>(&sql)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(WorkOrderRow::into_order).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use moto_core::{
        Branch, CashCategory, NewCustomer, NewPart, NewPaymentSource, Part, PartUsageDraft,
        PaymentSource,
    };
    use std::collections::BTreeMap;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    async fn setup() -> (Database, Part, PaymentSource) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.branches()
            .create(Branch {
                id: "HN".to_string(),
                name: "Hà Nội".to_string(),
                address: None,
            })
            .await
            .unwrap();
        let part = db
            .parts()
            .create(NewPart {
                sku: "SPARK-C7".to_string(),
                name: "Spark plug C7HSA".to_string(),
                category: "Ignition".to_string(),
                cost_price: Money::new(30_000),
                selling_price: Money::new(50_000),
                opening_stock: [("HN".to_string(), 6)].into_iter().collect(),
                date: day(1),
            })
            .await
            .unwrap();
        let drawer = db
            .cash()
            .create_source(NewPaymentSource {
                name: "Cash drawer".to_string(),
                opening_balance: BTreeMap::new(),
                date: day(1),
            })
            .await
            .unwrap();
        (db, part, drawer)
    }

    fn draft(part: &Part, quantity: i64) -> WorkOrderDraft {
        WorkOrderDraft {
            branch_id: "HN".to_string(),
            customer_id: None,
            customer_name: "Lê Hoàng".to_string(),
            customer_phone: Some("0933000111".to_string()),
            vehicle: Some("Yamaha Sirius".to_string()),
            license_plate: Some("29X3-55555".to_string()),
            odometer: Some(18_500),
            issue_description: "Hard to start in the morning".to_string(),
            technician: Some("Tuấn".to_string()),
            status: WorkOrderStatus::Received,
            parts: vec![PartUsageDraft {
                part_id: part.id.clone(),
                quantity,
                price: None,
            }],
            quotation_items: vec![QuotationItem {
                description: "Carburettor clean".to_string(),
                quantity: 1,
                unit_price: Money::new(70_000),
            }],
            labor_cost: Money::new(100_000),
            discount: Money::zero(),
            received_on: day(10),
        }
    }

    async fn stock(db: &Database, part: &Part) -> i64 {
        db.parts()
            .get_by_id(&part.id)
            .await
            .unwrap()
            .unwrap()
            .stock_at("HN")
    }

    #[tokio::test]
    async fn test_create_issues_parts_and_stamps_customer() {
        let (db, part, _) = setup().await;
        let customer = db
            .customers()
            .create(NewCustomer {
                name: "Lê Hoàng".to_string(),
                phone: "0933000111".to_string(),
                vehicle: Some("Yamaha Sirius".to_string()),
                license_plate: None,
                last_service_odometer: None,
                last_service_date: None,
            })
            .await
            .unwrap();

        let mut order_draft = draft(&part, 2);
        order_draft.customer_id = Some(customer.id.clone());
        let order = db.work_orders().create(order_draft, day(10)).await.unwrap();
        assert_eq!(order.total.amount(), 270_000);
        assert_eq!(stock(&db, &part).await, 4);

        let stored = db.work_orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.parts_used, order.parts_used);
        assert_eq!(stored.quotation_items, order.quotation_items);

        let customer = db.customers().get_by_id(&customer.id).await.unwrap().unwrap();
        assert_eq!(customer.last_service_date, Some(day(10)));
        assert_eq!(customer.last_service_odometer, Some(18_500));
    }

    #[tokio::test]
    async fn test_update_reposts_net_change() {
        let (db, part, _) = setup().await;
        let order = db.work_orders().create(draft(&part, 2), day(10)).await.unwrap();

        let updated = db
            .work_orders()
            .update(&order.id, draft(&part, 5), day(11))
            .await
            .unwrap();
        assert_eq!(updated.id, order.id);
        assert_eq!(stock(&db, &part).await, 1);

        // 5 → 8 needs 3 more, only 1 on hand
        let err = db
            .work_orders()
            .update(&order.id, draft(&part, 8), day(11))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { .. })
        ));
        assert_eq!(stock(&db, &part).await, 1);
        assert!(db.reports().verify_ledger().await.unwrap());
    }

    #[tokio::test]
    async fn test_status_cycle_stamps_completion() {
        let (db, part, _) = setup().await;
        let order = db.work_orders().create(draft(&part, 1), day(10)).await.unwrap();

        let done = db
            .work_orders()
            .set_status(&order.id, WorkOrderStatus::Done, day(12))
            .await
            .unwrap();
        assert_eq!(done.completed_on, Some(day(12)));

        let returned = db
            .work_orders()
            .set_status(&order.id, WorkOrderStatus::Returned, day(13))
            .await
            .unwrap();
        assert_eq!(returned.completed_on, Some(day(12)));

        let reopened = db
            .work_orders()
            .set_status(&order.id, WorkOrderStatus::InRepair, day(14))
            .await
            .unwrap();
        assert_eq!(reopened.completed_on, None);

        let in_repair = db
            .work_orders()
            .list_by_status(WorkOrderStatus::InRepair)
            .await
            .unwrap();
        assert_eq!(in_repair.len(), 1);
    }

    #[tokio::test]
    async fn test_settle_twice_moves_income() {
        let (db, part, drawer) = setup().await;
        let bank = db
            .cash()
            .create_source(NewPaymentSource {
                name: "Bank".to_string(),
                opening_balance: BTreeMap::new(),
                date: day(1),
            })
            .await
            .unwrap();
        let order = db.work_orders().create(draft(&part, 1), day(10)).await.unwrap();

        db.work_orders().settle(&order.id, &drawer.id, day(12)).await.unwrap();
        let settled = db.work_orders().settle(&order.id, &bank.id, day(13)).await.unwrap();
        assert_eq!(settled.paid_on, Some(day(13)));

        let drawer = db.cash().get_source(&drawer.id).await.unwrap().unwrap();
        assert!(drawer.balance_at("HN").is_zero());
        let bank = db.cash().get_source(&bank.id).await.unwrap().unwrap();
        assert_eq!(bank.balance_at("HN"), settled.total);

        let service: Vec<_> = db
            .cash()
            .list(&Default::default())
            .await
            .unwrap()
            .into_iter()
            .filter(|c| c.category == CashCategory::Service)
            .collect();
        assert_eq!(service.len(), 1);
        assert_eq!(service[0].date, day(13));
        // parts are not issued twice
        assert_eq!(stock(&db, &part).await, 5);
    }

    #[tokio::test]
    async fn test_delete_reverts_everything() {
        let (db, part, drawer) = setup().await;
        let order = db.work_orders().create(draft(&part, 3), day(10)).await.unwrap();
        db.work_orders().settle(&order.id, &drawer.id, day(12)).await.unwrap();

        db.work_orders().delete(&order.id).await.unwrap();
        assert_eq!(stock(&db, &part).await, 6);
        let drawer = db.cash().get_source(&drawer.id).await.unwrap().unwrap();
        assert!(drawer.balance_at("HN").is_zero());
        assert!(db.work_orders().get_by_id(&order.id).await.unwrap().is_none());
        assert!(db.reports().verify_ledger().await.unwrap());
    }

    #[tokio::test]
    async fn test_part_delete_refused_while_order_lists_it() {
        let (db, part, drawer) = setup().await;
        let order = db.work_orders().create(draft(&part, 2), day(10)).await.unwrap();

        let err = db.parts().delete(&part.id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::PartInUse { ref work_order_id, .. }) if *work_order_id == order.id
        ));
        assert_eq!(stock(&db, &part).await, 4);

        let settled = db.work_orders().settle(&order.id, &drawer.id, day(12)).await.unwrap();
        assert_eq!(settled.paid_on, Some(day(12)));

        db.work_orders().delete(&order.id).await.unwrap();
        db.parts().delete(&part.id).await.unwrap();
        assert!(db.parts().get_by_id(&part.id).await.unwrap().is_none());
        assert!(db.reports().verify_ledger().await.unwrap());
    }

    #[tokio::test]
    async fn test_settle_unknown_order() {
        let (db, _, drawer) = setup().await;
        let err = db
            .work_orders()
            .settle("missing", &drawer.id, day(12))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::WorkOrderNotFound(_))
        ));
    }
}
