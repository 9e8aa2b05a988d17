//! # Report Repository
//!
//! Loads the rows a report needs and hands them to `moto_core::report`.
//! Nothing here aggregates in SQL except the ledger consistency check.
//!
//! ```text
//! ┌──────────────┐   load_*()    ┌──────────────┐   report::*()   ┌─────────────────┐
//! │    SQLite    │ ────────────► │ owned Vecs   │ ──────────────► │ RevenueSummary, │
//! │              │               │ (ReportData) │                 │ BusinessSnapshot│
//! └──────────────┘               └──────────────┘                 └─────────────────┘
//! ```

use moto_core::report::{
    self, BusinessSnapshot, CashflowSummary, InventoryValuation, LowStockItem, Period,
    ReportData, ReportFilter, RevenueSummary, TopPart,
};
use moto_core::{
    BookSettings, CapitalInvestment, CashTransaction, CoreError, FixedAsset, Part, PaymentSource,
    Sale, WorkOrder,
};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::DbResult;
use crate::repository::asset::{load_capital, load_fixed_assets};
use crate::repository::branch::load_branch;
use crate::repository::cash::{load_all_payment_sources, load_cash, CashFilter};
use crate::repository::ledger::mismatches;
use crate::repository::part::load_all_parts;
use crate::repository::sale::load_all_sales;
use crate::repository::work_order::load_all_work_orders;

/// Owned copy of everything the snapshot reads.
struct LoadedData {
    parts: Vec<Part>,
    sales: Vec<Sale>,
    work_orders: Vec<WorkOrder>,
    cash: Vec<CashTransaction>,
    payment_sources: Vec<PaymentSource>,
    fixed_assets: Vec<FixedAsset>,
    capital: Vec<CapitalInvestment>,
}

impl LoadedData {
    async fn load(conn: &mut SqliteConnection) -> DbResult<Self> {
        Ok(LoadedData {
            parts: load_all_parts(conn).await?,
            sales: load_all_sales(conn).await?,
            work_orders: load_all_work_orders(conn).await?,
            cash: load_cash(conn, &CashFilter::default()).await?,
            payment_sources: load_all_payment_sources(conn).await?,
            fixed_assets: load_fixed_assets(conn).await?,
            capital: load_capital(conn).await?,
        })
    }

    fn view(&self) -> ReportData<'_> {
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
}

/// Repository for reports.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
    settings: BookSettings,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool, settings: BookSettings) -> Self {
        ReportRepository { pool, settings }
    }

    async fn revenue_lines(&self, filter: &ReportFilter) -> DbResult<Vec<report::RevenueLine>> {
        let mut conn = self.pool.acquire().await?;
        let sales = load_all_sales(&mut conn).await?;
        let work_orders = load_all_work_orders(&mut conn).await?;
        Ok(report::revenue_lines(&work_orders, &sales, filter))
    }

    /// Revenue, cost and profit per day, week or month.
    pub async fn revenue_by_period(
        &self,
        filter: &ReportFilter,
        period: Period,
    ) -> DbResult<Vec<RevenueSummary>> {
        let lines = self.revenue_lines(filter).await?;
        debug!(lines = lines.len(), ?period, "Grouping revenue by period");
        Ok(report::group_by_period(&lines, period))
    }

    pub async fn revenue_by_branch(&self, filter: &ReportFilter) -> DbResult<Vec<RevenueSummary>> {
        let lines = self.revenue_lines(filter).await?;
        Ok(report::group_by_branch(&lines))
    }

    /// One summary over everything the filter matches.
    pub async fn revenue_totals(&self, filter: &ReportFilter) -> DbResult<RevenueSummary> {
        let lines = self.revenue_lines(filter).await?;
        Ok(report::revenue_totals(&lines))
    }

    pub async fn cashflow(&self, filter: &ReportFilter) -> DbResult<CashflowSummary> {
        let mut conn = self.pool.acquire().await?;
        let cash = load_cash(&mut conn, &CashFilter::default()).await?;
        Ok(report::cashflow_summary(&cash, filter))
    }

    /// Stock valued at cost and at selling price, for one branch or all.
    pub async fn inventory_valuation(&self, branch_id: Option<&str>) -> DbResult<InventoryValuation> {
        let mut conn = self.pool.acquire().await?;
        let parts = load_all_parts(&mut conn).await?;
        Ok(report::inventory_valuation(&parts, branch_id))
    }

    /// Parts below the configured threshold at a branch, emptiest first.
    pub async fn low_stock(&self, branch_id: &str) -> DbResult<Vec<LowStockItem>> {
        let mut conn = self.pool.acquire().await?;
        let parts = load_all_parts(&mut conn).await?;
        Ok(report::low_stock(
            &parts,
            branch_id,
            self.settings.low_stock_threshold,
        ))
    }

    pub async fn top_selling_parts(
        &self,
        filter: &ReportFilter,
        limit: usize,
    ) -> DbResult<Vec<TopPart>> {
        let mut conn = self.pool.acquire().await?;
        let sales = load_all_sales(&mut conn).await?;
        let work_orders = load_all_work_orders(&mut conn).await?;
        Ok(report::top_selling_parts(&sales, &work_orders, filter, limit))
    }

    /// Key figures of one branch over the filter's date range.
    pub async fn business_snapshot(
        &self,
        branch_id: &str,
        filter: &ReportFilter,
    ) -> DbResult<BusinessSnapshot> {
        let mut conn = self.pool.acquire().await?;
        let branch = load_branch(&mut conn, branch_id)
            .await?
            .ok_or_else(|| CoreError::BranchNotFound(branch_id.to_string()))?;
        let data = LoadedData::load(&mut conn).await?;

        let snapshot = report::business_snapshot(
            &data.view(),
            &branch,
            filter,
            self.settings.low_stock_threshold,
        );
        info!(
            branch_id = %branch.id,
            revenue = snapshot.revenue.amount(),
            profit = snapshot.profit.amount(),
            "Business snapshot built"
        );
        Ok(snapshot)
    }

    /// Replays every transaction row and compares the result with the
    /// stored stock and balances. `true` when they agree.
    pub async fn verify_ledger(&self) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        let found = mismatches(&mut conn).await?;
        for (kind, key, recorded, replayed) in &found {
            warn!(%kind, %key, recorded, replayed, "Ledger mismatch");
        }
        Ok(found.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::NaiveDate;
    use moto_core::{
        Branch, Money, NewPart, NewPaymentSource, PartUsageDraft, SaleDraft, SaleLineDraft,
        WorkOrderDraft, WorkOrderStatus,
    };

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
    }

    /// One sale on the 3rd and one work order completed on the 20th, both
    /// at HN, paid into the same drawer.
    async fn populated() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
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
                sku: "TIRE-80".to_string(),
                name: "Tire 80/90-17".to_string(),
                category: "Tires".to_string(),
                cost_price: Money::new(200_000),
                selling_price: Money::new(300_000),
                opening_stock: [("HN".to_string(), 8)].into_iter().collect(),
                date: day(1),
            })
            .await
            .unwrap();
        let drawer = db
            .cash()
            .create_source(NewPaymentSource {
                name: "Cash drawer".to_string(),
                opening_balance: [("HN".to_string(), Money::new(1_000_000))]
                    .into_iter()
                    .collect(),
                date: day(1),
            })
            .await
            .unwrap();

        db.sales()
            .create(SaleDraft {
                branch_id: "HN".to_string(),
                customer_id: None,
                customer_name: None,
                items: vec![SaleLineDraft {
                    part_id: part.id.clone(),
                    quantity: 2,
                    unit_price: None,
                }],
                discount: Money::zero(),
                payment_source_id: drawer.id.clone(),
                date: day(3),
                notes: None,
            })
            .await
            .unwrap();

        let order = db
            .work_orders()
            .create(
                WorkOrderDraft {
                    branch_id: "HN".to_string(),
                    customer_id: None,
                    customer_name: "Phạm Quang".to_string(),
                    customer_phone: None,
                    vehicle: Some("Honda Vision".to_string()),
                    license_plate: None,
                    odometer: None,
                    issue_description: "Rear tire worn".to_string(),
                    technician: None,
                    status: WorkOrderStatus::Received,
                    parts: vec![PartUsageDraft {
                        part_id: part.id.clone(),
                        quantity: 1,
                        price: None,
                    }],
                    quotation_items: Vec::new(),
                    labor_cost: Money::new(50_000),
                    discount: Money::zero(),
                    received_on: day(18),
                },
                day(18),
            )
            .await
            .unwrap();
        db.work_orders()
            .set_status(&order.id, WorkOrderStatus::Done, day(20))
            .await
            .unwrap();
        db.work_orders().settle(&order.id, &drawer.id, day(20)).await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_revenue_by_period_and_branch() {
        let db = populated().await;
        let monthly = db
            .reports()
            .revenue_by_period(&ReportFilter::all(), Period::Month)
            .await
            .unwrap();
        assert_eq!(monthly.len(), 1);
        assert_eq!(monthly[0].revenue.amount(), 950_000);
        assert_eq!(monthly[0].retail_sales.amount(), 600_000);

        let daily = db
            .reports()
            .revenue_by_period(&ReportFilter::all(), Period::Day)
            .await
            .unwrap();
        assert_eq!(daily.len(), 2);

        let by_branch = db
            .reports()
            .revenue_by_branch(&ReportFilter::all())
            .await
            .unwrap();
        assert_eq!(by_branch.len(), 1);
        assert_eq!(by_branch[0].key, "HN");
    }

    #[tokio::test]
    async fn test_cashflow_excludes_opening_balance() {
        let db = populated().await;
        let summary = db.reports().cashflow(&ReportFilter::all()).await.unwrap();
        assert_eq!(summary.opening_balances.amount(), 1_000_000);
        assert_eq!(summary.income.amount(), 950_000);
        assert!(summary.expense.is_zero());

        let early = db
            .reports()
            .cashflow(&ReportFilter::between(day(2), day(10)))
            .await
            .unwrap();
        assert_eq!(early.income.amount(), 600_000);
    }

    #[tokio::test]
    async fn test_inventory_and_low_stock() {
        let db = populated().await;
        let valuation = db.reports().inventory_valuation(Some("HN")).await.unwrap();
        assert_eq!(valuation.units, 5);
        assert_eq!(valuation.at_cost.amount(), 1_000_000);

        let low_hn = db.reports().low_stock("HN").await.unwrap();
        assert!(low_hn.is_empty());
        let low_hcm = db.reports().low_stock("HCM").await.unwrap();
        assert_eq!(low_hcm.len(), 1);
        assert_eq!(low_hcm[0].quantity, 0);
    }

    #[tokio::test]
    async fn test_business_snapshot() {
        let db = populated().await;
        let snapshot = db
            .reports()
            .business_snapshot("HN", &ReportFilter::all())
            .await
            .unwrap();
        assert_eq!(snapshot.sale_count, 1);
        assert_eq!(snapshot.completed_work_orders, 1);
        assert_eq!(snapshot.cash_on_hand.amount(), 1_950_000);
        assert_eq!(snapshot.top_parts[0].quantity, 3);
        assert!(snapshot.to_json().unwrap().contains("\"branch_id\": \"HN\""));

        let err = db
            .reports()
            .business_snapshot("DN", &ReportFilter::all())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::DbError::Domain(CoreError::BranchNotFound(_))
        ));
        assert!(db.reports().verify_ledger().await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_detects_tampering() {
        let db = populated().await;
        sqlx::query("UPDATE part_stock SET quantity = quantity + 1 WHERE branch_id = 'HN'")
            .execute(db.pool())
            .await
            .unwrap();
        assert!(!db.reports().verify_ledger().await.unwrap());
    }
}
