//! # Reporting
//!
//! Revenue, cost and profit derived from the documents the shop keeps.
//!
//! ## Revenue Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  WorkOrder (done | returned)                                            │
//! │    ├── parts used + quotation lines ──► WorkOrderParts  (cost = parts)  │
//! │    └── labor − discount ─────────────► WorkOrderLabor  (cost = 0)       │
//! │  Sale                                                                   │
//! │    └── total (net of discount) ──────► RetailSale      (cost = items)   │
//! │                                                                         │
//! │  revenue_lines() ──► group_by_period(Day | Week | Month)                │
//! │                  └─► group_by_branch()                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Work orders are dated by completion, falling back to intake. Open work
//! orders never count as revenue.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::assets::{capital_total, fixed_asset_total};
use crate::money::Money;
use crate::types::{
    Branch, CapitalInvestment, CashCategory, CashFlow, CashTransaction, FixedAsset, Part,
    PaymentSource, Sale, WorkOrder,
};

// =============================================================================
// Filters & Periods
// =============================================================================

/// Restricts a report to a date range (inclusive) and/or a branch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportFilter {
    #[ts(as = "Option<String>")]
    pub from: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub to: Option<NaiveDate>,
    pub branch_id: Option<String>,
}

impl ReportFilter {
    /// No restriction.
    pub fn all() -> Self {
        ReportFilter::default()
    }

    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        ReportFilter {
            from: Some(from),
            to: Some(to),
            branch_id: None,
        }
    }

    pub fn for_branch(mut self, branch_id: impl Into<String>) -> Self {
        self.branch_id = Some(branch_id.into());
        self
    }

    pub fn matches(&self, date: NaiveDate, branch_id: &str) -> bool {
        self.from.map_or(true, |from| date >= from)
            && self.to.map_or(true, |to| date <= to)
            && self.branch_id.as_deref().map_or(true, |b| b == branch_id)
    }
}

/// Bucket size for time-grouped reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Day,
    Week,
    Month,
}

impl Period {
    /// Bucket key of a date: `2024-03-05`, `2024-W10` (ISO week) or `2024-03`.
    ///
    /// ```rust
    /// use chrono::NaiveDate;
    /// use moto_core::report::Period;
    ///
    /// let d = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
    /// assert_eq!(Period::Day.key(d), "2024-03-05");
    /// assert_eq!(Period::Week.key(d), "2024-W10");
    /// assert_eq!(Period::Month.key(d), "2024-03");
    /// ```
    pub fn key(&self, date: NaiveDate) -> String {
        match self {
            Period::Day => date.format("%Y-%m-%d").to_string(),
            Period::Week => {
                let week = date.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            Period::Month => date.format("%Y-%m").to_string(),
        }
    }
}

// =============================================================================
// Revenue Lines
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RevenueSource {
    WorkOrderParts,
    WorkOrderLabor,
    RetailSale,
}

/// One revenue-bearing fact, normalised across sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RevenueLine {
    pub source: RevenueSource,
    /// Work order or sale id.
    pub reference_id: String,
    pub branch_id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub revenue: Money,
    pub cost: Money,
}

impl RevenueLine {
    pub fn profit(&self) -> Money {
        self.revenue - self.cost
    }
}

/// Merges completed work orders and retail sales into revenue lines.
pub fn revenue_lines(
    work_orders: &[WorkOrder],
    sales: &[Sale],
    filter: &ReportFilter,
) -> Vec<RevenueLine> {
    let mut lines = Vec::new();

    for order in work_orders {
        if !order.status.is_completed() {
            continue;
        }
        let date = order.revenue_date();
        if !filter.matches(date, &order.branch_id) {
            continue;
        }

        if !order.parts_used.is_empty() || !order.quotation_items.is_empty() {
            let revenue = order.parts_used.iter().map(|p| p.line_total()).sum::<Money>()
                + order
                    .quotation_items
                    .iter()
                    .map(|q| q.line_total())
                    .sum::<Money>();
            lines.push(RevenueLine {
                source: RevenueSource::WorkOrderParts,
                reference_id: order.id.clone(),
                branch_id: order.branch_id.clone(),
                date,
                revenue,
                cost: order.parts_used.iter().map(|p| p.line_cost()).sum(),
            });
        }

        let labor = order.labor_cost - order.discount;
        if !labor.is_zero() {
            lines.push(RevenueLine {
                source: RevenueSource::WorkOrderLabor,
                reference_id: order.id.clone(),
                branch_id: order.branch_id.clone(),
                date,
                revenue: labor,
                cost: Money::zero(),
            });
        }
    }

    for sale in sales {
        if !filter.matches(sale.date, &sale.branch_id) {
            continue;
        }
        lines.push(RevenueLine {
            source: RevenueSource::RetailSale,
            reference_id: sale.id.clone(),
            branch_id: sale.branch_id.clone(),
            date: sale.date,
            revenue: sale.total,
            cost: sale.cost(),
        });
    }

    lines
}

/// Revenue, cost and profit of one group, with a per-source breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RevenueSummary {
    /// Period key or branch id.
    pub key: String,
    pub revenue: Money,
    pub cost: Money,
    pub profit: Money,
    pub work_order_parts: Money,
    pub work_order_labor: Money,
    pub retail_sales: Money,
    pub line_count: usize,
}

impl RevenueSummary {
    fn empty(key: String) -> Self {
        RevenueSummary {
            key,
            revenue: Money::zero(),
            cost: Money::zero(),
            profit: Money::zero(),
            work_order_parts: Money::zero(),
            work_order_labor: Money::zero(),
            retail_sales: Money::zero(),
            line_count: 0,
        }
    }

    fn add(&mut self, line: &RevenueLine) {
        self.revenue += line.revenue;
        self.cost += line.cost;
        self.profit += line.profit();
        match line.source {
            RevenueSource::WorkOrderParts => self.work_order_parts += line.revenue,
            RevenueSource::WorkOrderLabor => self.work_order_labor += line.revenue,
            RevenueSource::RetailSale => self.retail_sales += line.revenue,
        }
        self.line_count += 1;
    }
}

fn summarize<F>(lines: &[RevenueLine], key_of: F) -> Vec<RevenueSummary>
where
    F: Fn(&RevenueLine) -> String,
{
    let mut groups: BTreeMap<String, RevenueSummary> = BTreeMap::new();
    for line in lines {
        let key = key_of(line);
        groups
            .entry(key.clone())
            .or_insert_with(|| RevenueSummary::empty(key))
            .add(line);
    }
    groups.into_values().collect()
}

/// Groups lines by day, ISO week or month, ordered by key.
pub fn group_by_period(lines: &[RevenueLine], period: Period) -> Vec<RevenueSummary> {
    summarize(lines, |line| period.key(line.date))
}

/// Groups lines by branch, ordered by branch id.
pub fn group_by_branch(lines: &[RevenueLine]) -> Vec<RevenueSummary> {
    summarize(lines, |line| line.branch_id.clone())
}

/// All lines in one summary keyed `total`.
pub fn revenue_totals(lines: &[RevenueLine]) -> RevenueSummary {
    let mut summary = RevenueSummary::empty("total".to_string());
    for line in lines {
        summary.add(line);
    }
    summary
}

// =============================================================================
// Cashflow
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CategoryTotal {
    pub category: CashCategory,
    pub flow: CashFlow,
    pub amount: Money,
}

/// Income and expense over a filter. Opening balances are reported apart
/// and left out of income.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashflowSummary {
    pub opening_balances: Money,
    pub income: Money,
    pub expense: Money,
    /// income − expense.
    pub net: Money,
    pub by_category: Vec<CategoryTotal>,
}

pub fn cashflow_summary(cash: &[CashTransaction], filter: &ReportFilter) -> CashflowSummary {
    let mut opening_balances = Money::zero();
    let mut income = Money::zero();
    let mut expense = Money::zero();
    let mut by_category: BTreeMap<(CashCategory, i64), Money> = BTreeMap::new();

    for tx in cash.iter().filter(|tx| filter.matches(tx.date, &tx.branch_id)) {
        match (tx.category, tx.flow) {
            (CashCategory::OpeningBalance, _) => opening_balances += tx.balance_delta(),
            (_, CashFlow::Income) => income += tx.amount,
            (_, CashFlow::Expense) => expense += tx.amount,
        }
        *by_category
            .entry((tx.category, tx.flow.sign()))
            .or_insert_with(Money::zero) += tx.amount;
    }

    CashflowSummary {
        opening_balances,
        income,
        expense,
        net: income - expense,
        by_category: by_category
            .into_iter()
            .map(|((category, sign), amount)| CategoryTotal {
                category,
                flow: if sign > 0 {
                    CashFlow::Income
                } else {
                    CashFlow::Expense
                },
                amount,
            })
            .collect(),
    }
}

// =============================================================================
// Inventory
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventoryValuation {
    pub branch_id: Option<String>,
    pub units: i64,
    pub at_cost: Money,
    pub at_selling_price: Money,
    pub potential_margin: Money,
}

/// Stock on hand valued at cost and at selling price. Negative stock
/// counts as zero.
pub fn inventory_valuation(parts: &[Part], branch_id: Option<&str>) -> InventoryValuation {
    let mut units = 0;
    let mut at_cost = Money::zero();
    let mut at_selling_price = Money::zero();

    for part in parts {
        let qty = match branch_id {
            Some(b) => part.stock_at(b).max(0),
            None => part.stock.values().map(|q| (*q).max(0)).sum(),
        };
        units += qty;
        at_cost += part.cost_price * qty;
        at_selling_price += part.selling_price * qty;
    }

    InventoryValuation {
        branch_id: branch_id.map(str::to_string),
        units,
        at_cost,
        at_selling_price,
        potential_margin: at_selling_price - at_cost,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LowStockItem {
    pub part_id: String,
    pub sku: String,
    pub name: String,
    pub branch_id: String,
    pub quantity: i64,
}

/// Parts whose stock at `branch_id` is below `threshold`, emptiest first.
pub fn low_stock(parts: &[Part], branch_id: &str, threshold: i64) -> Vec<LowStockItem> {
    let mut items: Vec<LowStockItem> = parts
        .iter()
        .filter(|p| p.stock_at(branch_id) < threshold)
        .map(|p| LowStockItem {
            part_id: p.id.clone(),
            sku: p.sku.clone(),
            name: p.name.clone(),
            branch_id: branch_id.to_string(),
            quantity: p.stock_at(branch_id),
        })
        .collect();
    items.sort_by(|a, b| a.quantity.cmp(&b.quantity).then_with(|| a.sku.cmp(&b.sku)));
    items
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TopPart {
    pub part_id: String,
    pub part_name: String,
    pub quantity: i64,
    pub revenue: Money,
}

/// Best sellers by quantity across retail sales and completed work orders.
pub fn top_selling_parts(
    sales: &[Sale],
    work_orders: &[WorkOrder],
    filter: &ReportFilter,
    limit: usize,
) -> Vec<TopPart> {
    let mut totals: BTreeMap<String, TopPart> = BTreeMap::new();
    let mut add = |part_id: &str, part_name: &str, quantity: i64, revenue: Money| {
        let entry = totals.entry(part_id.to_string()).or_insert_with(|| TopPart {
            part_id: part_id.to_string(),
            part_name: part_name.to_string(),
            quantity: 0,
            revenue: Money::zero(),
        });
        entry.quantity += quantity;
        entry.revenue += revenue;
    };

    for sale in sales.iter().filter(|s| filter.matches(s.date, &s.branch_id)) {
        for item in &sale.items {
            add(
                item.part_id.as_str(),
                item.part_name.as_str(),
                item.quantity,
                item.line_total(),
            );
        }
    }
    for order in work_orders
        .iter()
        .filter(|o| o.status.is_completed() && filter.matches(o.revenue_date(), &o.branch_id))
    {
        for usage in &order.parts_used {
            add(
                usage.part_id.as_str(),
                usage.part_name.as_str(),
                usage.quantity,
                usage.line_total(),
            );
        }
    }

    let mut ranked: Vec<TopPart> = totals.into_values().collect();
    ranked.sort_by(|a, b| {
        b.quantity
            .cmp(&a.quantity)
            .then_with(|| b.revenue.cmp(&a.revenue))
            .then_with(|| a.part_name.cmp(&b.part_name))
    });
    ranked.truncate(limit);
    ranked
}

// =============================================================================
// Business Snapshot
// =============================================================================

/// Everything the reports read, borrowed from the book or loaded from the
/// database.
#[derive(Debug, Clone, Copy)]
pub struct ReportData<'a> {
    pub parts: &'a [Part],
    pub sales: &'a [Sale],
    pub work_orders: &'a [WorkOrder],
    pub cash: &'a [CashTransaction],
    pub payment_sources: &'a [PaymentSource],
    pub fixed_assets: &'a [FixedAsset],
    pub capital: &'a [CapitalInvestment],
}

/// Key figures of one branch, serialisable as the blob handed to a
/// business-analysis prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BusinessSnapshot {
    pub branch_id: String,
    pub branch_name: String,
    #[ts(as = "Option<String>")]
    pub from: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub to: Option<NaiveDate>,
    pub revenue: Money,
    pub cost: Money,
    pub profit: Money,
    pub retail_revenue: Money,
    pub service_revenue: Money,
    pub sale_count: usize,
    pub completed_work_orders: usize,
    pub open_work_orders: usize,
    pub cashflow: CashflowSummary,
    /// Σ payment-source balances at the branch, now.
    pub cash_on_hand: Money,
    pub inventory: InventoryValuation,
    pub low_stock_count: usize,
    pub fixed_assets: Money,
    pub capital: Money,
    pub top_parts: Vec<TopPart>,
}

impl BusinessSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Builds the snapshot of `branch` over the filter's date range.
///
/// The filter's own branch is ignored. Stock, balances, assets and capital
/// are current values; everything else honours the date range.
pub fn business_snapshot(
    data: &ReportData<'_>,
    branch: &Branch,
    filter: &ReportFilter,
    low_stock_threshold: i64,
) -> BusinessSnapshot {
    let filter = ReportFilter {
        from: filter.from,
        to: filter.to,
        branch_id: Some(branch.id.clone()),
    };

    let lines = revenue_lines(data.work_orders, data.sales, &filter);
    let totals = revenue_totals(&lines);

    let sale_count = data
        .sales
        .iter()
        .filter(|s| filter.matches(s.date, &s.branch_id))
        .count();
    let completed_work_orders = data
        .work_orders
        .iter()
        .filter(|o| o.status.is_completed() && filter.matches(o.revenue_date(), &o.branch_id))
        .count();
    let open_work_orders = data
        .work_orders
        .iter()
        .filter(|o| !o.status.is_completed() && o.branch_id == branch.id)
        .count();

    BusinessSnapshot {
        branch_id: branch.id.clone(),
        branch_name: branch.name.clone(),
        from: filter.from,
        to: filter.to,
        revenue: totals.revenue,
        cost: totals.cost,
        profit: totals.profit,
        retail_revenue: totals.retail_sales,
        service_revenue: totals.work_order_parts + totals.work_order_labor,
        sale_count,
        completed_work_orders,
        open_work_orders,
        cashflow: cashflow_summary(data.cash, &filter),
        cash_on_hand: data
            .payment_sources
            .iter()
            .map(|s| s.balance_at(&branch.id))
            .sum(),
        inventory: inventory_valuation(data.parts, Some(&branch.id)),
        low_stock_count: low_stock(data.parts, &branch.id, low_stock_threshold).len(),
        fixed_assets: fixed_asset_total(data.fixed_assets, Some(&branch.id)),
        capital: capital_total(data.capital, Some(&branch.id)),
        top_parts: top_selling_parts(data.sales, data.work_orders, &filter, 5),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
