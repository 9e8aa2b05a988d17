//! # Cash Repository
//!
//! Payment sources (cash drawers, bank accounts) and manual cash entries.
//! Balances per branch are running totals of the cash transactions.

use chrono::{DateTime, NaiveDate, Utc};
use moto_core::catalog::build_payment_source;
use moto_core::ledger::{manual_cash, opening_balance};
use moto_core::{
    CashTransaction, CoreError, Money, NewCashTransaction, NewPaymentSource,
    PaymentSource, Posting,
};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::ledger::{
    commit, fetch_cash, linked_error, require_branch, CashRow, CASH_COLUMNS,
};

/// Which cash transactions to list. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CashFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub branch_id: Option<String>,
    pub payment_source_id: Option<String>,
}

#[derive(Debug, FromRow)]
struct PaymentSourceRow {
    id: String,
    name: String,
    created_at: DateTime<Utc>,
}

async fn balances_of(
    conn: &mut SqliteConnection,
    source_id: &str,
) -> DbResult<BTreeMap<String, Money>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT branch_id, balance FROM payment_source_balances WHERE payment_source_id = ?1",
    )
    .bind(source_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(branch, amount)| (branch, Money::new(amount)))
        .collect())
}

pub(crate) async fn load_payment_source(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<PaymentSource>> {
    let row = sqlx::query_as::<_, PaymentSourceRow>(
        "SELECT id, name, created_at FROM payment_sources WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    match row {
        Some(row) => {
            let balance = balances_of(conn, &row.id).await?;
            Ok(Some(PaymentSource {
                id: row.id,
                name: row.name,
                balance,
                created_at: row.created_at,
            }))
        }
        None => Ok(None),
    }
}

pub(crate) async fn load_all_payment_sources(
    conn: &mut SqliteConnection,
) -> DbResult<Vec<PaymentSource>> {
    let rows = sqlx::query_as::<_, PaymentSourceRow>(
        "SELECT id, name, created_at FROM payment_sources ORDER BY name",
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut sources = Vec::with_capacity(rows.len());
    for row in rows {
        let balance = balances_of(conn, &row.id).await?;
        sources.push(PaymentSource {
            id: row.id,
            name: row.name,
            balance,
            created_at: row.created_at,
        });
    }
    Ok(sources)
}

pub(crate) async fn load_cash(
    conn: &mut SqliteConnection,
    filter: &CashFilter,
) -> DbResult<Vec<CashTransaction>> {
    let sql = format!(
        r#"
        SELECT {} FROM cash_transactions
        WHERE (?1 IS NULL OR date >= ?1)
          AND (?2 IS NULL OR date <= ?2)
          AND (?3 IS NULL OR branch_id = ?3)
          AND (?4 IS NULL OR payment_source_id = ?4)
        ORDER BY date, created_at
        "#,
        CASH_COLUMNS
    );
    let rows = sqlx::query_as::<_, CashRow>(&sql)
        .bind(filter.from)
        .bind(filter.to)
        .bind(&filter.branch_id)
        .bind(&filter.payment_source_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// Repository for payment sources and cash transactions.
#[derive(Debug, Clone)]
pub struct CashRepository {
    pool: SqlitePool,
}

impl CashRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CashRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Payment Sources
    // -------------------------------------------------------------------------

    /// Adds a payment source and posts its opening balance as income.
    pub async fn create_source(&self, draft: NewPaymentSource) -> DbResult<PaymentSource> {
        let source = build_payment_source(&draft)?;

        let mut tx = self.pool.begin().await?;
        for branch_id in draft.opening_balance.keys() {
            require_branch(&mut tx, branch_id).await?;
        }
        sqlx::query("INSERT INTO payment_sources (id, name, created_at) VALUES (?1, ?2, ?3)")
            .bind(&source.id)
            .bind(&source.name)
            .bind(source.created_at)
            .execute(&mut *tx)
            .await?;

        let opening = opening_balance(&source, &draft.opening_balance, draft.date)?;
        commit(&mut tx, &Posting::new(), &opening, true).await?;

        let created = load_payment_source(&mut tx, &source.id)
            .await?
            .ok_or_else(|| DbError::not_found("Payment source", &source.id))?;
        tx.commit().await?;

        info!(id = %created.id, name = %created.name, "Payment source created");
        Ok(created)
    }

    pub async fn get_source(&self, id: &str) -> DbResult<Option<PaymentSource>> {
        let mut conn = self.pool.acquire().await?;
        load_payment_source(&mut conn, id).await
    }

    pub async fn list_sources(&self) -> DbResult<Vec<PaymentSource>> {
        let mut conn = self.pool.acquire().await?;
        load_all_payment_sources(&mut conn).await
    }

    // -------------------------------------------------------------------------
    // Cash Transactions
    // -------------------------------------------------------------------------

    /// Records a manual income or expense.
    pub async fn record(&self, draft: NewCashTransaction) -> DbResult<CashTransaction> {
        let row = manual_cash(draft)?;

        let mut tx = self.pool.begin().await?;
        let posting = Posting {
            inventory: Vec::new(),
            cash: vec![row.clone()],
        };
        commit(&mut tx, &Posting::new(), &posting, true).await?;
        tx.commit().await?;

        info!(
            id = %row.id,
            source = %row.payment_source_id,
            branch_id = %row.branch_id,
            delta = row.balance_delta().amount(),
            "Cash transaction recorded"
        );
        Ok(row)
    }

    /// Replaces a manual entry. Source, branch, flow and amount may all
    /// change; the old balance effect is reversed in the same transaction.
    pub async fn update(&self, id: &str, draft: NewCashTransaction) -> DbResult<CashTransaction> {
        let mut tx = self.pool.begin().await?;
        let existing = fetch_cash(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::CashTransactionNotFound(id.to_string()))?;
        if let Some(link) = existing.link() {
            return Err(linked_error(id, &link).into());
        }

        let mut row = manual_cash(draft)?;
        row.id = existing.id.clone();
        row.created_at = existing.created_at;

        let before = Posting {
            inventory: Vec::new(),
            cash: vec![existing],
        };
        let after = Posting {
            inventory: Vec::new(),
            cash: vec![row.clone()],
        };
        commit(&mut tx, &before, &after, true).await?;
        tx.commit().await?;

        debug!(id = %row.id, amount = row.amount.amount(), "Cash transaction updated");
        Ok(row)
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let existing = fetch_cash(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::CashTransactionNotFound(id.to_string()))?;
        if let Some(link) = existing.link() {
            return Err(linked_error(id, &link).into());
        }

        let before = Posting {
            inventory: Vec::new(),
            cash: vec![existing],
        };
        commit(&mut tx, &before, &Posting::new(), true).await?;
        tx.commit().await?;

        info!(id = %id, "Cash transaction deleted");
        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CashTransaction>> {
        let mut conn = self.pool.acquire().await?;
        fetch_cash(&mut conn, id).await
    }

    /// Cash transactions matching the filter, oldest first.
    pub async fn list(&self, filter: &CashFilter) -> DbResult<Vec<CashTransaction>> {
        let mut conn = self.pool.acquire().await?;
        load_cash(&mut conn, filter).await
    }
}
