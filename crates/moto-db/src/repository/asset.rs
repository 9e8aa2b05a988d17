//! # Asset Repository
//!
//! Fixed assets (lifts, compressors, tools) and owner capital put into a
//! branch. Neither touches stock or payment-source balances; they feed the
//! business snapshot only.

use chrono::{DateTime, NaiveDate, Utc};
use moto_core::assets::{build_capital_investment, build_fixed_asset};
use moto_core::{
    CapitalInvestment, CoreError, FixedAsset, Money, NewCapitalInvestment, NewFixedAsset,
};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::info;

use crate::error::DbResult;
use crate::repository::ledger::require_branch;

#[derive(Debug, FromRow)]
struct FixedAssetRow {
    id: String,
    name: String,
    price: i64,
    date: NaiveDate,
    branch_id: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<FixedAssetRow> for FixedAsset {
    fn from(row: FixedAssetRow) -> Self {
        FixedAsset {
            id: row.id,
            name: row.name,
            price: Money::new(row.price),
            date: row.date,
            branch_id: row.branch_id,
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct CapitalRow {
    id: String,
    description: String,
    amount: i64,
    date: NaiveDate,
    branch_id: String,
    created_at: DateTime<Utc>,
}

impl From<CapitalRow> for CapitalInvestment {
    fn from(row: CapitalRow) -> Self {
        CapitalInvestment {
            id: row.id,
            description: row.description,
            amount: Money::new(row.amount),
            date: row.date,
            branch_id: row.branch_id,
            created_at: row.created_at,
        }
    }
}

pub(crate) async fn load_fixed_assets(conn: &mut SqliteConnection) -> DbResult<Vec<FixedAsset>> {
    let rows = sqlx::query_as::<_, FixedAssetRow>(
        "SELECT id, name, price, date, branch_id, notes, created_at FROM fixed_assets ORDER BY date",
    )
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub(crate) async fn load_capital(conn: &mut SqliteConnection) -> DbResult<Vec<CapitalInvestment>> {
    let rows = sqlx::query_as::<_, CapitalRow>(
        "SELECT id, description, amount, date, branch_id, created_at FROM capital_investments ORDER BY date",
    )
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// Repository for fixed assets and capital investments.
#[derive(Debug, Clone)]
pub struct AssetRepository {
    pool: SqlitePool,
}

impl AssetRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AssetRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Fixed Assets
    // -------------------------------------------------------------------------

    pub async fn add_fixed_asset(&self, draft: NewFixedAsset) -> DbResult<FixedAsset> {
        let mut conn = self.pool.acquire().await?;
        require_branch(&mut conn, &draft.branch_id).await?;
        let asset = build_fixed_asset(draft)?;

        sqlx::query(
            r#"
            INSERT INTO fixed_assets (id, name, price, date, branch_id, notes, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&asset.id)
        .bind(&asset.name)
        .bind(asset.price.amount())
        .bind(asset.date)
        .bind(&asset.branch_id)
        .bind(&asset.notes)
        .bind(asset.created_at)
        .execute(&mut *conn)
        .await?;

        info!(id = %asset.id, name = %asset.name, price = asset.price.amount(), "Fixed asset added");
        Ok(asset)
    }

    pub async fn delete_fixed_asset(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM fixed_assets WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::FixedAssetNotFound(id.to_string()).into());
        }
        Ok(())
    }

    pub async fn fixed_assets(&self) -> DbResult<Vec<FixedAsset>> {
        let mut conn = self.pool.acquire().await?;
        load_fixed_assets(&mut conn).await
    }

    // -------------------------------------------------------------------------
    // Capital
    // -------------------------------------------------------------------------

    pub async fn add_capital_investment(
        &self,
        draft: NewCapitalInvestment,
    ) -> DbResult<CapitalInvestment> {
        let mut conn = self.pool.acquire().await?;
        require_branch(&mut conn, &draft.branch_id).await?;
        let investment = build_capital_investment(draft)?;

        sqlx::query(
            r#"
            INSERT INTO capital_investments (id, description, amount, date, branch_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&investment.id)
        .bind(&investment.description)
        .bind(investment.amount.amount())
        .bind(investment.date)
        .bind(&investment.branch_id)
        .bind(investment.created_at)
        .execute(&mut *conn)
        .await?;

        info!(
            id = %investment.id,
            branch_id = %investment.branch_id,
            amount = investment.amount.amount(),
            "Capital investment added"
        );
        Ok(investment)
    }

    pub async fn delete_capital_investment(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM capital_investments WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::CapitalInvestmentNotFound(id.to_string()).into());
        }
        Ok(())
    }

    pub async fn capital_investments(&self) -> DbResult<Vec<CapitalInvestment>> {
        let mut conn = self.pool.acquire().await?;
        load_capital(&mut conn).await
    }
}
