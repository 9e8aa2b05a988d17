//! # Branch Repository
//!
//! Store locations. Branch ids are short human codes (`HN`, `HCM`) chosen
//! by the owner, not generated.

use moto_core::catalog::validate_branch;
use moto_core::{Branch, CoreError, ValidationError};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::info;

use crate::error::DbResult;

#[derive(Debug, FromRow)]
struct BranchRow {
    id: String,
    name: String,
    address: Option<String>,
}

impl From<BranchRow> for Branch {
    fn from(row: BranchRow) -> Self {
        Branch {
            id: row.id,
            name: row.name,
            address: row.address,
        }
    }
}

pub(crate) async fn load_branch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Branch>> {
    let row = sqlx::query_as::<_, BranchRow>("SELECT id, name, address FROM branches WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(Into::into))
}

/// Repository for branches.
#[derive(Debug, Clone)]
pub struct BranchRepository {
    pool: SqlitePool,
}

impl BranchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BranchRepository { pool }
    }

    pub async fn create(&self, branch: Branch) -> DbResult<Branch> {
        validate_branch(&branch)?;
        if self.get_by_id(&branch.id).await?.is_some() {
            return Err(CoreError::from(ValidationError::Duplicate {
                field: "branch".to_string(),
                value: branch.id,
            })
            .into());
        }

        sqlx::query("INSERT INTO branches (id, name, address) VALUES (?1, ?2, ?3)")
            .bind(&branch.id)
            .bind(&branch.name)
            .bind(&branch.address)
            .execute(&self.pool)
            .await?;

        info!(id = %branch.id, name = %branch.name, "Branch created");
        Ok(branch)
    }

    pub async fn update(&self, branch: Branch) -> DbResult<Branch> {
        validate_branch(&branch)?;
        let result = sqlx::query("UPDATE branches SET name = ?2, address = ?3 WHERE id = ?1")
            .bind(&branch.id)
            .bind(&branch.name)
            .bind(&branch.address)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::BranchNotFound(branch.id).into());
        }
        Ok(branch)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Branch>> {
        let mut conn = self.pool.acquire().await?;
        load_branch(&mut conn, id).await
    }

    pub async fn list(&self) -> DbResult<Vec<Branch>> {
        let rows =
            sqlx::query_as::<_, BranchRow>("SELECT id, name, address FROM branches ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
