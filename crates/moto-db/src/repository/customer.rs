//! # Customer Repository
//!
//! Customer records. Loyalty points and the last service visit are also
//! written by the sale and work-order repositories, inside their own
//! transactions, through the helpers here.

use chrono::{DateTime, NaiveDate, Utc};
use moto_core::customer::{apply_customer_update, build_customer, due_for_oil_change};
use moto_core::{BookSettings, CoreError, Customer, NewCustomer};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::info;

use crate::error::DbResult;

const CUSTOMER_COLUMNS: &str = "id, name, phone, vehicle, license_plate, loyalty_points, \
     last_service_odometer, last_service_date, created_at";

#[derive(Debug, FromRow)]
struct CustomerRow {
    id: String,
    name: String,
    phone: String,
    vehicle: Option<String>,
    license_plate: Option<String>,
    loyalty_points: i64,
    last_service_odometer: Option<i64>,
    last_service_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            name: row.name,
            phone: row.phone,
            vehicle: row.vehicle,
            license_plate: row.license_plate,
            loyalty_points: row.loyalty_points,
            last_service_odometer: row.last_service_odometer,
            last_service_date: row.last_service_date,
            created_at: row.created_at,
        }
    }
}

pub(crate) async fn load_customer(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<Customer>> {
    let sql = format!("SELECT {} FROM customers WHERE id = ?1", CUSTOMER_COLUMNS);
    let row = sqlx::query_as::<_, CustomerRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(Into::into))
}

/// Writes back every mutable field of a customer.
pub(crate) async fn store_customer(conn: &mut SqliteConnection, customer: &Customer) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE customers SET
            name = ?2, phone = ?3, vehicle = ?4, license_plate = ?5,
            loyalty_points = ?6, last_service_odometer = ?7, last_service_date = ?8
        WHERE id = ?1
        "#,
    )
    .bind(&customer.id)
    .bind(&customer.name)
    .bind(&customer.phone)
    .bind(&customer.vehicle)
    .bind(&customer.license_plate)
    .bind(customer.loyalty_points)
    .bind(customer.last_service_odometer)
    .bind(customer.last_service_date)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Repository for customers.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
    settings: BookSettings,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool, settings: BookSettings) -> Self {
        CustomerRepository { pool, settings }
    }

    pub async fn create(&self, draft: NewCustomer) -> DbResult<Customer> {
        let customer = build_customer(draft)?;

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, name, phone, vehicle, license_plate, loyalty_points,
                last_service_odometer, last_service_date, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.vehicle)
        .bind(&customer.license_plate)
        .bind(customer.loyalty_points)
        .bind(customer.last_service_odometer)
        .bind(customer.last_service_date)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await?;

        info!(id = %customer.id, name = %customer.name, "Customer created");
        Ok(customer)
    }

    /// Overwrites the editable fields. Loyalty points are kept.
    pub async fn update(&self, id: &str, draft: NewCustomer) -> DbResult<Customer> {
        let mut tx = self.pool.begin().await?;
        let mut customer = load_customer(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(id.to_string()))?;
        apply_customer_update(&mut customer, draft)?;
        store_customer(&mut tx, &customer).await?;
        tx.commit().await?;
        Ok(customer)
    }

    /// Removes a customer. Sales and work orders keep the name they
    /// recorded and lose the reference.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM customers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::CustomerNotFound(id.to_string()).into());
        }
        info!(id = %id, "Customer deleted");
        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        load_customer(&mut conn, id).await
    }

    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let sql = format!("SELECT {} FROM customers ORDER BY name", CUSTOMER_COLUMNS);
        let rows = sqlx::query_as::<_, CustomerRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Finds customers by name, phone or license plate.
    pub async fn search(&self, query: &str, limit: i64) -> DbResult<Vec<Customer>> {
        let pattern = format!("%{}%", query.trim());
        let sql = format!(
            r#"
            SELECT {} FROM customers
            WHERE name LIKE ?1 OR phone LIKE ?1 OR license_plate LIKE ?1
            ORDER BY name
            LIMIT ?2
            "#,
            CUSTOMER_COLUMNS
        );
        let rows = sqlx::query_as::<_, CustomerRow>(&sql)
            .bind(&pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Customers whose last service is older than the oil-change interval,
    /// or who have a vehicle but no service on record.
    pub async fn due_for_oil_change(&self, today: NaiveDate) -> DbResult<Vec<Customer>> {
        let interval = self.settings.oil_change_interval_days;
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|c| due_for_oil_change(c, today, interval))
            .collect())
    }
}
