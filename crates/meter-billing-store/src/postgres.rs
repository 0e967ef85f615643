//! PostgreSQL storage implementation.
//!
//! Each trait method is a single statement or a single transaction, so each
//! call is atomic on its own. The settlement update is conditional on the row
//! version, which is what keeps concurrent payments from overwriting each
//! other.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;

use meter_billing_core::{MeterReading, PaymentRecord, PaymentStatus, ReadingId, Settlement};

use crate::error::{Result, StoreError};
use crate::schema::{bootstrap_statements, PAYMENT_COLUMNS, READING_COLUMNS};
use crate::{BilledReading, NewPayment, PaymentStore, ReadingStore};

/// SQLSTATE of a foreign-key violation.
const FOREIGN_KEY_VIOLATION: &str = "23503";

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION)
    )
}

fn settlement_sql() -> String {
    format!(
        "UPDATE meter_readings \
         SET paid_amount = $1, payment_status = $2, \
             version = version + 1, updated_at = now() \
         WHERE id = $3 AND version = $4 \
         RETURNING {READING_COLUMNS}"
    )
}

fn insert_payment_sql() -> String {
    format!(
        "INSERT INTO payment_records \
           (meter_reading_id, amount, payment_date, payment_method, notes) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING {PAYMENT_COLUMNS}"
    )
}

/// PostgreSQL-backed storage implementation.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect a pool to `database_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be reached.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        tracing::info!(max_connections, "Connecting to PostgreSQL");

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(database_url)
            .await?;

        tracing::info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the tables if they do not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if a statement fails.
    pub async fn ensure_schema(&self) -> Result<()> {
        for statement in bootstrap_statements() {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::debug!("Schema ensured");
        Ok(())
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("PostgreSQL connection pool closed");
    }

    /// After a conditional update touched zero rows: the version moved, or
    /// the row is gone.
    async fn stale_or_missing<T>(&self, id: ReadingId) -> Result<Option<T>> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM meter_readings WHERE id = $1)")
                .bind(id.as_uuid())
                .fetch_one(&self.pool)
                .await?;

        if exists {
            Ok(None)
        } else {
            Err(StoreError::reading_not_found(id))
        }
    }
}

#[derive(FromRow)]
struct ReadingRow {
    id: uuid::Uuid,
    unit_number: String,
    previous_reading: Decimal,
    current_reading: Decimal,
    units_consumed: Decimal,
    price_per_unit: Decimal,
    total_amount: Decimal,
    reading_date: NaiveDate,
    due_date: NaiveDate,
    paid_amount: Decimal,
    payment_status: String,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ReadingRow> for MeterReading {
    type Error = StoreError;

    fn try_from(row: ReadingRow) -> Result<Self> {
        let payment_status = row
            .payment_status
            .parse::<PaymentStatus>()
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        Ok(Self {
            id: ReadingId::from_uuid(row.id),
            unit_number: row.unit_number,
            previous_reading: row.previous_reading,
            current_reading: row.current_reading,
            units_consumed: row.units_consumed,
            price_per_unit: row.price_per_unit,
            total_amount: row.total_amount,
            reading_date: row.reading_date,
            due_date: row.due_date,
            paid_amount: row.paid_amount,
            payment_status,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct PaymentRow {
    id: uuid::Uuid,
    meter_reading_id: uuid::Uuid,
    amount: Decimal,
    payment_date: NaiveDate,
    payment_method: String,
    notes: String,
    created_at: DateTime<Utc>,
}

impl From<PaymentRow> for PaymentRecord {
    fn from(row: PaymentRow) -> Self {
        Self {
            id: row.id.into(),
            meter_reading_id: row.meter_reading_id.into(),
            amount: row.amount,
            payment_date: row.payment_date,
            payment_method: row.payment_method,
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl ReadingStore for PgStore {
    async fn list_readings(&self) -> Result<Vec<MeterReading>> {
        let sql = format!(
            "SELECT {READING_COLUMNS} FROM meter_readings \
             ORDER BY reading_date DESC, created_at DESC, id DESC"
        );

        sqlx::query_as::<_, ReadingRow>(&sql)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(MeterReading::try_from)
            .collect()
    }

    async fn get_reading(&self, id: ReadingId) -> Result<Option<MeterReading>> {
        let sql = format!("SELECT {READING_COLUMNS} FROM meter_readings WHERE id = $1");

        sqlx::query_as::<_, ReadingRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(MeterReading::try_from)
            .transpose()
    }

    async fn insert_reading(&self, reading: &BilledReading) -> Result<MeterReading> {
        let sql = format!(
            "INSERT INTO meter_readings \
               (unit_number, previous_reading, current_reading, units_consumed, \
                price_per_unit, total_amount, reading_date, due_date, payment_status, paid_amount) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'unpaid', 0) \
             RETURNING {READING_COLUMNS}"
        );

        let row = sqlx::query_as::<_, ReadingRow>(&sql)
            .bind(&reading.unit_number)
            .bind(reading.previous_reading)
            .bind(reading.current_reading)
            .bind(reading.units_consumed)
            .bind(reading.price_per_unit)
            .bind(reading.total_amount)
            .bind(reading.reading_date)
            .bind(reading.due_date)
            .fetch_one(&self.pool)
            .await?;

        let reading = MeterReading::try_from(row)?;
        tracing::debug!(reading_id = %reading.id, "Meter reading inserted");
        Ok(reading)
    }

    async fn update_billing(
        &self,
        id: ReadingId,
        reading: &BilledReading,
    ) -> Result<MeterReading> {
        let sql = format!(
            "UPDATE meter_readings \
             SET unit_number = $1, previous_reading = $2, current_reading = $3, \
                 units_consumed = $4, price_per_unit = $5, total_amount = $6, \
                 reading_date = $7, due_date = $8, \
                 version = version + 1, updated_at = now() \
             WHERE id = $9 \
             RETURNING {READING_COLUMNS}"
        );

        sqlx::query_as::<_, ReadingRow>(&sql)
            .bind(&reading.unit_number)
            .bind(reading.previous_reading)
            .bind(reading.current_reading)
            .bind(reading.units_consumed)
            .bind(reading.price_per_unit)
            .bind(reading.total_amount)
            .bind(reading.reading_date)
            .bind(reading.due_date)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::reading_not_found(id))
            .and_then(MeterReading::try_from)
    }

    async fn update_settlement(
        &self,
        id: ReadingId,
        expected_version: i64,
        settlement: Settlement,
    ) -> Result<Option<MeterReading>> {
        let row = sqlx::query_as::<_, ReadingRow>(&settlement_sql())
            .bind(settlement.paid_amount)
            .bind(settlement.payment_status.as_str())
            .bind(id.as_uuid())
            .bind(expected_version)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => MeterReading::try_from(row).map(Some),
            None => self.stale_or_missing(id).await,
        }
    }

    async fn settle_with_payment(
        &self,
        id: ReadingId,
        expected_version: i64,
        settlement: Settlement,
        payment: &NewPayment,
    ) -> Result<Option<(MeterReading, PaymentRecord)>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ReadingRow>(&settlement_sql())
            .bind(settlement.paid_amount)
            .bind(settlement.payment_status.as_str())
            .bind(id.as_uuid())
            .bind(expected_version)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return self.stale_or_missing(id).await;
        };
        let reading = MeterReading::try_from(row)?;

        let record = sqlx::query_as::<_, PaymentRow>(&insert_payment_sql())
            .bind(payment.meter_reading_id.as_uuid())
            .bind(payment.amount)
            .bind(payment.payment_date)
            .bind(&payment.payment_method)
            .bind(&payment.notes)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::debug!(
            reading_id = %reading.id,
            version = reading.version,
            "Settlement and payment record committed"
        );

        Ok(Some((reading, record.into())))
    }

    async fn delete_reading(&self, id: ReadingId) -> Result<()> {
        let result = sqlx::query("DELETE FROM meter_readings WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    StoreError::payments_exist(id)
                } else {
                    e.into()
                }
            })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::reading_not_found(id));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentStore for PgStore {
    async fn insert_payment(&self, payment: &NewPayment) -> Result<PaymentRecord> {
        let row = sqlx::query_as::<_, PaymentRow>(&insert_payment_sql())
            .bind(payment.meter_reading_id.as_uuid())
            .bind(payment.amount)
            .bind(payment.payment_date)
            .bind(&payment.payment_method)
            .bind(&payment.notes)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    StoreError::reading_not_found(payment.meter_reading_id)
                } else {
                    e.into()
                }
            })?;

        Ok(row.into())
    }

    async fn list_payments(&self, reading_id: ReadingId) -> Result<Vec<PaymentRecord>> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payment_records \
             WHERE meter_reading_id = $1 \
             ORDER BY payment_date DESC, created_at DESC, id DESC"
        );

        let rows = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(reading_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(PaymentRecord::from).collect())
    }

    async fn has_payments(&self, reading_id: ReadingId) -> Result<bool> {
        let exists = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM payment_records WHERE meter_reading_id = $1)",
        )
        .bind(reading_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    async fn connect() -> PgStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let store = PgStore::connect(&url, 2).await.unwrap();
        store.ensure_schema().await.unwrap();
        store
    }

    fn billed() -> BilledReading {
        BilledReading {
            unit_number: "PG-1".into(),
            previous_reading: dec!(100),
            current_reading: dec!(150),
            units_consumed: dec!(50),
            price_per_unit: dec!(20),
            total_amount: dec!(1000),
            reading_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2024, 5, 15).unwrap(),
        }
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL pointing at a PostgreSQL instance"]
    async fn settlement_update_is_version_checked() {
        let store = connect().await;
        let row = store.insert_reading(&billed()).await.unwrap();
        let settlement = Settlement {
            paid_amount: dec!(400),
            payment_status: PaymentStatus::Partial,
        };

        let first = store.update_settlement(row.id, row.version, settlement).await.unwrap();
        assert_eq!(first.unwrap().version, row.version + 1);

        let stale = store.update_settlement(row.id, row.version, settlement).await.unwrap();
        assert!(stale.is_none());

        store.delete_reading(row.id).await.unwrap();
        assert!(matches!(
            store.update_settlement(row.id, 0, settlement).await,
            Err(StoreError::NotFound { .. })
        ));
        store.close().await;
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL pointing at a PostgreSQL instance"]
    async fn payments_round_trip_through_the_table() {
        let store = connect().await;
        let row = store.insert_reading(&billed()).await.unwrap();

        let record = store
            .insert_payment(&NewPayment {
                meter_reading_id: row.id,
                amount: dec!(250.50),
                payment_date: row.reading_date,
                payment_method: "cash".into(),
                notes: "first".into(),
            })
            .await
            .unwrap();

        assert_eq!(record.amount, dec!(250.50));
        assert!(store.has_payments(row.id).await.unwrap());
        assert_eq!(store.list_payments(row.id).await.unwrap(), vec![record]);
        // Foreign key: a reading with history cannot be deleted.
        assert!(matches!(
            store.delete_reading(row.id).await,
            Err(StoreError::Conflict(_))
        ));
        store.close().await;
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL pointing at a PostgreSQL instance"]
    async fn stale_settlement_appends_no_record() {
        let store = connect().await;
        let row = store.insert_reading(&billed()).await.unwrap();
        let settlement = Settlement {
            paid_amount: dec!(300),
            payment_status: PaymentStatus::Partial,
        };
        let payment = NewPayment {
            meter_reading_id: row.id,
            amount: dec!(300),
            payment_date: row.reading_date,
            payment_method: "cash".into(),
            notes: String::new(),
        };

        let (reading, record) = store
            .settle_with_payment(row.id, row.version, settlement, &payment)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reading.paid_amount, dec!(300));

        let stale = store
            .settle_with_payment(row.id, row.version, settlement, &payment)
            .await
            .unwrap();
        assert!(stale.is_none());
        assert_eq!(store.list_payments(row.id).await.unwrap(), vec![record]);
        store.close().await;
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL pointing at a PostgreSQL instance"]
    async fn payment_for_missing_reading_is_not_found() {
        let store = connect().await;

        let result = store
            .insert_payment(&NewPayment {
                meter_reading_id: ReadingId::generate(),
                amount: dec!(10),
                payment_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                payment_method: "cash".into(),
                notes: String::new(),
            })
            .await;

        assert!(matches!(result, Err(StoreError::NotFound { .. })));
        store.close().await;
    }
}
