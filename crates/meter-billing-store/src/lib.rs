//! Storage layer for meter billing.
//!
//! The billing core consumes two stores:
//!
//! - a **reading store**: CRUD over meter readings, with a conditional
//!   settlement update keyed on the row version
//! - a **payment store**: append-only payment records
//!
//! Each call is atomic on its own; nothing here spans calls. A payment that
//! moves a settlement is appended by the same conditional write, so a record
//! never exists without its contribution to `paid_amount`. Two backends
//! implement both traits:
//!
//! - [`PgStore`]: PostgreSQL via `sqlx`
//! - [`MemoryStore`]: process-local maps, for development and tests
//!
//! # Example
//!
//! ```no_run
//! use meter_billing_store::{MemoryStore, ReadingStore};
//!
//! # async fn example() -> meter_billing_store::Result<()> {
//! let store = MemoryStore::new();
//! let readings = store.list_readings().await?;
//! assert!(readings.is_empty());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod postgres;
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use meter_billing_core::{
    Billing, MeterReading, PaymentRecord, ReadingDraft, ReadingId, Settlement,
};

/// The billing columns of a reading, as written by create and edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BilledReading {
    /// The billed unit.
    pub unit_number: String,
    /// Meter value at the start of the period.
    pub previous_reading: Decimal,
    /// Meter value at the end of the period.
    pub current_reading: Decimal,
    /// Units consumed.
    pub units_consumed: Decimal,
    /// Rate charged per unit.
    pub price_per_unit: Decimal,
    /// Amount owed.
    pub total_amount: Decimal,
    /// When the meter was read.
    pub reading_date: NaiveDate,
    /// When payment is due.
    pub due_date: NaiveDate,
}

impl BilledReading {
    /// Combine a validated draft with its calculator output.
    #[must_use]
    pub fn new(draft: &ReadingDraft, billing: &Billing) -> Self {
        Self {
            unit_number: draft.unit_number.trim().to_string(),
            previous_reading: draft.previous_reading,
            current_reading: draft.current_reading,
            units_consumed: billing.units_consumed,
            price_per_unit: draft.price_per_unit,
            total_amount: billing.total_amount,
            reading_date: draft.reading_date,
            due_date: draft.due_date,
        }
    }
}

/// A payment record to append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    /// The reading being paid.
    pub meter_reading_id: ReadingId,
    /// Amount applied.
    pub amount: Decimal,
    /// When it was paid.
    pub payment_date: NaiveDate,
    /// How it was paid.
    pub payment_method: String,
    /// Operator notes.
    pub notes: String,
}

/// Durable storage of meter readings.
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// List all readings, newest reading date first.
    ///
    /// Ties are broken by creation time, then id, both descending.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_readings(&self) -> Result<Vec<MeterReading>>;

    /// Get a reading by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_reading(&self, id: ReadingId) -> Result<Option<MeterReading>>;

    /// Insert a reading. The store assigns the id, starts the version at 0
    /// and the settlement at unpaid / 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn insert_reading(&self, reading: &BilledReading) -> Result<MeterReading>;

    /// Overwrite the billing columns of a reading, leaving its settlement
    /// untouched. Bumps the version.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no row has this id.
    async fn update_billing(&self, id: ReadingId, reading: &BilledReading)
        -> Result<MeterReading>;

    /// Write a settlement if the row is still at `expected_version`.
    ///
    /// Returns `None` when the version has moved on (someone else wrote the
    /// row since it was read). Bumps the version on success.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no row has this id.
    async fn update_settlement(
        &self,
        id: ReadingId,
        expected_version: i64,
        settlement: Settlement,
    ) -> Result<Option<MeterReading>>;

    /// Like [`update_settlement`](Self::update_settlement), and append
    /// `payment` in the same atomic write.
    ///
    /// Returns `None` with nothing written when the version has moved on.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no row has this id.
    async fn settle_with_payment(
        &self,
        id: ReadingId,
        expected_version: i64,
        settlement: Settlement,
        payment: &NewPayment,
    ) -> Result<Option<(MeterReading, PaymentRecord)>>;

    /// Delete a reading.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no row has this id, and
    /// `StoreError::Conflict` if payment records still point at it.
    async fn delete_reading(&self, id: ReadingId) -> Result<()>;
}

/// Append-only storage of payment records.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Append a payment record. The store assigns the id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the reading does not exist.
    async fn insert_payment(&self, payment: &NewPayment) -> Result<PaymentRecord>;

    /// List the records of a reading, newest payment date first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_payments(&self, reading_id: ReadingId) -> Result<Vec<PaymentRecord>>;

    /// Whether a reading has any payment record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn has_payments(&self, reading_id: ReadingId) -> Result<bool>;
}
