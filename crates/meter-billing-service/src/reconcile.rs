//! Reconciliation service.
//!
//! Orchestrates the consumption calculator and the payment ledger against the
//! reading and payment stores. Every operation is request/response and keeps
//! no state between calls; the stores are the only shared resource.
//!
//! # Settlement writes
//!
//! `paid_amount` / `payment_status` on a reading are a cache over its payment
//! records. They are only ever written with a version-conditional update: the
//! settlement is computed from the row as read, and if another writer got in
//! first the row is re-read and the settlement recomputed. Two concurrent
//! payments therefore both land in the running total.
//!
//! A payment record is appended by the same conditional write that folds it
//! into the settlement. A lost race or an exhausted retry budget writes
//! neither, so a caller told to try again never books a payment twice.
//!
//! # Errors
//!
//! Failures come back as a [`ServiceError`] with a machine-readable kind.
//! Store failures are logged here and reduced to a generic message; the
//! underlying error never reaches the caller.

use std::sync::Arc;

use chrono::Utc;

use meter_billing_core::{
    apply_payment, default_status_note, force_status, round_money, validate_payment_amount,
    BillingError, MeterReading, PaymentInput, PaymentRecord, ReadingDraft, ReadingId,
    ReadingUpdate, Settlement, StatusChange, SYNTHETIC_PAYMENT_METHOD,
};
use meter_billing_store::{BilledReading, NewPayment, PaymentStore, ReadingStore, StoreError};

/// Default number of re-reads after a lost settlement race.
pub const DEFAULT_SETTLEMENT_RETRIES: u32 = 32;

/// Errors returned by the reconciliation service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// Malformed or out-of-range input. Nothing was written.
    #[error("{0}")]
    Validation(String),

    /// The targeted reading does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The operation conflicts with the current state (payment history on
    /// delete, settlement retries exhausted).
    #[error("{0}")]
    Conflict(String),

    /// The store failed. The message is generic; the cause is in the logs.
    #[error("{0}")]
    Store(String),
}

impl ServiceError {
    /// Machine-readable error kind.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Store(_) => "internal_error",
        }
    }
}

impl From<BillingError> for ServiceError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::ReadingNotFound { .. } => Self::NotFound(err.to_string()),
            BillingError::Validation { .. } | BillingError::InvalidId(_) => {
                Self::Validation(err.to_string())
            }
        }
    }
}

/// Map a store error, logging the cause of anything but a missing row.
fn store_failure(context: &'static str) -> impl FnOnce(StoreError) -> ServiceError {
    move |err| match err {
        StoreError::NotFound { .. } => ServiceError::NotFound(err.to_string()),
        StoreError::Conflict(reason) => ServiceError::Conflict(reason),
        StoreError::Database(_) | StoreError::Decode(_) => {
            tracing::error!(error = %err, operation = context, "Store operation failed");
            ServiceError::Store(context.to_string())
        }
    }
}

/// Result type for reconciliation operations.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// The billing and payment-reconciliation operations.
#[derive(Clone)]
pub struct ReconciliationService {
    readings: Arc<dyn ReadingStore>,
    payments: Arc<dyn PaymentStore>,
    max_settlement_retries: u32,
}

impl ReconciliationService {
    /// Create a service over the given stores.
    #[must_use]
    pub fn new(readings: Arc<dyn ReadingStore>, payments: Arc<dyn PaymentStore>) -> Self {
        Self {
            readings,
            payments,
            max_settlement_retries: DEFAULT_SETTLEMENT_RETRIES,
        }
    }

    /// Set how many times a lost settlement race is retried before giving up.
    #[must_use]
    pub fn with_max_settlement_retries(mut self, retries: u32) -> Self {
        self.max_settlement_retries = retries;
        self
    }

    /// All readings, newest reading date first.
    pub async fn list_readings(&self) -> ServiceResult<Vec<MeterReading>> {
        self.readings
            .list_readings()
            .await
            .map_err(store_failure("Failed to fetch meter readings"))
    }

    /// One reading.
    pub async fn get_reading(&self, id: ReadingId) -> ServiceResult<MeterReading> {
        self.require_reading(id, "Failed to fetch meter reading")
            .await
    }

    /// Bill and insert a new reading, unpaid.
    pub async fn create_reading(&self, draft: &ReadingDraft) -> ServiceResult<MeterReading> {
        let billing = draft.bill()?;
        if billing.clamped {
            tracing::warn!(
                unit_number = %draft.unit_number,
                previous_reading = %draft.previous_reading,
                current_reading = %draft.current_reading,
                "Current reading below previous reading, consumption clamped to zero"
            );
        }

        let reading = self
            .readings
            .insert_reading(&BilledReading::new(draft, &billing))
            .await
            .map_err(store_failure("Failed to add meter reading"))?;

        tracing::info!(
            reading_id = %reading.id,
            unit_number = %reading.unit_number,
            total_amount = %reading.total_amount,
            "Meter reading created"
        );

        Ok(reading)
    }

    /// Merge `update` onto a reading and re-bill it.
    ///
    /// Absent fields keep their stored value. A `payment_status` in the
    /// update goes through [`Self::set_payment_status`]; the settlement is
    /// never overwritten directly. Everything is validated before the first
    /// write.
    pub async fn edit_reading(
        &self,
        id: ReadingId,
        update: &ReadingUpdate,
    ) -> ServiceResult<MeterReading> {
        const CONTEXT: &str = "Failed to update meter reading";

        let mut reading = self.require_reading(id, CONTEXT).await?;

        let billed = if update.has_billing_fields() {
            let draft = update.merge_onto(reading.draft());
            let billing = draft.bill()?;
            if billing.clamped {
                tracing::warn!(
                    reading_id = %id,
                    unit_number = %draft.unit_number,
                    "Current reading below previous reading, consumption clamped to zero"
                );
            }
            Some(BilledReading::new(&draft, &billing))
        } else {
            None
        };

        let status_change = update.payment_status.map(|status| StatusChange {
            status,
            partial_amount: update.paid_amount,
            payment_date: None,
            notes: None,
        });

        if let Some(change) = &status_change {
            let total_amount = billed
                .as_ref()
                .map_or(reading.total_amount, |b| b.total_amount);
            force_status(
                total_amount,
                reading.paid_amount,
                change.status,
                change.partial_amount,
            )?;
        }

        if let Some(billed) = &billed {
            reading = self
                .readings
                .update_billing(id, billed)
                .await
                .map_err(store_failure(CONTEXT))?;

            tracing::info!(
                reading_id = %id,
                total_amount = %reading.total_amount,
                "Meter reading updated"
            );
        }

        if let Some(change) = &status_change {
            reading = self.set_payment_status(id, change).await?;
        }

        Ok(reading)
    }

    /// Delete a reading that has no payment history.
    pub async fn delete_reading(&self, id: ReadingId) -> ServiceResult<()> {
        const CONTEXT: &str = "Failed to delete meter reading";

        let has_payments = self
            .payments
            .has_payments(id)
            .await
            .map_err(store_failure(CONTEXT))?;
        if has_payments {
            return Err(ServiceError::Conflict(format!(
                "meter reading {id} has payment records and cannot be deleted"
            )));
        }

        self.readings
            .delete_reading(id)
            .await
            .map_err(store_failure(CONTEXT))?;

        tracing::info!(reading_id = %id, "Meter reading deleted");
        Ok(())
    }

    /// Append a payment and fold it into the reading's settlement.
    ///
    /// The record and the settlement are written together; on any error
    /// neither is stored.
    pub async fn record_payment(&self, input: &PaymentInput) -> ServiceResult<PaymentRecord> {
        const CONTEXT: &str = "Failed to add payment";

        validate_payment_amount(input.amount)?;
        let reading = self
            .require_reading(input.meter_reading_id, CONTEXT)
            .await?;

        let payment = NewPayment {
            meter_reading_id: input.meter_reading_id,
            amount: round_money(input.amount),
            payment_date: input.payment_date,
            payment_method: input.method.clone(),
            notes: input.notes.clone(),
        };

        let (reading, record) = self
            .settle(reading, CONTEXT, |r| {
                let settlement = apply_payment(r.total_amount, r.paid_amount, payment.amount)?;
                Ok((settlement, Some(payment.clone())))
            })
            .await?;
        let record = record.ok_or_else(|| ServiceError::Store(CONTEXT.to_string()))?;

        tracing::info!(
            reading_id = %reading.id,
            payment_id = %record.id,
            amount = %record.amount,
            paid_amount = %reading.paid_amount,
            payment_status = %reading.payment_status,
            "Payment recorded"
        );

        Ok(record)
    }

    /// Force a reading's payment status (operator override).
    ///
    /// A positive difference between the new and the old paid amount is
    /// booked as a synthetic payment record, dated `change.payment_date` or
    /// today, in the same write as the settlement. A retried race never
    /// books it twice.
    pub async fn set_payment_status(
        &self,
        id: ReadingId,
        change: &StatusChange,
    ) -> ServiceResult<MeterReading> {
        const CONTEXT: &str = "Failed to update payment status";

        let reading = self.require_reading(id, CONTEXT).await?;

        let (reading, synthetic) = self
            .settle(reading, CONTEXT, |r| {
                let forced =
                    force_status(r.total_amount, r.paid_amount, change.status, change.partial_amount)?;
                let payment = forced.synthetic_payment.map(|amount| NewPayment {
                    meter_reading_id: id,
                    amount,
                    payment_date: change
                        .payment_date
                        .unwrap_or_else(|| Utc::now().date_naive()),
                    payment_method: SYNTHETIC_PAYMENT_METHOD.to_string(),
                    notes: change
                        .notes
                        .clone()
                        .unwrap_or_else(|| default_status_note(change.status)),
                });
                Ok((forced.settlement, payment))
            })
            .await?;

        if let Some(record) = &synthetic {
            tracing::info!(
                reading_id = %id,
                payment_id = %record.id,
                amount = %record.amount,
                "Synthetic payment recorded for forced status"
            );
        }

        if !reading.settlement().is_consistent_with(reading.total_amount) {
            tracing::warn!(
                reading_id = %id,
                paid_amount = %reading.paid_amount,
                total_amount = %reading.total_amount,
                payment_status = %reading.payment_status,
                "Payment status forced against the paid amount"
            );
        }

        tracing::info!(
            reading_id = %id,
            payment_status = %reading.payment_status,
            paid_amount = %reading.paid_amount,
            "Payment status set"
        );

        Ok(reading)
    }

    /// Payment records of a reading, newest payment date first.
    pub async fn list_payments(&self, id: ReadingId) -> ServiceResult<Vec<PaymentRecord>> {
        const CONTEXT: &str = "Failed to fetch payments";

        self.require_reading(id, CONTEXT).await?;
        self.payments
            .list_payments(id)
            .await
            .map_err(store_failure(CONTEXT))
    }

    async fn require_reading(
        &self,
        id: ReadingId,
        context: &'static str,
    ) -> ServiceResult<MeterReading> {
        self.readings
            .get_reading(id)
            .await
            .map_err(store_failure(context))?
            .ok_or_else(|| {
                BillingError::ReadingNotFound {
                    reading_id: id.to_string(),
                }
                .into()
            })
    }

    /// Compute a settlement from `reading` and write it, together with the
    /// payment record that moved it, if the row has not moved; otherwise
    /// re-read and recompute.
    async fn settle<F>(
        &self,
        mut reading: MeterReading,
        context: &'static str,
        compute: F,
    ) -> ServiceResult<(MeterReading, Option<PaymentRecord>)>
    where
        F: Fn(&MeterReading) -> meter_billing_core::Result<(Settlement, Option<NewPayment>)>,
    {
        for attempt in 0..=self.max_settlement_retries {
            let (settlement, payment) = compute(&reading)?;

            let written = match &payment {
                Some(payment) => self
                    .readings
                    .settle_with_payment(reading.id, reading.version, settlement, payment)
                    .await
                    .map(|won| won.map(|(updated, record)| (updated, Some(record)))),
                None => self
                    .readings
                    .update_settlement(reading.id, reading.version, settlement)
                    .await
                    .map(|won| won.map(|updated| (updated, None))),
            }
            .map_err(store_failure(context))?;

            match written {
                Some(written) => return Ok(written),
                None => {
                    tracing::debug!(
                        reading_id = %reading.id,
                        version = reading.version,
                        attempt,
                        "Settlement raced with another writer, retrying"
                    );
                    tokio::task::yield_now().await;
                    reading = self.require_reading(reading.id, context).await?;
                }
            }
        }

        tracing::error!(
            reading_id = %reading.id,
            retries = self.max_settlement_retries,
            "Settlement retries exhausted"
        );
        Err(ServiceError::Conflict(format!(
            "meter reading {} is being updated concurrently, try again",
            reading.id
        )))
    }
}
