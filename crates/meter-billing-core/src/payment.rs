//! Payment record types.
//!
//! Payment records are append-only. They are linked to a reading by id only;
//! a reading does not hold its records.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::{PaymentId, ReadingId};
use crate::reading::PaymentStatus;

/// A persisted payment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Store-assigned identifier.
    pub id: PaymentId,

    /// The reading this payment applies to.
    pub meter_reading_id: ReadingId,

    /// Amount applied.
    pub amount: Decimal,

    /// When the payment was made.
    pub payment_date: NaiveDate,

    /// How it was paid (free form, e.g. "cash", "bank_transfer").
    pub payment_method: String,

    /// Operator notes.
    pub notes: String,

    /// When the record was appended.
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied fields for a payment (`POST /api/payments`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInput {
    /// The reading being paid.
    pub meter_reading_id: ReadingId,
    /// Amount paid.
    pub amount: Decimal,
    /// When it was paid.
    pub payment_date: NaiveDate,
    /// How it was paid.
    pub method: String,
    /// Optional notes.
    #[serde(default)]
    pub notes: String,
}

/// An operator's forced status change (`PUT /api/readings/:id/payment-status`).
///
/// `paid_amount` is only meaningful for a `partial` status; it is ignored for
/// `paid` and `unpaid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    /// Status to force.
    #[serde(rename = "payment_status")]
    pub status: PaymentStatus,

    /// New paid amount for a `partial` status.
    #[serde(rename = "paid_amount", default, skip_serializing_if = "Option::is_none")]
    pub partial_amount: Option<Decimal>,

    /// Date of the synthetic record, defaults to today.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<NaiveDate>,

    /// Notes of the synthetic record, defaults to a generated note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl StatusChange {
    /// A bare status change with every optional field left to its default.
    #[must_use]
    pub const fn to(status: PaymentStatus) -> Self {
        Self {
            status,
            partial_amount: None,
            payment_date: None,
            notes: None,
        }
    }

    /// Set the amount for a `partial` status.
    #[must_use]
    pub fn with_partial_amount(mut self, amount: Decimal) -> Self {
        self.partial_amount = Some(amount);
        self
    }
}
