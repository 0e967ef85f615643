//! Meter reading types.
//!
//! A [`MeterReading`] is one measurement event for a rental unit. It carries
//! the billed amount (derived by [`crate::billing`]) and a cached settlement
//! (`paid_amount` + `payment_status`) maintained by [`crate::ledger`].

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::billing::{self, Billing};
use crate::error::{BillingError, Result};
use crate::ids::ReadingId;
use crate::ledger::Settlement;

/// Payment state of a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Nothing paid yet (or forced back to unpaid by an operator).
    Unpaid,

    /// Something paid, less than the total.
    Partial,

    /// Paid in full.
    Paid,
}

impl PaymentStatus {
    /// Get the status as its wire string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Partial => "partial",
            Self::Paid => "paid",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = BillingError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(Self::Unpaid),
            "partial" => Ok(Self::Partial),
            "paid" => Ok(Self::Paid),
            other => Err(BillingError::validation(
                "payment_status",
                format!("unknown status {other:?}"),
            )),
        }
    }
}

/// A persisted meter reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeterReading {
    /// Store-assigned identifier.
    pub id: ReadingId,

    /// The billed unit.
    pub unit_number: String,

    /// Meter value at the start of the period.
    pub previous_reading: Decimal,

    /// Meter value at the end of the period.
    pub current_reading: Decimal,

    /// Derived: `max(0, current_reading - previous_reading)`.
    pub units_consumed: Decimal,

    /// Rate charged per unit.
    pub price_per_unit: Decimal,

    /// Derived: `units_consumed * price_per_unit`, two decimal places.
    pub total_amount: Decimal,

    /// When the meter was read.
    pub reading_date: NaiveDate,

    /// When payment is due.
    pub due_date: NaiveDate,

    /// Cumulative amount paid against this reading.
    pub paid_amount: Decimal,

    /// Payment status.
    pub payment_status: PaymentStatus,

    /// Row version, bumped on every write. Settlement updates are
    /// conditional on it.
    pub version: i64,

    /// When the reading was created.
    pub created_at: DateTime<Utc>,

    /// When the reading was last updated.
    pub updated_at: DateTime<Utc>,
}

impl MeterReading {
    /// The cached settlement of this reading.
    #[must_use]
    pub const fn settlement(&self) -> Settlement {
        Settlement {
            paid_amount: self.paid_amount,
            payment_status: self.payment_status,
        }
    }

    /// Amount still owed, never negative.
    #[must_use]
    pub fn outstanding(&self) -> Decimal {
        (self.total_amount - self.paid_amount).max(Decimal::ZERO)
    }

    /// The billing inputs of this reading, for merging an update onto.
    #[must_use]
    pub fn draft(&self) -> ReadingDraft {
        ReadingDraft {
            unit_number: self.unit_number.clone(),
            previous_reading: self.previous_reading,
            current_reading: self.current_reading,
            price_per_unit: self.price_per_unit,
            reading_date: self.reading_date,
            due_date: self.due_date,
        }
    }
}

/// Caller-supplied fields for a new reading (`POST /api/readings`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingDraft {
    /// The billed unit.
    pub unit_number: String,
    /// Meter value at the start of the period.
    pub previous_reading: Decimal,
    /// Meter value at the end of the period.
    pub current_reading: Decimal,
    /// Rate charged per unit.
    pub price_per_unit: Decimal,
    /// When the meter was read.
    pub reading_date: NaiveDate,
    /// When payment is due.
    pub due_date: NaiveDate,
}

impl ReadingDraft {
    /// Validate the draft and run the consumption calculator on it.
    ///
    /// # Errors
    ///
    /// Returns `BillingError::Validation` for a blank unit number or any
    /// calculator rejection.
    pub fn bill(&self) -> Result<Billing> {
        if self.unit_number.trim().is_empty() {
            return Err(BillingError::validation("unitNumber", "must not be blank"));
        }
        billing::compute_billing(
            self.previous_reading,
            self.current_reading,
            self.price_per_unit,
        )
    }
}

/// Partial update of a reading (`PUT /api/readings/:id`).
///
/// Absent fields keep the stored value. The payment fields are not written
/// directly; they are applied through the forced-status ledger path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingUpdate {
    /// New unit number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_number: Option<String>,
    /// New previous meter value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_reading: Option<Decimal>,
    /// New current meter value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_reading: Option<Decimal>,
    /// New rate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_per_unit: Option<Decimal>,
    /// New reading date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading_date: Option<NaiveDate>,
    /// New due date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    /// Forced payment status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    /// Paid amount to go with a forced `partial` status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_amount: Option<Decimal>,
}

impl ReadingUpdate {
    /// Merge the present fields onto `base`.
    #[must_use]
    pub fn merge_onto(&self, base: ReadingDraft) -> ReadingDraft {
        ReadingDraft {
            unit_number: self.unit_number.clone().unwrap_or(base.unit_number),
            previous_reading: self.previous_reading.unwrap_or(base.previous_reading),
            current_reading: self.current_reading.unwrap_or(base.current_reading),
            price_per_unit: self.price_per_unit.unwrap_or(base.price_per_unit),
            reading_date: self.reading_date.unwrap_or(base.reading_date),
            due_date: self.due_date.unwrap_or(base.due_date),
        }
    }

    /// Whether the update touches any billing field.
    #[must_use]
    pub const fn has_billing_fields(&self) -> bool {
        self.unit_number.is_some()
            || self.previous_reading.is_some()
            || self.current_reading.is_some()
            || self.price_per_unit.is_some()
            || self.reading_date.is_some()
            || self.due_date.is_some()
    }
}
