//! Core types and billing rules for meter billing.
//!
//! This crate provides the pieces of the billing system that have real
//! invariants, with no I/O:
//!
//! - **Identifiers**: `ReadingId`, `PaymentId`
//! - **Readings**: `MeterReading`, `PaymentStatus`, `ReadingDraft`, `ReadingUpdate`
//! - **Payments**: `PaymentRecord`, `PaymentInput`, `StatusChange`
//! - **Calculator**: `compute_billing` turns meter values and a rate into an amount owed
//! - **Ledger**: `apply_payment` / `force_status` keep paid amount and status consistent
//!
//! # Money
//!
//! Amounts are `rust_decimal::Decimal`, rounded to two places
//! ([`billing::MONEY_SCALE`]) so totals never drift the way binary floats do.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod billing;
pub mod error;
pub mod ids;
pub mod ledger;
pub mod payment;
pub mod reading;

pub use billing::{compute_billing, round_money, Billing, MONEY_SCALE};
pub use error::{BillingError, Result};
pub use ids::{IdError, PaymentId, ReadingId};
pub use ledger::{
    apply_payment, default_status_note, derive_status, force_status, validate_payment_amount,
    ForcedSettlement, Settlement, SYNTHETIC_PAYMENT_METHOD,
};
pub use payment::{PaymentInput, PaymentRecord, StatusChange};
pub use reading::{MeterReading, PaymentStatus, ReadingDraft, ReadingUpdate};
