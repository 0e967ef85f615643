//! Payment ledger.
//!
//! Derives a reading's settlement (paid-to-date amount and payment status)
//! from its total and the payment being applied. There are two entry points:
//!
//! - [`apply_payment`]: an organic payment event, always backed by a
//!   [`PaymentRecord`](crate::PaymentRecord) of the same amount.
//! - [`force_status`]: an operator declaring the status directly. It may
//!   require a synthetic record for the positive difference.
//!
//! # Status mapping
//!
//! | paid amount              | status    |
//! |--------------------------|-----------|
//! | `paid >= total`          | `paid`    |
//! | `0 < paid < total`       | `partial` |
//! | `paid == 0`              | `unpaid`  |
//!
//! A forced `unpaid` keeps the paid amount as is, so a reading can be
//! `unpaid` with a positive paid amount. That override is intentional.

use rust_decimal::Decimal;

use crate::billing::round_money;
use crate::error::{BillingError, Result};
use crate::reading::PaymentStatus;

/// Payment method recorded on synthetic records created by a forced status.
pub const SYNTHETIC_PAYMENT_METHOD: &str = "other";

/// Notes recorded on a synthetic record when the operator gave none.
#[must_use]
pub fn default_status_note(status: PaymentStatus) -> String {
    format!("Status updated to {status} by landlord")
}

/// Cached payment state of a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    /// Cumulative amount paid.
    pub paid_amount: Decimal,

    /// Payment status.
    pub payment_status: PaymentStatus,
}

impl Settlement {
    /// Settlement of a freshly created reading.
    pub const UNPAID: Self = Self {
        paid_amount: Decimal::ZERO,
        payment_status: PaymentStatus::Unpaid,
    };

    /// Whether the status agrees with the status mapping for `total_amount`.
    #[must_use]
    pub fn is_consistent_with(&self, total_amount: Decimal) -> bool {
        self.payment_status == derive_status(self.paid_amount, total_amount)
    }
}

/// Map a paid amount against a total to a status.
#[must_use]
pub fn derive_status(paid_amount: Decimal, total_amount: Decimal) -> PaymentStatus {
    if paid_amount >= total_amount {
        PaymentStatus::Paid
    } else if paid_amount > Decimal::ZERO {
        PaymentStatus::Partial
    } else {
        PaymentStatus::Unpaid
    }
}

/// Apply an incremental payment.
///
/// # Errors
///
/// Returns `BillingError::Validation` if `amount` is negative or the running
/// total overflows.
pub fn apply_payment(
    total_amount: Decimal,
    paid_amount: Decimal,
    amount: Decimal,
) -> Result<Settlement> {
    validate_payment_amount(amount)?;

    let paid_amount = paid_amount
        .checked_add(round_money(amount))
        .ok_or_else(|| BillingError::validation("amount", "paid amount overflows"))?;

    Ok(Settlement {
        paid_amount,
        payment_status: derive_status(paid_amount, total_amount),
    })
}

/// Check a payment amount before anything is written.
///
/// # Errors
///
/// Returns `BillingError::Validation` if `amount` is negative.
pub fn validate_payment_amount(amount: Decimal) -> Result<()> {
    if amount < Decimal::ZERO {
        return Err(BillingError::validation("amount", "must not be negative"));
    }
    Ok(())
}

/// Outcome of a forced status set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForcedSettlement {
    /// The settlement to persist.
    pub settlement: Settlement,

    /// Amount of the synthetic payment record to append, if the forced
    /// status raised the paid amount.
    pub synthetic_payment: Option<Decimal>,
}

/// Force a reading's status.
///
/// - `paid`: the paid amount becomes the total; the missing difference (if
///   any) is a synthetic payment.
/// - `partial` with `partial_amount`: the paid amount becomes
///   `partial_amount`. An upward move yields a synthetic payment; a downward
///   correction is recorded in the settlement only.
/// - `partial` without an amount: the paid amount is kept.
/// - `unpaid`: the paid amount is kept, the status is overridden.
///
/// # Errors
///
/// Returns `BillingError::Validation` when `partial_amount` is outside
/// `(0, total_amount)` for a `partial` status.
pub fn force_status(
    total_amount: Decimal,
    paid_amount: Decimal,
    status: PaymentStatus,
    partial_amount: Option<Decimal>,
) -> Result<ForcedSettlement> {
    let (new_paid_amount, delta) = match (status, partial_amount) {
        (PaymentStatus::Paid, _) => (total_amount, total_amount - paid_amount),
        (PaymentStatus::Partial, Some(amount)) => {
            let amount = round_money(amount);
            if amount <= Decimal::ZERO {
                return Err(BillingError::validation(
                    "paid_amount",
                    "a partial payment must be greater than 0",
                ));
            }
            if amount >= total_amount {
                return Err(BillingError::validation(
                    "paid_amount",
                    format!(
                        "a partial payment must be below the total of {total_amount}; \
                         set the status to paid to settle the full amount"
                    ),
                ));
            }
            (amount, amount - paid_amount)
        }
        (PaymentStatus::Partial | PaymentStatus::Unpaid, _) => (paid_amount, Decimal::ZERO),
    };

    Ok(ForcedSettlement {
        settlement: Settlement {
            paid_amount: new_paid_amount,
            payment_status: status,
        },
        synthetic_payment: (delta > Decimal::ZERO).then_some(delta),
    })
}
