//! Consumption calculator.
//!
//! Turns a pair of meter values and a unit price into units consumed and the
//! amount owed. Amounts are fixed to [`MONEY_SCALE`] decimal places, midpoint
//! rounded away from zero.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{BillingError, Result};

/// Decimal places kept on every monetary amount.
pub const MONEY_SCALE: u32 = 2;

/// Round a monetary amount to [`MONEY_SCALE`] places.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Result of billing one reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Billing {
    /// Units consumed over the period (meter precision, never negative).
    pub units_consumed: Decimal,

    /// Amount owed, rounded to [`MONEY_SCALE`] places.
    pub total_amount: Decimal,

    /// True when the current value was below the previous one and
    /// consumption was clamped to zero.
    pub clamped: bool,
}

/// Compute consumption and amount owed.
///
/// A current value below the previous one (meter rollback or entry error) is
/// not rejected: consumption is clamped to zero and [`Billing::clamped`] is set
/// so the caller can surface it.
///
/// # Errors
///
/// Returns `BillingError::Validation` when a meter value is negative, the unit
/// price is not strictly positive, or the amount overflows.
pub fn compute_billing(
    previous_reading: Decimal,
    current_reading: Decimal,
    price_per_unit: Decimal,
) -> Result<Billing> {
    if previous_reading < Decimal::ZERO {
        return Err(BillingError::validation(
            "previousReading",
            "must not be negative",
        ));
    }
    if current_reading < Decimal::ZERO {
        return Err(BillingError::validation(
            "currentReading",
            "must not be negative",
        ));
    }
    if price_per_unit <= Decimal::ZERO {
        return Err(BillingError::validation(
            "pricePerUnit",
            "must be greater than zero",
        ));
    }

    let clamped = current_reading < previous_reading;
    let units_consumed = if clamped {
        Decimal::ZERO
    } else {
        current_reading - previous_reading
    };

    let total_amount = units_consumed
        .checked_mul(price_per_unit)
        .map(round_money)
        .ok_or_else(|| BillingError::validation("pricePerUnit", "total amount overflows"))?;

    Ok(Billing {
        units_consumed,
        total_amount,
        clamped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn bills_the_delta_times_the_rate() {
        let billing = compute_billing(dec!(100), dec!(150), dec!(20)).unwrap();
        assert_eq!(billing.units_consumed, dec!(50));
        assert_eq!(billing.total_amount, dec!(1000));
        assert!(!billing.clamped);
    }

    #[test]
    fn delta_is_exact_for_fractional_values() {
        let grid = [
            (dec!(0), dec!(0), dec!(1)),
            (dec!(12.5), dec!(40.25), dec!(3)),
            (dec!(999.9), dec!(1000), dec!(0.15)),
            (dec!(7), dec!(7), dec!(55.5)),
        ];
        for (previous, current, price) in grid {
            let billing = compute_billing(previous, current, price).unwrap();
            assert_eq!(billing.units_consumed, current - previous);
            assert_eq!(billing.total_amount, round_money((current - previous) * price));
        }
    }

    #[test]
    fn negative_delta_is_clamped_to_zero() {
        let billing = compute_billing(dec!(150), dec!(100), dec!(20)).unwrap();
        assert_eq!(billing.units_consumed, Decimal::ZERO);
        assert_eq!(billing.total_amount, Decimal::ZERO);
        assert!(billing.clamped);
    }

    #[test]
    fn total_is_rounded_to_cents() {
        // 3.333 units at 0.10 = 0.3333
        let billing = compute_billing(dec!(0), dec!(3.333), dec!(0.10)).unwrap();
        assert_eq!(billing.total_amount, dec!(0.33));
        // 0.125 rounds up, not to even
        let billing = compute_billing(dec!(0), dec!(1), dec!(0.125)).unwrap();
        assert_eq!(billing.total_amount, dec!(0.13));
    }

    #[test]
    fn rejects_bad_rates_and_negative_meters() {
        assert!(compute_billing(dec!(0), dec!(10), dec!(0)).is_err());
        assert!(compute_billing(dec!(0), dec!(10), dec!(-1)).is_err());
        assert!(matches!(
            compute_billing(dec!(-1), dec!(10), dec!(1)),
            Err(BillingError::Validation { field: "previousReading", .. })
        ));
        assert!(matches!(
            compute_billing(dec!(0), dec!(-0.5), dec!(1)),
            Err(BillingError::Validation { field: "currentReading", .. })
        ));
    }

    #[test]
    fn overflow_is_a_validation_error() {
        let result = compute_billing(Decimal::ZERO, Decimal::MAX, Decimal::MAX);
        assert!(matches!(result, Err(BillingError::Validation { .. })));
    }
}
