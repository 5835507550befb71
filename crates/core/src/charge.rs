//! Expense charge and payment amounts.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::balance::ensure_positive;
use crate::error::PostingError;
use crate::period::BillingPeriod;

/// What is still owed on a charge.
#[must_use]
pub fn charge_remaining(charge_amount: Decimal, paid: Decimal) -> Decimal {
    (charge_amount - paid).max(Decimal::ZERO)
}

/// Resolves the amount of a new expense payment.
///
/// An omitted amount pays the charge off. An explicit amount must be positive
/// and may not exceed what is still owed.
pub fn resolve_payment_amount(
    requested: Option<Decimal>,
    charge_amount: Decimal,
    paid: Decimal,
) -> Result<Decimal, PostingError> {
    let remaining = charge_remaining(charge_amount, paid);
    match requested {
        None if remaining.is_zero() => Err(PostingError::FullyPaid),
        None => Ok(remaining),
        Some(amount) => {
            let amount = ensure_positive(amount, "amount_paid")?;
            if amount > remaining {
                return Err(PostingError::PaymentExceedsCharge {
                    requested: amount,
                    remaining,
                });
            }
            Ok(amount)
        }
    }
}

/// Validates a new charge amount against what has already been paid.
pub fn validate_charge_amount(amount: Decimal, paid: Decimal) -> Result<Decimal, PostingError> {
    let amount = ensure_positive(amount, "amount")?;
    if amount < paid {
        return Err(PostingError::ChargeBelowPaid { amount, paid });
    }
    Ok(amount)
}

/// Checks a new date for a charge tagged with a billing period.
///
/// Hand-entered charges carry no tag and may move freely. A period charge
/// must stay inside its month, otherwise the budget could be charged again
/// for the month it moved into.
pub fn validate_charge_date(
    period_year: Option<i32>,
    period_month: Option<i32>,
    date: NaiveDate,
) -> Result<NaiveDate, PostingError> {
    let (Some(year), Some(month)) = (period_year, period_month) else {
        return Ok(date);
    };
    let month = u32::try_from(month).map_err(|_| PostingError::InvalidPeriod { year, month: 0 })?;
    let period = BillingPeriod::new(year, month)?;
    if !period.contains(date) {
        return Err(PostingError::DateOutsidePeriod { date, month, year });
    }
    Ok(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults_to_remaining() {
        assert_eq!(resolve_payment_amount(None, dec!(200), dec!(50)), Ok(dec!(150)));
    }

    #[test]
    fn test_fully_paid_charge_rejects_default() {
        assert_eq!(
            resolve_payment_amount(None, dec!(200), dec!(200)),
            Err(PostingError::FullyPaid)
        );
    }

    #[rstest]
    #[case(dec!(150), Ok(dec!(150)))]
    #[case(dec!(0.01), Ok(dec!(0.01)))]
    #[case(dec!(150.01), Err(PostingError::PaymentExceedsCharge { requested: dec!(150.01), remaining: dec!(150) }))]
    #[case(dec!(0), Err(PostingError::NonPositiveAmount { field: "amount_paid" }))]
    fn test_explicit_amount(#[case] amount: Decimal, #[case] expected: Result<Decimal, PostingError>) {
        assert_eq!(resolve_payment_amount(Some(amount), dec!(200), dec!(50)), expected);
    }

    #[test]
    fn test_charge_amount_not_below_paid() {
        assert_eq!(validate_charge_amount(dec!(80), dec!(50)), Ok(dec!(80)));
        assert_eq!(
            validate_charge_amount(dec!(40), dec!(50)),
            Err(PostingError::ChargeBelowPaid {
                amount: dec!(40),
                paid: dec!(50)
            })
        );
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case(day(2026, 3, 1), true)]
    #[case(day(2026, 3, 31), true)]
    #[case(day(2026, 4, 1), false)]
    #[case(day(2025, 3, 15), false)]
    fn test_period_charge_stays_in_month(#[case] date: NaiveDate, #[case] allowed: bool) {
        assert_eq!(validate_charge_date(Some(2026), Some(3), date).is_ok(), allowed);
    }

    #[test]
    fn test_untagged_charge_moves_freely() {
        assert_eq!(validate_charge_date(None, None, day(2030, 1, 1)), Ok(day(2030, 1, 1)));
    }
}
