//! Balance arithmetic for accounts and counterparties.
//!
//! Party balances are display caches and clamp at zero; the ledgers keep the
//! exact history. Account balances are never clamped: a posting that would
//! overdraw an account is rejected unless the caller holds the admin override.

use rust_decimal::Decimal;

use crate::error::PostingError;

/// Rejects zero and negative amounts.
pub fn ensure_positive(amount: Decimal, field: &'static str) -> Result<Decimal, PostingError> {
    if amount > Decimal::ZERO {
        Ok(amount)
    } else {
        Err(PostingError::NonPositiveAmount { field })
    }
}

/// Applies `delta` to a party balance, never going below zero.
#[must_use]
pub fn clamped_balance(current: Decimal, delta: Decimal) -> Decimal {
    (current + delta).max(Decimal::ZERO)
}

/// Applies `delta` to an account balance.
///
/// `allow_overdraft` is the admin override path.
pub fn next_account_balance(
    account_id: i32,
    current: Decimal,
    delta: Decimal,
    allow_overdraft: bool,
) -> Result<Decimal, PostingError> {
    let next = current + delta;
    if next < Decimal::ZERO && delta < Decimal::ZERO && !allow_overdraft {
        return Err(PostingError::InsufficientFunds {
            account_id,
            balance: current,
            delta,
        });
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(100), dec!(-30), dec!(70))]
    #[case(dec!(100), dec!(-100), dec!(0))]
    #[case(dec!(100), dec!(-250), dec!(0))]
    #[case(dec!(0), dec!(-1), dec!(0))]
    #[case(dec!(10), dec!(5.50), dec!(15.50))]
    fn test_clamped_balance(#[case] current: Decimal, #[case] delta: Decimal, #[case] expected: Decimal) {
        assert_eq!(clamped_balance(current, delta), expected);
    }

    #[test]
    fn test_ensure_positive() {
        assert_eq!(ensure_positive(dec!(0.01), "amount"), Ok(dec!(0.01)));
        assert_eq!(
            ensure_positive(Decimal::ZERO, "amount"),
            Err(PostingError::NonPositiveAmount { field: "amount" })
        );
        assert!(ensure_positive(dec!(-5), "amount").is_err());
    }

    #[test]
    fn test_account_overdraft_rejected() {
        let err = next_account_balance(3, dec!(50), dec!(-80), false).unwrap_err();
        assert_eq!(
            err,
            PostingError::InsufficientFunds {
                account_id: 3,
                balance: dec!(50),
                delta: dec!(-80),
            }
        );
    }

    #[test]
    fn test_account_overdraft_allowed_for_admin() {
        assert_eq!(next_account_balance(3, dec!(50), dec!(-80), true), Ok(dec!(-30)));
    }

    #[test]
    fn test_credit_to_overdrawn_account_is_accepted() {
        // Restoring an already negative account must not be blocked.
        assert_eq!(next_account_balance(3, dec!(-30), dec!(10), false), Ok(dec!(-20)));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_clamp_never_negative(
            current in 0i64..10_000_000,
            delta in -20_000_000i64..20_000_000,
        ) {
            let result = clamped_balance(Decimal::new(current, 2), Decimal::new(delta, 2));
            prop_assert!(result >= Decimal::ZERO);
        }

        #[test]
        fn prop_clamp_exact_when_covered(
            current in 0i64..10_000_000,
            spend in 0i64..10_000_000,
        ) {
            prop_assume!(spend <= current);
            let current = Decimal::new(current, 2);
            let spend = Decimal::new(spend, 2);
            prop_assert_eq!(clamped_balance(current, -spend), current - spend);
        }
    }
}
