//! Conversion between decimal amounts and stored minor units.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Amounts are `Decimal` everywhere in the API and are persisted as integer
//! minor units (cents), which every supported backend stores exactly.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::PostingError;

/// Decimal places kept by stored amounts.
pub const SCALE: u32 = 2;

/// Converts an amount to minor units.
///
/// Amounts with more precision than [`SCALE`] are rejected rather than rounded.
pub fn to_minor(amount: Decimal) -> Result<i64, PostingError> {
    let invalid = PostingError::InvalidPrecision(amount);
    let scaled = amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or_else(|| invalid.clone())?;
    if !scaled.fract().is_zero() {
        return Err(invalid);
    }
    scaled.to_i64().ok_or(invalid)
}

/// Converts stored minor units back to an amount.
#[must_use]
pub fn from_minor(minor: i64) -> Decimal {
    Decimal::new(minor, SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(100), 10_000)]
    #[case(dec!(0.01), 1)]
    #[case(dec!(-75.50), -7_550)]
    #[case(dec!(12.300), 1_230)]
    fn test_to_minor(#[case] amount: Decimal, #[case] minor: i64) {
        assert_eq!(to_minor(amount), Ok(minor));
    }

    #[test]
    fn test_sub_cent_precision_rejected() {
        assert_eq!(
            to_minor(dec!(0.005)),
            Err(PostingError::InvalidPrecision(dec!(0.005)))
        );
    }

    #[test]
    fn test_from_minor() {
        assert_eq!(from_minor(15_000), dec!(150));
        assert_eq!(from_minor(-1), dec!(-0.01));
    }

    proptest! {
        #[test]
        fn prop_minor_roundtrip(minor in -1_000_000_000_000i64..1_000_000_000_000) {
            prop_assert_eq!(to_minor(from_minor(minor)), Ok(minor));
        }
    }
}
