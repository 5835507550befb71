//! Salary remittance bound.

use rust_decimal::Decimal;

use crate::balance::ensure_positive;
use crate::error::PostingError;

/// Net salary minus everything already paid on the line.
#[must_use]
pub fn salary_remaining(net_salary: Decimal, prior_payments: Decimal) -> Decimal {
    (net_salary - prior_payments).max(Decimal::ZERO)
}

/// Validates `0 < amount <= remaining` and returns what is left afterwards.
pub fn validate_salary_payment(
    amount: Decimal,
    net_salary: Decimal,
    prior_payments: Decimal,
) -> Result<Decimal, PostingError> {
    let amount = ensure_positive(amount, "amount_paid")?;
    let remaining = salary_remaining(net_salary, prior_payments);
    if amount > remaining {
        return Err(PostingError::OverRemittance {
            requested: amount,
            remaining,
        });
    }
    Ok(remaining - amount)
}
