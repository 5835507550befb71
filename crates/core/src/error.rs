//! Posting error types for validation and business rule errors.
//!
//! Every variant here is raised before a transaction opens, except
//! `UnbalancedPosting`, which flags a bug in leg derivation.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use branchledger_shared::{AppError, ErrorKind};

/// Errors raised by the posting rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PostingError {
    // ========== Validation Errors ==========
    /// Amount must be strictly positive.
    #[error("{field} must be greater than zero")]
    NonPositiveAmount {
        /// Name of the offending field.
        field: &'static str,
    },

    /// Amount has more decimal places than the ledger stores.
    #[error("Amount {0} has more than two decimal places")]
    InvalidPrecision(Decimal),

    /// Transfer source and destination are the same account.
    #[error("Transfer source and destination must differ (account {0})")]
    SameAccountTransfer(i32),

    /// A required association was not supplied.
    #[error("{0} is required")]
    MissingAssociation(&'static str),

    /// Salary payment larger than what is still owed on the line.
    #[error("Payment {requested} exceeds remaining salary {remaining}")]
    OverRemittance {
        /// Amount the caller tried to pay.
        requested: Decimal,
        /// Net salary minus prior payments.
        remaining: Decimal,
    },

    /// Expense payment larger than what is still owed on the charge.
    #[error("Payment {requested} exceeds remaining charge amount {remaining}")]
    PaymentExceedsCharge {
        /// Amount the caller tried to pay.
        requested: Decimal,
        /// Charge amount minus prior payments.
        remaining: Decimal,
    },

    /// Nothing is left to pay.
    #[error("Nothing left to pay")]
    FullyPaid,

    /// Posting would drive an account below zero.
    #[error("Insufficient funds in account {account_id}: balance {balance}, change {delta}")]
    InsufficientFunds {
        /// The account.
        account_id: i32,
        /// Balance before the posting.
        balance: Decimal,
        /// Signed change that was attempted.
        delta: Decimal,
    },

    /// Charge amount cannot drop below what has been paid.
    #[error("Charge amount {amount} is below the {paid} already paid")]
    ChargeBelowPaid {
        /// Requested charge amount.
        amount: Decimal,
        /// Sum of payments on the charge.
        paid: Decimal,
    },

    // ========== Dependency Errors ==========
    /// A charge with payments cannot be deleted.
    #[error("Charge {0} has payments and cannot be deleted")]
    ChargeHasPayments(i32),

    /// A row still referenced by charges cannot be deleted.
    #[error("{entity} {id} still has charges")]
    HasCharges {
        /// Entity name.
        entity: &'static str,
        /// Entity key.
        id: i32,
    },

    // ========== Period Errors ==========
    /// Year/month pair is not a calendar month.
    #[error("Invalid period {month}/{year}")]
    InvalidPeriod {
        /// Calendar year.
        year: i32,
        /// Calendar month.
        month: u32,
    },

    /// The budget already has a charge for the period.
    #[error("Budget {budget_id} already charged for period {month:02}/{year}")]
    AlreadyCharged {
        /// The budget.
        budget_id: i32,
        /// Calendar month (1-12).
        month: u32,
        /// Calendar year.
        year: i32,
    },

    /// A period charge was moved out of the month it was charged for.
    #[error("Charge date {date} is outside its billing period {month:02}/{year}")]
    DateOutsidePeriod {
        /// Requested charge date.
        date: NaiveDate,
        /// Calendar month (1-12).
        month: u32,
        /// Calendar year.
        year: i32,
    },

    /// Payroll was already charged on this date.
    #[error("Payroll already charged for {0}")]
    PayrollAlreadyCharged(NaiveDate),

    /// There are no salary templates to charge.
    #[error("No active employees to charge payroll for")]
    NoPayrollTemplates,

    // ========== Internal Errors ==========
    /// Derived legs do not sum to the business amount.
    #[error("Posting is not balanced: amount {amount}, legs {legs}")]
    UnbalancedPosting {
        /// Business amount.
        amount: Decimal,
        /// Sum recorded by the legs.
        legs: Decimal,
    },
}

impl PostingError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NonPositiveAmount { .. } => "NON_POSITIVE_AMOUNT",
            Self::InvalidPrecision(_) => "INVALID_PRECISION",
            Self::SameAccountTransfer(_) => "SAME_ACCOUNT_TRANSFER",
            Self::MissingAssociation(_) => "MISSING_ASSOCIATION",
            Self::OverRemittance { .. } => "OVER_REMITTANCE",
            Self::PaymentExceedsCharge { .. } => "PAYMENT_EXCEEDS_CHARGE",
            Self::FullyPaid => "FULLY_PAID",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::ChargeBelowPaid { .. } => "CHARGE_BELOW_PAID",
            Self::ChargeHasPayments(_) => "CHARGE_HAS_PAYMENTS",
            Self::HasCharges { .. } => "HAS_CHARGES",
            Self::InvalidPeriod { .. } => "INVALID_PERIOD",
            Self::AlreadyCharged { .. } => "ALREADY_CHARGED",
            Self::DateOutsidePeriod { .. } => "DATE_OUTSIDE_PERIOD",
            Self::PayrollAlreadyCharged(_) => "PAYROLL_ALREADY_CHARGED",
            Self::NoPayrollTemplates => "NO_PAYROLL_TEMPLATES",
            Self::UnbalancedPosting { .. } => "UNBALANCED_POSTING",
        }
    }

    /// Returns the coarse kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyCharged { .. } | Self::PayrollAlreadyCharged(_) => ErrorKind::Conflict,
            Self::UnbalancedPosting { .. } => ErrorKind::Internal,
            _ => ErrorKind::BadRequest,
        }
    }
}

impl From<PostingError> for AppError {
    fn from(err: PostingError) -> Self {
        Self::from_kind(err.kind(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            PostingError::SameAccountTransfer(1).kind(),
            ErrorKind::BadRequest
        );
        assert_eq!(
            PostingError::AlreadyCharged {
                budget_id: 1,
                month: 3,
                year: 2026
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            PostingError::UnbalancedPosting {
                amount: dec!(1),
                legs: dec!(2)
            }
            .kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_error_display() {
        let err = PostingError::AlreadyCharged {
            budget_id: 4,
            month: 3,
            year: 2026,
        };
        assert_eq!(
            err.to_string(),
            "Budget 4 already charged for period 03/2026"
        );

        let err = PostingError::OverRemittance {
            requested: dec!(150.00),
            remaining: dec!(100.00),
        };
        assert_eq!(
            err.to_string(),
            "Payment 150.00 exceeds remaining salary 100.00"
        );
        assert_eq!(err.error_code(), "OVER_REMITTANCE");
    }

    #[test]
    fn test_into_app_error() {
        let app: AppError = PostingError::PayrollAlreadyCharged(
            NaiveDate::from_ymd_opt(2026, 3, 25).unwrap(),
        )
        .into();
        assert_eq!(app.kind(), ErrorKind::Conflict);
        assert_eq!(app.status_code(), 409);
        assert!(app.to_string().ends_with("Payroll already charged for 2026-03-25"));
    }
}
