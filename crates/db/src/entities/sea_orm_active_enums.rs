//! `SeaORM` active enums stored as strings.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle of an account transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    /// Recorded but not applied to balances.
    #[sea_orm(string_value = "draft")]
    Draft,
    /// Applied to both account balances.
    #[sea_orm(string_value = "posted")]
    Posted,
    /// Cancelled; never touches balances.
    #[sea_orm(string_value = "void")]
    Void,
}

impl TransferStatus {
    /// Returns true if the transfer's pair is applied to balances.
    #[must_use]
    pub const fn is_posted(self) -> bool {
        matches!(self, Self::Posted)
    }

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Posted => "posted",
            Self::Void => "void",
        }
    }
}

/// Payment progress of a payroll run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum PayrollStatus {
    /// No line has been paid.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Some salary is still owed.
    #[sea_orm(string_value = "partial")]
    Partial,
    /// Every line is fully paid.
    #[sea_orm(string_value = "paid")]
    Paid,
}
