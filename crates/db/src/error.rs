//! Error plumbing shared by the repositories.

use sea_orm::{DbErr, SqlErr};

/// Implements `From<$ty> for AppError` for errors exposing `kind()`.
macro_rules! impl_app_error {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for branchledger_shared::AppError {
                fn from(err: $ty) -> Self {
                    Self::from_kind(err.kind(), err.to_string())
                }
            }
        )+
    };
}

pub(crate) use impl_app_error;

impl_app_error!(
    crate::balance::BalanceError,
    crate::schema::SchemaError,
);

/// Returns true if the store rejected a write on a unique index.
#[must_use]
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
