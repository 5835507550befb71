//! Transactional mutation scope.
//!
//! Every operation that writes more than one row runs its writes through a
//! [`MutationScope`]. The scope owns one database transaction; `finish`
//! commits on success and rolls back on failure, handing the original error
//! back to the caller untouched.
//!
//! # Usage
//!
//! ```ignore
//! let scope = MutationScope::begin(&db, "create_transfer").await?;
//! let result = insert_transfer(scope.conn(), input).await;
//! let transfer = scope.finish(result).await?;
//! ```

use std::fmt::Display;

use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};

/// A database transaction bound to one engine operation.
pub struct MutationScope {
    txn: DatabaseTransaction,
    operation: &'static str,
}

impl MutationScope {
    /// Opens a transaction for `operation`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be started.
    pub async fn begin(db: &DatabaseConnection, operation: &'static str) -> Result<Self, DbErr> {
        let txn = db.begin().await?;
        tracing::trace!(operation, "mutation scope opened");
        Ok(Self { txn, operation })
    }

    /// Connection every write of the operation must go through.
    #[must_use]
    pub fn conn(&self) -> &DatabaseTransaction {
        &self.txn
    }

    /// Commits when `result` is `Ok`, rolls back otherwise.
    ///
    /// A failed rollback is logged; the error returned is always the one the
    /// operation produced.
    ///
    /// # Errors
    ///
    /// Returns the operation's error, or the commit failure.
    pub async fn finish<T, E>(self, result: Result<T, E>) -> Result<T, E>
    where
        E: From<DbErr> + Display,
    {
        let operation = self.operation;
        match result {
            Ok(value) => {
                self.txn.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = self.txn.rollback().await {
                    tracing::error!(operation, error = %rollback, "rollback failed");
                }
                tracing::warn!(operation, error = %err, "operation rolled back");
                Err(err)
            }
        }
    }
}
