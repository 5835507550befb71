//! Database layer with `SeaORM` entities, migrations and the posting engine.
//!
//! This crate provides:
//! - `SeaORM` entity definitions and portable migrations
//! - The schema capability resolver for the party balance column
//! - The balance adjuster and party ledger writers
//! - The transactional mutation scope
//! - Repositories for accounts, transfers, receipts, expenses, payroll and
//!   outstanding balances

mod error;

pub mod balance;
pub mod coordinator;
pub mod entities;
pub mod ledger;
pub mod migration;
pub mod repositories;
pub mod schema;

pub use balance::{BalanceError, PostingContext};
pub use coordinator::MutationScope;
pub use error::is_unique_violation;
pub use repositories::{
    AccountError, AccountRepository, ExpenseError, ExpenseRepository, OutstandingError,
    OutstandingRepository, PayrollError, PayrollRepository, ReceiptError, ReceiptRepository,
    TransferError, TransferRepository,
};
pub use schema::{SchemaError, SchemaRegistry};

use std::time::Duration;

use branchledger_shared::config::DatabaseConfig;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};

/// Establishes a connection pool to the configured database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    let db = Database::connect(options).await?;
    tracing::info!(backend = ?db.get_database_backend(), "database connected");
    Ok(db)
}
