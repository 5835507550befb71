//! Database migration runner for BranchLedger.
//!
//! Usage:
//!   migrator up      - Run all pending migrations
//!   migrator down    - Rollback last migration
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop all tables and re-run migrations
//!   migrator probe   - Resolve the party balance columns of the configured database

use sea_orm_migration::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use branchledger_db::migration::Migrator;
use branchledger_db::{connect, SchemaRegistry};
use branchledger_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    if std::env::args().nth(1).as_deref() == Some("probe") {
        return probe().await;
    }

    // The migrator CLI sets up its own tracing
    cli::run_cli(Migrator).await;
    Ok(())
}

async fn probe() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "branchledger=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;
    let db = connect(&config.database).await?;
    let registry = SchemaRegistry::from_config(&config.schema);
    registry.warm_up(&db).await?;
    tracing::info!(version = registry.version(), "schema probe finished");
    Ok(())
}
