//! Schema capability resolver.
//!
//! The outstanding balance column of `customers` and `suppliers` was renamed
//! from `open_balance` to `remaining_balance` at some point, and deployments
//! of both generations are still live. [`SchemaRegistry`] probes the table once,
//! caches the answer and hands it to every balance read and write.
//!
//! The registry is injected (usually behind an `Arc`) rather than kept in a
//! global, so a test can pin either shape without touching the database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use branchledger_core::PartyKind;
use branchledger_shared::config::SchemaConfig;
use branchledger_shared::ErrorKind;
use dashmap::DashMap;
use sea_orm::{ConnectionTrait, DbBackend, DbErr, Statement};

/// Column used by current schemas.
pub const DEFAULT_BALANCE_COLUMN: &str = "remaining_balance";

/// Balance column names, most preferred first.
pub const BALANCE_COLUMN_CANDIDATES: [&str; 2] = ["remaining_balance", "open_balance"];

/// Errors raised while resolving a column.
///
/// All of them are fatal configuration problems: the engine never guesses a
/// column when the table cannot be inspected.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Table name is not a plain identifier.
    #[error("Invalid table identifier: {0}")]
    InvalidIdentifier(String),

    /// Introspection returned no columns.
    #[error("Table {0} does not exist or has no columns")]
    TableMissing(String),

    /// Introspection query failed.
    #[error("Schema introspection failed for table {table}: {source}")]
    Introspection {
        /// Table being inspected.
        table: String,
        /// Driver error.
        #[source]
        source: DbErr,
    },
}

impl SchemaError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidIdentifier(_) => "SCHEMA_INVALID_IDENTIFIER",
            Self::TableMissing(_) => "SCHEMA_TABLE_MISSING",
            Self::Introspection { .. } => "SCHEMA_INTROSPECTION_FAILED",
        }
    }

    /// Returns the coarse kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::Internal
    }
}

/// Process-wide cache of resolved column names.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    version: AtomicU32,
    pinned: HashMap<String, String>,
    resolved: DashMap<(String, String), String>,
}

impl SchemaRegistry {
    /// Creates an empty registry for the given schema version.
    #[must_use]
    pub fn new(version: u32) -> Self {
        Self {
            version: AtomicU32::new(version),
            ..Self::default()
        }
    }

    /// Creates a registry from configuration, pinning any configured columns.
    #[must_use]
    pub fn from_config(config: &SchemaConfig) -> Self {
        let mut registry = Self::new(config.version);
        if let Some(column) = &config.customer_balance_column {
            registry = registry.pin(PartyKind::Customer.table(), column);
        }
        if let Some(column) = &config.supplier_balance_column {
            registry = registry.pin(PartyKind::Supplier.table(), column);
        }
        registry
    }

    /// Fixes the column of a table; probing is skipped for it.
    #[must_use]
    pub fn pin(mut self, table: &str, column: &str) -> Self {
        self.pinned.insert(table.to_string(), column.to_string());
        self
    }

    /// Schema version the cache belongs to.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version.load(Ordering::Acquire)
    }

    /// Drops every probed column when `version` differs from the current one.
    ///
    /// Returns true if the cache was cleared. Pinned columns are kept.
    pub fn invalidate_for_version(&self, version: u32) -> bool {
        let previous = self.version.swap(version, Ordering::AcqRel);
        if previous == version {
            return false;
        }
        self.resolved.clear();
        tracing::info!(previous, version, "schema version changed, column cache cleared");
        true
    }

    /// Returns the first candidate column the table has, or `default`.
    pub async fn resolve_column<C>(
        &self,
        conn: &C,
        table: &str,
        default: &str,
        candidates: &[&str],
    ) -> Result<String, SchemaError>
    where
        C: ConnectionTrait,
    {
        if let Some(column) = self.pinned.get(table) {
            return Ok(column.clone());
        }
        let key = (table.to_string(), default.to_string());
        if let Some(column) = self.resolved.get(&key) {
            return Ok(column.clone());
        }

        let columns = table_columns(conn, table).await?;
        let column = candidates
            .iter()
            .find(|candidate| columns.iter().any(|c| c == *candidate))
            .map_or_else(|| default.to_string(), |c| (*c).to_string());

        tracing::debug!(table, column = %column, "resolved schema column");
        self.resolved.insert(key, column.clone());
        Ok(column)
    }

    /// Balance column of the party table.
    pub async fn balance_column<C>(&self, conn: &C, kind: PartyKind) -> Result<String, SchemaError>
    where
        C: ConnectionTrait,
    {
        self.resolve_column(
            conn,
            kind.table(),
            DEFAULT_BALANCE_COLUMN,
            &BALANCE_COLUMN_CANDIDATES,
        )
        .await
    }

    /// Resolves every party table up front so a broken schema fails at startup.
    pub async fn warm_up<C>(&self, conn: &C) -> Result<(), SchemaError>
    where
        C: ConnectionTrait,
    {
        for kind in [PartyKind::Customer, PartyKind::Supplier] {
            let column = self.balance_column(conn, kind).await?;
            tracing::info!(table = kind.table(), column = %column, "balance column ready");
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

async fn table_columns<C>(conn: &C, table: &str) -> Result<Vec<String>, SchemaError>
where
    C: ConnectionTrait,
{
    if !is_identifier(table) {
        return Err(SchemaError::InvalidIdentifier(table.to_string()));
    }

    let backend = conn.get_database_backend();
    let stmt = match backend {
        DbBackend::Postgres => Statement::from_sql_and_values(
            backend,
            "SELECT column_name::text AS column_name FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = $1",
            [table.into()],
        ),
        DbBackend::MySql => Statement::from_sql_and_values(
            backend,
            "SELECT column_name AS column_name FROM information_schema.columns \
             WHERE table_schema = DATABASE() AND table_name = ?",
            [table.into()],
        ),
        DbBackend::Sqlite => Statement::from_string(
            backend,
            format!("SELECT name AS column_name FROM pragma_table_info('{table}')"),
        ),
    };

    let introspection = |source| SchemaError::Introspection {
        table: table.to_string(),
        source,
    };
    let rows = conn.query_all(stmt).await.map_err(introspection)?;
    let columns = rows
        .iter()
        .map(|row| row.try_get::<String>("", "column_name"))
        .collect::<Result<Vec<_>, _>>()
        .map_err(introspection)?;

    if columns.is_empty() {
        return Err(SchemaError::TableMissing(table.to_string()));
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_check() {
        assert!(is_identifier("customers"));
        assert!(is_identifier("supplier_ledger"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("customers'); DROP TABLE x; --"));
    }

    #[test]
    fn test_from_config_pins_columns() {
        let config = SchemaConfig {
            version: 2,
            customer_balance_column: Some("open_balance".to_string()),
            supplier_balance_column: None,
        };
        let registry = SchemaRegistry::from_config(&config);
        assert_eq!(registry.version(), 2);
        assert_eq!(
            registry.pinned.get("customers").map(String::as_str),
            Some("open_balance")
        );
        assert!(!registry.pinned.contains_key("suppliers"));
    }

    #[test]
    fn test_invalidate_only_on_version_change() {
        let registry = SchemaRegistry::new(1);
        registry
            .resolved
            .insert(("customers".into(), "remaining_balance".into()), "open_balance".into());

        assert!(!registry.invalidate_for_version(1));
        assert_eq!(registry.resolved.len(), 1);

        assert!(registry.invalidate_for_version(2));
        assert!(registry.resolved.is_empty());
        assert_eq!(registry.version(), 2);
    }
}
