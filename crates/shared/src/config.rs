//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Schema capability configuration.
    #[serde(default)]
    pub schema: SchemaConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Schema shape configuration.
///
/// Party balance columns are normally probed from the live schema. Pinning a
/// column here skips the probe for that table entirely.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaConfig {
    /// Schema version the process was started against. Bumping it drops every
    /// cached probe result.
    #[serde(default)]
    pub version: u32,
    /// Pinned balance column for the customers table.
    pub customer_balance_column: Option<String>,
    /// Pinned balance column for the suppliers table.
    pub supplier_balance_column: Option<String>,
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("BRANCHLEDGER").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
