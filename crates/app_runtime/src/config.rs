//! Runtime configuration
//!
//! Settings are layered: built-in defaults, then an optional `lending.toml`
//! in the working directory, then environment variables prefixed with
//! `LENDING` using `__` between path segments:
//!
//! ```bash
//! LENDING__STORAGE=postgres
//! LENDING__DATABASE__URL=postgres://library:secret@db/library
//! LENDING__LOG__JSON=true
//! LENDING__TIMEZONE=Europe/Paris
//! ```
//!
//! A `.env` file is read first when present.

use std::str::FromStr;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use core_kernel::{Currency, SystemClock};
use domain_lending::{BorrowerCategory, CategoryTable};
use infra_db::DatabaseConfig;

use crate::error::RuntimeError;

const CONFIG_FILE: &str = "lending";
const ENV_PREFIX: &str = "LENDING";
const ENV_SEPARATOR: &str = "__";

/// Which lending store backs the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

/// Connection pool settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/library".to_string(),
            max_connections: 10,
            min_connections: 2,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }
}

impl DatabaseSettings {
    pub fn pool_config(&self) -> DatabaseConfig {
        DatabaseConfig::new(self.url.clone())
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .connect_timeout(Duration::from_secs(self.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(self.idle_timeout_secs))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete runtime configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LendingConfig {
    pub storage: StorageBackend,
    pub database: DatabaseSettings,
    pub log: LogSettings,
    /// ISO 4217 code of the library's currency
    pub currency: String,
    /// IANA timezone deciding when the calendar day turns over
    pub timezone: String,
    pub categories: Vec<BorrowerCategory>,
}

impl Default for LendingConfig {
    fn default() -> Self {
        Self {
            storage: StorageBackend::Postgres,
            database: DatabaseSettings::default(),
            log: LogSettings::default(),
            currency: "EUR".to_string(),
            timezone: "UTC".to_string(),
            categories: CategoryTable::standard().iter().cloned().collect(),
        }
    }
}

impl LendingConfig {
    /// Loads `.env`, `lending.toml` and `LENDING__*` variables, then validates
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::Config` for unreadable sources and
    /// `RuntimeError::InvalidConfig` for values that fail validation.
    pub fn load() -> Result<Self, RuntimeError> {
        dotenvy::dotenv().ok();

        let config: Self = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a TOML document
    pub fn from_toml(source: &str) -> Result<Self, RuntimeError> {
        let config: Self = Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// In-memory storage with the default categories, for tests and demos
    pub fn in_memory() -> Self {
        Self {
            storage: StorageBackend::Memory,
            ..Self::default()
        }
    }

    /// Checks every setting that can be checked without connecting anywhere
    pub fn validate(&self) -> Result<(), RuntimeError> {
        self.currency()?;
        self.clock()?;
        self.category_table()?;

        if self.storage == StorageBackend::Postgres {
            if self.database.url.trim().is_empty() {
                return Err(RuntimeError::invalid("database.url must be set for postgres storage"));
            }
            if self.database.max_connections == 0 {
                return Err(RuntimeError::invalid("database.max_connections must be at least 1"));
            }
            if self.database.min_connections > self.database.max_connections {
                return Err(RuntimeError::invalid(format!(
                    "database.min_connections ({}) exceeds max_connections ({})",
                    self.database.min_connections, self.database.max_connections
                )));
            }
        }
        Ok(())
    }

    pub fn currency(&self) -> Result<Currency, RuntimeError> {
        Currency::from_str(&self.currency)
            .map_err(|e| RuntimeError::invalid(format!("currency: {}", e)))
    }

    /// The wall clock in the configured timezone
    pub fn clock(&self) -> Result<SystemClock, RuntimeError> {
        Ok(SystemClock::from_timezone_name(&self.timezone)?)
    }

    /// Builds the category table, rejecting empty, zero-valued or duplicate entries
    pub fn category_table(&self) -> Result<CategoryTable, RuntimeError> {
        if self.categories.is_empty() {
            return Err(RuntimeError::invalid("at least one borrower category is required"));
        }
        CategoryTable::new(self.categories.clone())
            .map_err(|e| RuntimeError::invalid(format!("categories: {}", e)))
    }
}
