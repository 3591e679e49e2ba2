//! Runtime error handling

use thiserror::Error;

use core_kernel::CoreError;
use domain_lending::LendingError;
use infra_db::DatabaseError;

/// Errors raised while loading configuration or starting the runtime
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Lending error: {0}")]
    Lending(#[from] LendingError),

    #[error("Telemetry error: {0}")]
    Telemetry(String),
}

impl RuntimeError {
    pub fn invalid(message: impl Into<String>) -> Self {
        RuntimeError::InvalidConfig(message.into())
    }
}

impl From<CoreError> for RuntimeError {
    fn from(error: CoreError) -> Self {
        RuntimeError::InvalidConfig(error.to_string())
    }
}
