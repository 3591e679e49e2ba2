//! Circulation Runtime
//!
//! Process-level wiring for the circulation core:
//!
//! - [`config`]: layered configuration (`lending.toml`, `LENDING__*` env vars)
//! - [`telemetry`]: tracing subscriber set-up
//! - [`runtime`]: explicit start and shutdown of storage and services
//!
//! # Example
//!
//! ```rust,ignore
//! use app_runtime::{init_tracing, LendingConfig, LendingRuntime};
//!
//! let config = LendingConfig::load()?;
//! init_tracing(&config.log)?;
//! let runtime = LendingRuntime::start(config).await?;
//! let loan = runtime.circulation().checkout(borrower_id, document_id).await?;
//! runtime.shutdown().await;
//! ```

pub mod config;
pub mod error;
pub mod runtime;
pub mod telemetry;

pub use config::{DatabaseSettings, LendingConfig, LogSettings, StorageBackend};
pub use error::RuntimeError;
pub use runtime::LendingRuntime;
pub use telemetry::init_tracing;
