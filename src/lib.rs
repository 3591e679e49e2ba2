//! Open Library Core
//!
//! Loan lifecycle and billing for a library circulation desk. This crate
//! only re-exports the workspace members:
//!
//! - [`kernel`]: money, identifiers, clock and port plumbing
//! - [`lending`]: categories, fees, penalties, the loan ledger and the
//!   payment reconciler
//! - [`db`]: the PostgreSQL lending store
//! - [`runtime`]: configuration, tracing and lifecycle

pub use app_runtime as runtime;
pub use core_kernel as kernel;
pub use domain_lending as lending;
pub use infra_db as db;

pub use app_runtime::{LendingConfig, LendingRuntime};
