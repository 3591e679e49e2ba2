//! Storage Adapters
//!
//! Implementations of the circulation storage ports on top of PostgreSQL.
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresLendingStore;
//! use domain_lending::LendingStore;
//!
//! let store = PostgresLendingStore::new(pool);
//! let mut uow = store.begin().await?;
//! let loan = uow.lock_loan(loan_id).await?;
//! ```

pub mod lending;

pub use lending::{PgUnitOfWork, PostgresLendingStore};
