//! Infrastructure Database Layer
//!
//! PostgreSQL storage for the circulation core, using SQLx.
//!
//! # Architecture
//!
//! - [`pool`]: connection pool configuration and schema migrations
//! - [`repositories`]: SQL for documents, people, loans and payments, written
//!   against a single connection so every call can run inside a transaction
//! - [`adapters`]: [`PostgresLendingStore`], the `LendingStore` implementation
//!   handing out one database transaction per unit of work
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresLendingStore};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/library")).await?;
//! run_migrations(&pool).await?;
//! let store = PostgresLendingStore::new(pool);
//! ```

pub mod adapters;
pub mod error;
pub mod pool;
pub mod repositories;

pub use adapters::PostgresLendingStore;
pub use error::DatabaseError;
pub use pool::{create_pool, create_pool_from_url, run_migrations, DatabaseConfig, DatabasePool};
