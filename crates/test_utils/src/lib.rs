//! Test Utilities Crate
//!
//! Shared test infrastructure for the circulation test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built test data for common entities
//! - `builders`: Builder patterns for documents, people and loans
//! - `desk`: A fully wired circulation desk over the in-memory store
//! - `database`: PostgreSQL testcontainer management
//! - `assertions`: Custom assertion helpers for domain types
//! - `generators`: Property-based test data generators

pub mod assertions;
pub mod builders;
pub mod database;
pub mod desk;
pub mod fixtures;
pub mod generators;

pub use assertions::*;
pub use builders::*;
pub use database::*;
pub use desk::*;
pub use fixtures::*;
pub use generators::*;
