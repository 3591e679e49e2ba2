//! Core Kernel - Foundational types for the library circulation core
//!
//! This crate provides the building blocks shared by the domain and
//! infrastructure crates:
//! - Money types with precise decimal arithmetic
//! - Strongly-typed identifiers for borrowers, documents, loans and payments
//! - The calendar [`Clock`] port
//! - Port error and health-check types used at every collaborator boundary

pub mod money;
pub mod identifiers;
pub mod clock;
pub mod ports;
pub mod error;

pub use money::{Money, Currency, MoneyError};
pub use identifiers::{BorrowerId, DocumentId, LoanId, PaymentId};
pub use clock::{Clock, SystemClock, FixedClock};
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth,
};
pub use error::CoreError;
