//! Storage adapters bundled with the domain crate

pub mod memory;

pub use memory::{FailurePoint, InMemoryLendingStore};
