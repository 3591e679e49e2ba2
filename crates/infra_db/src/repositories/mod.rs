//! Repository implementations for circulation records
//!
//! Each repository encapsulates the SQL for one table and maps rows to
//! domain types. Functions take a `&mut PgConnection` rather than the pool,
//! so the lending store can run several of them inside one transaction.
//!
//! Row locks are taken with `SELECT ... FOR UPDATE` when the caller asks
//! for them (`lock = true`).

pub mod catalog;
pub mod loans;
pub mod payments;
pub mod people;

pub use catalog::{CatalogRepository, DocumentRow};
pub use loans::{LoanRepository, LoanRow};
pub use payments::{PaymentRepository, PaymentRow};
pub use people::{PeopleRepository, PersonRow};

use rust_decimal::Decimal;
use std::str::FromStr;

use core_kernel::{Currency, Money};

use crate::error::DatabaseError;

pub(crate) fn money(amount: Decimal, currency: &str) -> Result<Money, DatabaseError> {
    let currency = Currency::from_str(currency)
        .map_err(|e| DatabaseError::serialization(e.to_string()))?;
    Ok(Money::new(amount, currency))
}

pub(crate) fn for_update(sql: &str, lock: bool) -> String {
    if lock {
        format!("{} FOR UPDATE", sql)
    } else {
        sql.to_string()
    }
}
