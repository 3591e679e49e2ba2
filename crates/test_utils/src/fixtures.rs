//! Pre-built Test Fixtures
//!
//! Ready-to-use test data for the circulation desk. Fixtures are
//! deterministic so assertions can name exact dates and amounts.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use core_kernel::{BorrowerId, Currency, DocumentId, Money};
use domain_lending::{BorrowerCategory, CategoryTable};

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// Builds a euro amount
    pub fn eur(amount: Decimal) -> Money {
        Money::new(amount, Currency::EUR)
    }

    /// One euro a day, the rate most scenarios use
    pub fn standard_rate() -> Money {
        Self::eur(dec!(1.00))
    }

    pub fn eur_zero() -> Money {
        Money::zero(Currency::EUR)
    }

    /// A USD amount for currency mismatch tests
    pub fn usd_10() -> Money {
        Money::new(dec!(10.00), Currency::USD)
    }
}

/// Fixture for calendar dates
pub struct DateFixtures;

impl DateFixtures {
    /// Day the desk opens in every scenario (1 March 2024)
    pub fn opening_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    /// Last day of the year, for loans that straddle a year boundary
    pub fn new_years_eve() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
    }
}

/// Fixture for identifier test data
pub struct IdFixtures;

impl IdFixtures {
    /// Deterministic borrower ID
    pub fn borrower_id() -> BorrowerId {
        BorrowerId::from_uuid(Uuid::parse_str("6f1c2a40-5d2b-4f0e-9a61-3c0d1e7b9a01").unwrap())
    }

    /// Deterministic document ID
    pub fn document_id() -> DocumentId {
        DocumentId::from_uuid(Uuid::parse_str("6f1c2a40-5d2b-4f0e-9a61-3c0d1e7b9a02").unwrap())
    }
}

/// Fixture for borrower categories
pub struct CategoryFixtures;

impl CategoryFixtures {
    /// The shipped table: student, teacher, staff, visitor
    pub fn standard() -> CategoryTable {
        CategoryTable::standard()
    }

    /// A category with a single loan slot and a ten day loan
    ///
    /// Ten days sits exactly on the grace threshold, so no free days apply.
    pub fn threshold() -> BorrowerCategory {
        BorrowerCategory::new("threshold", 1, 10, 4)
    }

    /// Standard table plus [`CategoryFixtures::threshold`]
    pub fn with_threshold() -> CategoryTable {
        let mut categories: Vec<BorrowerCategory> = Self::standard().iter().cloned().collect();
        categories.push(Self::threshold());
        CategoryTable::new(categories).unwrap()
    }
}
