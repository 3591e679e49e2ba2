//! Borrower categories
//!
//! A category is configuration, not a live entity: it fixes how many loans a
//! borrower may hold at once, how long each loan runs and how many days of
//! the loan are free of charge.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::LendingError;

/// Borrowing terms attached to a category code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowerCategory {
    /// Category code referenced by borrower profiles (e.g. "student")
    pub code: String,
    /// Maximum number of concurrent active loans
    pub borrow_limit: u32,
    /// Loan duration granted at open time
    pub base_duration_days: u32,
    /// Free days, granted only on loans longer than ten days
    #[serde(default)]
    pub grace_days: u32,
}

impl BorrowerCategory {
    pub fn new(
        code: impl Into<String>,
        borrow_limit: u32,
        base_duration_days: u32,
        grace_days: u32,
    ) -> Self {
        Self {
            code: code.into(),
            borrow_limit,
            base_duration_days,
            grace_days,
        }
    }

    /// Checks the category terms are usable
    ///
    /// # Errors
    ///
    /// Returns `LendingError::Validation` for an empty code, a zero borrow
    /// limit or a zero duration.
    pub fn validate(&self) -> Result<(), LendingError> {
        if self.code.trim().is_empty() {
            return Err(LendingError::validation("Category code must not be empty"));
        }
        if self.borrow_limit == 0 {
            return Err(LendingError::validation(format!(
                "Category '{}' must allow at least one loan",
                self.code
            )));
        }
        if self.base_duration_days == 0 {
            return Err(LendingError::validation(format!(
                "Category '{}' must grant at least one day",
                self.code
            )));
        }
        Ok(())
    }
}

/// Lookup table of borrower categories keyed by code
#[derive(Debug, Clone, Default)]
pub struct CategoryTable {
    categories: BTreeMap<String, BorrowerCategory>,
}

impl CategoryTable {
    /// Builds a table, validating every category and rejecting duplicate codes
    pub fn new(categories: Vec<BorrowerCategory>) -> Result<Self, LendingError> {
        let mut table = BTreeMap::new();
        for category in categories {
            category.validate()?;
            if table.contains_key(&category.code) {
                return Err(LendingError::validation(format!(
                    "Duplicate category code '{}'",
                    category.code
                )));
            }
            table.insert(category.code.clone(), category);
        }
        Ok(Self { categories: table })
    }

    /// The categories the library ships with
    pub fn standard() -> Self {
        let categories = [
            BorrowerCategory::new("student", 3, 20, 5),
            BorrowerCategory::new("teacher", 5, 30, 7),
            BorrowerCategory::new("staff", 5, 15, 0),
            BorrowerCategory::new("visitor", 1, 7, 0),
        ];
        Self {
            categories: categories
                .into_iter()
                .map(|c| (c.code.clone(), c))
                .collect(),
        }
    }

    /// Looks up a category by code
    ///
    /// # Errors
    ///
    /// An unknown code is a data error on the borrower record, reported as
    /// `LendingError::Validation`.
    pub fn get(&self, code: &str) -> Result<&BorrowerCategory, LendingError> {
        self.categories
            .get(code)
            .ok_or_else(|| LendingError::validation(format!("Unknown borrower category '{}'", code)))
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BorrowerCategory> {
        self.categories.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_contains_student() {
        let table = CategoryTable::standard();
        let student = table.get("student").unwrap();
        assert_eq!(student.base_duration_days, 20);
        assert_eq!(student.grace_days, 5);
    }

    #[test]
    fn test_duplicate_codes_rejected() {
        let result = CategoryTable::new(vec![
            BorrowerCategory::new("student", 3, 20, 5),
            BorrowerCategory::new("student", 2, 10, 0),
        ]);
        assert!(matches!(result, Err(LendingError::Validation(_))));
    }

    #[test]
    fn test_zero_limit_rejected() {
        let category = BorrowerCategory::new("frozen", 0, 20, 0);
        assert!(category.validate().is_err());
    }

    #[test]
    fn test_unknown_category_is_validation_error() {
        let table = CategoryTable::standard();
        assert!(matches!(table.get("alumni"), Err(LendingError::Validation(_))));
    }
}
