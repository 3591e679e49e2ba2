//! Loan charge computation
//!
//! A loan is billed per day at the document's per-diem rate. Borrowers in
//! categories with grace days get those days free, but only when the loan
//! runs longer than [`GRACE_THRESHOLD_DAYS`]. The threshold is a hard cut:
//! a ten-day loan gets no free days at all.

use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::Money;

use crate::category::BorrowerCategory;
use crate::error::LendingError;

/// Loans strictly longer than this many days earn the category's grace days
pub const GRACE_THRESHOLD_DAYS: i64 = 10;

/// Result of a charge computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeQuote {
    pub free_days: u32,
    pub billable_days: u32,
    pub charge: Money,
}

/// Pure charge rules
#[derive(Debug, Clone, Copy, Default)]
pub struct FeePolicy;

impl FeePolicy {
    /// Computes free days, billable days and the charge for a loan duration
    ///
    /// # Arguments
    ///
    /// * `duration_days` - Loan duration in days
    /// * `category` - Borrower category supplying the grace days
    /// * `per_diem_rate` - Daily rate of the document
    ///
    /// # Errors
    ///
    /// Returns `LendingError::Validation` for a negative duration or rate
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let quote = FeePolicy::compute_charge(20, &student, rate)?;
    /// assert_eq!(quote.free_days, 5);
    /// assert_eq!(quote.billable_days, 15);
    /// ```
    pub fn compute_charge(
        duration_days: i64,
        category: &BorrowerCategory,
        per_diem_rate: Money,
    ) -> Result<FeeQuote, LendingError> {
        let quote = Self::charge_with_grace(duration_days, category.grace_days, per_diem_rate)?;
        debug!(
            duration_days,
            free_days = quote.free_days,
            billable_days = quote.billable_days,
            charge = %quote.charge,
            category = %category.code,
            "Computed loan charge"
        );
        Ok(quote)
    }

    /// Same rules as [`compute_charge`](Self::compute_charge), with the grace
    /// days given directly, as snapshotted on a loan
    ///
    /// # Errors
    ///
    /// Returns `LendingError::Validation` for a negative duration or rate
    pub fn charge_with_grace(
        duration_days: i64,
        grace_days: u32,
        per_diem_rate: Money,
    ) -> Result<FeeQuote, LendingError> {
        if duration_days < 0 {
            return Err(LendingError::validation(format!(
                "Loan duration must not be negative, got {} days",
                duration_days
            )));
        }
        if per_diem_rate.is_negative() {
            return Err(LendingError::validation(format!(
                "Per-diem rate must not be negative, got {}",
                per_diem_rate
            )));
        }

        let free_days = granted_grace(duration_days, grace_days);
        let billable = (duration_days - i64::from(free_days)).max(0);
        let billable_days = u32::try_from(billable).map_err(|_| {
            LendingError::validation(format!("Loan duration too large: {} days", duration_days))
        })?;

        Ok(FeeQuote {
            free_days,
            billable_days,
            charge: per_diem_rate.times_days(billable_days),
        })
    }

    /// Grace days granted for a duration: all of them above the threshold, none otherwise
    pub fn free_days(duration_days: i64, category: &BorrowerCategory) -> u32 {
        granted_grace(duration_days, category.grace_days)
    }
}

fn granted_grace(duration_days: i64, grace_days: u32) -> u32 {
    if duration_days > GRACE_THRESHOLD_DAYS {
        grace_days
    } else {
        0
    }
}
