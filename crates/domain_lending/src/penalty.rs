//! Late-return penalties
//!
//! Every day a document stays out past its due date costs twice its per-diem
//! rate. The committed penalty is computed once, when the loan is closed;
//! estimates for loans still out are advisory.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::Money;

use crate::error::LendingError;

/// A late day is charged at this multiple of the per-diem rate
pub const PENALTY_MULTIPLIER: u32 = 2;

/// Late days and the penalty they cost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyEstimate {
    pub late_days: u32,
    pub penalty: Money,
    /// False when the figures come from a closed loan
    pub advisory: bool,
}

/// Pure penalty rules
#[derive(Debug, Clone, Copy, Default)]
pub struct PenaltyCalculator;

impl PenaltyCalculator {
    /// Counts days past `due_on`
    ///
    /// Uses `returned_on` when the loan is closed and `today` otherwise. A
    /// return on the due date itself is on time.
    pub fn late_days(due_on: NaiveDate, returned_on: Option<NaiveDate>, today: NaiveDate) -> u32 {
        let end = returned_on.unwrap_or(today);
        let days = (end - due_on).num_days().max(0);
        u32::try_from(days).unwrap_or(u32::MAX)
    }

    /// Penalty for a number of late days at a per-diem rate
    ///
    /// # Errors
    ///
    /// Returns `LendingError::Validation` for a negative rate
    pub fn penalty(late_days: u32, per_diem_rate: Money) -> Result<Money, LendingError> {
        if per_diem_rate.is_negative() {
            return Err(LendingError::validation(format!(
                "Per-diem rate must not be negative, got {}",
                per_diem_rate
            )));
        }
        if late_days == 0 {
            return Ok(Money::zero(per_diem_rate.currency()));
        }
        Ok(per_diem_rate
            .times_days(late_days)
            .multiply(Decimal::from(PENALTY_MULTIPLIER)))
    }
}
