//! Loan aggregate
//!
//! A loan moves from `Active` to `Returned` exactly once. Its payment status
//! is tracked separately: a returned loan stays `Unpaid` until its penalty is
//! settled.
//!
//! # Invariants
//!
//! - `due_on = borrowed_on + max_duration_days`
//! - `max_duration_days`, `grace_days` and `per_diem_rate` are the terms in
//!   force at open and do not follow later category or catalog changes
//! - `returned_on` is set once, on close, and never changes afterwards
//! - `penalty_amount` is never negative and is fixed at close

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use core_kernel::{BorrowerId, DocumentId, LoanId, Money};

use crate::category::BorrowerCategory;
use crate::error::LendingError;
use crate::penalty::PenaltyCalculator;

/// Loan lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanState {
    Active,
    Returned,
}

impl LoanState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanState::Active => "active",
            LoanState::Returned => "returned",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(LoanState::Active),
            "returned" => Some(LoanState::Returned),
            _ => None,
        }
    }
}

/// Whether the loan's penalty has been settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanPaymentStatus {
    Unpaid,
    Paid,
}

impl LoanPaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanPaymentStatus::Unpaid => "unpaid",
            LoanPaymentStatus::Paid => "paid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unpaid" => Some(LoanPaymentStatus::Unpaid),
            "paid" => Some(LoanPaymentStatus::Paid),
            _ => None,
        }
    }
}

/// A borrowing transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub borrower_id: BorrowerId,
    pub document_id: DocumentId,
    /// Category the loan was opened under
    pub category_code: String,
    /// Document rate when the loan was opened; the charge is billed at this rate
    pub per_diem_rate: Money,
    pub borrowed_on: NaiveDate,
    pub due_on: NaiveDate,
    pub returned_on: Option<NaiveDate>,
    pub state: LoanState,
    pub max_duration_days: u32,
    /// Grace days of the category at open time
    pub grace_days: u32,
    pub penalty_amount: Money,
    pub payment_status: LoanPaymentStatus,
}

impl Loan {
    /// Opens a loan on `today` under the terms of `category`
    ///
    /// # Errors
    ///
    /// Returns `LendingError::Validation` if the due date overflows the calendar
    pub fn open(
        borrower_id: BorrowerId,
        document_id: DocumentId,
        category: &BorrowerCategory,
        per_diem_rate: Money,
        today: NaiveDate,
    ) -> Result<Self, LendingError> {
        let due_on = today
            .checked_add_days(Days::new(u64::from(category.base_duration_days)))
            .ok_or_else(|| {
                LendingError::validation(format!(
                    "Due date out of range: {} + {} days",
                    today, category.base_duration_days
                ))
            })?;

        Ok(Self {
            id: LoanId::new_v7(),
            borrower_id,
            document_id,
            category_code: category.code.clone(),
            per_diem_rate,
            borrowed_on: today,
            due_on,
            returned_on: None,
            state: LoanState::Active,
            max_duration_days: category.base_duration_days,
            grace_days: category.grace_days,
            penalty_amount: Money::zero(per_diem_rate.currency()),
            payment_status: LoanPaymentStatus::Unpaid,
        })
    }

    pub fn is_active(&self) -> bool {
        self.state == LoanState::Active
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == LoanPaymentStatus::Paid
    }

    /// True when a committed penalty is still waiting to be settled
    pub fn has_outstanding_penalty(&self) -> bool {
        self.penalty_amount.is_positive() && !self.is_paid()
    }

    /// Days past the due date, as of the return date or `today` while still out
    pub fn late_days(&self, today: NaiveDate) -> u32 {
        PenaltyCalculator::late_days(self.due_on, self.returned_on, today)
    }

    /// Closes the loan on `today`, fixing the penalty at the document's current rate
    ///
    /// # Errors
    ///
    /// Returns `LendingError::AlreadyReturned` if the loan is not active. The
    /// loan is left untouched in that case.
    pub fn close(&mut self, today: NaiveDate, per_diem_rate: Money) -> Result<(), LendingError> {
        if !self.is_active() {
            return Err(LendingError::AlreadyReturned { loan_id: self.id });
        }

        let late_days = PenaltyCalculator::late_days(self.due_on, Some(today), today);
        let penalty = PenaltyCalculator::penalty(late_days, per_diem_rate)?;

        self.returned_on = Some(today);
        self.state = LoanState::Returned;
        self.penalty_amount = penalty;
        Ok(())
    }

    pub fn mark_paid(&mut self) {
        self.payment_status = LoanPaymentStatus::Paid;
    }

    /// Reopens the penalty after the payment that settled it was cancelled
    pub fn mark_unpaid(&mut self) {
        self.payment_status = LoanPaymentStatus::Unpaid;
    }
}
