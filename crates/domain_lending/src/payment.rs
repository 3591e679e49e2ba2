//! Payments against a borrower's balance
//!
//! A payment is either linked to a loan (settling its penalty) or general.
//! It is created `Pending` and moves to `Validated` when its amount is
//! applied to the balance. Any payment that is not already `Cancelled` can be
//! cancelled; cancelling a validated payment puts its full `amount` back on
//! the balance, so a reopened penalty is owed again even when the balance
//! was already clear when it was paid.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{BorrowerId, LoanId, Money, PaymentId};

use crate::error::LendingError;

/// How the borrower paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    Cheque,
    /// Paid through an external online provider
    Online,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Cheque => "cheque",
            PaymentMethod::Online => "online",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "cash" => Some(PaymentMethod::Cash),
            "card" => Some(PaymentMethod::Card),
            "bank_transfer" => Some(PaymentMethod::BankTransfer),
            "cheque" => Some(PaymentMethod::Cheque),
            "online" => Some(PaymentMethod::Online),
            _ => None,
        }
    }
}

/// Payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Recorded but not yet applied to the balance
    Pending,
    /// Applied to the balance
    Validated,
    /// Terminal
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Validated => "validated",
            PaymentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(PaymentStatus::Pending),
            "validated" => Some(PaymentStatus::Validated),
            "cancelled" => Some(PaymentStatus::Cancelled),
            _ => None,
        }
    }
}

/// A payment record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub borrower_id: BorrowerId,
    /// Loan whose penalty this payment settles, if any
    pub loan_id: Option<LoanId>,
    pub amount: Money,
    /// What validation actually took off the balance; below `amount` when
    /// the balance was smaller than the payment. Kept for statements only.
    pub applied_amount: Money,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    /// Unique human-facing reference
    pub reference: String,
    pub motif: String,
    pub created_at: DateTime<Utc>,
    pub validated_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// Creates a pending payment
    ///
    /// # Arguments
    ///
    /// * `borrower_id` - Who is paying
    /// * `loan_id` - Loan being settled, `None` for a general payment
    /// * `amount` - Payment amount
    /// * `method` - Payment method
    /// * `reference` - Unique reference from the [`ReferenceGenerator`](crate::reference::ReferenceGenerator)
    /// * `motif` - Free-text reason shown on statements
    pub fn pending(
        borrower_id: BorrowerId,
        loan_id: Option<LoanId>,
        amount: Money,
        method: PaymentMethod,
        reference: impl Into<String>,
        motif: impl Into<String>,
    ) -> Self {
        Self {
            id: PaymentId::new_v7(),
            borrower_id,
            loan_id,
            amount,
            applied_amount: Money::zero(amount.currency()),
            method,
            status: PaymentStatus::Pending,
            reference: reference.into(),
            motif: motif.into(),
            created_at: Utc::now(),
            validated_at: None,
            cancelled_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending
    }

    pub fn is_validated(&self) -> bool {
        self.status == PaymentStatus::Validated
    }

    /// Marks the payment validated, recording what was deducted from the balance
    ///
    /// # Errors
    ///
    /// Returns `LendingError::InvalidTransition` unless the payment is pending
    pub fn validate(&mut self, applied_amount: Money) -> Result<(), LendingError> {
        if self.status != PaymentStatus::Pending {
            return Err(self.invalid_transition(PaymentStatus::Validated));
        }
        self.status = PaymentStatus::Validated;
        self.applied_amount = applied_amount;
        self.validated_at = Some(Utc::now());
        Ok(())
    }

    /// Cancels the payment and returns the amount to give back to the balance
    ///
    /// The returned amount is zero for a payment that was still pending.
    ///
    /// # Errors
    ///
    /// Returns `LendingError::InvalidTransition` if already cancelled
    pub fn cancel(&mut self) -> Result<Money, LendingError> {
        let restore = match self.status {
            PaymentStatus::Cancelled => {
                return Err(self.invalid_transition(PaymentStatus::Cancelled));
            }
            PaymentStatus::Validated => self.amount,
            PaymentStatus::Pending => Money::zero(self.amount.currency()),
        };
        self.status = PaymentStatus::Cancelled;
        self.cancelled_at = Some(Utc::now());
        Ok(restore)
    }

    fn invalid_transition(&self, to: PaymentStatus) -> LendingError {
        LendingError::InvalidTransition {
            payment_id: self.id,
            from: self.status,
            to,
        }
    }
}
