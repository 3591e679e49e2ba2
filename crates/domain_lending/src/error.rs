//! Circulation domain errors
//!
//! Business-rule failures are returned to the caller as-is. Anything the
//! storage collaborator reports that is not a lookup miss or a validation
//! rejection surfaces as [`LendingError::Storage`].

use thiserror::Error;

use core_kernel::{BorrowerId, DocumentId, LoanId, MoneyError, PaymentId, PortError};

use crate::payment::PaymentStatus;

/// Errors that can occur in the circulation domain
#[derive(Debug, Error)]
pub enum LendingError {
    /// Malformed input: negative amounts, unknown category, wrong borrower
    #[error("Validation error: {0}")]
    Validation(String),

    /// The document is already out on loan
    #[error("Document {document_id} is not available")]
    NotAvailable { document_id: DocumentId },

    /// The borrower already holds as many active loans as their category allows
    #[error("Borrow limit reached for {borrower_id}: {active} active loans, limit {limit}")]
    LimitExceeded {
        borrower_id: BorrowerId,
        active: u32,
        limit: u32,
    },

    /// The loan has already been closed
    #[error("Loan {loan_id} has already been returned")]
    AlreadyReturned { loan_id: LoanId },

    /// The loan carries no outstanding penalty
    #[error("Nothing to pay on loan {loan_id}")]
    NothingToPay { loan_id: LoanId },

    /// Unknown loan, payment, document or person
    #[error("Not found: {entity} {id}")]
    NotFound { entity: String, id: String },

    /// Payment status change not allowed from the current status
    #[error("Invalid transition for payment {payment_id}: {from:?} -> {to:?}")]
    InvalidTransition {
        payment_id: PaymentId,
        from: PaymentStatus,
        to: PaymentStatus,
    },

    /// Collaborator failure; the whole operation was rolled back
    #[error("Storage error: {0}")]
    Storage(#[source] PortError),
}

impl LendingError {
    pub fn validation(message: impl Into<String>) -> Self {
        LendingError::Validation(message.into())
    }

    pub fn not_found(entity: impl Into<String>, id: impl std::fmt::Display) -> Self {
        LendingError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// True for business-rule rejections, false for lookup and storage failures
    pub fn is_business_rule(&self) -> bool {
        matches!(
            self,
            LendingError::NotAvailable { .. }
                | LendingError::LimitExceeded { .. }
                | LendingError::AlreadyReturned { .. }
                | LendingError::NothingToPay { .. }
                | LendingError::InvalidTransition { .. }
        )
    }
}

impl From<PortError> for LendingError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::NotFound { entity_type, id } => LendingError::NotFound {
                entity: entity_type,
                id,
            },
            PortError::Validation { message, .. } => LendingError::Validation(message),
            other => LendingError::Storage(other),
        }
    }
}

impl From<MoneyError> for LendingError {
    fn from(error: MoneyError) -> Self {
        LendingError::Validation(error.to_string())
    }
}
