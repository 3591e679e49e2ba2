//! Circulation Storage Ports
//!
//! The circulation core reads and writes documents, people, loans and
//! payments through the port traits defined here. Every write happens inside
//! a [`LendingUnitOfWork`] obtained from a [`LendingStore`]: either the whole
//! unit commits, or nothing it did is visible.
//!
//! # Architecture
//!
//! - **Postgres adapter** (`infra_db`): one database transaction per unit,
//!   row locks taken with `SELECT ... FOR UPDATE`
//! - **In-memory adapter** ([`crate::adapters::memory`]): one store-wide lock
//!   per unit, changes staged on a copy until commit
//!
//! # Lock order
//!
//! Operations that lock several rows take them in this order:
//!
//! ```text
//! payment -> loan -> person -> document
//! ```
//!
//! Locking the same row twice within one unit is allowed.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut uow = store.begin().await?;
//! let mut loan = uow.lock_loan(loan_id).await?;
//! loan.mark_paid();
//! uow.update_loan(&loan).await?;
//! uow.commit().await?;
//! // Dropping `uow` without calling `commit` rolls everything back
//! ```

use async_trait::async_trait;

use core_kernel::{
    BorrowerId, DocumentId, DomainPort, HealthCheckable, LoanId, Money, PaymentId, PortError,
};

use crate::document::Document;
use crate::loan::Loan;
use crate::payment::Payment;
use crate::person::Person;

// ============================================================================
// Catalog
// ============================================================================

/// Document availability and pricing
#[async_trait]
pub trait CatalogPort: Send {
    /// Loads a document and locks it until the unit ends
    ///
    /// # Returns
    ///
    /// The document, or `PortError::NotFound`
    async fn lock_document(&mut self, id: DocumentId) -> Result<Document, PortError>;

    /// Loads a document without locking it
    async fn fetch_document(&mut self, id: DocumentId) -> Result<Document, PortError>;

    /// Flips the availability flag
    async fn set_available(&mut self, id: DocumentId, available: bool) -> Result<(), PortError>;

    async fn is_available(&mut self, id: DocumentId) -> Result<bool, PortError> {
        Ok(self.fetch_document(id).await?.is_available())
    }

    async fn per_diem_rate(&mut self, id: DocumentId) -> Result<Money, PortError> {
        Ok(self.fetch_document(id).await?.per_diem_rate())
    }
}

// ============================================================================
// Borrower directory
// ============================================================================

/// People, their categories and balances
#[async_trait]
pub trait BorrowerPort: Send {
    /// Loads a person and locks them until the unit ends
    async fn lock_person(&mut self, id: BorrowerId) -> Result<Person, PortError>;

    /// Number of loans in state `Active` held by the person
    async fn count_active_loans(&mut self, id: BorrowerId) -> Result<u32, PortError>;

    /// Adds `delta` to the person's balance and returns the new balance
    ///
    /// # Returns
    ///
    /// `PortError::Validation` if the balance would drop below zero
    async fn adjust_balance(&mut self, id: BorrowerId, delta: Money) -> Result<Money, PortError>;

    async fn category(&mut self, id: BorrowerId) -> Result<String, PortError> {
        Ok(self.lock_person(id).await?.category().to_string())
    }

    async fn balance(&mut self, id: BorrowerId) -> Result<Money, PortError> {
        Ok(self.lock_person(id).await?.balance())
    }
}

// ============================================================================
// Loans
// ============================================================================

#[async_trait]
pub trait LoanPort: Send {
    /// Stores a new loan
    ///
    /// # Returns
    ///
    /// `PortError::Conflict` if the document already has an active loan
    async fn insert_loan(&mut self, loan: &Loan) -> Result<(), PortError>;

    /// Loads a loan and locks it until the unit ends
    async fn lock_loan(&mut self, id: LoanId) -> Result<Loan, PortError>;

    /// Loads a loan without locking it
    async fn fetch_loan(&mut self, id: LoanId) -> Result<Loan, PortError>;

    async fn update_loan(&mut self, loan: &Loan) -> Result<(), PortError>;

    async fn find_active_loan_for_document(
        &mut self,
        document_id: DocumentId,
    ) -> Result<Option<Loan>, PortError>;

    /// All loans of a borrower, oldest first
    async fn list_loans_for_borrower(&mut self, borrower_id: BorrowerId)
        -> Result<Vec<Loan>, PortError>;
}

// ============================================================================
// Payments
// ============================================================================

#[async_trait]
pub trait PaymentPort: Send {
    /// Stores a new payment
    ///
    /// # Returns
    ///
    /// `PortError::Conflict` if the reference is already taken
    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), PortError>;

    /// Loads a payment and locks it until the unit ends
    async fn lock_payment(&mut self, id: PaymentId) -> Result<Payment, PortError>;

    async fn fetch_payment(&mut self, id: PaymentId) -> Result<Payment, PortError>;

    async fn update_payment(&mut self, payment: &Payment) -> Result<(), PortError>;

    /// All payments of a borrower, oldest first
    async fn list_payments_for_borrower(
        &mut self,
        borrower_id: BorrowerId,
    ) -> Result<Vec<Payment>, PortError>;
}

// ============================================================================
// Unit of work
// ============================================================================

/// A scoped storage transaction
///
/// Dropping the unit without calling [`commit`](LendingUnitOfWork::commit)
/// rolls it back, on every exit path including `?` and panics.
#[async_trait]
pub trait LendingUnitOfWork: CatalogPort + BorrowerPort + LoanPort + PaymentPort + Send {
    async fn commit(self: Box<Self>) -> Result<(), PortError>;
}

/// Storage handle shared by the ledger and the reconciler
#[async_trait]
pub trait LendingStore: DomainPort + HealthCheckable {
    /// Opens a unit of work
    async fn begin(&self) -> Result<Box<dyn LendingUnitOfWork>, PortError>;

    /// Releases the store's resources; further `begin` calls may fail
    async fn close(&self) {}
}
