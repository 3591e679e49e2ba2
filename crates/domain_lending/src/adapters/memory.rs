//! In-memory lending store
//!
//! Keeps documents, people, loans and payments in hash maps behind a single
//! async mutex. A unit of work holds the mutex for its whole lifetime and
//! works on a staged copy of the state, written back on commit. Units are
//! therefore fully serialised, which gives the same observable outcome as
//! row locks for every circulation operation.
//!
//! Used by unit tests, demos and the `memory` storage backend.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use core_kernel::{
    AdapterHealth, BorrowerId, DocumentId, DomainPort, HealthCheckResult, HealthCheckable, LoanId,
    Money, PaymentId, PortError,
};

use crate::document::Document;
use crate::loan::Loan;
use crate::payment::Payment;
use crate::person::Person;
use crate::ports::{
    BorrowerPort, CatalogPort, LendingStore, LendingUnitOfWork, LoanPort, PaymentPort,
};

/// Write operations that can be made to fail once, for rollback tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    SetAvailable,
    InsertLoan,
    UpdateLoan,
    InsertPayment,
    UpdatePayment,
    AdjustBalance,
    Commit,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    documents: HashMap<DocumentId, Document>,
    people: HashMap<BorrowerId, Person>,
    loans: HashMap<LoanId, Loan>,
    payments: HashMap<PaymentId, Payment>,
}

type FailureSlot = Arc<StdMutex<Option<FailurePoint>>>;

/// Lending store backed by process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryLendingStore {
    state: Arc<Mutex<MemoryState>>,
    failure: FailureSlot,
}

impl InMemoryLendingStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------------
    // Seeding
    // ------------------------------------------------------------------------

    pub async fn insert_document(&self, document: Document) {
        self.state.lock().await.documents.insert(document.id(), document);
    }

    pub async fn insert_person(&self, person: Person) {
        self.state.lock().await.people.insert(person.id(), person);
    }

    /// Pre-populates the store with documents and people
    pub async fn with_records(documents: Vec<Document>, people: Vec<Person>) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.lock().await;
            for document in documents {
                state.documents.insert(document.id(), document);
            }
            for person in people {
                state.people.insert(person.id(), person);
            }
        }
        store
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    pub async fn document(&self, id: DocumentId) -> Option<Document> {
        self.state.lock().await.documents.get(&id).cloned()
    }

    pub async fn person(&self, id: BorrowerId) -> Option<Person> {
        self.state.lock().await.people.get(&id).cloned()
    }

    pub async fn loan(&self, id: LoanId) -> Option<Loan> {
        self.state.lock().await.loans.get(&id).cloned()
    }

    pub async fn payment(&self, id: PaymentId) -> Option<Payment> {
        self.state.lock().await.payments.get(&id).cloned()
    }

    pub async fn loan_count(&self) -> usize {
        self.state.lock().await.loans.len()
    }

    pub async fn payment_count(&self) -> usize {
        self.state.lock().await.payments.len()
    }

    // ------------------------------------------------------------------------
    // Failure injection
    // ------------------------------------------------------------------------

    /// Makes the next call reaching `point` fail with `PortError::Internal`
    pub fn fail_next(&self, point: FailurePoint) {
        *self.failure.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(point);
    }

    pub fn clear_failure(&self) {
        *self.failure.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}

impl DomainPort for InMemoryLendingStore {}

#[async_trait]
impl HealthCheckable for InMemoryLendingStore {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult {
            adapter_id: "memory-lending-store".to_string(),
            status: AdapterHealth::Healthy,
            latency_ms: 0,
            message: Some("In-memory store always healthy".to_string()),
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl LendingStore for InMemoryLendingStore {
    async fn begin(&self) -> Result<Box<dyn LendingUnitOfWork>, PortError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryUnitOfWork {
            guard,
            staged,
            failure: Arc::clone(&self.failure),
        }))
    }
}

/// Unit of work over the in-memory state
///
/// Dropping it releases the lock and discards `staged`.
struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
    failure: FailureSlot,
}

impl MemoryUnitOfWork {
    fn check(&self, point: FailurePoint) -> Result<(), PortError> {
        let mut slot = self.failure.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *slot == Some(point) {
            *slot = None;
            return Err(PortError::internal(format!("Injected failure at {:?}", point)));
        }
        Ok(())
    }

    fn document(&self, id: DocumentId) -> Result<Document, PortError> {
        self.staged
            .documents
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Document", id))
    }

    fn loan(&self, id: LoanId) -> Result<Loan, PortError> {
        self.staged
            .loans
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Loan", id))
    }

    fn payment(&self, id: PaymentId) -> Result<Payment, PortError> {
        self.staged
            .payments
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Payment", id))
    }
}

#[async_trait]
impl CatalogPort for MemoryUnitOfWork {
    async fn lock_document(&mut self, id: DocumentId) -> Result<Document, PortError> {
        self.document(id)
    }

    async fn fetch_document(&mut self, id: DocumentId) -> Result<Document, PortError> {
        self.document(id)
    }

    async fn set_available(&mut self, id: DocumentId, available: bool) -> Result<(), PortError> {
        self.check(FailurePoint::SetAvailable)?;
        let document = self
            .staged
            .documents
            .get_mut(&id)
            .ok_or_else(|| PortError::not_found("Document", id))?;
        document.set_available(available);
        Ok(())
    }
}

#[async_trait]
impl BorrowerPort for MemoryUnitOfWork {
    async fn lock_person(&mut self, id: BorrowerId) -> Result<Person, PortError> {
        self.staged
            .people
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Person", id))
    }

    async fn count_active_loans(&mut self, id: BorrowerId) -> Result<u32, PortError> {
        let count = self
            .staged
            .loans
            .values()
            .filter(|loan| loan.borrower_id == id && loan.is_active())
            .count();
        u32::try_from(count).map_err(|_| PortError::internal("Active loan count overflow"))
    }

    async fn adjust_balance(&mut self, id: BorrowerId, delta: Money) -> Result<Money, PortError> {
        self.check(FailurePoint::AdjustBalance)?;
        let person = self
            .staged
            .people
            .get_mut(&id)
            .ok_or_else(|| PortError::not_found("Person", id))?;

        let profile = person.profile_mut();
        let updated = profile
            .balance
            .checked_add(&delta)
            .map_err(|e| PortError::validation_field(e.to_string(), "balance"))?;
        if updated.is_negative() {
            return Err(PortError::validation_field(
                format!("Balance of {} would become {}", id, updated),
                "balance",
            ));
        }
        profile.balance = updated;
        debug!(borrower_id = %id, delta = %delta, balance = %updated, "Adjusted balance");
        Ok(updated)
    }
}

#[async_trait]
impl LoanPort for MemoryUnitOfWork {
    async fn insert_loan(&mut self, loan: &Loan) -> Result<(), PortError> {
        self.check(FailurePoint::InsertLoan)?;
        if self.staged.loans.contains_key(&loan.id) {
            return Err(PortError::conflict(format!("Loan {} already exists", loan.id)));
        }
        if loan.is_active()
            && self
                .staged
                .loans
                .values()
                .any(|other| other.document_id == loan.document_id && other.is_active())
        {
            return Err(PortError::conflict(format!(
                "Document {} already has an active loan",
                loan.document_id
            )));
        }
        self.staged.loans.insert(loan.id, loan.clone());
        Ok(())
    }

    async fn lock_loan(&mut self, id: LoanId) -> Result<Loan, PortError> {
        self.loan(id)
    }

    async fn fetch_loan(&mut self, id: LoanId) -> Result<Loan, PortError> {
        self.loan(id)
    }

    async fn update_loan(&mut self, loan: &Loan) -> Result<(), PortError> {
        self.check(FailurePoint::UpdateLoan)?;
        match self.staged.loans.get_mut(&loan.id) {
            Some(existing) => {
                *existing = loan.clone();
                Ok(())
            }
            None => Err(PortError::not_found("Loan", loan.id)),
        }
    }

    async fn find_active_loan_for_document(
        &mut self,
        document_id: DocumentId,
    ) -> Result<Option<Loan>, PortError> {
        Ok(self
            .staged
            .loans
            .values()
            .find(|loan| loan.document_id == document_id && loan.is_active())
            .cloned())
    }

    async fn list_loans_for_borrower(
        &mut self,
        borrower_id: BorrowerId,
    ) -> Result<Vec<Loan>, PortError> {
        let mut loans: Vec<Loan> = self
            .staged
            .loans
            .values()
            .filter(|loan| loan.borrower_id == borrower_id)
            .cloned()
            .collect();
        loans.sort_by(|a, b| a.borrowed_on.cmp(&b.borrowed_on).then(a.id.cmp(&b.id)));
        Ok(loans)
    }
}

#[async_trait]
impl PaymentPort for MemoryUnitOfWork {
    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), PortError> {
        self.check(FailurePoint::InsertPayment)?;
        if self.staged.payments.contains_key(&payment.id) {
            return Err(PortError::conflict(format!("Payment {} already exists", payment.id)));
        }
        if self
            .staged
            .payments
            .values()
            .any(|other| other.reference == payment.reference)
        {
            return Err(PortError::conflict(format!(
                "Payment reference {} already exists",
                payment.reference
            )));
        }
        self.staged.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn lock_payment(&mut self, id: PaymentId) -> Result<Payment, PortError> {
        self.payment(id)
    }

    async fn fetch_payment(&mut self, id: PaymentId) -> Result<Payment, PortError> {
        self.payment(id)
    }

    async fn update_payment(&mut self, payment: &Payment) -> Result<(), PortError> {
        self.check(FailurePoint::UpdatePayment)?;
        match self.staged.payments.get_mut(&payment.id) {
            Some(existing) => {
                *existing = payment.clone();
                Ok(())
            }
            None => Err(PortError::not_found("Payment", payment.id)),
        }
    }

    async fn list_payments_for_borrower(
        &mut self,
        borrower_id: BorrowerId,
    ) -> Result<Vec<Payment>, PortError> {
        let mut payments: Vec<Payment> = self
            .staged
            .payments
            .values()
            .filter(|payment| payment.borrower_id == borrower_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(payments)
    }
}

#[async_trait]
impl LendingUnitOfWork for MemoryUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        self.check(FailurePoint::Commit)?;
        let MemoryUnitOfWork { mut guard, staged, .. } = *self;
        *guard = staged;
        Ok(())
    }
}
