//! In-memory circulation desk
//!
//! Wires the ledger, reconciler and circulation facade over an
//! [`InMemoryLendingStore`] driven by a [`FixedClock`] that starts on
//! [`DateFixtures::opening_day`].

use std::sync::Arc;

use core_kernel::{BorrowerId, DocumentId, FixedClock, LoanId, Money};
use domain_lending::{
    CategoryTable, Circulation, Document, InMemoryLendingStore, LendingStore, Loan, LoanLedger,
    PaymentReconciler, Person,
};

use crate::fixtures::{CategoryFixtures, DateFixtures};

/// A circulation desk over seeded in-memory records
pub struct TestDesk {
    pub store: Arc<InMemoryLendingStore>,
    pub clock: Arc<FixedClock>,
    pub ledger: Arc<LoanLedger>,
    pub reconciler: Arc<PaymentReconciler>,
    pub circulation: Circulation,
}

impl TestDesk {
    /// Seeds the store and wires a desk with the standard categories
    pub async fn new(documents: Vec<Document>, people: Vec<Person>) -> Self {
        Self::with_categories(documents, people, CategoryFixtures::standard()).await
    }

    pub async fn with_categories(
        documents: Vec<Document>,
        people: Vec<Person>,
        categories: CategoryTable,
    ) -> Self {
        let store = Arc::new(InMemoryLendingStore::with_records(documents, people).await);
        let clock = Arc::new(FixedClock::new(DateFixtures::opening_day()));
        let dyn_store: Arc<dyn LendingStore> = store.clone();

        let ledger = Arc::new(LoanLedger::new(
            Arc::clone(&dyn_store),
            clock.clone(),
            Arc::new(categories),
        ));
        let reconciler = Arc::new(PaymentReconciler::new(dyn_store));
        let circulation = Circulation::new(Arc::clone(&ledger), Arc::clone(&reconciler));

        Self {
            store,
            clock,
            ledger,
            reconciler,
            circulation,
        }
    }

    /// Current balance of a seeded person
    ///
    /// # Panics
    ///
    /// Panics if the person is unknown
    pub async fn balance(&self, id: BorrowerId) -> Money {
        self.store.person(id).await.unwrap().balance()
    }

    pub async fn is_available(&self, id: DocumentId) -> bool {
        self.store.document(id).await.unwrap().is_available()
    }

    /// Opens a loan, moves the clock `days_late` days past its due date and
    /// closes it
    pub async fn late_return(&self, borrower: BorrowerId, document: DocumentId, days_late: u64) -> Loan {
        let loan = self.ledger.open_loan(borrower, document).await.unwrap();
        self.clock.set(loan.due_on);
        self.clock.advance_days(days_late);
        self.ledger.close_loan(loan.id).await.unwrap()
    }

    pub async fn loan(&self, id: LoanId) -> Loan {
        self.store.loan(id).await.unwrap()
    }
}
