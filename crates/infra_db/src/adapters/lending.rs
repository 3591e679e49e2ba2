//! PostgreSQL Lending Store
//!
//! [`PostgresLendingStore`] hands out one database transaction per unit of
//! work. Row locks come from `SELECT ... FOR UPDATE` and are held until the
//! transaction ends, so two units touching the same loan or document queue
//! behind each other instead of interleaving.
//!
//! Dropping a [`PgUnitOfWork`] without committing rolls the transaction back
//! (sqlx issues the `ROLLBACK` when the connection returns to the pool).
//!
//! # Error Handling
//!
//! Database errors are translated to `PortError` variants:
//! - `DatabaseError::NotFound` -> `PortError::NotFound`
//! - `DatabaseError::DuplicateEntry` -> `PortError::Conflict`
//! - Check and foreign key violations -> `PortError::Validation`
//! - Connection problems -> `PortError::Connection`
//! - Other errors -> `PortError::Internal`

use std::time::Instant;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, info, instrument};

use core_kernel::{
    BorrowerId, DocumentId, DomainPort, HealthCheckResult, HealthCheckable, LoanId, Money,
    PaymentId, PortError,
};
use domain_lending::{
    BorrowerPort, CatalogPort, Document, LendingStore, LendingUnitOfWork, Loan, LoanPort, Payment,
    PaymentPort, Person,
};

use crate::error::DatabaseError;
use crate::repositories::{
    CatalogRepository, LoanRepository, PaymentRepository, PeopleRepository,
};

const ADAPTER_ID: &str = "postgres-lending-store";

/// PostgreSQL-backed implementation of [`LendingStore`]
#[derive(Debug, Clone)]
pub struct PostgresLendingStore {
    pool: PgPool,
}

impl PostgresLendingStore {
    /// Creates a store over an existing pool
    ///
    /// The schema is expected to be migrated already (see
    /// [`crate::run_migrations`]).
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Adds a document to the catalog in its own transaction
    #[instrument(skip(self, document), fields(document_id = %document.id()))]
    pub async fn insert_document(&self, document: &Document) -> Result<(), PortError> {
        let mut conn = self.pool.acquire().await.map_err(DatabaseError::from)?;
        CatalogRepository::insert(&mut conn, document).await?;
        debug!("Catalogued document");
        Ok(())
    }

    /// Adds a person to the directory in its own transaction
    #[instrument(skip(self, person), fields(person_id = %person.id()))]
    pub async fn insert_person(&self, person: &Person) -> Result<(), PortError> {
        let mut conn = self.pool.acquire().await.map_err(DatabaseError::from)?;
        PeopleRepository::insert(&mut conn, person).await?;
        debug!("Registered person");
        Ok(())
    }
}

impl DomainPort for PostgresLendingStore {}

#[async_trait]
impl HealthCheckable for PostgresLendingStore {
    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult::healthy(ADAPTER_ID, latency_ms),
            Err(e) => {
                HealthCheckResult::unhealthy(ADAPTER_ID, latency_ms, format!("Database error: {}", e))
            }
        }
    }
}

#[async_trait]
impl LendingStore for PostgresLendingStore {
    async fn begin(&self) -> Result<Box<dyn LendingUnitOfWork>, PortError> {
        let tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Closed lending store pool");
    }
}

// ============================================================================
// Unit of work
// ============================================================================

/// One open database transaction
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl CatalogPort for PgUnitOfWork {
    #[instrument(skip(self), fields(document_id = %id))]
    async fn lock_document(&mut self, id: DocumentId) -> Result<Document, PortError> {
        Ok(CatalogRepository::find(&mut self.tx, id, true).await?)
    }

    async fn fetch_document(&mut self, id: DocumentId) -> Result<Document, PortError> {
        Ok(CatalogRepository::find(&mut self.tx, id, false).await?)
    }

    async fn set_available(&mut self, id: DocumentId, available: bool) -> Result<(), PortError> {
        Ok(CatalogRepository::set_available(&mut self.tx, id, available).await?)
    }
}

#[async_trait]
impl BorrowerPort for PgUnitOfWork {
    #[instrument(skip(self), fields(borrower_id = %id))]
    async fn lock_person(&mut self, id: BorrowerId) -> Result<Person, PortError> {
        Ok(PeopleRepository::find(&mut self.tx, id, true).await?)
    }

    async fn count_active_loans(&mut self, id: BorrowerId) -> Result<u32, PortError> {
        Ok(PeopleRepository::count_active_loans(&mut self.tx, id).await?)
    }

    #[instrument(skip(self), fields(borrower_id = %id, delta = %delta))]
    async fn adjust_balance(&mut self, id: BorrowerId, delta: Money) -> Result<Money, PortError> {
        let person = PeopleRepository::find(&mut self.tx, id, true).await?;
        let current = person.balance();
        if current.currency() != delta.currency() {
            return Err(PortError::validation_field(
                format!(
                    "Balance of {} is kept in {}, not {}",
                    id,
                    current.currency(),
                    delta.currency()
                ),
                "balance",
            ));
        }

        let updated =
            PeopleRepository::adjust_balance(&mut self.tx, id, delta.amount()).await?;
        debug!(balance = %updated, "Adjusted balance");
        Ok(Money::new(updated, current.currency()))
    }
}

#[async_trait]
impl LoanPort for PgUnitOfWork {
    #[instrument(skip(self, loan), fields(loan_id = %loan.id))]
    async fn insert_loan(&mut self, loan: &Loan) -> Result<(), PortError> {
        LoanRepository::insert(&mut self.tx, loan)
            .await
            .map_err(|e| match e {
                DatabaseError::DuplicateEntry(_) => PortError::conflict(format!(
                    "Document {} already has an active loan",
                    loan.document_id
                )),
                other => other.into(),
            })
    }

    #[instrument(skip(self), fields(loan_id = %id))]
    async fn lock_loan(&mut self, id: LoanId) -> Result<Loan, PortError> {
        Ok(LoanRepository::find(&mut self.tx, id, true).await?)
    }

    async fn fetch_loan(&mut self, id: LoanId) -> Result<Loan, PortError> {
        Ok(LoanRepository::find(&mut self.tx, id, false).await?)
    }

    async fn update_loan(&mut self, loan: &Loan) -> Result<(), PortError> {
        Ok(LoanRepository::update(&mut self.tx, loan).await?)
    }

    async fn find_active_loan_for_document(
        &mut self,
        document_id: DocumentId,
    ) -> Result<Option<Loan>, PortError> {
        Ok(LoanRepository::find_active_for_document(&mut self.tx, document_id).await?)
    }

    async fn list_loans_for_borrower(
        &mut self,
        borrower_id: BorrowerId,
    ) -> Result<Vec<Loan>, PortError> {
        Ok(LoanRepository::list_for_borrower(&mut self.tx, borrower_id).await?)
    }
}

#[async_trait]
impl PaymentPort for PgUnitOfWork {
    #[instrument(skip(self, payment), fields(payment_id = %payment.id, reference = %payment.reference))]
    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), PortError> {
        PaymentRepository::insert(&mut self.tx, payment)
            .await
            .map_err(|e| match e {
                DatabaseError::DuplicateEntry(_) => PortError::conflict(format!(
                    "Payment reference {} already used",
                    payment.reference
                )),
                other => other.into(),
            })
    }

    #[instrument(skip(self), fields(payment_id = %id))]
    async fn lock_payment(&mut self, id: PaymentId) -> Result<Payment, PortError> {
        Ok(PaymentRepository::find(&mut self.tx, id, true).await?)
    }

    async fn fetch_payment(&mut self, id: PaymentId) -> Result<Payment, PortError> {
        Ok(PaymentRepository::find(&mut self.tx, id, false).await?)
    }

    async fn update_payment(&mut self, payment: &Payment) -> Result<(), PortError> {
        Ok(PaymentRepository::update(&mut self.tx, payment).await?)
    }

    async fn list_payments_for_borrower(
        &mut self,
        borrower_id: BorrowerId,
    ) -> Result<Vec<Payment>, PortError> {
        Ok(PaymentRepository::list_for_borrower(&mut self.tx, borrower_id).await?)
    }
}

#[async_trait]
impl LendingUnitOfWork for PgUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        self.tx.commit().await.map_err(|e| {
            PortError::from(DatabaseError::TransactionFailed(e.to_string()))
        })
    }
}
