//! Circulation runtime lifecycle
//!
//! [`LendingRuntime::start`] wires storage, clock and categories into the
//! ledger, reconciler and circulation facade. There is no global state: the
//! runtime owns everything it built and [`LendingRuntime::shutdown`] releases
//! it.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use core_kernel::{AdapterHealth, Clock, Currency, HealthCheckResult};
use domain_lending::{
    Circulation, Document, InMemoryLendingStore, LendingError, LendingStore, LoanLedger,
    PaymentReconciler, Person,
};
use infra_db::{create_pool, run_migrations, PostgresLendingStore};

use crate::config::{LendingConfig, StorageBackend};
use crate::error::RuntimeError;

/// The store the runtime was started with
#[derive(Debug, Clone)]
enum Backend {
    Memory(Arc<InMemoryLendingStore>),
    Postgres(Arc<PostgresLendingStore>),
}

impl Backend {
    fn store(&self) -> Arc<dyn LendingStore> {
        match self {
            Backend::Memory(store) => store.clone(),
            Backend::Postgres(store) => store.clone(),
        }
    }
}

/// A started circulation core
pub struct LendingRuntime {
    config: LendingConfig,
    currency: Currency,
    backend: Backend,
    clock: Arc<dyn Clock>,
    circulation: Circulation,
}

impl LendingRuntime {
    /// Starts the runtime on the wall clock of the configured timezone
    ///
    /// For postgres storage this opens the pool and applies pending
    /// migrations before anything else runs.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::InvalidConfig` for bad settings and
    /// `RuntimeError::Database` if the database is unreachable.
    pub async fn start(config: LendingConfig) -> Result<Self, RuntimeError> {
        let clock: Arc<dyn Clock> = Arc::new(config.clock()?);
        Self::start_with_clock(config, clock).await
    }

    /// Starts the runtime on a caller-supplied clock
    #[instrument(skip(config, clock), fields(storage = ?config.storage))]
    pub async fn start_with_clock(
        config: LendingConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RuntimeError> {
        config.validate()?;
        let currency = config.currency()?;
        let categories = Arc::new(config.category_table()?);

        let backend = match config.storage {
            StorageBackend::Memory => Backend::Memory(Arc::new(InMemoryLendingStore::new())),
            StorageBackend::Postgres => {
                let pool = create_pool(config.database.pool_config()).await?;
                run_migrations(&pool).await?;
                Backend::Postgres(Arc::new(PostgresLendingStore::new(pool)))
            }
        };

        let store = backend.store();
        let ledger = Arc::new(LoanLedger::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            Arc::clone(&categories),
        ));
        let reconciler = Arc::new(PaymentReconciler::new(store));
        let circulation = Circulation::new(ledger, reconciler);

        info!(
            currency = %currency,
            timezone = %config.timezone,
            categories = categories.len(),
            "Circulation runtime started"
        );

        Ok(Self {
            config,
            currency,
            backend,
            clock,
            circulation,
        })
    }

    pub fn config(&self) -> &LendingConfig {
        &self.config
    }

    /// The currency every rate and balance is kept in
    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn circulation(&self) -> &Circulation {
        &self.circulation
    }

    pub fn ledger(&self) -> &LoanLedger {
        self.circulation.ledger()
    }

    pub fn reconciler(&self) -> &PaymentReconciler {
        self.circulation.reconciler()
    }

    pub fn store(&self) -> Arc<dyn LendingStore> {
        self.backend.store()
    }

    /// Adds a document to the catalog
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::InvalidConfig` if the document is priced in
    /// another currency than the library's.
    pub async fn register_document(&self, document: Document) -> Result<(), RuntimeError> {
        let rate_currency = document.per_diem_rate().currency();
        if rate_currency != self.currency {
            return Err(RuntimeError::invalid(format!(
                "Document {} is priced in {}, library uses {}",
                document.id(),
                rate_currency,
                self.currency
            )));
        }

        match &self.backend {
            Backend::Memory(store) => store.insert_document(document).await,
            Backend::Postgres(store) => store
                .insert_document(&document)
                .await
                .map_err(LendingError::from)?,
        }
        Ok(())
    }

    /// Adds a person to the borrower directory
    pub async fn register_person(&self, person: Person) -> Result<(), RuntimeError> {
        let balance_currency = person.balance().currency();
        if balance_currency != self.currency {
            return Err(RuntimeError::invalid(format!(
                "Person {} has a balance in {}, library uses {}",
                person.id(),
                balance_currency,
                self.currency
            )));
        }

        match &self.backend {
            Backend::Memory(store) => store.insert_person(person).await,
            Backend::Postgres(store) => store
                .insert_person(&person)
                .await
                .map_err(LendingError::from)?,
        }
        Ok(())
    }

    pub async fn health(&self) -> HealthCheckResult {
        let result = self.store().health_check().await;
        if result.status != AdapterHealth::Healthy {
            warn!(
                adapter = %result.adapter_id,
                message = ?result.message,
                "Lending store unhealthy"
            );
        }
        result
    }

    /// Closes the store; units still open finish on their own connections
    pub async fn shutdown(self) {
        self.backend.store().close().await;
        info!("Circulation runtime stopped");
    }
}
