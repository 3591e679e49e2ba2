//! Loan ledger
//!
//! Owns the loan state machine. Opening a loan reserves the document and
//! closing it releases the document; both happen in the same unit of work as
//! the loan write, so an active loan and an unavailable document always go
//! together.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use core_kernel::{BorrowerId, Clock, DocumentId, LoanId, Money};

use crate::category::CategoryTable;
use crate::error::LendingError;
use crate::fee::FeePolicy;
use crate::loan::Loan;
use crate::penalty::{PenaltyCalculator, PenaltyEstimate};
use crate::ports::{BorrowerPort, CatalogPort, LendingStore, LendingUnitOfWork, LoanPort};

/// Everything a borrower owes on one loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeBreakdown {
    pub loan_id: LoanId,
    pub free_days: u32,
    pub billable_days: u32,
    pub charge: Money,
    pub penalty: Money,
    pub total: Money,
}

/// Loan lifecycle service
pub struct LoanLedger {
    store: Arc<dyn LendingStore>,
    clock: Arc<dyn Clock>,
    categories: Arc<CategoryTable>,
}

impl LoanLedger {
    pub fn new(
        store: Arc<dyn LendingStore>,
        clock: Arc<dyn Clock>,
        categories: Arc<CategoryTable>,
    ) -> Self {
        Self {
            store,
            clock,
            categories,
        }
    }

    pub fn store(&self) -> &Arc<dyn LendingStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn categories(&self) -> &CategoryTable {
        &self.categories
    }

    // ========================================================================
    // State transitions
    // ========================================================================

    /// Opens a loan of `document_id` for `borrower_id`
    ///
    /// This method:
    /// 1. Locks the borrower and resolves their category
    /// 2. Locks the document and checks it is on the shelf
    /// 3. Checks the borrower is under their borrow limit
    /// 4. Stores the active loan and marks the document unavailable
    ///
    /// # Errors
    ///
    /// - `NotAvailable` if the document is out
    /// - `LimitExceeded` if the borrower already holds `borrow_limit` loans
    /// - `Validation` for an unknown category or a person who may not borrow
    /// - `NotFound` for an unknown borrower or document
    ///
    /// Nothing is written when any of these is returned.
    #[instrument(skip(self), fields(borrower_id = %borrower_id, document_id = %document_id))]
    pub async fn open_loan(
        &self,
        borrower_id: BorrowerId,
        document_id: DocumentId,
    ) -> Result<Loan, LendingError> {
        let result = async {
            let mut uow = self.store.begin().await?;
            let loan = self.open_in(uow.as_mut(), borrower_id, document_id).await?;
            uow.commit().await?;
            Ok::<_, LendingError>(loan)
        }
        .await;

        match &result {
            Ok(loan) => info!(
                loan_id = %loan.id,
                due_on = %loan.due_on,
                "Loan opened"
            ),
            Err(error) => log_rejection("open_loan", error),
        }
        result
    }

    pub(crate) async fn open_in(
        &self,
        uow: &mut dyn LendingUnitOfWork,
        borrower_id: BorrowerId,
        document_id: DocumentId,
    ) -> Result<Loan, LendingError> {
        let person = uow.lock_person(borrower_id).await?;
        let profile = person.borrowing_profile().ok_or_else(|| {
            LendingError::validation(format!(
                "{} has role {} and may not borrow",
                borrower_id,
                person.role().as_str()
            ))
        })?;
        let category = self.categories.get(&profile.category)?;

        let document = uow.lock_document(document_id).await?;
        if !document.is_available() {
            return Err(LendingError::NotAvailable { document_id });
        }

        let active = uow.count_active_loans(borrower_id).await?;
        if active >= category.borrow_limit {
            return Err(LendingError::LimitExceeded {
                borrower_id,
                active,
                limit: category.borrow_limit,
            });
        }

        let loan = Loan::open(
            borrower_id,
            document_id,
            category,
            document.per_diem_rate(),
            self.clock.today(),
        )?;
        uow.insert_loan(&loan).await?;
        uow.set_available(document_id, false).await?;
        Ok(loan)
    }

    /// Closes an active loan as of today
    ///
    /// The penalty is fixed here, at the document's current per-diem rate.
    /// The borrower's balance is not touched.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyReturned` if the loan was closed before; the first
    /// close's return date and penalty stay as they were.
    #[instrument(skip(self), fields(loan_id = %loan_id))]
    pub async fn close_loan(&self, loan_id: LoanId) -> Result<Loan, LendingError> {
        let result = async {
            let mut uow = self.store.begin().await?;
            let loan = self.close_in(uow.as_mut(), loan_id).await?;
            uow.commit().await?;
            Ok::<_, LendingError>(loan)
        }
        .await;

        match &result {
            Ok(loan) => info!(
                document_id = %loan.document_id,
                penalty = %loan.penalty_amount,
                "Loan closed"
            ),
            Err(error) => log_rejection("close_loan", error),
        }
        result
    }

    pub(crate) async fn close_in(
        &self,
        uow: &mut dyn LendingUnitOfWork,
        loan_id: LoanId,
    ) -> Result<Loan, LendingError> {
        let mut loan = uow.lock_loan(loan_id).await?;
        if !loan.is_active() {
            return Err(LendingError::AlreadyReturned { loan_id });
        }

        let document = uow.lock_document(loan.document_id).await?;
        loan.close(self.clock.today(), document.per_diem_rate())?;

        uow.update_loan(&loan).await?;
        uow.set_available(loan.document_id, true).await?;
        Ok(loan)
    }

    // ========================================================================
    // Charges
    // ========================================================================

    /// Loan charge plus committed penalty
    ///
    /// The charge covers the duration and grace days granted at open time,
    /// billed at the rate the loan was opened with.
    pub fn compute_total_due(&self, loan: &Loan) -> Result<Money, LendingError> {
        Ok(self.breakdown(loan)?.total)
    }

    /// Free days, billable days, charge and penalty of a stored loan
    #[instrument(skip(self), fields(loan_id = %loan_id))]
    pub async fn charge_breakdown(&self, loan_id: LoanId) -> Result<ChargeBreakdown, LendingError> {
        let loan = self.get_loan(loan_id).await?;
        self.breakdown(&loan)
    }

    fn breakdown(&self, loan: &Loan) -> Result<ChargeBreakdown, LendingError> {
        let quote = FeePolicy::charge_with_grace(
            i64::from(loan.max_duration_days),
            loan.grace_days,
            loan.per_diem_rate,
        )?;
        let total = quote.charge.checked_add(&loan.penalty_amount)?;

        Ok(ChargeBreakdown {
            loan_id: loan.id,
            free_days: quote.free_days,
            billable_days: quote.billable_days,
            charge: quote.charge,
            penalty: loan.penalty_amount,
            total,
        })
    }

    /// Late days and penalty of a loan
    ///
    /// For a returned loan these are the committed figures. For a loan still
    /// out they are an estimate as of today, at the document's current rate;
    /// the figures fixed at close take precedence.
    #[instrument(skip(self), fields(loan_id = %loan_id))]
    pub async fn estimate_penalty(&self, loan_id: LoanId) -> Result<PenaltyEstimate, LendingError> {
        let mut uow = self.store.begin().await?;
        let loan = uow.fetch_loan(loan_id).await?;
        let today = self.clock.today();

        if !loan.is_active() {
            return Ok(PenaltyEstimate {
                late_days: loan.late_days(today),
                penalty: loan.penalty_amount,
                advisory: false,
            });
        }

        let rate = uow.per_diem_rate(loan.document_id).await?;
        let late_days = loan.late_days(today);
        Ok(PenaltyEstimate {
            late_days,
            penalty: PenaltyCalculator::penalty(late_days, rate)?,
            advisory: true,
        })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub async fn get_loan(&self, loan_id: LoanId) -> Result<Loan, LendingError> {
        let mut uow = self.store.begin().await?;
        Ok(uow.fetch_loan(loan_id).await?)
    }

    /// All loans of a borrower, oldest first
    pub async fn loans_for_borrower(&self, borrower_id: BorrowerId) -> Result<Vec<Loan>, LendingError> {
        let mut uow = self.store.begin().await?;
        Ok(uow.list_loans_for_borrower(borrower_id).await?)
    }

    /// The active loan holding a document, if any
    pub async fn active_loan_for_document(
        &self,
        document_id: DocumentId,
    ) -> Result<Option<Loan>, LendingError> {
        let mut uow = self.store.begin().await?;
        Ok(uow.find_active_loan_for_document(document_id).await?)
    }
}

/// Logs a failed operation at a level matching its cause
pub(crate) fn log_rejection(operation: &'static str, error: &LendingError) {
    match error {
        LendingError::Storage(source) => warn!(operation, error = %source, "Storage failure, rolled back"),
        other => warn!(operation, error = %other, "Operation rejected"),
    }
}
