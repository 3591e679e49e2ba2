//! Desk-level circulation workflows
//!
//! Combines the ledger and the reconciler when one counter interaction
//! touches both: returning a late document and paying for it on the spot is
//! a single unit of work.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

use core_kernel::{BorrowerId, DocumentId, LoanId};

use crate::error::LendingError;
use crate::ledger::{log_rejection, LoanLedger};
use crate::loan::Loan;
use crate::payment::{Payment, PaymentMethod};
use crate::ports::{BorrowerPort, LendingStore, LendingUnitOfWork, LoanPort};
use crate::reconciler::PaymentReconciler;

/// Outcome of a return
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnReceipt {
    pub loan: Loan,
    /// Penalty payment taken at the desk, if any
    pub payment: Option<Payment>,
}

/// Front door for the circulation desk
#[derive(Clone)]
pub struct Circulation {
    ledger: Arc<LoanLedger>,
    reconciler: Arc<PaymentReconciler>,
}

impl Circulation {
    pub fn new(ledger: Arc<LoanLedger>, reconciler: Arc<PaymentReconciler>) -> Self {
        Self { ledger, reconciler }
    }

    pub fn ledger(&self) -> &LoanLedger {
        &self.ledger
    }

    pub fn reconciler(&self) -> &PaymentReconciler {
        &self.reconciler
    }

    pub async fn checkout(
        &self,
        borrower_id: BorrowerId,
        document_id: DocumentId,
    ) -> Result<Loan, LendingError> {
        self.ledger.open_loan(borrower_id, document_id).await
    }

    /// Closes a loan and, when `method` is given and the loan came back late,
    /// takes the penalty in the same unit of work
    ///
    /// If the payment cannot be recorded the return is rolled back as well.
    #[instrument(skip(self), fields(loan_id = %loan_id))]
    pub async fn return_document(
        &self,
        loan_id: LoanId,
        method: Option<PaymentMethod>,
    ) -> Result<ReturnReceipt, LendingError> {
        let result = async {
            let mut uow = self.ledger.store().begin().await?;

            // Take the borrower's row before the document's
            let loan = uow.lock_loan(loan_id).await?;
            if !loan.is_active() {
                return Err(LendingError::AlreadyReturned { loan_id });
            }
            uow.lock_person(loan.borrower_id).await?;

            let loan = self.ledger.close_in(uow.as_mut(), loan_id).await?;
            let payment = match method {
                Some(method) if loan.has_outstanding_penalty() => Some(
                    self.reconciler
                        .pay_penalty_in(uow.as_mut(), loan.borrower_id, loan_id, method)
                        .await?,
                ),
                _ => None,
            };
            let loan = match payment {
                Some(_) => uow.fetch_loan(loan_id).await?,
                None => loan,
            };

            uow.commit().await?;
            Ok::<_, LendingError>(ReturnReceipt { loan, payment })
        }
        .await;

        match &result {
            Ok(receipt) => info!(
                penalty = %receipt.loan.penalty_amount,
                paid = receipt.payment.is_some(),
                "Document returned"
            ),
            Err(error) => log_rejection("return_document", error),
        }
        result
    }
}
