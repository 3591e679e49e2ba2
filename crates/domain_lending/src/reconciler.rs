//! Payment reconciliation
//!
//! The only component allowed to change a borrower's balance. A payment
//! takes `min(amount, balance)` off the balance so the balance never goes
//! below zero; the deducted part is recorded on the payment as
//! `applied_amount`. Cancelling a validated payment puts its full `amount`
//! back on the balance.
//!
//! A loan-linked payment always settles the loan's whole committed penalty:
//! it is only accepted for a returned loan with an unpaid penalty, for
//! exactly that penalty.

use std::sync::Arc;
use tracing::{info, instrument};

use core_kernel::{BorrowerId, LoanId, Money, PaymentId};

use crate::error::LendingError;
use crate::ledger::log_rejection;
use crate::loan::Loan;
use crate::payment::{Payment, PaymentMethod, PaymentStatus};
use crate::ports::{BorrowerPort, LendingStore, LendingUnitOfWork, LoanPort, PaymentPort};
use crate::reference::ReferenceGenerator;

/// Payment service
pub struct PaymentReconciler {
    store: Arc<dyn LendingStore>,
    references: ReferenceGenerator,
}

impl PaymentReconciler {
    pub fn new(store: Arc<dyn LendingStore>) -> Self {
        Self {
            store,
            references: ReferenceGenerator::new(),
        }
    }

    // ========================================================================
    // Immediate payments
    // ========================================================================

    /// Settles the committed penalty of a returned loan
    ///
    /// Records a validated payment of the full penalty, takes it off the
    /// borrower's balance (floored at zero) and marks the loan paid.
    ///
    /// # Errors
    ///
    /// - `NothingToPay` if the loan has no penalty or it was already paid
    /// - `Validation` if the loan belongs to another borrower
    #[instrument(skip(self), fields(borrower_id = %borrower_id, loan_id = %loan_id))]
    pub async fn pay_penalty(
        &self,
        borrower_id: BorrowerId,
        loan_id: LoanId,
        method: PaymentMethod,
    ) -> Result<Payment, LendingError> {
        let result = async {
            let mut uow = self.store.begin().await?;
            let payment = self.pay_penalty_in(uow.as_mut(), borrower_id, loan_id, method).await?;
            uow.commit().await?;
            Ok::<_, LendingError>(payment)
        }
        .await;
        log_outcome("pay_penalty", &result);
        result
    }

    pub(crate) async fn pay_penalty_in(
        &self,
        uow: &mut dyn LendingUnitOfWork,
        borrower_id: BorrowerId,
        loan_id: LoanId,
        method: PaymentMethod,
    ) -> Result<Payment, LendingError> {
        let mut loan = uow.lock_loan(loan_id).await?;
        ensure_settles_penalty(&loan, borrower_id, loan.penalty_amount)?;

        let mut payment = Payment::pending(
            borrower_id,
            Some(loan_id),
            loan.penalty_amount,
            method,
            self.references.next(borrower_id, Some(loan_id)),
            format!("Late penalty for loan {}", loan_id),
        );
        self.apply(uow, &mut payment).await?;
        uow.insert_payment(&payment).await?;

        loan.mark_paid();
        uow.update_loan(&loan).await?;
        Ok(payment)
    }

    /// Records a payment that is not tied to a loan
    ///
    /// # Errors
    ///
    /// Returns `Validation` unless `amount` is strictly positive
    #[instrument(skip(self, motif), fields(borrower_id = %borrower_id, amount = %amount))]
    pub async fn pay_general(
        &self,
        borrower_id: BorrowerId,
        amount: Money,
        method: PaymentMethod,
        motif: &str,
    ) -> Result<Payment, LendingError> {
        let result = async {
            ensure_positive(amount)?;
            let mut uow = self.store.begin().await?;
            uow.lock_person(borrower_id).await?;

            let mut payment = Payment::pending(
                borrower_id,
                None,
                amount,
                method,
                self.references.next(borrower_id, None),
                motif,
            );
            self.apply(uow.as_mut(), &mut payment).await?;
            uow.insert_payment(&payment).await?;
            uow.commit().await?;
            Ok::<_, LendingError>(payment)
        }
        .await;
        log_outcome("pay_general", &result);
        result
    }

    // ========================================================================
    // Staged payments
    // ========================================================================

    /// Records a pending payment, for instance one awaiting confirmation from
    /// an online provider
    ///
    /// Nothing is deducted until [`validate_payment`](Self::validate_payment).
    ///
    /// # Errors
    ///
    /// - `Validation` unless `amount` is strictly positive
    /// - for a loan-linked payment, `NothingToPay` if the loan has no unpaid
    ///   penalty, and `Validation` if the loan belongs to someone else or
    ///   `amount` differs from the penalty
    #[instrument(skip(self, motif), fields(borrower_id = %borrower_id, amount = %amount))]
    pub async fn stage_payment(
        &self,
        borrower_id: BorrowerId,
        amount: Money,
        method: PaymentMethod,
        motif: &str,
        loan_id: Option<LoanId>,
    ) -> Result<Payment, LendingError> {
        let result = async {
            ensure_positive(amount)?;
            let mut uow = self.store.begin().await?;

            if let Some(loan_id) = loan_id {
                let loan = uow.lock_loan(loan_id).await?;
                ensure_settles_penalty(&loan, borrower_id, amount)?;
            }
            uow.lock_person(borrower_id).await?;

            let payment = Payment::pending(
                borrower_id,
                loan_id,
                amount,
                method,
                self.references.next(borrower_id, loan_id),
                motif,
            );
            uow.insert_payment(&payment).await?;
            uow.commit().await?;
            Ok::<_, LendingError>(payment)
        }
        .await;
        log_outcome("stage_payment", &result);
        result
    }

    /// Moves a pending payment to validated and applies it
    ///
    /// The balance decrease and, for a loan-linked payment, the loan's paid
    /// flag happen here, exactly as for an immediate payment.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` unless the payment is pending
    /// - for a loan-linked payment, `NothingToPay` if the penalty was settled
    ///   in the meantime; the payment stays pending
    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn validate_payment(&self, payment_id: PaymentId) -> Result<Payment, LendingError> {
        let result = async {
            let mut uow = self.store.begin().await?;
            let mut payment = uow.lock_payment(payment_id).await?;
            if !payment.is_pending() {
                return Err(LendingError::InvalidTransition {
                    payment_id,
                    from: payment.status,
                    to: PaymentStatus::Validated,
                });
            }

            if let Some(loan_id) = payment.loan_id {
                let mut loan = uow.lock_loan(loan_id).await?;
                ensure_settles_penalty(&loan, payment.borrower_id, payment.amount)?;
                loan.mark_paid();
                uow.update_loan(&loan).await?;
            }

            self.apply(uow.as_mut(), &mut payment).await?;
            uow.update_payment(&payment).await?;
            uow.commit().await?;
            Ok::<_, LendingError>(payment)
        }
        .await;
        log_outcome("validate_payment", &result);
        result
    }

    /// Cancels a payment
    ///
    /// A validated payment puts its `amount` back on the balance, and a
    /// validated loan-linked payment reopens the loan's penalty.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if the payment is already cancelled
    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn cancel_payment(&self, payment_id: PaymentId) -> Result<Payment, LendingError> {
        let result = async {
            let mut uow = self.store.begin().await?;
            let mut payment = uow.lock_payment(payment_id).await?;
            let was_validated = payment.is_validated();
            let restore = payment.cancel()?;

            if let (true, Some(loan_id)) = (was_validated, payment.loan_id) {
                let mut loan = uow.lock_loan(loan_id).await?;
                loan.mark_unpaid();
                uow.update_loan(&loan).await?;
            }

            if restore.is_positive() {
                uow.lock_person(payment.borrower_id).await?;
                uow.adjust_balance(payment.borrower_id, restore).await?;
            }

            uow.update_payment(&payment).await?;
            uow.commit().await?;
            Ok::<_, LendingError>(payment)
        }
        .await;
        log_outcome("cancel_payment", &result);
        result
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub async fn get_payment(&self, payment_id: PaymentId) -> Result<Payment, LendingError> {
        let mut uow = self.store.begin().await?;
        Ok(uow.fetch_payment(payment_id).await?)
    }

    /// All payments of a borrower, oldest first
    pub async fn payments_for_borrower(
        &self,
        borrower_id: BorrowerId,
    ) -> Result<Vec<Payment>, LendingError> {
        let mut uow = self.store.begin().await?;
        Ok(uow.list_payments_for_borrower(borrower_id).await?)
    }

    /// Deducts `min(amount, balance)` and validates the payment with that figure
    async fn apply(
        &self,
        uow: &mut dyn LendingUnitOfWork,
        payment: &mut Payment,
    ) -> Result<(), LendingError> {
        let person = uow.lock_person(payment.borrower_id).await?;
        let applied = payment.amount.min(&person.balance())?;
        if applied.is_positive() {
            uow.adjust_balance(payment.borrower_id, -applied).await?;
        }
        payment.validate(applied)
    }
}

fn ensure_positive(amount: Money) -> Result<(), LendingError> {
    if !amount.is_positive() {
        return Err(LendingError::validation(format!(
            "Payment amount must be positive, got {}",
            amount
        )));
    }
    Ok(())
}

/// Checks a loan-linked payment of `amount` by `borrower_id` settles the
/// loan's unpaid penalty exactly
fn ensure_settles_penalty(
    loan: &Loan,
    borrower_id: BorrowerId,
    amount: Money,
) -> Result<(), LendingError> {
    if loan.borrower_id != borrower_id {
        return Err(LendingError::validation(format!(
            "Loan {} does not belong to {}",
            loan.id, borrower_id
        )));
    }
    if !loan.has_outstanding_penalty() {
        return Err(LendingError::NothingToPay { loan_id: loan.id });
    }
    if amount != loan.penalty_amount {
        return Err(LendingError::validation(format!(
            "Payment of {} does not match the {} penalty of loan {}",
            amount, loan.penalty_amount, loan.id
        )));
    }
    Ok(())
}

fn log_outcome(operation: &'static str, result: &Result<Payment, LendingError>) {
    match result {
        Ok(payment) => info!(
            operation,
            payment_id = %payment.id,
            reference = %payment.reference,
            status = payment.status.as_str(),
            amount = %payment.amount,
            applied = %payment.applied_amount,
            "Payment recorded"
        ),
        Err(error) => log_rejection(operation, error),
    }
}
