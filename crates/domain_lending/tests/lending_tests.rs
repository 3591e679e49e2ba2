//! Circulation workflows against the in-memory store

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use core_kernel::{BorrowerId, Currency, DocumentId, FixedClock, LoanId, Money, PaymentId};

use domain_lending::{
    BorrowerCategory, BorrowerProfile, CategoryTable, Circulation, DigitalDocument, DigitalFormat, Document,
    FailurePoint, InMemoryLendingStore, LendingError, LendingStore, LoanLedger, LoanPaymentStatus,
    LoanState, PaymentMethod, PaymentReconciler, PaymentStatus, Person, PhysicalDocument,
    StaffProfile,
};

// ============================================================================
// Harness
// ============================================================================

struct Desk {
    store: Arc<InMemoryLendingStore>,
    clock: Arc<FixedClock>,
    ledger: Arc<LoanLedger>,
    reconciler: Arc<PaymentReconciler>,
    circulation: Circulation,
}

fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

fn eur(amount: Decimal) -> Money {
    Money::new(amount, Currency::EUR)
}

fn book(rate: Decimal) -> Document {
    Document::Physical(PhysicalDocument {
        id: DocumentId::new(),
        title: "The Left Hand of Darkness".to_string(),
        shelf_mark: "SF-LEG-2".to_string(),
        per_diem_rate: eur(rate),
        available: true,
    })
}

fn ebook(rate: Decimal) -> Document {
    Document::Digital(DigitalDocument {
        id: DocumentId::new(),
        title: "Snow Crash".to_string(),
        format: DigitalFormat::Epub,
        per_diem_rate: eur(rate),
        available: true,
    })
}

fn borrower(category: &str, balance: Decimal) -> Person {
    Person::Borrower(BorrowerProfile::new(
        BorrowerId::new(),
        "Grace Hopper",
        category,
        eur(balance),
    ))
}

async fn desk(documents: Vec<Document>, people: Vec<Person>) -> Desk {
    let store = Arc::new(InMemoryLendingStore::with_records(documents, people).await);
    let clock = Arc::new(FixedClock::new(start_date()));
    let dyn_store: Arc<dyn LendingStore> = store.clone();

    let ledger = Arc::new(LoanLedger::new(
        Arc::clone(&dyn_store),
        clock.clone(),
        Arc::new(CategoryTable::standard()),
    ));
    let reconciler = Arc::new(PaymentReconciler::new(dyn_store));
    let circulation = Circulation::new(Arc::clone(&ledger), Arc::clone(&reconciler));

    Desk {
        store,
        clock,
        ledger,
        reconciler,
        circulation,
    }
}

impl Desk {
    async fn balance(&self, id: BorrowerId) -> Money {
        self.store.person(id).await.unwrap().balance()
    }

    async fn is_available(&self, id: DocumentId) -> bool {
        self.store.document(id).await.unwrap().is_available()
    }

    /// Opens a loan and returns it `days_late` days after its due date
    async fn late_return(&self, borrower: BorrowerId, document: DocumentId, days_late: u64) -> LoanId {
        let loan = self.ledger.open_loan(borrower, document).await.unwrap();
        self.clock.set(loan.due_on);
        self.clock.advance_days(days_late);
        self.ledger.close_loan(loan.id).await.unwrap();
        loan.id
    }
}

// ============================================================================
// Scenarios
// ============================================================================

mod scenario_tests {
    use super::*;

    #[tokio::test]
    async fn test_on_time_student_loan() {
        let document = book(dec!(1.00));
        let person = borrower("student", dec!(0));
        let (document_id, borrower_id) = (document.id(), person.id());
        let desk = desk(vec![document], vec![person]).await;

        let loan = desk.ledger.open_loan(borrower_id, document_id).await.unwrap();
        assert_eq!(loan.due_on, NaiveDate::from_ymd_opt(2024, 3, 21).unwrap());
        assert!(!desk.is_available(document_id).await);

        desk.clock.set(loan.due_on);
        let closed = desk.ledger.close_loan(loan.id).await.unwrap();
        assert_eq!(closed.state, LoanState::Returned);
        assert!(closed.penalty_amount.is_zero());
        assert!(desk.is_available(document_id).await);

        let breakdown = desk.ledger.charge_breakdown(loan.id).await.unwrap();
        assert_eq!(breakdown.free_days, 5);
        assert_eq!(breakdown.billable_days, 15);
        assert_eq!(breakdown.charge.amount(), dec!(15.00));
        assert!(breakdown.penalty.is_zero());
    }

    #[tokio::test]
    async fn test_three_days_late() {
        let document = book(dec!(1.00));
        let person = borrower("student", dec!(0));
        let (document_id, borrower_id) = (document.id(), person.id());
        let desk = desk(vec![document], vec![person]).await;

        let loan_id = desk.late_return(borrower_id, document_id, 3).await;
        let loan = desk.ledger.get_loan(loan_id).await.unwrap();

        assert_eq!(loan.penalty_amount.amount(), dec!(6.00));
        assert_eq!(desk.ledger.compute_total_due(&loan).unwrap().amount(), dec!(21.00));
        assert_eq!(loan.payment_status, LoanPaymentStatus::Unpaid);
        // closing does not touch the balance
        assert!(desk.balance(borrower_id).await.is_zero());
    }

    #[tokio::test]
    async fn test_staff_loan_without_grace() {
        let document = ebook(dec!(1.00));
        let person = borrower("staff", dec!(0));
        let (document_id, borrower_id) = (document.id(), person.id());
        let desk = desk(vec![document], vec![person]).await;

        let loan = desk.ledger.open_loan(borrower_id, document_id).await.unwrap();
        let breakdown = desk.ledger.charge_breakdown(loan.id).await.unwrap();

        assert_eq!(loan.max_duration_days, 15);
        assert_eq!(breakdown.free_days, 0);
        assert_eq!(breakdown.billable_days, 15);
    }

    #[tokio::test]
    async fn test_borrow_limit_reached() {
        let first = book(dec!(1.00));
        let second = book(dec!(1.00));
        let person = borrower("visitor", dec!(0));
        let (first_id, second_id, borrower_id) = (first.id(), second.id(), person.id());
        let desk = desk(vec![first, second], vec![person]).await;

        desk.ledger.open_loan(borrower_id, first_id).await.unwrap();
        let result = desk.ledger.open_loan(borrower_id, second_id).await;

        assert!(matches!(
            result,
            Err(LendingError::LimitExceeded { active: 1, limit: 1, .. })
        ));
        assert!(desk.is_available(second_id).await);
        assert_eq!(desk.store.loan_count().await, 1);
    }

    #[tokio::test]
    async fn test_pay_penalty_with_nothing_owed() {
        let document = book(dec!(1.00));
        let person = borrower("student", dec!(3.00));
        let (document_id, borrower_id) = (document.id(), person.id());
        let desk = desk(vec![document], vec![person]).await;

        let loan_id = desk.late_return(borrower_id, document_id, 0).await;
        let result = desk
            .reconciler
            .pay_penalty(borrower_id, loan_id, PaymentMethod::Cash)
            .await;

        assert!(matches!(result, Err(LendingError::NothingToPay { .. })));
        assert_eq!(desk.store.payment_count().await, 0);
        assert_eq!(desk.balance(borrower_id).await.amount(), dec!(3.00));
        let loan = desk.ledger.get_loan(loan_id).await.unwrap();
        assert_eq!(loan.payment_status, LoanPaymentStatus::Unpaid);
    }

    #[tokio::test]
    async fn test_cancel_validated_penalty_payment_restores_balance() {
        let document = book(dec!(1.00));
        let person = borrower("student", dec!(6.00));
        let (document_id, borrower_id) = (document.id(), person.id());
        let desk = desk(vec![document], vec![person]).await;

        let loan_id = desk.late_return(borrower_id, document_id, 3).await;
        let payment = desk
            .reconciler
            .pay_penalty(borrower_id, loan_id, PaymentMethod::Card)
            .await
            .unwrap();

        assert_eq!(payment.status, PaymentStatus::Validated);
        assert_eq!(payment.amount.amount(), dec!(6.00));
        assert!(desk.balance(borrower_id).await.is_zero());
        assert!(desk.ledger.get_loan(loan_id).await.unwrap().is_paid());

        let cancelled = desk.reconciler.cancel_payment(payment.id).await.unwrap();
        assert_eq!(cancelled.status, PaymentStatus::Cancelled);
        assert_eq!(desk.balance(borrower_id).await.amount(), dec!(6.00));
        assert!(!desk.ledger.get_loan(loan_id).await.unwrap().is_paid());
    }

    #[tokio::test]
    async fn test_penalty_paid_from_clear_balance() {
        let document = book(dec!(1.00));
        let person = borrower("student", dec!(0));
        let (document_id, borrower_id) = (document.id(), person.id());
        let desk = desk(vec![document], vec![person]).await;

        let loan_id = desk.late_return(borrower_id, document_id, 3).await;
        assert!(desk.balance(borrower_id).await.is_zero());

        let payment = desk
            .reconciler
            .pay_penalty(borrower_id, loan_id, PaymentMethod::Cash)
            .await
            .unwrap();

        assert_eq!(payment.status, PaymentStatus::Validated);
        assert_eq!(payment.amount.amount(), dec!(6.00));
        assert!(payment.applied_amount.is_zero());
        assert!(desk.balance(borrower_id).await.is_zero());
        assert!(desk.ledger.get_loan(loan_id).await.unwrap().is_paid());
    }

    #[tokio::test]
    async fn test_cancel_from_clear_balance_reinstates_penalty() {
        let document = book(dec!(1.00));
        let person = borrower("student", dec!(0));
        let (document_id, borrower_id) = (document.id(), person.id());
        let desk = desk(vec![document], vec![person]).await;

        let loan_id = desk.late_return(borrower_id, document_id, 3).await;
        let payment = desk
            .reconciler
            .pay_penalty(borrower_id, loan_id, PaymentMethod::Card)
            .await
            .unwrap();
        desk.reconciler.cancel_payment(payment.id).await.unwrap();

        let loan = desk.ledger.get_loan(loan_id).await.unwrap();
        assert!(loan.has_outstanding_penalty());
        assert_eq!(desk.balance(borrower_id).await, loan.penalty_amount);

        let retry = desk
            .reconciler
            .pay_penalty(borrower_id, loan_id, PaymentMethod::Cash)
            .await
            .unwrap();
        assert_eq!(retry.applied_amount.amount(), dec!(6.00));
        assert!(desk.balance(borrower_id).await.is_zero());
    }
}

// ============================================================================
// Loan lifecycle
// ============================================================================

mod ledger_tests {
    use super::*;

    #[tokio::test]
    async fn test_open_unavailable_document_creates_no_loan() {
        let document = book(dec!(1.00));
        let first = borrower("student", dec!(0));
        let second = borrower("teacher", dec!(0));
        let (document_id, first_id, second_id) = (document.id(), first.id(), second.id());
        let desk = desk(vec![document], vec![first, second]).await;

        desk.ledger.open_loan(first_id, document_id).await.unwrap();
        let result = desk.ledger.open_loan(second_id, document_id).await;

        assert!(matches!(result, Err(LendingError::NotAvailable { .. })));
        assert_eq!(desk.store.loan_count().await, 1);
        assert!(desk.ledger.loans_for_borrower(second_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_close_keeps_first_result() {
        let document = book(dec!(1.00));
        let person = borrower("student", dec!(0));
        let (document_id, borrower_id) = (document.id(), person.id());
        let desk = desk(vec![document], vec![person]).await;

        let loan_id = desk.late_return(borrower_id, document_id, 2).await;
        let first = desk.ledger.get_loan(loan_id).await.unwrap();

        desk.clock.advance_days(10);
        let result = desk.ledger.close_loan(loan_id).await;
        assert!(matches!(result, Err(LendingError::AlreadyReturned { .. })));

        let after = desk.ledger.get_loan(loan_id).await.unwrap();
        assert_eq!(after.returned_on, first.returned_on);
        assert_eq!(after.penalty_amount, first.penalty_amount);
    }

    #[tokio::test]
    async fn test_super_staff_may_not_borrow() {
        let document = book(dec!(1.00));
        let admin = Person::SuperStaff(StaffProfile {
            profile: BorrowerProfile::new(BorrowerId::new(), "Root", "staff", eur(dec!(0))),
            badge_number: "ADM-1".to_string(),
        });
        let (document_id, admin_id) = (document.id(), admin.id());
        let desk = desk(vec![document], vec![admin]).await;

        let result = desk.ledger.open_loan(admin_id, document_id).await;
        assert!(matches!(result, Err(LendingError::Validation(_))));
        assert!(desk.is_available(document_id).await);
    }

    #[tokio::test]
    async fn test_staff_member_may_borrow() {
        let document = book(dec!(0.50));
        let staff = Person::Staff(StaffProfile {
            profile: BorrowerProfile::new(BorrowerId::new(), "Linus", "staff", eur(dec!(0))),
            badge_number: "STF-9".to_string(),
        });
        let (document_id, staff_id) = (document.id(), staff.id());
        let desk = desk(vec![document], vec![staff]).await;

        let loan = desk.ledger.open_loan(staff_id, document_id).await.unwrap();
        assert_eq!(loan.category_code, "staff");
    }

    #[tokio::test]
    async fn test_unknown_category_is_rejected() {
        let document = book(dec!(1.00));
        let person = borrower("alumni", dec!(0));
        let (document_id, borrower_id) = (document.id(), person.id());
        let desk = desk(vec![document], vec![person]).await;

        let result = desk.ledger.open_loan(borrower_id, document_id).await;
        assert!(matches!(result, Err(LendingError::Validation(_))));
    }

    #[tokio::test]
    async fn test_unknown_borrower_is_not_found() {
        let document = book(dec!(1.00));
        let document_id = document.id();
        let desk = desk(vec![document], vec![]).await;

        let result = desk.ledger.open_loan(BorrowerId::new(), document_id).await;
        assert!(matches!(result, Err(LendingError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_unknown_loan_is_not_found() {
        let desk = desk(vec![], vec![]).await;
        let result = desk.ledger.close_loan(LoanId::new()).await;
        assert!(matches!(result, Err(LendingError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_estimate_penalty_is_advisory_until_close() {
        let document = book(dec!(1.00));
        let person = borrower("student", dec!(0));
        let (document_id, borrower_id) = (document.id(), person.id());
        let desk = desk(vec![document], vec![person]).await;

        let loan = desk.ledger.open_loan(borrower_id, document_id).await.unwrap();
        desk.clock.set(loan.due_on);
        desk.clock.advance_days(4);

        let estimate = desk.ledger.estimate_penalty(loan.id).await.unwrap();
        assert!(estimate.advisory);
        assert_eq!(estimate.late_days, 4);
        assert_eq!(estimate.penalty.amount(), dec!(8.00));

        desk.ledger.close_loan(loan.id).await.unwrap();
        desk.clock.advance_days(30);

        let committed = desk.ledger.estimate_penalty(loan.id).await.unwrap();
        assert!(!committed.advisory);
        assert_eq!(committed.late_days, 4);
        assert_eq!(committed.penalty.amount(), dec!(8.00));
    }

    #[tokio::test]
    async fn test_total_due_keeps_terms_from_open() {
        let document = book(dec!(0.50));
        let person = borrower("teacher", dec!(0));
        let (document_id, borrower_id) = (document.id(), person.id());
        let desk = desk(vec![document], vec![person]).await;

        let loan = desk.ledger.open_loan(borrower_id, document_id).await.unwrap();
        assert_eq!(loan.grace_days, 7);

        let reconfigured = LoanLedger::new(
            desk.store.clone(),
            desk.clock.clone(),
            Arc::new(CategoryTable::new(vec![BorrowerCategory::new("student", 3, 20, 0)]).unwrap()),
        );
        let total = reconfigured.compute_total_due(&loan).unwrap();
        assert_eq!(total, desk.ledger.compute_total_due(&loan).unwrap());
        assert_eq!(total.amount(), dec!(11.50));
    }

    #[tokio::test]
    async fn test_document_can_be_lent_again_after_return() {
        let document = book(dec!(1.00));
        let first = borrower("student", dec!(0));
        let second = borrower("student", dec!(0));
        let (document_id, first_id, second_id) = (document.id(), first.id(), second.id());
        let desk = desk(vec![document], vec![first, second]).await;

        let loan = desk.ledger.open_loan(first_id, document_id).await.unwrap();
        desk.ledger.close_loan(loan.id).await.unwrap();

        let again = desk.ledger.open_loan(second_id, document_id).await.unwrap();
        let active = desk.ledger.active_loan_for_document(document_id).await.unwrap();
        assert_eq!(active.map(|l| l.id), Some(again.id));
    }
}

// ============================================================================
// Payments
// ============================================================================

mod payment_tests {
    use super::*;

    #[tokio::test]
    async fn test_general_payment_floors_balance_and_cancel_restores_amount() {
        let person = borrower("student", dec!(2.00));
        let borrower_id = person.id();
        let desk = desk(vec![], vec![person]).await;

        let payment = desk
            .reconciler
            .pay_general(borrower_id, eur(dec!(5.00)), PaymentMethod::Cash, "Lost card")
            .await
            .unwrap();

        assert_eq!(payment.amount.amount(), dec!(5.00));
        assert_eq!(payment.applied_amount.amount(), dec!(2.00));
        assert!(payment.loan_id.is_none());
        assert!(payment.reference.contains("-GEN-"));
        assert!(desk.balance(borrower_id).await.is_zero());

        desk.reconciler.cancel_payment(payment.id).await.unwrap();
        assert_eq!(desk.balance(borrower_id).await.amount(), dec!(5.00));
    }

    #[tokio::test]
    async fn test_general_payment_must_be_positive() {
        let person = borrower("student", dec!(2.00));
        let borrower_id = person.id();
        let desk = desk(vec![], vec![person]).await;

        for amount in [dec!(0), dec!(-1.00)] {
            let result = desk
                .reconciler
                .pay_general(borrower_id, eur(amount), PaymentMethod::Cash, "Nothing")
                .await;
            assert!(matches!(result, Err(LendingError::Validation(_))));
        }
        assert_eq!(desk.store.payment_count().await, 0);
    }

    #[tokio::test]
    async fn test_pay_penalty_twice_is_nothing_to_pay() {
        let document = book(dec!(1.00));
        let person = borrower("student", dec!(10.00));
        let (document_id, borrower_id) = (document.id(), person.id());
        let desk = desk(vec![document], vec![person]).await;

        let loan_id = desk.late_return(borrower_id, document_id, 1).await;
        desk.reconciler
            .pay_penalty(borrower_id, loan_id, PaymentMethod::Cash)
            .await
            .unwrap();

        let again = desk
            .reconciler
            .pay_penalty(borrower_id, loan_id, PaymentMethod::Cash)
            .await;
        assert!(matches!(again, Err(LendingError::NothingToPay { .. })));
        assert_eq!(desk.balance(borrower_id).await.amount(), dec!(8.00));
    }

    #[tokio::test]
    async fn test_pay_penalty_for_someone_elses_loan() {
        let document = book(dec!(1.00));
        let owner = borrower("student", dec!(0));
        let other = borrower("student", dec!(0));
        let (document_id, owner_id, other_id) = (document.id(), owner.id(), other.id());
        let desk = desk(vec![document], vec![owner, other]).await;

        let loan_id = desk.late_return(owner_id, document_id, 2).await;
        let result = desk
            .reconciler
            .pay_penalty(other_id, loan_id, PaymentMethod::Cash)
            .await;
        assert!(matches!(result, Err(LendingError::Validation(_))));
    }

    #[tokio::test]
    async fn test_staged_payment_applies_only_on_validation() {
        let document = book(dec!(1.00));
        let person = borrower("student", dec!(6.00));
        let (document_id, borrower_id) = (document.id(), person.id());
        let desk = desk(vec![document], vec![person]).await;

        let loan_id = desk.late_return(borrower_id, document_id, 3).await;
        let staged = desk
            .reconciler
            .stage_payment(borrower_id, eur(dec!(6.00)), PaymentMethod::Online, "Online penalty", Some(loan_id))
            .await
            .unwrap();

        assert_eq!(staged.status, PaymentStatus::Pending);
        assert_eq!(desk.balance(borrower_id).await.amount(), dec!(6.00));
        assert!(!desk.ledger.get_loan(loan_id).await.unwrap().is_paid());

        let validated = desk.reconciler.validate_payment(staged.id).await.unwrap();
        assert_eq!(validated.status, PaymentStatus::Validated);
        assert!(validated.validated_at.is_some());
        assert!(desk.balance(borrower_id).await.is_zero());
        assert!(desk.ledger.get_loan(loan_id).await.unwrap().is_paid());

        let again = desk.reconciler.validate_payment(staged.id).await;
        assert!(matches!(
            again,
            Err(LendingError::InvalidTransition { from: PaymentStatus::Validated, .. })
        ));
    }

    #[tokio::test]
    async fn test_staged_payment_on_active_loan_is_refused() {
        let document = book(dec!(1.00));
        let person = borrower("student", dec!(0));
        let (document_id, borrower_id) = (document.id(), person.id());
        let desk = desk(vec![document], vec![person]).await;

        let loan = desk.ledger.open_loan(borrower_id, document_id).await.unwrap();
        let result = desk
            .reconciler
            .stage_payment(borrower_id, eur(dec!(0.01)), PaymentMethod::Online, "Early", Some(loan.id))
            .await;
        assert!(matches!(result, Err(LendingError::NothingToPay { .. })));
        assert_eq!(desk.store.payment_count().await, 0);

        desk.clock.set(loan.due_on);
        desk.clock.advance_days(3);
        let closed = desk.ledger.close_loan(loan.id).await.unwrap();
        assert_eq!(closed.penalty_amount.amount(), dec!(6.00));

        let paid = desk
            .reconciler
            .pay_penalty(borrower_id, loan.id, PaymentMethod::Cash)
            .await
            .unwrap();
        assert_eq!(paid.amount.amount(), dec!(6.00));
        assert!(desk.ledger.get_loan(loan.id).await.unwrap().is_paid());
    }

    #[tokio::test]
    async fn test_staged_payment_must_match_penalty() {
        let document = book(dec!(1.00));
        let person = borrower("student", dec!(0));
        let (document_id, borrower_id) = (document.id(), person.id());
        let desk = desk(vec![document], vec![person]).await;

        let loan_id = desk.late_return(borrower_id, document_id, 3).await;
        for amount in [dec!(0.01), dec!(10.00)] {
            let result = desk
                .reconciler
                .stage_payment(borrower_id, eur(amount), PaymentMethod::Online, "Penalty", Some(loan_id))
                .await;
            assert!(matches!(result, Err(LendingError::Validation(_))));
        }
        assert_eq!(desk.store.payment_count().await, 0);
        assert!(!desk.ledger.get_loan(loan_id).await.unwrap().is_paid());
    }

    #[tokio::test]
    async fn test_staged_payment_overtaken_by_desk_payment() {
        let document = book(dec!(1.00));
        let person = borrower("student", dec!(6.00));
        let (document_id, borrower_id) = (document.id(), person.id());
        let desk = desk(vec![document], vec![person]).await;

        let loan_id = desk.late_return(borrower_id, document_id, 3).await;
        let staged = desk
            .reconciler
            .stage_payment(borrower_id, eur(dec!(6.00)), PaymentMethod::Online, "Online penalty", Some(loan_id))
            .await
            .unwrap();
        desk.reconciler
            .pay_penalty(borrower_id, loan_id, PaymentMethod::Cash)
            .await
            .unwrap();

        let result = desk.reconciler.validate_payment(staged.id).await;
        assert!(matches!(result, Err(LendingError::NothingToPay { .. })));

        let still_pending = desk.reconciler.get_payment(staged.id).await.unwrap();
        assert_eq!(still_pending.status, PaymentStatus::Pending);
        assert!(desk.balance(borrower_id).await.is_zero());
    }

    #[tokio::test]
    async fn test_cancel_pending_payment_leaves_balance() {
        let person = borrower("student", dec!(4.00));
        let borrower_id = person.id();
        let desk = desk(vec![], vec![person]).await;

        let staged = desk
            .reconciler
            .stage_payment(borrower_id, eur(dec!(4.00)), PaymentMethod::BankTransfer, "Transfer", None)
            .await
            .unwrap();
        desk.reconciler.cancel_payment(staged.id).await.unwrap();

        assert_eq!(desk.balance(borrower_id).await.amount(), dec!(4.00));
        let cancelled_again = desk.reconciler.cancel_payment(staged.id).await;
        assert!(matches!(cancelled_again, Err(LendingError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_unknown_payment_is_not_found() {
        let desk = desk(vec![], vec![]).await;
        let result = desk.reconciler.validate_payment(PaymentId::new()).await;
        assert!(matches!(result, Err(LendingError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_payments_listed_oldest_first() {
        let person = borrower("student", dec!(10.00));
        let borrower_id = person.id();
        let desk = desk(vec![], vec![person]).await;

        let first = desk
            .reconciler
            .pay_general(borrower_id, eur(dec!(1.00)), PaymentMethod::Cash, "First")
            .await
            .unwrap();
        let second = desk
            .reconciler
            .pay_general(borrower_id, eur(dec!(1.00)), PaymentMethod::Cash, "Second")
            .await
            .unwrap();

        let payments = desk.reconciler.payments_for_borrower(borrower_id).await.unwrap();
        assert_eq!(payments.len(), 2);
        assert_eq!(payments[0].id, first.id);
        assert_eq!(payments[1].id, second.id);
        assert_ne!(first.reference, second.reference);
    }
}

// ============================================================================
// Return at the desk
// ============================================================================

mod circulation_tests {
    use super::*;

    #[tokio::test]
    async fn test_late_return_with_payment() {
        let document = book(dec!(1.00));
        let person = borrower("student", dec!(6.00));
        let (document_id, borrower_id) = (document.id(), person.id());
        let desk = desk(vec![document], vec![person]).await;

        let loan = desk.circulation.checkout(borrower_id, document_id).await.unwrap();
        desk.clock.set(loan.due_on);
        desk.clock.advance_days(3);

        let receipt = desk
            .circulation
            .return_document(loan.id, Some(PaymentMethod::Cash))
            .await
            .unwrap();

        assert_eq!(receipt.loan.state, LoanState::Returned);
        assert!(receipt.loan.is_paid());
        let payment = receipt.payment.unwrap();
        assert_eq!(payment.amount.amount(), dec!(6.00));
        assert!(desk.balance(borrower_id).await.is_zero());
        assert!(desk.is_available(document_id).await);
    }

    #[tokio::test]
    async fn test_on_time_return_records_no_payment() {
        let document = book(dec!(1.00));
        let person = borrower("student", dec!(0));
        let (document_id, borrower_id) = (document.id(), person.id());
        let desk = desk(vec![document], vec![person]).await;

        let loan = desk.circulation.checkout(borrower_id, document_id).await.unwrap();
        let receipt = desk
            .circulation
            .return_document(loan.id, Some(PaymentMethod::Cash))
            .await
            .unwrap();

        assert!(receipt.payment.is_none());
        assert_eq!(desk.store.payment_count().await, 0);
    }

    #[tokio::test]
    async fn test_return_twice_is_already_returned() {
        let document = book(dec!(1.00));
        let person = borrower("student", dec!(0));
        let (document_id, borrower_id) = (document.id(), person.id());
        let desk = desk(vec![document], vec![person]).await;

        let loan = desk.circulation.checkout(borrower_id, document_id).await.unwrap();
        desk.circulation.return_document(loan.id, None).await.unwrap();
        let again = desk.circulation.return_document(loan.id, None).await;

        assert!(matches!(again, Err(LendingError::AlreadyReturned { .. })));
    }
}

// ============================================================================
// Atomicity
// ============================================================================

mod rollback_tests {
    use super::*;

    #[tokio::test]
    async fn test_failed_reservation_rolls_back_open() {
        let document = book(dec!(1.00));
        let person = borrower("student", dec!(0));
        let (document_id, borrower_id) = (document.id(), person.id());
        let desk = desk(vec![document], vec![person]).await;

        desk.store.fail_next(FailurePoint::SetAvailable);
        let result = desk.ledger.open_loan(borrower_id, document_id).await;

        assert!(matches!(result, Err(LendingError::Storage(_))));
        assert_eq!(desk.store.loan_count().await, 0);
        assert!(desk.is_available(document_id).await);
    }

    #[tokio::test]
    async fn test_failed_release_rolls_back_close() {
        let document = book(dec!(1.00));
        let person = borrower("student", dec!(0));
        let (document_id, borrower_id) = (document.id(), person.id());
        let desk = desk(vec![document], vec![person]).await;

        let loan = desk.ledger.open_loan(borrower_id, document_id).await.unwrap();
        desk.store.fail_next(FailurePoint::SetAvailable);
        let result = desk.ledger.close_loan(loan.id).await;

        assert!(matches!(result, Err(LendingError::Storage(_))));
        let stored = desk.ledger.get_loan(loan.id).await.unwrap();
        assert_eq!(stored.state, LoanState::Active);
        assert!(stored.returned_on.is_none());
        assert!(!desk.is_available(document_id).await);
    }

    #[tokio::test]
    async fn test_failed_payment_rolls_back_return() {
        let document = book(dec!(1.00));
        let person = borrower("student", dec!(6.00));
        let (document_id, borrower_id) = (document.id(), person.id());
        let desk = desk(vec![document], vec![person]).await;

        let loan = desk.ledger.open_loan(borrower_id, document_id).await.unwrap();
        desk.clock.set(loan.due_on);
        desk.clock.advance_days(3);

        desk.store.fail_next(FailurePoint::InsertPayment);
        let result = desk
            .circulation
            .return_document(loan.id, Some(PaymentMethod::Card))
            .await;

        assert!(matches!(result, Err(LendingError::Storage(_))));
        assert!(desk.ledger.get_loan(loan.id).await.unwrap().is_active());
        assert!(!desk.is_available(document_id).await);
        assert_eq!(desk.balance(borrower_id).await.amount(), dec!(6.00));
        assert_eq!(desk.store.payment_count().await, 0);
    }

    #[tokio::test]
    async fn test_failed_balance_update_rolls_back_payment() {
        let document = book(dec!(1.00));
        let person = borrower("student", dec!(6.00));
        let (document_id, borrower_id) = (document.id(), person.id());
        let desk = desk(vec![document], vec![person]).await;

        let loan_id = desk.late_return(borrower_id, document_id, 3).await;
        desk.store.fail_next(FailurePoint::AdjustBalance);
        let result = desk
            .reconciler
            .pay_penalty(borrower_id, loan_id, PaymentMethod::Cash)
            .await;

        assert!(matches!(result, Err(LendingError::Storage(_))));
        assert_eq!(desk.store.payment_count().await, 0);
        assert!(!desk.ledger.get_loan(loan_id).await.unwrap().is_paid());
        assert_eq!(desk.balance(borrower_id).await.amount(), dec!(6.00));
    }
}

// ============================================================================
// Concurrency
// ============================================================================

mod concurrency_tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_closes_exactly_one_wins() {
        let document = book(dec!(1.00));
        let person = borrower("student", dec!(0));
        let (document_id, borrower_id) = (document.id(), person.id());
        let desk = desk(vec![document], vec![person]).await;

        let loan = desk.ledger.open_loan(borrower_id, document_id).await.unwrap();
        let (a, b) = tokio::join!(desk.ledger.close_loan(loan.id), desk.ledger.close_loan(loan.id));

        let outcomes = [a, b];
        let wins = outcomes.iter().filter(|r| r.is_ok()).count();
        let already = outcomes
            .iter()
            .filter(|r| matches!(r, Err(LendingError::AlreadyReturned { .. })))
            .count();
        assert_eq!(wins, 1);
        assert_eq!(already, 1);
        assert!(desk.is_available(document_id).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_opens_reserve_once() {
        let document = book(dec!(1.00));
        let first = borrower("student", dec!(0));
        let second = borrower("teacher", dec!(0));
        let (document_id, first_id, second_id) = (document.id(), first.id(), second.id());
        let desk = desk(vec![document], vec![first, second]).await;

        let ledger_a = Arc::clone(&desk.ledger);
        let ledger_b = Arc::clone(&desk.ledger);
        let a = tokio::spawn(async move { ledger_a.open_loan(first_id, document_id).await });
        let b = tokio::spawn(async move { ledger_b.open_loan(second_id, document_id).await });

        let outcomes = [a.await.unwrap(), b.await.unwrap()];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            outcomes
                .iter()
                .filter(|r| matches!(r, Err(LendingError::NotAvailable { .. })))
                .count(),
            1
        );
        assert_eq!(desk.store.loan_count().await, 1);
    }
}
