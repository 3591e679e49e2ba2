//! Custom Test Assertions
//!
//! Assertion helpers for circulation types that give more meaningful
//! failure messages than a bare `assert_eq!`.

use rust_decimal::Decimal;

use core_kernel::Money;
use domain_lending::{LendingError, Loan, LoanPaymentStatus, LoanState, Payment, PaymentStatus};

/// Asserts that a Money value carries exactly `expected` in its own currency
pub fn assert_amount(actual: &Money, expected: Decimal) {
    assert_eq!(
        actual.amount(),
        expected,
        "Expected {} {}, got {}",
        actual.currency().symbol(),
        expected,
        actual
    );
}

/// Asserts that a Money value is zero
pub fn assert_money_zero(money: &Money) {
    assert!(money.is_zero(), "Expected zero money, got {}", money);
}

/// Asserts that a Money value is never below zero
pub fn assert_money_non_negative(money: &Money) {
    assert!(!money.is_negative(), "Expected non-negative money, got {}", money);
}

/// Asserts that a loan is still out
pub fn assert_loan_active(loan: &Loan) {
    assert_eq!(loan.state, LoanState::Active, "Loan {} should be active", loan.id);
    assert!(
        loan.returned_on.is_none(),
        "Active loan {} has a return date {:?}",
        loan.id,
        loan.returned_on
    );
}

/// Asserts that a loan was closed with the given penalty
pub fn assert_loan_returned(loan: &Loan, expected_penalty: Decimal) {
    assert_eq!(loan.state, LoanState::Returned, "Loan {} should be returned", loan.id);
    assert!(loan.returned_on.is_some(), "Returned loan {} has no return date", loan.id);
    assert_amount(&loan.penalty_amount, expected_penalty);
}

pub fn assert_loan_paid(loan: &Loan) {
    assert_eq!(
        loan.payment_status,
        LoanPaymentStatus::Paid,
        "Loan {} should be marked paid",
        loan.id
    );
}

/// Asserts a payment's status and the amount it took off the balance
pub fn assert_payment(payment: &Payment, status: PaymentStatus, applied: Decimal) {
    assert_eq!(payment.status, status, "Payment {} status", payment.reference);
    assert_amount(&payment.applied_amount, applied);
}

/// Asserts that a result failed with a business-rule error matching `pattern`
#[macro_export]
macro_rules! assert_lending_err {
    ($result:expr, $pattern:pat) => {
        match $result {
            Err($pattern) => {}
            Err(other) => panic!("Expected {}, got error {:?}", stringify!($pattern), other),
            Ok(value) => panic!("Expected {}, got Ok({:?})", stringify!($pattern), value),
        }
    };
}

/// Asserts that an error is a storage failure rather than a business rule
pub fn assert_storage_error(error: &LendingError) {
    assert!(
        matches!(error, LendingError::Storage(_)),
        "Expected a storage error, got {:?}",
        error
    );
}
