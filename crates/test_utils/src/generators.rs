//! Property-Based Test Generators
//!
//! Proptest strategies producing circulation data that respects the domain
//! invariants: positive rates, categories that validate, dates in range.

use chrono::{Days, NaiveDate};
use proptest::prelude::*;

use core_kernel::{Currency, Money};
use domain_lending::{BorrowerCategory, PaymentMethod};

/// Strategy for per-diem rates between 0.01 and 10.00 euros
pub fn per_diem_rate_strategy() -> impl Strategy<Value = Money> {
    (1i64..=1_000i64).prop_map(|cents| Money::from_minor(cents, Currency::EUR))
}

/// Strategy for balances between 0.00 and 500.00 euros
pub fn balance_strategy() -> impl Strategy<Value = Money> {
    (0i64..=50_000i64).prop_map(|cents| Money::from_minor(cents, Currency::EUR))
}

/// Strategy for strictly positive payment amounts
pub fn payment_amount_strategy() -> impl Strategy<Value = Money> {
    (1i64..=50_000i64).prop_map(|cents| Money::from_minor(cents, Currency::EUR))
}

/// Strategy for categories that pass validation
pub fn category_strategy() -> impl Strategy<Value = BorrowerCategory> {
    (1u32..=10u32, 1u32..=60u32, 0u32..=15u32).prop_map(|(limit, duration, grace)| {
        BorrowerCategory::new("generated", limit, duration, grace)
    })
}

/// Strategy for loan durations in days, including ones past the grace threshold
pub fn duration_days_strategy() -> impl Strategy<Value = i64> {
    0i64..=120i64
}

/// Strategy for borrow dates across 2023-2025
pub fn borrow_date_strategy() -> impl Strategy<Value = NaiveDate> {
    (0u64..1_096u64).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2023, 1, 1)
            .and_then(|start| start.checked_add_days(Days::new(offset)))
            .unwrap()
    })
}

pub fn payment_method_strategy() -> impl Strategy<Value = PaymentMethod> {
    prop_oneof![
        Just(PaymentMethod::Cash),
        Just(PaymentMethod::Card),
        Just(PaymentMethod::BankTransfer),
        Just(PaymentMethod::Cheque),
        Just(PaymentMethod::Online),
    ]
}
