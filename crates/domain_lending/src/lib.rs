//! Circulation Domain - loan lifecycle and billing
//!
//! This crate holds the business rules of the library circulation desk:
//! - Borrower categories and their borrowing terms
//! - Fee policy with conditional grace days
//! - Late-return penalties
//! - The loan state machine ([`LoanLedger`])
//! - Payment recording and balance reconciliation ([`PaymentReconciler`])
//! - Storage ports with scoped units of work, plus an in-memory adapter

pub mod adapters;
pub mod category;
pub mod circulation;
pub mod document;
pub mod error;
pub mod fee;
pub mod ledger;
pub mod loan;
pub mod payment;
pub mod penalty;
pub mod person;
pub mod ports;
pub mod reconciler;
pub mod reference;

pub use adapters::{FailurePoint, InMemoryLendingStore};
pub use category::{BorrowerCategory, CategoryTable};
pub use circulation::{Circulation, ReturnReceipt};
pub use document::{DigitalDocument, DigitalFormat, Document, PhysicalDocument};
pub use error::LendingError;
pub use fee::{FeePolicy, FeeQuote, GRACE_THRESHOLD_DAYS};
pub use ledger::{ChargeBreakdown, LoanLedger};
pub use loan::{Loan, LoanPaymentStatus, LoanState};
pub use payment::{Payment, PaymentMethod, PaymentStatus};
pub use penalty::{PenaltyCalculator, PenaltyEstimate, PENALTY_MULTIPLIER};
pub use person::{BorrowerProfile, Person, PersonRole, StaffProfile};
pub use ports::{
    BorrowerPort, CatalogPort, LendingStore, LendingUnitOfWork, LoanPort, PaymentPort,
};
pub use reconciler::PaymentReconciler;
pub use reference::ReferenceGenerator;
