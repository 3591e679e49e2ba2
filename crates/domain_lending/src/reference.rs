//! Payment reference generation
//!
//! References read `PAY-<borrower>-<loan or GEN>-<micros>`. The timestamp part
//! is strictly increasing within a process, so two payments generated in the
//! same microsecond still get different references. Storage rejects
//! duplicates across processes.

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

use core_kernel::{BorrowerId, LoanId};

/// Monotonic payment reference source
#[derive(Debug, Default)]
pub struct ReferenceGenerator {
    last_micros: AtomicI64,
}

impl ReferenceGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the next reference for a borrower and optional loan
    pub fn next(&self, borrower_id: BorrowerId, loan_id: Option<LoanId>) -> String {
        let loan_part = loan_id.map(|id| id.short()).unwrap_or_else(|| "GEN".to_string());
        format!("PAY-{}-{}-{}", borrower_id.short(), loan_part, self.next_stamp())
    }

    fn next_stamp(&self) -> i64 {
        let now = Utc::now().timestamp_micros();
        let mut last = self.last_micros.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match self.last_micros.compare_exchange_weak(
                last,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(current) => last = current,
            }
        }
    }
}
