//! Loan repository

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use core_kernel::{BorrowerId, DocumentId, LoanId};
use domain_lending::{Loan, LoanPaymentStatus, LoanState};

use super::{for_update, money};
use crate::error::DatabaseError;

const LOAN_COLUMNS: &str = r#"
    SELECT loan_id, borrower_id, document_id, category_code, per_diem_rate, currency,
           borrowed_on, due_on, returned_on, state, max_duration_days, grace_days,
           penalty_amount, payment_status
    FROM loans
"#;

/// Database row for a loan
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LoanRow {
    pub loan_id: Uuid,
    pub borrower_id: Uuid,
    pub document_id: Uuid,
    pub category_code: String,
    pub per_diem_rate: Decimal,
    pub currency: String,
    pub borrowed_on: NaiveDate,
    pub due_on: NaiveDate,
    pub returned_on: Option<NaiveDate>,
    pub state: String,
    pub max_duration_days: i32,
    pub grace_days: i32,
    pub penalty_amount: Decimal,
    pub payment_status: String,
}

impl LoanRow {
    pub fn into_loan(self) -> Result<Loan, DatabaseError> {
        let state = LoanState::parse(&self.state).ok_or_else(|| {
            DatabaseError::serialization(format!("Unknown loan state '{}'", self.state))
        })?;
        let payment_status = LoanPaymentStatus::parse(&self.payment_status).ok_or_else(|| {
            DatabaseError::serialization(format!(
                "Unknown loan payment status '{}'",
                self.payment_status
            ))
        })?;
        let max_duration_days = u32::try_from(self.max_duration_days).map_err(|_| {
            DatabaseError::serialization(format!(
                "Negative loan duration {}",
                self.max_duration_days
            ))
        })?;
        let grace_days = u32::try_from(self.grace_days).map_err(|_| {
            DatabaseError::serialization(format!("Negative grace days {}", self.grace_days))
        })?;

        Ok(Loan {
            id: LoanId::from(self.loan_id),
            borrower_id: BorrowerId::from(self.borrower_id),
            document_id: DocumentId::from(self.document_id),
            category_code: self.category_code,
            per_diem_rate: money(self.per_diem_rate, &self.currency)?,
            borrowed_on: self.borrowed_on,
            due_on: self.due_on,
            returned_on: self.returned_on,
            state,
            max_duration_days,
            grace_days,
            penalty_amount: money(self.penalty_amount, &self.currency)?,
            payment_status,
        })
    }
}

/// SQL for the `loans` table
#[derive(Debug, Clone, Copy, Default)]
pub struct LoanRepository;

impl LoanRepository {
    /// Stores a new loan
    ///
    /// A second active loan on the same document violates
    /// `loans_one_active_per_document` and comes back as `DuplicateEntry`.
    pub async fn insert(conn: &mut PgConnection, loan: &Loan) -> Result<(), DatabaseError> {
        let max_duration_days = i32::try_from(loan.max_duration_days).map_err(|_| {
            DatabaseError::serialization(format!("Loan duration {} too large", loan.max_duration_days))
        })?;
        let grace_days = i32::try_from(loan.grace_days).map_err(|_| {
            DatabaseError::serialization(format!("Grace days {} too large", loan.grace_days))
        })?;

        sqlx::query(
            r#"
            INSERT INTO loans (
                loan_id, borrower_id, document_id, category_code, per_diem_rate, currency,
                borrowed_on, due_on, returned_on, state, max_duration_days, grace_days,
                penalty_amount, payment_status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(Uuid::from(loan.id))
        .bind(Uuid::from(loan.borrower_id))
        .bind(Uuid::from(loan.document_id))
        .bind(loan.category_code.as_str())
        .bind(loan.per_diem_rate.amount())
        .bind(loan.per_diem_rate.currency().code())
        .bind(loan.borrowed_on)
        .bind(loan.due_on)
        .bind(loan.returned_on)
        .bind(loan.state.as_str())
        .bind(max_duration_days)
        .bind(grace_days)
        .bind(loan.penalty_amount.amount())
        .bind(loan.payment_status.as_str())
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn find(conn: &mut PgConnection, id: LoanId, lock: bool) -> Result<Loan, DatabaseError> {
        let sql = for_update(&format!("{} WHERE loan_id = $1", LOAN_COLUMNS), lock);
        let row = sqlx::query_as::<_, LoanRow>(&sql)
            .bind(Uuid::from(id))
            .fetch_optional(&mut *conn)
            .await?;

        row.ok_or_else(|| DatabaseError::not_found("Loan", id))?
            .into_loan()
    }

    /// Writes the mutable part of a loan: return date, state, penalty and payment status
    pub async fn update(conn: &mut PgConnection, loan: &Loan) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE loans
            SET returned_on = $2,
                state = $3,
                penalty_amount = $4,
                payment_status = $5,
                updated_at = now()
            WHERE loan_id = $1
            "#,
        )
        .bind(Uuid::from(loan.id))
        .bind(loan.returned_on)
        .bind(loan.state.as_str())
        .bind(loan.penalty_amount.amount())
        .bind(loan.payment_status.as_str())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Loan", loan.id));
        }
        Ok(())
    }

    pub async fn find_active_for_document(
        conn: &mut PgConnection,
        document_id: DocumentId,
    ) -> Result<Option<Loan>, DatabaseError> {
        let sql = format!("{} WHERE document_id = $1 AND state = 'active'", LOAN_COLUMNS);
        let row = sqlx::query_as::<_, LoanRow>(&sql)
            .bind(Uuid::from(document_id))
            .fetch_optional(&mut *conn)
            .await?;

        row.map(LoanRow::into_loan).transpose()
    }

    /// All loans of a borrower, oldest first
    pub async fn list_for_borrower(
        conn: &mut PgConnection,
        borrower_id: BorrowerId,
    ) -> Result<Vec<Loan>, DatabaseError> {
        let sql = format!(
            "{} WHERE borrower_id = $1 ORDER BY borrowed_on, loan_id",
            LOAN_COLUMNS
        );
        let rows = sqlx::query_as::<_, LoanRow>(&sql)
            .bind(Uuid::from(borrower_id))
            .fetch_all(&mut *conn)
            .await?;

        rows.into_iter().map(LoanRow::into_loan).collect()
    }
}
