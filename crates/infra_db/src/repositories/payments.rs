//! Payment repository

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use core_kernel::{BorrowerId, LoanId, PaymentId};
use domain_lending::{Payment, PaymentMethod, PaymentStatus};

use super::{for_update, money};
use crate::error::DatabaseError;

const PAYMENT_COLUMNS: &str = r#"
    SELECT payment_id, borrower_id, loan_id, amount, applied_amount, currency,
           method, status, reference, motif, created_at, validated_at, cancelled_at
    FROM payments
"#;

/// Database row for a payment
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaymentRow {
    pub payment_id: Uuid,
    pub borrower_id: Uuid,
    pub loan_id: Option<Uuid>,
    pub amount: Decimal,
    pub applied_amount: Decimal,
    pub currency: String,
    pub method: String,
    pub status: String,
    pub reference: String,
    pub motif: String,
    pub created_at: DateTime<Utc>,
    pub validated_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl PaymentRow {
    pub fn into_payment(self) -> Result<Payment, DatabaseError> {
        let method = PaymentMethod::parse(&self.method).ok_or_else(|| {
            DatabaseError::serialization(format!("Unknown payment method '{}'", self.method))
        })?;
        let status = PaymentStatus::parse(&self.status).ok_or_else(|| {
            DatabaseError::serialization(format!("Unknown payment status '{}'", self.status))
        })?;

        Ok(Payment {
            id: PaymentId::from(self.payment_id),
            borrower_id: BorrowerId::from(self.borrower_id),
            loan_id: self.loan_id.map(LoanId::from),
            amount: money(self.amount, &self.currency)?,
            applied_amount: money(self.applied_amount, &self.currency)?,
            method,
            status,
            reference: self.reference,
            motif: self.motif,
            created_at: self.created_at,
            validated_at: self.validated_at,
            cancelled_at: self.cancelled_at,
        })
    }
}

/// SQL for the `payments` table
#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentRepository;

impl PaymentRepository {
    /// Stores a new payment
    ///
    /// A reused reference violates `payments_reference_unique` and comes back
    /// as `DuplicateEntry`.
    pub async fn insert(conn: &mut PgConnection, payment: &Payment) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                payment_id, borrower_id, loan_id, amount, applied_amount, currency,
                method, status, reference, motif, created_at, validated_at, cancelled_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(Uuid::from(payment.id))
        .bind(Uuid::from(payment.borrower_id))
        .bind(payment.loan_id.map(Uuid::from))
        .bind(payment.amount.amount())
        .bind(payment.applied_amount.amount())
        .bind(payment.amount.currency().code())
        .bind(payment.method.as_str())
        .bind(payment.status.as_str())
        .bind(payment.reference.as_str())
        .bind(payment.motif.as_str())
        .bind(payment.created_at)
        .bind(payment.validated_at)
        .bind(payment.cancelled_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn find(
        conn: &mut PgConnection,
        id: PaymentId,
        lock: bool,
    ) -> Result<Payment, DatabaseError> {
        let sql = for_update(&format!("{} WHERE payment_id = $1", PAYMENT_COLUMNS), lock);
        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(Uuid::from(id))
            .fetch_optional(&mut *conn)
            .await?;

        row.ok_or_else(|| DatabaseError::not_found("Payment", id))?
            .into_payment()
    }

    /// Writes the status fields of a payment
    pub async fn update(conn: &mut PgConnection, payment: &Payment) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET applied_amount = $2,
                status = $3,
                validated_at = $4,
                cancelled_at = $5
            WHERE payment_id = $1
            "#,
        )
        .bind(Uuid::from(payment.id))
        .bind(payment.applied_amount.amount())
        .bind(payment.status.as_str())
        .bind(payment.validated_at)
        .bind(payment.cancelled_at)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Payment", payment.id));
        }
        Ok(())
    }

    /// All payments of a borrower, oldest first
    pub async fn list_for_borrower(
        conn: &mut PgConnection,
        borrower_id: BorrowerId,
    ) -> Result<Vec<Payment>, DatabaseError> {
        let sql = format!(
            "{} WHERE borrower_id = $1 ORDER BY created_at, payment_id",
            PAYMENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(Uuid::from(borrower_id))
            .fetch_all(&mut *conn)
            .await?;

        rows.into_iter().map(PaymentRow::into_payment).collect()
    }
}
