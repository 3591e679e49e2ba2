//! Borrower directory repository

use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use core_kernel::BorrowerId;
use domain_lending::{BorrowerProfile, Person, PersonRole, StaffProfile};

use super::{for_update, money};
use crate::error::DatabaseError;

const SELECT_PERSON: &str = r#"
    SELECT person_id, role, display_name, category_code, badge_number, balance, currency
    FROM people
    WHERE person_id = $1
"#;

/// Database row for a person
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PersonRow {
    pub person_id: Uuid,
    pub role: String,
    pub display_name: String,
    pub category_code: String,
    pub badge_number: Option<String>,
    pub balance: Decimal,
    pub currency: String,
}

impl PersonRow {
    pub fn into_person(self) -> Result<Person, DatabaseError> {
        let role = PersonRole::parse(&self.role).ok_or_else(|| {
            DatabaseError::serialization(format!("Unknown person role '{}'", self.role))
        })?;
        let profile = BorrowerProfile::new(
            BorrowerId::from(self.person_id),
            self.display_name,
            self.category_code,
            money(self.balance, &self.currency)?,
        );
        let badge_number = self.badge_number.unwrap_or_default();

        Ok(match role {
            PersonRole::Borrower => Person::Borrower(profile),
            PersonRole::Staff => Person::Staff(StaffProfile {
                profile,
                badge_number,
            }),
            PersonRole::SuperStaff => Person::SuperStaff(StaffProfile {
                profile,
                badge_number,
            }),
        })
    }
}

/// SQL for the `people` table
#[derive(Debug, Clone, Copy, Default)]
pub struct PeopleRepository;

impl PeopleRepository {
    pub async fn find(
        conn: &mut PgConnection,
        id: BorrowerId,
        lock: bool,
    ) -> Result<Person, DatabaseError> {
        let sql = for_update(SELECT_PERSON, lock);
        let row = sqlx::query_as::<_, PersonRow>(&sql)
            .bind(Uuid::from(id))
            .fetch_optional(&mut *conn)
            .await?;

        row.ok_or_else(|| DatabaseError::not_found("Person", id))?
            .into_person()
    }

    pub async fn count_active_loans(
        conn: &mut PgConnection,
        id: BorrowerId,
    ) -> Result<u32, DatabaseError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE borrower_id = $1 AND state = 'active'",
        )
        .bind(Uuid::from(id))
        .fetch_one(&mut *conn)
        .await?;

        u32::try_from(count)
            .map_err(|_| DatabaseError::serialization(format!("Active loan count {} out of range", count)))
    }

    /// Adds `delta` to the balance and returns the new value
    ///
    /// The `balance >= 0` check constraint rejects an update that would go
    /// below zero.
    pub async fn adjust_balance(
        conn: &mut PgConnection,
        id: BorrowerId,
        delta: Decimal,
    ) -> Result<Decimal, DatabaseError> {
        let balance: Option<Decimal> = sqlx::query_scalar(
            r#"
            UPDATE people
            SET balance = balance + $2, updated_at = now()
            WHERE person_id = $1
            RETURNING balance
            "#,
        )
        .bind(Uuid::from(id))
        .bind(delta)
        .fetch_optional(&mut *conn)
        .await?;

        balance.ok_or_else(|| DatabaseError::not_found("Person", id))
    }

    /// Adds a person to the directory
    pub async fn insert(conn: &mut PgConnection, person: &Person) -> Result<(), DatabaseError> {
        let profile = person.profile();
        let badge_number = match person {
            Person::Borrower(_) => None,
            Person::Staff(staff) | Person::SuperStaff(staff) => Some(staff.badge_number.as_str()),
        };

        sqlx::query(
            r#"
            INSERT INTO people (
                person_id, role, display_name, category_code, badge_number, balance, currency
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::from(profile.id))
        .bind(person.role().as_str())
        .bind(profile.display_name.as_str())
        .bind(profile.category.as_str())
        .bind(badge_number)
        .bind(profile.balance.amount())
        .bind(profile.balance.currency().code())
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}
