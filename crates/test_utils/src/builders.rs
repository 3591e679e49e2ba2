//! Test Data Builders
//!
//! Builders construct documents, people and loans with sensible defaults so
//! a test only spells out the fields it is about.

use chrono::NaiveDate;
use fake::faker::lorem::en::Words;
use fake::faker::name::en::Name;
use fake::Fake;
use rust_decimal::Decimal;

use core_kernel::{BorrowerId, DocumentId, Money};
use domain_lending::{
    BorrowerCategory, BorrowerProfile, DigitalDocument, DigitalFormat, Document, Loan,
    Person, PhysicalDocument, StaffProfile,
};

use crate::fixtures::{CategoryFixtures, DateFixtures, MoneyFixtures};

// ============================================================================
// Documents
// ============================================================================

/// Builder for catalog documents
pub struct DocumentBuilder {
    id: DocumentId,
    title: String,
    per_diem_rate: Money,
    available: bool,
    format: Option<DigitalFormat>,
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentBuilder {
    /// A physical book at one euro a day, on the shelf
    pub fn new() -> Self {
        let words: Vec<String> = Words(2..5).fake();
        Self {
            id: DocumentId::new(),
            title: words.join(" "),
            per_diem_rate: MoneyFixtures::standard_rate(),
            available: true,
            format: None,
        }
    }

    pub fn with_id(mut self, id: DocumentId) -> Self {
        self.id = id;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_rate(mut self, rate: Money) -> Self {
        self.per_diem_rate = rate;
        self
    }

    /// Sets the rate in euros
    pub fn with_eur_rate(self, amount: Decimal) -> Self {
        self.with_rate(MoneyFixtures::eur(amount))
    }

    /// Marks the document as already out on loan
    pub fn checked_out(mut self) -> Self {
        self.available = false;
        self
    }

    /// Makes the document a digital item of the given format
    pub fn digital(mut self, format: DigitalFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn build(self) -> Document {
        match self.format {
            Some(format) => Document::Digital(DigitalDocument {
                id: self.id,
                title: self.title,
                format,
                per_diem_rate: self.per_diem_rate,
                available: self.available,
            }),
            None => Document::Physical(PhysicalDocument {
                id: self.id,
                shelf_mark: format!("SH-{}", self.id.short()),
                title: self.title,
                per_diem_rate: self.per_diem_rate,
                available: self.available,
            }),
        }
    }
}

// ============================================================================
// People
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Borrower,
    Staff,
    SuperStaff,
}

/// Builder for directory entries
pub struct PersonBuilder {
    id: BorrowerId,
    display_name: String,
    category: String,
    balance: Money,
    role: Role,
}

impl Default for PersonBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PersonBuilder {
    /// A student borrower with a clean balance
    pub fn new() -> Self {
        Self {
            id: BorrowerId::new(),
            display_name: Name().fake(),
            category: "student".to_string(),
            balance: MoneyFixtures::eur_zero(),
            role: Role::Borrower,
        }
    }

    pub fn with_id(mut self, id: BorrowerId) -> Self {
        self.id = id;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_category(mut self, code: impl Into<String>) -> Self {
        self.category = code.into();
        self
    }

    pub fn with_balance(mut self, balance: Money) -> Self {
        self.balance = balance;
        self
    }

    /// Sets the outstanding balance in euros
    pub fn with_eur_balance(self, amount: Decimal) -> Self {
        self.with_balance(MoneyFixtures::eur(amount))
    }

    /// Makes the person a staff member (category "staff")
    pub fn staff(mut self) -> Self {
        self.role = Role::Staff;
        self.category = "staff".to_string();
        self
    }

    /// Makes the person a collection administrator, who may not borrow
    pub fn super_staff(mut self) -> Self {
        self.role = Role::SuperStaff;
        self.category = "staff".to_string();
        self
    }

    pub fn build(self) -> Person {
        let badge_number = format!("B-{}", self.id.short());
        let profile = BorrowerProfile::new(self.id, self.display_name, self.category, self.balance);
        match self.role {
            Role::Borrower => Person::Borrower(profile),
            Role::Staff => Person::Staff(StaffProfile { profile, badge_number }),
            Role::SuperStaff => Person::SuperStaff(StaffProfile { profile, badge_number }),
        }
    }
}

// ============================================================================
// Loans
// ============================================================================

/// Builder for loans that have not gone through the ledger
///
/// Useful for repository and calculator tests that need a loan in a given
/// state without replaying the workflow.
pub struct LoanBuilder {
    borrower_id: BorrowerId,
    document_id: DocumentId,
    category: BorrowerCategory,
    per_diem_rate: Money,
    borrowed_on: NaiveDate,
    returned_on: Option<NaiveDate>,
}

impl Default for LoanBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoanBuilder {
    /// An active student loan opened on the opening day
    pub fn new() -> Self {
        let categories = CategoryFixtures::standard();
        Self {
            borrower_id: BorrowerId::new(),
            document_id: DocumentId::new(),
            category: categories.get("student").cloned().unwrap(),
            per_diem_rate: MoneyFixtures::standard_rate(),
            borrowed_on: DateFixtures::opening_day(),
            returned_on: None,
        }
    }

    pub fn for_borrower(mut self, id: BorrowerId) -> Self {
        self.borrower_id = id;
        self
    }

    pub fn for_document(mut self, id: DocumentId) -> Self {
        self.document_id = id;
        self
    }

    pub fn with_category(mut self, category: BorrowerCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_rate(mut self, rate: Money) -> Self {
        self.per_diem_rate = rate;
        self
    }

    pub fn borrowed_on(mut self, date: NaiveDate) -> Self {
        self.borrowed_on = date;
        self
    }

    /// Closes the loan on `date` at the loan's own rate
    pub fn returned_on(mut self, date: NaiveDate) -> Self {
        self.returned_on = Some(date);
        self
    }

    pub fn build(self) -> Loan {
        let mut loan = Loan::open(
            self.borrower_id,
            self.document_id,
            &self.category,
            self.per_diem_rate,
            self.borrowed_on,
        )
        .unwrap();
        if let Some(returned_on) = self.returned_on {
            loan.close(returned_on, self.per_diem_rate).unwrap();
        }
        loan
    }
}
