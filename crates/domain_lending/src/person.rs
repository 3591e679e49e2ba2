//! People known to the borrower directory
//!
//! Everyone in the directory has a borrowing profile (category and balance),
//! but not everyone may borrow: super-staff administer the collection and are
//! refused at loan time.

use serde::{Deserialize, Serialize};

use core_kernel::{BorrowerId, Money};

/// Borrowing capability: who the person is for billing purposes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowerProfile {
    pub id: BorrowerId,
    pub display_name: String,
    /// Borrower category code, resolved against the category table
    pub category: String,
    /// Outstanding unpaid penalties, never negative
    pub balance: Money,
}

impl BorrowerProfile {
    pub fn new(
        id: BorrowerId,
        display_name: impl Into<String>,
        category: impl Into<String>,
        balance: Money,
    ) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            category: category.into(),
            balance,
        }
    }
}

/// Staff member: a borrower profile plus a badge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffProfile {
    pub profile: BorrowerProfile,
    pub badge_number: String,
}

/// Role tag used by storage mappings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonRole {
    Borrower,
    Staff,
    SuperStaff,
}

impl PersonRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonRole::Borrower => "borrower",
            PersonRole::Staff => "staff",
            PersonRole::SuperStaff => "super_staff",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "borrower" => Some(PersonRole::Borrower),
            "staff" => Some(PersonRole::Staff),
            "super_staff" => Some(PersonRole::SuperStaff),
            _ => None,
        }
    }
}

/// A person in the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Person {
    Borrower(BorrowerProfile),
    Staff(StaffProfile),
    SuperStaff(StaffProfile),
}

impl Person {
    pub fn id(&self) -> BorrowerId {
        self.profile().id
    }

    pub fn role(&self) -> PersonRole {
        match self {
            Person::Borrower(_) => PersonRole::Borrower,
            Person::Staff(_) => PersonRole::Staff,
            Person::SuperStaff(_) => PersonRole::SuperStaff,
        }
    }

    /// The billing profile every person carries
    pub fn profile(&self) -> &BorrowerProfile {
        match self {
            Person::Borrower(profile) => profile,
            Person::Staff(staff) | Person::SuperStaff(staff) => &staff.profile,
        }
    }

    pub fn profile_mut(&mut self) -> &mut BorrowerProfile {
        match self {
            Person::Borrower(profile) => profile,
            Person::Staff(staff) | Person::SuperStaff(staff) => &mut staff.profile,
        }
    }

    /// The profile to borrow under, or `None` for people who may not borrow
    pub fn borrowing_profile(&self) -> Option<&BorrowerProfile> {
        match self {
            Person::Borrower(profile) => Some(profile),
            Person::Staff(staff) => Some(&staff.profile),
            Person::SuperStaff(_) => None,
        }
    }

    pub fn category(&self) -> &str {
        &self.profile().category
    }

    pub fn balance(&self) -> Money {
        self.profile().balance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;

    fn profile(category: &str) -> BorrowerProfile {
        BorrowerProfile::new(BorrowerId::new(), "Ada", category, Money::zero(Currency::EUR))
    }

    #[test]
    fn test_staff_may_borrow() {
        let staff = Person::Staff(StaffProfile {
            profile: profile("staff"),
            badge_number: "B-12".to_string(),
        });
        assert!(staff.borrowing_profile().is_some());
        assert_eq!(staff.category(), "staff");
    }

    #[test]
    fn test_super_staff_may_not_borrow() {
        let admin = Person::SuperStaff(StaffProfile {
            profile: profile("staff"),
            badge_number: "ROOT".to_string(),
        });
        assert!(admin.borrowing_profile().is_none());
        assert_eq!(admin.role(), PersonRole::SuperStaff);
    }

    #[test]
    fn test_role_round_trips_through_str() {
        for role in [PersonRole::Borrower, PersonRole::Staff, PersonRole::SuperStaff] {
            assert_eq!(PersonRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(PersonRole::parse("librarian"), None);
    }
}
