//! Calendar clock port
//!
//! Circulation rules work in whole calendar days: loans are borrowed on a
//! date, fall due on a date and are returned on a date. The [`Clock`] trait is
//! the only place the core asks "what day is it", which keeps every rule
//! reproducible under a [`FixedClock`].

use chrono::{Days, NaiveDate, Utc};
use chrono_tz::Tz;
use std::str::FromStr;
use std::sync::RwLock;

use crate::error::CoreError;

/// Source of the current calendar date
pub trait Clock: Send + Sync {
    /// Returns today's date in the library's local timezone
    fn today(&self) -> NaiveDate;
}

/// Wall clock reading the system time in a fixed timezone
///
/// The timezone matters around midnight: a document returned at 00:30 local
/// time must count as returned on the new day even though UTC still reports
/// the previous one.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    timezone: Tz,
}

impl SystemClock {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    /// Creates a clock from an IANA timezone name such as `Europe/Paris`
    pub fn from_timezone_name(name: &str) -> Result<Self, CoreError> {
        let timezone = Tz::from_str(name)
            .map_err(|_| CoreError::Configuration(format!("Invalid timezone: {}", name)))?;
        Ok(Self::new(timezone))
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }
}

/// Manually driven clock for tests and replays
#[derive(Debug)]
pub struct FixedClock {
    today: RwLock<NaiveDate>,
}

impl FixedClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: RwLock::new(today),
        }
    }

    /// Moves the clock to the given date
    pub fn set(&self, date: NaiveDate) {
        let mut guard = self.today.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = date;
    }

    /// Moves the clock forward by `days`
    pub fn advance_days(&self, days: u64) {
        let mut guard = self.today.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(next) = guard.checked_add_days(Days::new(days)) {
            *guard = next;
        }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.today.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
