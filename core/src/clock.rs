//! Store clock — the single source of "now" and "today".
//!
//! Lifecycle status, days-to-go, schedule fit and offer expiry all depend on
//! the current date, and the write-behind queue depends on the current
//! instant. Everything reads time through this type so tests can pin it.

use crate::types::Timestamp;
use chrono::{Duration, Local, NaiveDate, Utc};

#[derive(Debug, Clone, PartialEq)]
pub enum Clock {
    /// Real wall clock. "Today" is the local calendar date.
    System,
    /// Frozen instant. "Today" is the UTC calendar date of the instant.
    Fixed(Timestamp),
}

impl Clock {
    /// Pin the clock at noon UTC on the given date.
    pub fn fixed_on(date: NaiveDate) -> Self {
        let noon = date
            .and_hms_opt(12, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or_else(Utc::now);
        Self::Fixed(noon)
    }

    pub fn now(&self) -> Timestamp {
        match self {
            Self::System   => Utc::now(),
            Self::Fixed(t) => *t,
        }
    }

    pub fn today(&self) -> NaiveDate {
        match self {
            Self::System   => Local::now().date_naive(),
            Self::Fixed(t) => t.date_naive(),
        }
    }

    /// Move a fixed clock forward. No-op on the system clock.
    pub fn advance(&mut self, by: Duration) {
        if let Self::Fixed(t) = self {
            *t += by;
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::System
    }
}
