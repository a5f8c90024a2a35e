//! # Fiscal Year
//!
//! The Indian fiscal year runs 1 April – 31 March and is keyed
//! `"YYYY-YYYY+1"` (e.g. `"2025-2026"`).
//!
//! ```text
//!   Jan Feb Mar │ Apr May ... Dec │ Jan Feb Mar
//!   ────────────┼─────────────────┼────────────
//!    2024-2025  │        2025-2026              │
//! ```

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Earliest accepted fiscal year start.
const MIN_START_YEAR: i32 = 1900;

/// Latest accepted fiscal year start.
const MAX_START_YEAR: i32 = 9998;

/// A fiscal year identified by the calendar year in which it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct FiscalYear {
    start_year: i32,
}

impl FiscalYear {
    /// Creates a fiscal year from its starting calendar year.
    pub fn starting(start_year: i32) -> Result<Self, ValidationError> {
        if !(MIN_START_YEAR..=MAX_START_YEAR).contains(&start_year) {
            return Err(ValidationError::OutOfRange {
                field: "fiscal_year".to_string(),
                min: MIN_START_YEAR as i64,
                max: MAX_START_YEAR as i64,
            });
        }
        Ok(FiscalYear { start_year })
    }

    /// Returns the fiscal year containing `date`.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::NaiveDate;
    /// use tds_core::fiscal_year::FiscalYear;
    ///
    /// let march = NaiveDate::from_ymd_opt(2026, 3, 31).unwrap();
    /// let april = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
    /// assert_eq!(FiscalYear::from_date(march).to_string(), "2025-2026");
    /// assert_eq!(FiscalYear::from_date(april).to_string(), "2026-2027");
    /// ```
    pub fn from_date(date: NaiveDate) -> Self {
        let start_year = if date.month() <= 3 {
            date.year() - 1
        } else {
            date.year()
        };
        FiscalYear { start_year }
    }

    /// Returns the fiscal year containing today's date (UTC).
    pub fn current() -> Self {
        FiscalYear::from_date(Utc::now().date_naive())
    }

    /// Calendar year in which this fiscal year starts.
    #[inline]
    pub const fn start_year(&self) -> i32 {
        self.start_year
    }

    /// Calendar year in which this fiscal year ends.
    #[inline]
    pub const fn end_year(&self) -> i32 {
        self.start_year + 1
    }

    /// First day (1 April).
    pub fn start_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.start_year, 4, 1)
    }

    /// Last day (31 March of the following year).
    pub fn end_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.end_year(), 3, 31)
    }

    /// Checks whether `date` falls inside this fiscal year.
    pub fn contains(&self, date: NaiveDate) -> bool {
        FiscalYear::from_date(date) == *self
    }

    /// The fiscal year before this one.
    pub fn previous(&self) -> Self {
        FiscalYear {
            start_year: self.start_year - 1,
        }
    }
}

impl fmt::Display for FiscalYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start_year, self.end_year())
    }
}

impl FromStr for FiscalYear {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "fiscal_year".to_string(),
            reason: reason.to_string(),
        };

        let s = s.trim();
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| invalid("expected YYYY-YYYY"))?;

        if start.len() != 4 || end.len() != 4 {
            return Err(invalid("expected YYYY-YYYY"));
        }

        let start: i32 = start.parse().map_err(|_| invalid("start year is not a number"))?;
        let end: i32 = end.parse().map_err(|_| invalid("end year is not a number"))?;

        if end != start + 1 {
            return Err(invalid("end year must follow start year"));
        }

        FiscalYear::starting(start)
    }
}

impl TryFrom<String> for FiscalYear {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FiscalYear> for String {
    fn from(fy: FiscalYear) -> Self {
        fy.to_string()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
