//! # Rate Resolver
//!
//! Maps a retailer's ownership classification and PAN availability to the
//! withholding rate applied to every entry of its ledger.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  resolve_rate(ownership_type, pan)                                      │
//! │                                                                         │
//! │  PAN blank / missing ───────────────────────────► NoPan        (20%)    │
//! │  ownership contains "sole proprietorship" ──────► Sole Prop.   (1%)     │
//! │  anything else (partnership, pvt ltd, LLP, ...) ► Standard     (2%)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// One of the three fixed withholding rates.
///
/// Serialized as the integer percentage (`1`, `2`, `20`) and stored the same
/// way in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[repr(i32)]
pub enum TdsRate {
    /// Sole proprietorship with a PAN on file.
    SoleProprietorship = 1,
    /// Partnerships, companies, LLPs and everything else with a PAN.
    Standard = 2,
    /// No PAN on file; penalty rate.
    NoPan = 20,
}

impl TdsRate {
    /// All rates, lowest first.
    pub const ALL: [TdsRate; 3] = [TdsRate::SoleProprietorship, TdsRate::Standard, TdsRate::NoPan];

    /// Returns the rate as a whole percentage.
    #[inline]
    pub const fn percent(&self) -> u8 {
        match self {
            TdsRate::SoleProprietorship => 1,
            TdsRate::Standard => 2,
            TdsRate::NoPan => 20,
        }
    }

    /// Looks up a rate by its percentage.
    pub fn from_percent(percent: u8) -> Option<Self> {
        TdsRate::ALL.into_iter().find(|rate| rate.percent() == percent)
    }
}

impl fmt::Display for TdsRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

impl From<TdsRate> for u8 {
    fn from(rate: TdsRate) -> Self {
        rate.percent()
    }
}

impl TryFrom<u8> for TdsRate {
    type Error = ValidationError;

    fn try_from(percent: u8) -> Result<Self, Self::Error> {
        TdsRate::from_percent(percent).ok_or_else(|| ValidationError::InvalidFormat {
            field: "rate".to_string(),
            reason: format!("{} is not one of 1, 2, 20", percent),
        })
    }
}

/// Ownership classification that earns the lowest rate (matched case-insensitively).
const SOLE_PROPRIETORSHIP: &str = "sole proprietorship";

/// Resolves the withholding rate for a retailer.
///
/// ## Example
/// ```rust
/// use tds_core::rate::{resolve_rate, TdsRate};
///
/// assert_eq!(resolve_rate(Some("Sole Proprietorship"), Some("ABCDE1234F")), TdsRate::SoleProprietorship);
/// assert_eq!(resolve_rate(Some("Private Limited"), Some("ABCDE1234F")), TdsRate::Standard);
/// assert_eq!(resolve_rate(Some("Sole Proprietorship"), Some("   ")), TdsRate::NoPan);
/// ```
pub fn resolve_rate(ownership_type: Option<&str>, tax_id: Option<&str>) -> TdsRate {
    let has_tax_id = tax_id.map(|id| !id.trim().is_empty()).unwrap_or(false);
    if !has_tax_id {
        return TdsRate::NoPan;
    }

    let is_sole_proprietorship = ownership_type
        .map(|kind| kind.to_lowercase().contains(SOLE_PROPRIETORSHIP))
        .unwrap_or(false);

    if is_sole_proprietorship {
        TdsRate::SoleProprietorship
    } else {
        TdsRate::Standard
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
