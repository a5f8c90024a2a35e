//! # Domain Types
//!
//! Inputs the ledger consumes from the rest of the campaign platform.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Ledger Inputs                                  │
//! │                                                                         │
//! │  Retailer                  (owned by the retailer portal)              │
//! │  ├── ownership_type ─┐                                                  │
//! │  ├── pan ────────────┴──► resolve_rate() ──► TdsRate                   │
//! │  └── state ─────────────► fiscal-year summary grouping                 │
//! │                                                                         │
//! │  CampaignAmount            (one campaign's committed amount, "TCA")    │
//! │  └── Vec<CampaignAmount> ─► rebuild_from_snapshot()                    │
//! │                                                                         │
//! │  CampaignAmountChange      (one campaign edited)                       │
//! │  └──────────────────────► apply_campaign_amount()                      │
//! │                                                                         │
//! │  Thresholds                (per-campaign 30k, cumulative 100k)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::rate::{resolve_rate, TdsRate};
use crate::{DEFAULT_CUMULATIVE_THRESHOLD, DEFAULT_PER_CAMPAIGN_THRESHOLD};

// =============================================================================
// Retailer
// =============================================================================

/// The retailer attributes the ledger reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Retailer {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Shop or business name.
    pub name: String,

    /// State of registration, used for state-wise reporting.
    pub state: Option<String>,

    /// Free-text business ownership classification.
    pub ownership_type: Option<String>,

    /// PAN (tax id). `None` or blank means not on file.
    pub pan: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Retailer {
    /// Resolves this retailer's withholding rate from its current attributes.
    pub fn tds_rate(&self) -> TdsRate {
        resolve_rate(self.ownership_type.as_deref(), self.pan.as_deref())
    }
}

// =============================================================================
// Campaign Amounts
// =============================================================================

/// One campaign's committed amount for a retailer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CampaignAmount {
    pub campaign_id: String,
    pub campaign_name: String,
    pub amount: Money,
}

impl CampaignAmount {
    pub fn new(campaign_id: impl Into<String>, campaign_name: impl Into<String>, amount: Money) -> Self {
        CampaignAmount {
            campaign_id: campaign_id.into(),
            campaign_name: campaign_name.into(),
            amount,
        }
    }
}

/// A single campaign's amount changing from `previous_amount` to `new_amount`.
///
/// `previous_amount` is zero when the campaign is new to the retailer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CampaignAmountChange {
    pub campaign_id: String,
    pub campaign_name: String,
    pub new_amount: Money,
    #[serde(default)]
    pub previous_amount: Money,
}

impl CampaignAmountChange {
    /// A campaign appearing for the first time.
    pub fn added(campaign_id: impl Into<String>, campaign_name: impl Into<String>, amount: Money) -> Self {
        CampaignAmountChange {
            campaign_id: campaign_id.into(),
            campaign_name: campaign_name.into(),
            new_amount: amount,
            previous_amount: Money::zero(),
        }
    }

    /// An existing campaign edited from `previous` to `new`.
    pub fn edited(
        campaign_id: impl Into<String>,
        campaign_name: impl Into<String>,
        previous: Money,
        new: Money,
    ) -> Self {
        CampaignAmountChange {
            campaign_id: campaign_id.into(),
            campaign_name: campaign_name.into(),
            new_amount: new,
            previous_amount: previous,
        }
    }
}

// =============================================================================
// Thresholds
// =============================================================================

/// The two regulatory thresholds driving the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Thresholds {
    /// Single-campaign amount at or above which an individual entry is
    /// created before the cumulative threshold is crossed.
    pub per_campaign: Money,

    /// Peak aggregate at or above which the one-time cumulative charge
    /// fires and every later campaign is taxed individually.
    pub cumulative: Money,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            per_campaign: DEFAULT_PER_CAMPAIGN_THRESHOLD,
            cumulative: DEFAULT_CUMULATIVE_THRESHOLD,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
