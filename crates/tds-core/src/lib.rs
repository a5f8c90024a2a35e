//! # tds-core: Pure Withholding Logic for the TDS Ledger
//!
//! This crate is the **heart** of the TDS ledger. It contains the rate
//! resolver, the ledger state machine, the snapshot rebuild and the report
//! aggregation as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        TDS Ledger Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    tds-api (axum HTTP)                          │   │
//! │  │   campaign-amounts, recalculate, rate, summary, near-threshold  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tds-core (THIS CRATE) ★                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   rate    │  │  ledger   │  │  report   │  │ validation│  │   │
//! │  │   │ resolver  │  │  record   │  │  summary  │  │   rules   │  │   │
//! │  │   │  TdsRate  │  │  rebuild  │  │  alerts   │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tds-db (Database Layer)                      │   │
//! │  │         SQLite queries, migrations, versioned repositories      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`rate`] - Rate resolver (1% / 2% / 20%)
//! - [`ledger`] - Ledger record, incremental update, full rebuild
//! - [`report`] - Retailer history, fiscal-year summary, near-threshold alerts
//! - [`money`] - Money type with integer paise
//! - [`fiscal_year`] - April-March fiscal year keys
//! - [`types`] - Retailer and campaign inputs
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use tds_core::{CampaignAmount, FiscalYear, LedgerRecord, Money, TdsRate, Thresholds};
//!
//! let fy: FiscalYear = "2025-2026".parse().unwrap();
//! let mut ledger = LedgerRecord::new("r-1", fy, TdsRate::SoleProprietorship, Utc::now());
//!
//! let snapshot = vec![
//!     CampaignAmount::new("c-1", "Summer", Money::from_rupees(35_000)),
//!     CampaignAmount::new("c-2", "Diwali", Money::from_rupees(70_000)),
//! ];
//! ledger.rebuild_from_snapshot(&snapshot, &Thresholds::default(), Utc::now()).unwrap();
//!
//! assert!(ledger.threshold_crossed);
//! // 350 + 700 individual, 1,050 cumulative on the 105,000 peak
//! assert_eq!(ledger.total_amount(), Money::from_rupees(2_100));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod fiscal_year;
pub mod ledger;
pub mod money;
pub mod rate;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use fiscal_year::FiscalYear;
pub use ledger::{
    ApplyOutcome, CumulativeEntry, EntryKind, IndividualEntry, LedgerParts, LedgerRecord,
};
pub use money::Money;
pub use rate::{resolve_rate, TdsRate};
pub use report::{FiscalYearSummary, LedgerWithRetailer, NearThresholdAlert, RetailerHistory};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Single-campaign amount at or above which withholding applies before the
/// cumulative threshold is crossed (₹30,000).
pub const DEFAULT_PER_CAMPAIGN_THRESHOLD: Money = Money::from_rupees(30_000);

/// Peak aggregate that triggers the one-time cumulative charge (₹1,00,000).
pub const DEFAULT_CUMULATIVE_THRESHOLD: Money = Money::from_rupees(100_000);

/// Near-threshold alerts start at this percentage of the cumulative threshold.
pub const NEAR_THRESHOLD_WARNING_PERCENT: u8 = 90;
