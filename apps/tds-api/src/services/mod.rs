//! Services orchestrating tds-core rules over tds-db repositories.
//!
//! ```text
//! ┌──────────────────┐   ┌────────────────────────────────────────────┐
//! │ LedgerService    │   │ apply_campaign_amount / recalculate / rate │
//! │ (writes)         │──►│ get-or-create → core rule → versioned save │
//! └──────────────────┘   └────────────────────────────────────────────┘
//! ┌──────────────────┐   ┌────────────────────────────────────────────┐
//! │ ReportService    │──►│ record lookups, history, summary, alerts   │
//! │ (read-only)      │   └────────────────────────────────────────────┘
//! └──────────────────┘
//! ```

pub mod ledger_service;
pub mod report_service;

pub use ledger_service::{CampaignAmountResponse, LedgerService, RateUpdateResponse};
pub use report_service::{NearThresholdResponse, ReportService};
