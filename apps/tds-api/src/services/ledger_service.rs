//! Ledger write paths: incremental update, full recalculation, rate update.
//!
//! Every path has the same shape:
//! ```text
//! validate ids → load retailer → get-or-create record → clone "before"
//!      → core rule (apply / rebuild) → verify_transition(before)
//!      → versioned save (409 if another writer got there first)
//! ```

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tds_core::validation::validate_uuid;
use tds_core::{
    ApplyOutcome, CampaignAmount, CampaignAmountChange, CoreError, EntryKind, FiscalYear,
    LedgerRecord, Retailer, TdsRate,
};
use tracing::{debug, info};

use crate::error::ApiResult;
use crate::AppState;

/// Result of an incremental update.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignAmountResponse {
    pub record: LedgerRecord,
    pub outcome: ApplyOutcome,
}

/// Result of a manual rate update.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateUpdateResponse {
    pub record: LedgerRecord,
    pub previous_rate: TdsRate,
    pub new_rate: TdsRate,
    pub changed: bool,
}

pub struct LedgerService {
    state: Arc<AppState>,
}

impl LedgerService {
    pub fn new(state: Arc<AppState>) -> Self {
        LedgerService { state }
    }

    /// Applies one campaign's amount change to the retailer's record for
    /// `fiscal_year` (current fiscal year when `None`).
    pub async fn apply_campaign_amount(
        &self,
        retailer_id: &str,
        fiscal_year: Option<FiscalYear>,
        change: &CampaignAmountChange,
    ) -> ApiResult<CampaignAmountResponse> {
        let retailer = self.load_retailer(retailer_id).await?;
        let fiscal_year = fiscal_year.unwrap_or_else(FiscalYear::current);

        let mut record = self
            .state
            .db
            .ledgers()
            .get_or_create(&retailer.id, fiscal_year, retailer.tds_rate())
            .await?;
        let before = record.clone();

        let outcome = record.apply_campaign_amount(change, &self.state.config.thresholds(), Utc::now())?;
        record.verify_transition(&before)?;

        self.state.db.ledgers().save(&mut record).await?;

        if outcome.kind == EntryKind::Cumulative {
            info!(
                retailer_id = %retailer.id,
                fiscal_year = %fiscal_year,
                basis = %outcome.basis,
                withholding = %outcome.withholding,
                "Cumulative threshold crossed"
            );
        } else {
            debug!(
                retailer_id = %retailer.id,
                campaign_id = %change.campaign_id,
                kind = ?outcome.kind,
                withholding = %outcome.withholding,
                "Applied campaign amount"
            );
        }

        Ok(CampaignAmountResponse { record, outcome })
    }

    /// Rebuilds the retailer's record from `campaigns`, or from the stored
    /// campaign budget when no snapshot is supplied.
    pub async fn recalculate(
        &self,
        retailer_id: &str,
        fiscal_year: Option<FiscalYear>,
        campaigns: Option<Vec<CampaignAmount>>,
    ) -> ApiResult<LedgerRecord> {
        let retailer = self.load_retailer(retailer_id).await?;
        let fiscal_year = fiscal_year.unwrap_or_else(FiscalYear::current);

        let campaigns = match campaigns {
            Some(campaigns) => campaigns,
            None => self.stored_budget(&retailer.id).await?,
        };

        let mut record = self
            .state
            .db
            .ledgers()
            .get_or_create(&retailer.id, fiscal_year, retailer.tds_rate())
            .await?;
        let before = record.clone();
        let was_crossed = record.threshold_crossed;

        record.rebuild_from_snapshot(&campaigns, &self.state.config.thresholds(), Utc::now())?;
        record.verify_transition(&before)?;

        self.state.db.ledgers().save(&mut record).await?;

        info!(
            retailer_id = %retailer.id,
            fiscal_year = %fiscal_year,
            campaigns = campaigns.len(),
            total_committed = %record.total_committed,
            total_tds = %record.total_amount(),
            crossed_now = !was_crossed && record.threshold_crossed,
            "Recalculated ledger record"
        );

        Ok(record)
    }

    /// Re-resolves the retailer's rate from its current attributes. When it
    /// changed, every individual entry is restated at the new rate by
    /// rebuilding from the stored budget; an existing cumulative entry keeps
    /// the rate it was charged at.
    pub async fn update_rate(
        &self,
        retailer_id: &str,
        fiscal_year: Option<FiscalYear>,
    ) -> ApiResult<RateUpdateResponse> {
        let retailer = self.load_retailer(retailer_id).await?;
        let fiscal_year = fiscal_year.unwrap_or_else(FiscalYear::current);

        let mut record = self
            .state
            .db
            .ledgers()
            .find_by_retailer_year(&retailer.id, fiscal_year)
            .await?
            .ok_or_else(|| CoreError::LedgerNotFound(format!("{}/{}", retailer.id, fiscal_year)))?;

        let previous_rate = record.applicable_rate;
        let new_rate = retailer.tds_rate();

        if previous_rate == new_rate {
            return Ok(RateUpdateResponse {
                record,
                previous_rate,
                new_rate,
                changed: false,
            });
        }

        let campaigns = self.stored_budget(&retailer.id).await?;
        let before = record.clone();

        record.change_rate(new_rate);
        record.rebuild_from_snapshot(&campaigns, &self.state.config.thresholds(), Utc::now())?;
        record.verify_transition(&before)?;

        self.state.db.ledgers().save(&mut record).await?;

        info!(
            retailer_id = %retailer.id,
            fiscal_year = %fiscal_year,
            previous_rate = %previous_rate,
            new_rate = %new_rate,
            "Applicable rate changed, individual entries restated"
        );

        Ok(RateUpdateResponse {
            record,
            previous_rate,
            new_rate,
            changed: true,
        })
    }

    async fn load_retailer(&self, retailer_id: &str) -> ApiResult<Retailer> {
        validate_uuid("retailer_id", retailer_id)?;

        let retailer = self
            .state
            .db
            .retailers()
            .get_by_id(retailer_id)
            .await?
            .ok_or_else(|| CoreError::RetailerNotFound(retailer_id.to_string()))?;

        Ok(retailer)
    }

    async fn stored_budget(&self, retailer_id: &str) -> ApiResult<Vec<CampaignAmount>> {
        let campaigns = self
            .state
            .db
            .budgets()
            .get_snapshot(retailer_id)
            .await?
            .ok_or_else(|| CoreError::BudgetNotFound(retailer_id.to_string()))?;

        Ok(campaigns)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
