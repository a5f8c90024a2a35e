//! Read-only reporting over ledger records.

use std::sync::Arc;

use serde::Serialize;
use tds_core::report::{self, warning_line};
use tds_core::validation::validate_uuid;
use tds_core::{
    CoreError, FiscalYear, FiscalYearSummary, LedgerRecord, Money, NearThresholdAlert,
    RetailerHistory, ValidationError,
};
use tracing::debug;

use crate::error::ApiResult;
use crate::AppState;

/// Near-threshold alerts plus the parameters they were computed with.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearThresholdResponse {
    pub fiscal_year: FiscalYear,
    pub threshold: Money,
    pub warning_line: Money,
    pub alerts: Vec<NearThresholdAlert>,
}

pub struct ReportService {
    state: Arc<AppState>,
}

impl ReportService {
    pub fn new(state: Arc<AppState>) -> Self {
        ReportService { state }
    }

    /// The retailer's record for `fiscal_year` (current fiscal year when `None`).
    pub async fn get_by_retailer_year(
        &self,
        retailer_id: &str,
        fiscal_year: Option<FiscalYear>,
    ) -> ApiResult<LedgerRecord> {
        validate_uuid("retailer_id", retailer_id)?;
        let fiscal_year = fiscal_year.unwrap_or_else(FiscalYear::current);

        let record = self
            .state
            .db
            .ledgers()
            .find_by_retailer_year(retailer_id, fiscal_year)
            .await?
            .ok_or_else(|| CoreError::LedgerNotFound(format!("{}/{}", retailer_id, fiscal_year)))?;

        Ok(record)
    }

    /// Every fiscal year of a retailer with an all-time summary.
    pub async fn history(&self, retailer_id: &str) -> ApiResult<RetailerHistory> {
        validate_uuid("retailer_id", retailer_id)?;

        if self.state.db.retailers().get_by_id(retailer_id).await?.is_none() {
            return Err(CoreError::RetailerNotFound(retailer_id.to_string()).into());
        }

        let records = self.state.db.ledgers().list_by_retailer(retailer_id).await?;
        Ok(report::retailer_history(retailer_id, records)?)
    }

    pub async fn get_by_id(&self, record_id: &str) -> ApiResult<LedgerRecord> {
        validate_uuid("record_id", record_id)?;

        let record = self
            .state
            .db
            .ledgers()
            .find_by_id(record_id)
            .await?
            .ok_or_else(|| CoreError::LedgerNotFound(record_id.to_string()))?;

        Ok(record)
    }

    /// Totals for a fiscal year, broken down by retailer state and by rate.
    pub async fn fiscal_year_summary(&self, fiscal_year: Option<FiscalYear>) -> ApiResult<FiscalYearSummary> {
        let fiscal_year = fiscal_year.unwrap_or_else(FiscalYear::current);
        let rows = self.state.db.ledgers().list_for_fiscal_year(fiscal_year).await?;

        debug!(fiscal_year = %fiscal_year, records = rows.len(), "Building fiscal year summary");
        Ok(report::fiscal_year_summary(fiscal_year, &rows)?)
    }

    /// Uncrossed records within the warning band below `threshold`
    /// (configured cumulative threshold when `None`).
    pub async fn near_threshold(
        &self,
        fiscal_year: Option<FiscalYear>,
        threshold: Option<Money>,
    ) -> ApiResult<NearThresholdResponse> {
        let fiscal_year = fiscal_year.unwrap_or_else(FiscalYear::current);
        let threshold = threshold.unwrap_or(self.state.config.thresholds().cumulative);

        if !threshold.is_positive() {
            return Err(ValidationError::MustBePositive {
                field: "threshold".to_string(),
            }
            .into());
        }

        let percent = self.state.config.warning_percent();
        let line = warning_line(threshold, percent);

        let rows = self
            .state
            .db
            .ledgers()
            .list_uncrossed_at_or_above(fiscal_year, line)
            .await?;
        let alerts = report::near_threshold_alerts(&rows, threshold, percent);

        Ok(NearThresholdResponse {
            fiscal_year,
            threshold,
            warning_line: line,
            alerts,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::services::ledger_service::tests::{new_id, rupees, seed_retailer, test_state};
    use crate::services::LedgerService;
    use tds_core::{CampaignAmount, TdsRate};

    fn fy() -> FiscalYear {
        "2025-2026".parse().unwrap()
    }

    async fn ledger_with(state: &Arc<AppState>, retailer_id: &str, year: FiscalYear, amounts: &[i64]) {
        let snapshot: Vec<CampaignAmount> = amounts
            .iter()
            .enumerate()
            .map(|(i, a)| CampaignAmount::new(format!("c{}", i), format!("Campaign {}", i), rupees(*a)))
            .collect();
        LedgerService::new(state.clone())
            .recalculate(retailer_id, Some(year), Some(snapshot))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_get_by_retailer_year_and_id() {
        let state = test_state().await;
        let retailer = seed_retailer(&state, None, Some("ABCDE1234F"), None).await;
        ledger_with(&state, &retailer.id, fy(), &[40_000]).await;

        let service = ReportService::new(state);
        let record = service.get_by_retailer_year(&retailer.id, Some(fy())).await.unwrap();
        assert_eq!(record.total_committed, rupees(40_000));

        let same = service.get_by_id(&record.id).await.unwrap();
        assert_eq!(same.id, record.id);

        let err = service
            .get_by_retailer_year(&retailer.id, Some(fy().previous()))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err = service.get_by_id(&new_id()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err = service.get_by_id("42").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_history_summary() {
        let state = test_state().await;
        let retailer = seed_retailer(&state, Some("Sole Proprietorship"), Some("ABCDE1234F"), None).await;
        ledger_with(&state, &retailer.id, fy().previous(), &[60_000, 50_000]).await;
        ledger_with(&state, &retailer.id, fy(), &[35_000]).await;

        let history = ReportService::new(state).history(&retailer.id).await.unwrap();

        assert_eq!(history.records.len(), 2);
        assert_eq!(history.records[0].fiscal_year, fy());
        assert_eq!(history.summary.total_years, 2);
        assert_eq!(history.summary.total_committed, rupees(145_000));
        // 600 + 500 + 1,100 cumulative, then 350
        assert_eq!(history.summary.total_tds, rupees(2_550));
        assert_eq!(history.summary.threshold_crossed_years, vec![fy().previous()]);
    }

    #[tokio::test]
    async fn test_history_unknown_retailer() {
        let state = test_state().await;
        let err = ReportService::new(state).history(&new_id()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_fiscal_year_summary_groups_by_state_and_rate() {
        let state = test_state().await;
        let a = seed_retailer(&state, Some("Sole Proprietorship"), Some("ABCDE1234F"), Some("Karnataka")).await;
        let b = seed_retailer(&state, None, Some("ABCDE1234G"), Some("Karnataka")).await;
        let c = seed_retailer(&state, None, None, None).await;
        ledger_with(&state, &a.id, fy(), &[40_000]).await;
        ledger_with(&state, &b.id, fy(), &[40_000]).await;
        ledger_with(&state, &c.id, fy(), &[40_000]).await;

        let summary = ReportService::new(state).fiscal_year_summary(Some(fy())).await.unwrap();

        assert_eq!(summary.totals.retailer_count, 3);
        assert_eq!(summary.totals.total_tds, rupees(400 + 800 + 8_000));

        let states: Vec<&str> = summary.by_state.iter().map(|s| s.state.as_str()).collect();
        assert_eq!(states, vec!["Karnataka", "Unknown"]);
        assert_eq!(summary.by_state[0].totals.retailer_count, 2);

        let rates: Vec<TdsRate> = summary.by_rate.iter().map(|r| r.rate).collect();
        assert_eq!(rates, vec![TdsRate::SoleProprietorship, TdsRate::Standard, TdsRate::NoPan]);
    }

    #[tokio::test]
    async fn test_near_threshold_default_and_override() {
        let state = test_state().await;
        let near = seed_retailer(&state, None, Some("ABCDE1234F"), Some("Gujarat")).await;
        let nearer = seed_retailer(&state, None, Some("ABCDE1234G"), Some("Gujarat")).await;
        let far = seed_retailer(&state, None, Some("ABCDE1234H"), None).await;
        let crossed = seed_retailer(&state, None, Some("ABCDE1234J"), None).await;
        ledger_with(&state, &near.id, fy(), &[46_000, 46_000]).await;
        ledger_with(&state, &nearer.id, fy(), &[50_000, 48_000]).await;
        ledger_with(&state, &far.id, fy(), &[20_000]).await;
        ledger_with(&state, &crossed.id, fy(), &[60_000, 60_000]).await;

        let service = ReportService::new(state);

        let res = service.near_threshold(Some(fy()), None).await.unwrap();
        assert_eq!(res.threshold, rupees(100_000));
        assert_eq!(res.warning_line, rupees(90_000));
        let ids: Vec<&str> = res.alerts.iter().map(|a| a.retailer_id.as_str()).collect();
        assert_eq!(ids, vec![nearer.id.as_str(), near.id.as_str()]);
        assert_eq!(res.alerts[0].remaining, rupees(2_000));
        assert_eq!(res.alerts[0].percentage, 98.0);

        // A lower reporting threshold pulls the small ledger in
        let res = service.near_threshold(Some(fy()), Some(rupees(21_000))).await.unwrap();
        assert!(res.alerts.iter().any(|a| a.retailer_id == far.id));

        let err = service.near_threshold(Some(fy()), Some(Money::zero())).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
}
