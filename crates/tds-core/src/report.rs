//! # Reporting Aggregation
//!
//! Read-only views computed from ledger records. The database layer loads
//! rows; everything here is pure folding over them.
//!
//! ```text
//! ┌──────────────────────┐      ┌───────────────────────────────────────┐
//! │ Vec<LedgerRecord>    │ ───► │ retailer_history()   (one retailer)   │
//! └──────────────────────┘      └───────────────────────────────────────┘
//! ┌──────────────────────┐      ┌───────────────────────────────────────┐
//! │ Vec<LedgerWithRetailer│ ──► │ fiscal_year_summary() state / rate    │
//! │   (record + name,    │      ├───────────────────────────────────────┤
//! │    state)            │ ───► │ near_threshold_alerts()               │
//! └──────────────────────┘      └───────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;

use serde::Serialize;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::fiscal_year::FiscalYear;
use crate::ledger::LedgerRecord;
use crate::money::Money;
use crate::rate::TdsRate;

/// Group label for retailers without a recorded state.
pub const UNKNOWN_STATE: &str = "Unknown";

/// A ledger record joined with the retailer attributes reports group by.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LedgerWithRetailer {
    pub record: LedgerRecord,
    pub retailer_name: String,
    pub state: Option<String>,
}

// =============================================================================
// Retailer History
// =============================================================================

/// All-years roll-up for one retailer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HistorySummary {
    pub total_years: usize,
    /// All-time withholding across every fiscal year.
    pub total_tds: Money,
    /// All-time committed amount (sum of each year's current total).
    pub total_committed: Money,
    /// Fiscal years in which the cumulative threshold was crossed, newest first.
    #[ts(as = "Vec<String>")]
    pub threshold_crossed_years: Vec<FiscalYear>,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RetailerHistory {
    pub retailer_id: String,
    /// Newest fiscal year first.
    pub records: Vec<LedgerRecord>,
    pub summary: HistorySummary,
}

/// Builds a retailer's history from its records (any order).
///
/// Fails only if a total no longer fits in [`Money`].
pub fn retailer_history(
    retailer_id: impl Into<String>,
    mut records: Vec<LedgerRecord>,
) -> CoreResult<RetailerHistory> {
    records.sort_by(|a, b| b.fiscal_year.cmp(&a.fiscal_year));

    let summary = HistorySummary {
        total_years: records.len(),
        total_tds: checked_sum(records.iter().map(LedgerRecord::total_amount), "total TDS")?,
        total_committed: checked_sum(records.iter().map(|r| r.total_committed), "total committed")?,
        threshold_crossed_years: records
            .iter()
            .filter(|r| r.threshold_crossed)
            .map(|r| r.fiscal_year)
            .collect(),
    };

    Ok(RetailerHistory {
        retailer_id: retailer_id.into(),
        records,
        summary,
    })
}

fn checked_sum(amounts: impl Iterator<Item = Money>, what: &str) -> CoreResult<Money> {
    let mut total = Money::zero();
    for amount in amounts {
        accumulate(&mut total, amount, what)?;
    }
    Ok(total)
}

fn accumulate(total: &mut Money, amount: Money, what: &str) -> CoreResult<()> {
    *total = total
        .checked_add(amount)
        .ok_or_else(|| CoreError::computation(format!("{} overflowed", what)))?;
    Ok(())
}

// =============================================================================
// Fiscal-Year Summary
// =============================================================================

/// Totals shared by every summary grouping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SummaryTotals {
    pub retailer_count: usize,
    pub total_committed: Money,
    pub total_individual_tds: Money,
    pub total_cumulative_tds: Money,
    pub total_tds: Money,
    pub threshold_crossed_count: usize,
}

impl SummaryTotals {
    fn add(&mut self, record: &LedgerRecord) -> CoreResult<()> {
        accumulate(&mut self.total_committed, record.total_committed, "total committed")?;
        accumulate(&mut self.total_individual_tds, record.total_individual_amount(), "individual TDS")?;
        accumulate(&mut self.total_cumulative_tds, record.total_cumulative_amount(), "cumulative TDS")?;
        accumulate(&mut self.total_tds, record.total_amount(), "total TDS")?;
        self.retailer_count += 1;
        if record.threshold_crossed {
            self.threshold_crossed_count += 1;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StateBreakdown {
    pub state: String,
    #[serde(flatten)]
    pub totals: SummaryTotals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RateBreakdown {
    #[ts(as = "u8")]
    pub rate: TdsRate,
    #[serde(flatten)]
    pub totals: SummaryTotals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct FiscalYearSummary {
    #[ts(as = "String")]
    pub fiscal_year: FiscalYear,
    pub totals: SummaryTotals,
    /// Sorted by state name.
    pub by_state: Vec<StateBreakdown>,
    /// Sorted by rate, lowest first; only rates in use appear.
    pub by_rate: Vec<RateBreakdown>,
}

/// Aggregates one fiscal year's active records.
///
/// Rows from other fiscal years and inactive records are ignored.
pub fn fiscal_year_summary(
    fiscal_year: FiscalYear,
    rows: &[LedgerWithRetailer],
) -> CoreResult<FiscalYearSummary> {
    let mut totals = SummaryTotals::default();
    let mut by_state: BTreeMap<String, SummaryTotals> = BTreeMap::new();
    let mut by_rate: BTreeMap<TdsRate, SummaryTotals> = BTreeMap::new();

    for row in rows
        .iter()
        .filter(|row| row.record.is_active && row.record.fiscal_year == fiscal_year)
    {
        let state = row
            .state
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_STATE)
            .to_string();

        totals.add(&row.record)?;
        by_state.entry(state).or_default().add(&row.record)?;
        by_rate.entry(row.record.applicable_rate).or_default().add(&row.record)?;
    }

    Ok(FiscalYearSummary {
        fiscal_year,
        totals,
        by_state: by_state
            .into_iter()
            .map(|(state, totals)| StateBreakdown { state, totals })
            .collect(),
        by_rate: by_rate
            .into_iter()
            .map(|(rate, totals)| RateBreakdown { rate, totals })
            .collect(),
    })
}

// =============================================================================
// Near-Threshold Alerts
// =============================================================================

/// A retailer approaching the cumulative threshold.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NearThresholdAlert {
    pub record_id: String,
    pub retailer_id: String,
    pub retailer_name: String,
    pub state: Option<String>,
    #[ts(as = "String")]
    pub fiscal_year: FiscalYear,
    pub total_committed: Money,
    pub threshold: Money,
    /// `threshold - total_committed`, floored at zero.
    pub remaining: Money,
    /// `total_committed` as a percentage of `threshold`, two decimals.
    pub percentage: f64,
}

/// The amount at which warnings start: `threshold × percent / 100`.
pub fn warning_line(threshold: Money, warning_percent: u8) -> Money {
    let paise = threshold.paise() as i128 * warning_percent as i128 / 100;
    Money::from_paise(paise as i64)
}

/// Lists uncrossed active records at or above the warning line, largest
/// committed total first.
///
/// ## Example
/// ```text
/// threshold 100,000 × 90% = warning line 90,000
///
///   95,000  not crossed  → alert (remaining 5,000, 95.00%)
///   92,000  not crossed  → alert (remaining 8,000, 92.00%)
///   85,000  not crossed  → skipped (below line)
///  120,000  crossed      → skipped
/// ```
pub fn near_threshold_alerts(
    rows: &[LedgerWithRetailer],
    threshold: Money,
    warning_percent: u8,
) -> Vec<NearThresholdAlert> {
    let line = warning_line(threshold, warning_percent);

    let mut alerts: Vec<NearThresholdAlert> = rows
        .iter()
        .filter(|row| {
            row.record.is_active
                && !row.record.threshold_crossed
                && row.record.total_committed >= line
        })
        .map(|row| {
            let committed = row.record.total_committed;
            NearThresholdAlert {
                record_id: row.record.id.clone(),
                retailer_id: row.record.retailer_id.clone(),
                retailer_name: row.retailer_name.clone(),
                state: row.state.clone(),
                fiscal_year: row.record.fiscal_year,
                total_committed: committed,
                threshold,
                remaining: (threshold - committed).max(Money::zero()),
                percentage: committed.percentage_of(threshold),
            }
        })
        .collect();

    alerts.sort_by(|a, b| b.total_committed.cmp(&a.total_committed));
    alerts
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CampaignAmount, Thresholds};
    use chrono::Utc;

    fn fy(s: &str) -> FiscalYear {
        s.parse().unwrap()
    }

    fn record(retailer: &str, year: &str, rate: TdsRate, amounts: &[i64]) -> LedgerRecord {
        let mut record = LedgerRecord::new(retailer, fy(year), rate, Utc::now());
        let snapshot: Vec<CampaignAmount> = amounts
            .iter()
            .enumerate()
            .map(|(i, a)| CampaignAmount::new(format!("c{}", i), format!("Campaign {}", i), Money::from_rupees(*a)))
            .collect();
        record
            .rebuild_from_snapshot(&snapshot, &Thresholds::default(), Utc::now())
            .unwrap();
        record
    }

    fn row(record: LedgerRecord, name: &str, state: Option<&str>) -> LedgerWithRetailer {
        LedgerWithRetailer {
            record,
            retailer_name: name.to_string(),
            state: state.map(str::to_string),
        }
    }

    #[test]
    fn test_retailer_history_summary() {
        let records = vec![
            record("r1", "2024-2025", TdsRate::Standard, &[120_000]),
            record("r1", "2025-2026", TdsRate::Standard, &[40_000]),
        ];
        let history = retailer_history("r1", records).unwrap();

        assert_eq!(history.records[0].fiscal_year, fy("2025-2026"));
        assert_eq!(history.summary.total_years, 2);
        assert_eq!(history.summary.total_committed, Money::from_rupees(160_000));
        // 2024: 120,000 individual + 120,000 cumulative at 2%; 2025: 40,000 at 2%
        assert_eq!(history.summary.total_tds, Money::from_rupees(2_400 + 2_400 + 800));
        assert_eq!(history.summary.threshold_crossed_years, vec![fy("2024-2025")]);
    }

    #[test]
    fn test_fiscal_year_summary_groups_by_state_and_rate() {
        let year = "2025-2026";
        let mut inactive = record("r4", year, TdsRate::Standard, &[50_000]);
        inactive.deactivate();

        let rows = vec![
            row(record("r1", year, TdsRate::SoleProprietorship, &[35_000]), "A", Some("Maharashtra")),
            row(record("r2", year, TdsRate::Standard, &[40_000]), "B", Some("Maharashtra")),
            row(record("r3", year, TdsRate::NoPan, &[10_000]), "C", None),
            row(inactive, "D", Some("Goa")),
            row(record("r5", "2024-2025", TdsRate::Standard, &[50_000]), "E", Some("Goa")),
        ];
        let summary = fiscal_year_summary(fy(year), &rows).unwrap();

        assert_eq!(summary.totals.retailer_count, 3);
        assert_eq!(summary.totals.total_committed, Money::from_rupees(85_000));
        assert_eq!(summary.totals.total_tds, Money::from_rupees(350 + 800));

        let states: Vec<&str> = summary.by_state.iter().map(|b| b.state.as_str()).collect();
        assert_eq!(states, vec!["Maharashtra", UNKNOWN_STATE]);
        assert_eq!(summary.by_state[0].totals.retailer_count, 2);

        let rates: Vec<TdsRate> = summary.by_rate.iter().map(|b| b.rate).collect();
        assert_eq!(rates, vec![TdsRate::SoleProprietorship, TdsRate::Standard, TdsRate::NoPan]);
        assert_eq!(summary.by_rate[2].totals.total_tds, Money::zero());
    }

    #[test]
    fn test_totals_overflow_is_a_computation_error() {
        let year = "2025-2026";
        let mut big = LedgerRecord::new("r1", fy(year), TdsRate::Standard, Utc::now());
        big.total_committed = Money::from_paise(i64::MAX);
        big.peak_committed = big.total_committed;
        let mut other = big.clone();
        other.retailer_id = "r2".to_string();

        let err = fiscal_year_summary(fy(year), &[row(big.clone(), "A", None), row(other, "B", None)])
            .unwrap_err();
        assert!(matches!(err, CoreError::Computation(_)));

        let mut next_year = big.clone();
        next_year.fiscal_year = fy("2026-2027");
        assert!(retailer_history("r1", vec![big, next_year]).is_err());
    }

    #[test]
    fn test_near_threshold_alerts() {
        let year = "2025-2026";
        let rows = vec![
            row(record("r1", year, TdsRate::Standard, &[20_000, 20_000, 20_000, 25_000]), "A", None),
            row(record("r2", year, TdsRate::Standard, &[25_000, 25_000, 25_000, 20_000]), "B", None),
            row(record("r3", year, TdsRate::Standard, &[20_000, 20_000, 20_000, 20_000, 12_000]), "C", None),
            row(record("r4", year, TdsRate::Standard, &[120_000]), "D", None),
        ];

        let alerts = near_threshold_alerts(&rows, Money::from_rupees(100_000), 90);
        let ids: Vec<&str> = alerts.iter().map(|a| a.retailer_id.as_str()).collect();
        assert_eq!(ids, vec!["r2", "r3"]);
        assert_eq!(alerts[0].remaining, Money::from_rupees(5_000));
        assert_eq!(alerts[0].percentage, 95.0);
        assert_eq!(alerts[1].total_committed, Money::from_rupees(92_000));
    }

    #[test]
    fn test_near_threshold_custom_threshold() {
        let rows = vec![row(
            record("r1", "2025-2026", TdsRate::Standard, &[20_000, 25_000]),
            "A",
            Some("Goa"),
        )];
        let alerts = near_threshold_alerts(&rows, Money::from_rupees(50_000), 90);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].remaining, Money::from_rupees(5_000));
    }

    #[test]
    fn test_warning_line() {
        assert_eq!(warning_line(Money::from_rupees(100_000), 90), Money::from_rupees(90_000));
        assert_eq!(warning_line(Money::from_rupees(100_000), 100), Money::from_rupees(100_000));
    }
}
