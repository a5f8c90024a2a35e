//! # Ledger State Machine
//!
//! One [`LedgerRecord`] per (retailer, fiscal year). It tracks the running
//! committed total, its all-time peak, a one-way threshold flag, per-campaign
//! individual entries and at most one cumulative entry.
//!
//! ## Regimes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  PRE-CROSSING (threshold_crossed = false)                              │
//! │  ├── campaign amount >= 30,000 → individual entry (amount × rate)      │
//! │  └── campaign amount <  30,000 → exempt, no entry                      │
//! │           │                                                             │
//! │           │  peak_committed reaches 100,000                             │
//! │           ▼                                                             │
//! │  CROSSING (happens exactly once)                                       │
//! │  ├── threshold_crossed := true, threshold_crossed_at := now            │
//! │  └── cumulative entry = peak × rate over the ENTIRE peak               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  POST-CROSSING (never reverts)                                         │
//! │  └── every campaign amount → individual entry (amount × rate)          │
//! │                                                                         │
//! │  Invariants: peak never decreases, flag never reverts,                 │
//! │              at most one cumulative entry.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two mutation paths exist:
//! - [`LedgerRecord::apply_campaign_amount`] - incremental, one campaign changed
//! - [`LedgerRecord::rebuild_from_snapshot`] - full rebuild from every campaign

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::fiscal_year::FiscalYear;
use crate::money::Money;
use crate::rate::TdsRate;
use crate::types::{CampaignAmount, CampaignAmountChange, Thresholds};
use crate::validation::{validate_campaign_change, validate_snapshot};

// =============================================================================
// Entries
// =============================================================================

/// Per-campaign withholding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct IndividualEntry {
    pub campaign_id: String,
    pub campaign_name: String,

    /// The campaign's committed amount (TCA).
    pub amount: Money,

    #[ts(as = "u8")]
    pub rate: TdsRate,

    /// `amount × rate / 100`.
    pub withholding: Money,

    #[ts(as = "String")]
    pub calculated_at: DateTime<Utc>,
}

/// The one-time lump-sum withholding charged when the threshold is crossed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CumulativeEntry {
    /// Peak committed amount at the moment of crossing.
    pub basis: Money,

    #[ts(as = "u8")]
    pub rate: TdsRate,

    /// `basis × rate / 100`.
    pub withholding: Money,

    /// Campaigns known to the ledger when the charge was made.
    pub included_campaigns: Vec<CampaignAmount>,

    #[ts(as = "String")]
    pub calculated_at: DateTime<Utc>,
}

/// Which kind of entry an incremental update produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum EntryKind {
    /// Exempt: below the per-campaign threshold before crossing.
    None,
    /// An individual entry was created or updated.
    Individual,
    /// This update crossed the threshold and created the cumulative entry.
    Cumulative,
}

/// Result of [`LedgerRecord::apply_campaign_amount`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ApplyOutcome {
    pub kind: EntryKind,

    /// Amount withheld by this update (zero for [`EntryKind::None`]).
    pub withholding: Money,

    /// Amount the withholding was computed on: the campaign amount, or the
    /// peak for a cumulative charge.
    pub basis: Money,
}

// =============================================================================
// Ledger Record
// =============================================================================

/// Stored fields of a ledger record, used to rebuild a [`LedgerRecord`] from
/// persistence. Derived totals are not part of it; they are recomputed.
#[derive(Debug, Clone)]
pub struct LedgerParts {
    pub id: String,
    pub retailer_id: String,
    pub fiscal_year: FiscalYear,
    pub total_committed: Money,
    pub peak_committed: Money,
    pub threshold_crossed: bool,
    pub threshold_crossed_at: Option<DateTime<Utc>>,
    pub applicable_rate: TdsRate,
    pub individual_entries: Vec<IndividualEntry>,
    pub cumulative_entry: Option<CumulativeEntry>,
    pub last_calculated_at: DateTime<Utc>,
    pub is_active: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// TDS ledger for one retailer in one fiscal year.
///
/// The withholding totals (`total_individual_amount`,
/// `total_cumulative_amount`, `total_amount`) are derived from the entries and
/// can only be read, never set.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LedgerRecord {
    /// Unique identifier (UUID v4).
    pub id: String,

    pub retailer_id: String,

    #[ts(as = "String")]
    pub fiscal_year: FiscalYear,

    /// Sum of the retailer's current campaign amounts. May decrease.
    pub total_committed: Money,

    /// Highest `total_committed` ever reached. Never decreases.
    pub peak_committed: Money,

    /// One-way flag, set when `peak_committed` first reaches the threshold.
    pub threshold_crossed: bool,

    #[ts(as = "Option<String>")]
    pub threshold_crossed_at: Option<DateTime<Utc>>,

    #[ts(as = "u8")]
    pub applicable_rate: TdsRate,

    pub individual_entries: Vec<IndividualEntry>,

    pub cumulative_entry: Option<CumulativeEntry>,

    total_individual_amount: Money,
    total_cumulative_amount: Money,
    total_amount: Money,

    #[ts(as = "String")]
    pub last_calculated_at: DateTime<Utc>,

    /// Soft lifecycle flag; records are never deleted.
    pub is_active: bool,

    /// Optimistic concurrency version, bumped on every save.
    pub version: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl LedgerRecord {
    /// Creates an empty ledger with a fresh id.
    pub fn new(
        retailer_id: impl Into<String>,
        fiscal_year: FiscalYear,
        rate: TdsRate,
        now: DateTime<Utc>,
    ) -> Self {
        LedgerRecord {
            id: Uuid::new_v4().to_string(),
            retailer_id: retailer_id.into(),
            fiscal_year,
            total_committed: Money::zero(),
            peak_committed: Money::zero(),
            threshold_crossed: false,
            threshold_crossed_at: None,
            applicable_rate: rate,
            individual_entries: Vec::new(),
            cumulative_entry: None,
            total_individual_amount: Money::zero(),
            total_cumulative_amount: Money::zero(),
            total_amount: Money::zero(),
            last_calculated_at: now,
            is_active: true,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuilds a record from stored fields, recomputing derived totals.
    pub fn restore(parts: LedgerParts) -> Self {
        let mut record = LedgerRecord {
            id: parts.id,
            retailer_id: parts.retailer_id,
            fiscal_year: parts.fiscal_year,
            total_committed: parts.total_committed,
            peak_committed: parts.peak_committed,
            threshold_crossed: parts.threshold_crossed,
            threshold_crossed_at: parts.threshold_crossed_at,
            applicable_rate: parts.applicable_rate,
            individual_entries: parts.individual_entries,
            cumulative_entry: parts.cumulative_entry,
            total_individual_amount: Money::zero(),
            total_cumulative_amount: Money::zero(),
            total_amount: Money::zero(),
            last_calculated_at: parts.last_calculated_at,
            is_active: parts.is_active,
            version: parts.version,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
        };
        record.refresh_totals();
        record
    }

    /// Sum of individual entry withholdings.
    #[inline]
    pub fn total_individual_amount(&self) -> Money {
        self.total_individual_amount
    }

    /// Withholding of the cumulative entry, or zero.
    #[inline]
    pub fn total_cumulative_amount(&self) -> Money {
        self.total_cumulative_amount
    }

    /// Individual plus cumulative withholding.
    #[inline]
    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    /// Finds the individual entry for a campaign.
    pub fn individual_entry(&self, campaign_id: &str) -> Option<&IndividualEntry> {
        self.individual_entries
            .iter()
            .find(|entry| entry.campaign_id == campaign_id)
    }

    // =========================================================================
    // Incremental Update
    // =========================================================================

    /// Applies one campaign's amount change.
    ///
    /// ## Algorithm
    /// 1. `total := total - previous + new`
    /// 2. `peak := max(peak, total)`
    /// 3. Not yet crossed and `peak >= cumulative threshold` → cross now:
    ///    cumulative entry over the entire peak, kind `Cumulative`
    /// 4. Already crossed → upsert individual entry, kind `Individual`
    /// 5. Not crossed and `new >= per-campaign threshold` → upsert individual
    ///    entry, kind `Individual`; otherwise kind `None` and any existing
    ///    entry for the campaign is left as it is
    ///
    /// ## Example
    /// ```rust
    /// use chrono::Utc;
    /// use tds_core::{CampaignAmountChange, EntryKind, FiscalYear, LedgerRecord, Money, TdsRate, Thresholds};
    ///
    /// let fy: FiscalYear = "2025-2026".parse().unwrap();
    /// let mut ledger = LedgerRecord::new("r-1", fy, TdsRate::SoleProprietorship, Utc::now());
    ///
    /// let change = CampaignAmountChange::added("c-1", "Diwali", Money::from_rupees(35_000));
    /// let outcome = ledger.apply_campaign_amount(&change, &Thresholds::default(), Utc::now()).unwrap();
    ///
    /// assert_eq!(outcome.kind, EntryKind::Individual);
    /// assert_eq!(outcome.withholding, Money::from_rupees(350));
    /// ```
    pub fn apply_campaign_amount(
        &mut self,
        change: &CampaignAmountChange,
        thresholds: &Thresholds,
        now: DateTime<Utc>,
    ) -> CoreResult<ApplyOutcome> {
        validate_campaign_change(change)?;

        let total = self
            .total_committed
            .checked_sub(change.previous_amount)
            .and_then(|t| t.checked_add(change.new_amount))
            .ok_or_else(|| CoreError::computation("committed total overflowed"))?;

        if total.is_negative() {
            return Err(CoreError::computation(format!(
                "previous amount {} for campaign {} exceeds committed total {}",
                change.previous_amount, change.campaign_id, self.total_committed
            )));
        }

        let crossed_before = self.threshold_crossed;

        self.total_committed = total;
        self.peak_committed = self.peak_committed.max(total);

        let outcome = if !crossed_before && self.peak_committed >= thresholds.cumulative {
            let included = self.campaigns_known_with(change);
            let withholding = self.cross_threshold(included, now);
            ApplyOutcome {
                kind: EntryKind::Cumulative,
                withholding,
                basis: self.peak_committed,
            }
        } else if crossed_before || change.new_amount >= thresholds.per_campaign {
            let withholding = self.upsert_individual(
                &change.campaign_id,
                &change.campaign_name,
                change.new_amount,
                now,
            );
            ApplyOutcome {
                kind: EntryKind::Individual,
                withholding,
                basis: change.new_amount,
            }
        } else {
            ApplyOutcome {
                kind: EntryKind::None,
                withholding: Money::zero(),
                basis: change.new_amount,
            }
        };

        self.refresh_totals();
        Ok(outcome)
    }

    // =========================================================================
    // Full Rebuild
    // =========================================================================

    /// Rebuilds the ledger from the complete list of the retailer's campaigns.
    ///
    /// ## Algorithm
    /// 1. Discard all individual entries
    /// 2. `total := Σ amounts`, `peak := max(peak, total)`
    /// 3. Already crossed → one individual entry per campaign, except a
    ///    campaign below the per-campaign threshold that the cumulative entry
    ///    already covers at the same amount; the cumulative entry is a
    ///    historical fact and stays as it is
    /// 4. Not crossed → individual entries for campaigns at or above the
    ///    per-campaign threshold, then cross if `peak` reached the
    ///    cumulative threshold, recording this snapshot as included campaigns
    ///
    /// Idempotent: the same snapshot applied twice yields the same entries
    /// (timestamps of unchanged entries are kept).
    pub fn rebuild_from_snapshot(
        &mut self,
        campaigns: &[CampaignAmount],
        thresholds: &Thresholds,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        validate_snapshot(campaigns)?;

        let total = campaigns
            .iter()
            .try_fold(Money::zero(), |acc, c| acc.checked_add(c.amount))
            .ok_or_else(|| CoreError::computation("committed total overflowed"))?;

        let previous_entries = std::mem::take(&mut self.individual_entries);

        self.total_committed = total;
        self.peak_committed = self.peak_committed.max(total);

        let crossed = self.threshold_crossed;
        for campaign in campaigns {
            let taxable = if crossed {
                campaign.amount >= thresholds.per_campaign || !self.covered_by_cumulative(campaign)
            } else {
                campaign.amount >= thresholds.per_campaign
            };
            if taxable {
                let entry = self.make_individual(
                    &campaign.campaign_id,
                    &campaign.campaign_name,
                    campaign.amount,
                    &previous_entries,
                    now,
                );
                self.individual_entries.push(entry);
            }
        }

        if !crossed && self.peak_committed >= thresholds.cumulative {
            self.cross_threshold(campaigns.to_vec(), now);
        }

        self.refresh_totals();
        Ok(())
    }

    // =========================================================================
    // Rate, Lifecycle, Persistence Hooks
    // =========================================================================

    /// Sets a new applicable rate. Returns `true` if it changed.
    ///
    /// Existing entries keep their old rate until the caller rebuilds.
    pub fn change_rate(&mut self, rate: TdsRate) -> bool {
        if self.applicable_rate == rate {
            return false;
        }
        self.applicable_rate = rate;
        true
    }

    /// Marks the record inactive (hidden from reports, never deleted).
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    /// Makes a deactivated record visible again.
    pub fn activate(&mut self) {
        self.is_active = true;
    }

    /// Save hook: recomputes derived totals and refreshes timestamps.
    ///
    /// Called by the repository on every write.
    pub fn stamp_saved(&mut self, now: DateTime<Utc>) {
        self.refresh_totals();
        self.last_calculated_at = now;
        self.updated_at = now;
    }

    /// Checks the invariants that hold for any single record.
    pub fn verify_invariants(&self) -> CoreResult<()> {
        if self.total_committed.is_negative() {
            return Err(CoreError::computation(format!(
                "record {} has negative committed total {}",
                self.id, self.total_committed
            )));
        }

        if self.peak_committed < self.total_committed {
            return Err(CoreError::computation(format!(
                "record {} peak {} is below committed total {}",
                self.id, self.peak_committed, self.total_committed
            )));
        }

        if self.threshold_crossed != self.cumulative_entry.is_some()
            || self.threshold_crossed != self.threshold_crossed_at.is_some()
        {
            return Err(CoreError::computation(format!(
                "record {} threshold flag, date and cumulative entry disagree",
                self.id
            )));
        }

        if self.total_amount != self.total_individual_amount + self.total_cumulative_amount {
            return Err(CoreError::computation(format!(
                "record {} derived totals are inconsistent",
                self.id
            )));
        }

        Ok(())
    }

    /// Checks that moving from `before` to `self` kept the lifetime
    /// invariants: monotonic peak, one-way flag, untouched cumulative entry.
    pub fn verify_transition(&self, before: &LedgerRecord) -> CoreResult<()> {
        self.verify_invariants()?;

        if self.id != before.id
            || self.retailer_id != before.retailer_id
            || self.fiscal_year != before.fiscal_year
        {
            return Err(CoreError::computation("ledger identity changed"));
        }

        if self.peak_committed < before.peak_committed {
            return Err(CoreError::computation(format!(
                "record {} peak would decrease from {} to {}",
                self.id, before.peak_committed, self.peak_committed
            )));
        }

        if before.threshold_crossed {
            if !self.threshold_crossed {
                return Err(CoreError::computation(format!(
                    "record {} threshold flag would revert",
                    self.id
                )));
            }
            if self.cumulative_entry != before.cumulative_entry
                || self.threshold_crossed_at != before.threshold_crossed_at
            {
                return Err(CoreError::computation(format!(
                    "record {} cumulative entry would be replaced",
                    self.id
                )));
            }
        }

        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn refresh_totals(&mut self) {
        self.total_individual_amount = self
            .individual_entries
            .iter()
            .map(|entry| entry.withholding)
            .sum();
        self.total_cumulative_amount = self
            .cumulative_entry
            .as_ref()
            .map(|entry| entry.withholding)
            .unwrap_or_default();
        self.total_amount = self.total_individual_amount + self.total_cumulative_amount;
    }

    /// Performs the one-time crossing. Caller guarantees it has not happened yet.
    fn cross_threshold(&mut self, included_campaigns: Vec<CampaignAmount>, now: DateTime<Utc>) -> Money {
        let basis = self.peak_committed;
        let withholding = basis.withholding(self.applicable_rate);

        self.threshold_crossed = true;
        self.threshold_crossed_at = Some(now);
        self.cumulative_entry = Some(CumulativeEntry {
            basis,
            rate: self.applicable_rate,
            withholding,
            included_campaigns,
            calculated_at: now,
        });

        withholding
    }

    /// Whether the cumulative entry already charged `campaign` at this amount.
    fn covered_by_cumulative(&self, campaign: &CampaignAmount) -> bool {
        self.cumulative_entry.as_ref().is_some_and(|entry| {
            entry
                .included_campaigns
                .iter()
                .any(|c| c.campaign_id == campaign.campaign_id && c.amount == campaign.amount)
        })
    }

    /// Campaigns the ledger knows about (those with entries), with the
    /// changing campaign at its new amount.
    fn campaigns_known_with(&self, change: &CampaignAmountChange) -> Vec<CampaignAmount> {
        let mut campaigns: Vec<CampaignAmount> = self
            .individual_entries
            .iter()
            .filter(|entry| entry.campaign_id != change.campaign_id)
            .map(|entry| {
                CampaignAmount::new(&entry.campaign_id, &entry.campaign_name, entry.amount)
            })
            .collect();
        campaigns.push(CampaignAmount::new(
            &change.campaign_id,
            &change.campaign_name,
            change.new_amount,
        ));
        campaigns
    }

    /// Inserts or replaces the campaign's individual entry in place.
    fn upsert_individual(
        &mut self,
        campaign_id: &str,
        campaign_name: &str,
        amount: Money,
        now: DateTime<Utc>,
    ) -> Money {
        let entry = self.make_individual(
            campaign_id,
            campaign_name,
            amount,
            &self.individual_entries,
            now,
        );
        let withholding = entry.withholding;

        match self
            .individual_entries
            .iter_mut()
            .find(|existing| existing.campaign_id == campaign_id)
        {
            Some(existing) => *existing = entry,
            None => self.individual_entries.push(entry),
        }

        withholding
    }

    /// Builds an entry at the current rate, keeping the old timestamp when an
    /// identical entry already exists in `previous`.
    fn make_individual(
        &self,
        campaign_id: &str,
        campaign_name: &str,
        amount: Money,
        previous: &[IndividualEntry],
        now: DateTime<Utc>,
    ) -> IndividualEntry {
        let rate = self.applicable_rate;
        let calculated_at = previous
            .iter()
            .find(|e| {
                e.campaign_id == campaign_id
                    && e.campaign_name == campaign_name
                    && e.amount == amount
                    && e.rate == rate
            })
            .map(|e| e.calculated_at)
            .unwrap_or(now);

        IndividualEntry {
            campaign_id: campaign_id.to_string(),
            campaign_name: campaign_name.to_string(),
            amount,
            rate,
            withholding: amount.withholding(rate),
            calculated_at,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn rupees(r: i64) -> Money {
        Money::from_rupees(r)
    }

    fn fy() -> FiscalYear {
        "2025-2026".parse().unwrap()
    }

    fn ledger(rate: TdsRate) -> LedgerRecord {
        LedgerRecord::new("7d0f9a54-8a55-4b1c-bb0b-3a6cf1f4f001", fy(), rate, Utc::now())
    }

    fn apply(record: &mut LedgerRecord, change: CampaignAmountChange) -> ApplyOutcome {
        record
            .apply_campaign_amount(&change, &Thresholds::default(), Utc::now())
            .unwrap()
    }

    fn assert_totals_consistent(record: &LedgerRecord) {
        let individual: Money = record.individual_entries.iter().map(|e| e.withholding).sum();
        assert_eq!(record.total_individual_amount(), individual);
        assert_eq!(
            record.total_amount(),
            record.total_individual_amount() + record.total_cumulative_amount()
        );
        record.verify_invariants().unwrap();
    }

    /// Scenarios 1-5 from the product walkthrough, in order.
    #[test]
    fn test_sole_proprietor_walkthrough() {
        let mut record = ledger(TdsRate::SoleProprietorship);

        // 1. One campaign of 25,000: exempt
        let outcome = apply(&mut record, CampaignAmountChange::added("c1", "Summer", rupees(25_000)));
        assert_eq!(outcome.kind, EntryKind::None);
        assert_eq!(outcome.withholding, Money::zero());
        assert!(record.individual_entries.is_empty());
        assert_eq!(record.total_committed, rupees(25_000));
        assert!(!record.threshold_crossed);

        // 2. Edited to 35,000: individual entry of 350
        let outcome = apply(
            &mut record,
            CampaignAmountChange::edited("c1", "Summer", rupees(25_000), rupees(35_000)),
        );
        assert_eq!(outcome.kind, EntryKind::Individual);
        assert_eq!(outcome.withholding, rupees(350));
        assert_eq!(record.individual_entries.len(), 1);
        assert_eq!(record.individual_entries[0].amount, rupees(35_000));
        assert_eq!(record.total_committed, rupees(35_000));
        assert_eq!(record.peak_committed, rupees(35_000));
        assert!(!record.threshold_crossed);

        // 3. Second campaign of 70,000: crossing on the full 105,000
        let outcome = apply(&mut record, CampaignAmountChange::added("c2", "Diwali", rupees(70_000)));
        assert_eq!(outcome.kind, EntryKind::Cumulative);
        assert_eq!(outcome.basis, rupees(105_000));
        assert_eq!(outcome.withholding, rupees(1_050));
        assert!(record.threshold_crossed);
        assert!(record.threshold_crossed_at.is_some());
        let cumulative = record.cumulative_entry.clone().unwrap();
        assert_eq!(cumulative.basis, rupees(105_000));
        assert_eq!(cumulative.rate, TdsRate::SoleProprietorship);
        assert_eq!(cumulative.included_campaigns.len(), 2);
        // Crossing does not also create an individual entry for c2
        assert!(record.individual_entry("c2").is_none());
        assert_eq!(record.total_amount(), rupees(350 + 1_050));

        // 4. Post-crossing campaign of 10,000: taxed despite being small
        let outcome = apply(&mut record, CampaignAmountChange::added("c3", "Holi", rupees(10_000)));
        assert_eq!(outcome.kind, EntryKind::Individual);
        assert_eq!(outcome.withholding, rupees(100));
        assert_eq!(record.total_committed, rupees(115_000));

        // 5. c1 removed, rebuild from the remaining campaigns
        let snapshot = vec![
            CampaignAmount::new("c2", "Diwali", rupees(70_000)),
            CampaignAmount::new("c3", "Holi", rupees(10_000)),
        ];
        record
            .rebuild_from_snapshot(&snapshot, &Thresholds::default(), Utc::now())
            .unwrap();
        assert_eq!(record.total_committed, rupees(80_000));
        assert_eq!(record.peak_committed, rupees(115_000));
        assert!(record.threshold_crossed);
        assert_eq!(record.cumulative_entry, Some(cumulative));
        assert_eq!(record.individual_entries.len(), 2);
        assert_eq!(record.individual_entry("c2").unwrap().withholding, rupees(700));
        assert_eq!(record.individual_entry("c3").unwrap().withholding, rupees(100));
        assert!(record.individual_entry("c1").is_none());
        assert_totals_consistent(&record);
    }

    #[test]
    fn test_no_pan_rate_applies_everywhere() {
        let mut record = ledger(TdsRate::NoPan);
        let outcome = apply(&mut record, CampaignAmountChange::added("c1", "Launch", rupees(40_000)));
        assert_eq!(outcome.withholding, rupees(8_000));

        let outcome = apply(&mut record, CampaignAmountChange::added("c2", "Festive", rupees(60_000)));
        assert_eq!(outcome.kind, EntryKind::Cumulative);
        assert_eq!(outcome.withholding, rupees(20_000));
    }

    #[test]
    fn test_exempt_edit_leaves_existing_entry_untouched() {
        let mut record = ledger(TdsRate::Standard);
        apply(&mut record, CampaignAmountChange::added("c1", "Summer", rupees(40_000)));
        let outcome = apply(
            &mut record,
            CampaignAmountChange::edited("c1", "Summer", rupees(40_000), rupees(20_000)),
        );
        assert_eq!(outcome.kind, EntryKind::None);
        assert_eq!(record.total_committed, rupees(20_000));
        assert_eq!(record.individual_entry("c1").unwrap().amount, rupees(40_000));
        assert_eq!(record.peak_committed, rupees(40_000));
    }

    #[test]
    fn test_crossing_exactly_at_threshold() {
        let mut record = ledger(TdsRate::Standard);
        let outcome = apply(&mut record, CampaignAmountChange::added("c1", "Mega", rupees(100_000)));
        assert_eq!(outcome.kind, EntryKind::Cumulative);
        assert_eq!(outcome.withholding, rupees(2_000));
    }

    #[test]
    fn test_flag_and_peak_survive_drop_below_threshold() {
        let mut record = ledger(TdsRate::Standard);
        apply(&mut record, CampaignAmountChange::added("c1", "Mega", rupees(120_000)));
        let cumulative = record.cumulative_entry.clone();

        let outcome = apply(
            &mut record,
            CampaignAmountChange::edited("c1", "Mega", rupees(120_000), rupees(5_000)),
        );
        assert_eq!(outcome.kind, EntryKind::Individual);
        assert_eq!(record.total_committed, rupees(5_000));
        assert_eq!(record.peak_committed, rupees(120_000));
        assert!(record.threshold_crossed);
        assert_eq!(record.cumulative_entry, cumulative);

        record
            .rebuild_from_snapshot(&[], &Thresholds::default(), Utc::now())
            .unwrap();
        assert_eq!(record.total_committed, Money::zero());
        assert_eq!(record.peak_committed, rupees(120_000));
        assert!(record.threshold_crossed);
        assert!(record.individual_entries.is_empty());
        assert_eq!(record.cumulative_entry, cumulative);
    }

    #[test]
    fn test_rebuild_crossing_keeps_30k_entries_and_adds_cumulative() {
        let mut record = ledger(TdsRate::SoleProprietorship);
        let snapshot = vec![
            CampaignAmount::new("c1", "Summer", rupees(35_000)),
            CampaignAmount::new("c2", "Diwali", rupees(70_000)),
            CampaignAmount::new("c3", "Holi", rupees(10_000)),
        ];
        record
            .rebuild_from_snapshot(&snapshot, &Thresholds::default(), Utc::now())
            .unwrap();

        assert!(record.threshold_crossed);
        assert_eq!(record.peak_committed, rupees(115_000));
        let ids: Vec<&str> = record
            .individual_entries
            .iter()
            .map(|e| e.campaign_id.as_str())
            .collect();
        assert_eq!(ids, vec!["c1", "c2"]);
        let cumulative = record.cumulative_entry.as_ref().unwrap();
        assert_eq!(cumulative.basis, rupees(115_000));
        assert_eq!(cumulative.withholding, rupees(1_150));
        assert_eq!(cumulative.included_campaigns, snapshot);
        assert_eq!(record.total_amount(), rupees(350 + 700 + 1_150));
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let mut record = ledger(TdsRate::Standard);
        let snapshot = vec![
            CampaignAmount::new("c1", "Summer", rupees(60_000)),
            CampaignAmount::new("c2", "Diwali", rupees(50_000)),
        ];
        let t0 = Utc::now();
        record
            .rebuild_from_snapshot(&snapshot, &Thresholds::default(), t0)
            .unwrap();
        let first = record.clone();

        record
            .rebuild_from_snapshot(&snapshot, &Thresholds::default(), t0 + Duration::minutes(5))
            .unwrap();
        assert_eq!(record.individual_entries, first.individual_entries);
        assert_eq!(record.peak_committed, first.peak_committed);
        assert_eq!(record.threshold_crossed, first.threshold_crossed);
        assert_eq!(record.cumulative_entry, first.cumulative_entry);
        assert_eq!(record.total_amount(), first.total_amount());
        record.verify_transition(&first).unwrap();
    }

    #[test]
    fn test_rebuild_after_crossing_rebuild_is_idempotent() {
        let mut record = ledger(TdsRate::SoleProprietorship);
        let snapshot = vec![
            CampaignAmount::new("c1", "Summer", rupees(35_000)),
            CampaignAmount::new("c2", "Diwali", rupees(70_000)),
            CampaignAmount::new("c3", "Holi", rupees(10_000)),
        ];
        let t0 = Utc::now();
        record
            .rebuild_from_snapshot(&snapshot, &Thresholds::default(), t0)
            .unwrap();
        let first = record.clone();

        record
            .rebuild_from_snapshot(&snapshot, &Thresholds::default(), t0 + Duration::minutes(5))
            .unwrap();

        // c3 sits inside the cumulative basis, so it never gets its own entry
        assert!(record.individual_entry("c3").is_none());
        assert_eq!(record.individual_entries, first.individual_entries);
        assert_eq!(record.total_amount(), rupees(350 + 700 + 1_150));
        record.verify_transition(&first).unwrap();
    }

    #[test]
    fn test_rebuild_after_crossing_charges_changed_small_campaign() {
        let mut record = ledger(TdsRate::SoleProprietorship);
        let thresholds = Thresholds::default();
        record
            .rebuild_from_snapshot(
                &[
                    CampaignAmount::new("c1", "Summer", rupees(95_000)),
                    CampaignAmount::new("c2", "Holi", rupees(10_000)),
                ],
                &thresholds,
                Utc::now(),
            )
            .unwrap();
        assert!(record.individual_entry("c2").is_none());

        // A new amount, or a campaign the crossing never saw, is post-crossing business
        record
            .rebuild_from_snapshot(
                &[
                    CampaignAmount::new("c1", "Summer", rupees(95_000)),
                    CampaignAmount::new("c2", "Holi", rupees(12_000)),
                    CampaignAmount::new("c3", "Onam", rupees(5_000)),
                ],
                &thresholds,
                Utc::now(),
            )
            .unwrap();
        assert_eq!(record.individual_entry("c2").unwrap().withholding, rupees(120));
        assert_eq!(record.individual_entry("c3").unwrap().withholding, rupees(50));
        assert_eq!(record.cumulative_entry.as_ref().unwrap().basis, rupees(105_000));
    }

    #[test]
    fn test_single_cumulative_charge_over_many_operations() {
        let mut record = ledger(TdsRate::Standard);
        let thresholds = Thresholds::default();
        let mut cumulative_events = 0;
        let mut previous = Money::zero();

        // Deterministic pseudo-random walk over one campaign's amount
        let mut seed: u64 = 42;
        for step in 0..200 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let amount = rupees(((seed >> 33) % 150_000) as i64);
            let before = record.clone();

            if step % 7 == 0 {
                record
                    .rebuild_from_snapshot(
                        &[CampaignAmount::new("c1", "Rolling", amount)],
                        &thresholds,
                        Utc::now(),
                    )
                    .unwrap();
            } else {
                let outcome = record
                    .apply_campaign_amount(
                        &CampaignAmountChange::edited("c1", "Rolling", previous, amount),
                        &thresholds,
                        Utc::now(),
                    )
                    .unwrap();
                if outcome.kind == EntryKind::Cumulative {
                    cumulative_events += 1;
                }
            }
            previous = amount;

            record.verify_transition(&before).unwrap();
            assert!(record.peak_committed >= before.peak_committed);
            if before.threshold_crossed {
                assert!(record.threshold_crossed);
            }
            assert_totals_consistent(&record);
        }

        assert!(record.threshold_crossed);
        assert!(cumulative_events <= 1);
    }

    #[test]
    fn test_thresholds_are_configurable() {
        let thresholds = Thresholds {
            per_campaign: rupees(10_000),
            cumulative: rupees(50_000),
        };
        let mut record = ledger(TdsRate::Standard);
        let outcome = record
            .apply_campaign_amount(
                &CampaignAmountChange::added("c1", "Small", rupees(12_000)),
                &thresholds,
                Utc::now(),
            )
            .unwrap();
        assert_eq!(outcome.kind, EntryKind::Individual);

        let outcome = record
            .apply_campaign_amount(
                &CampaignAmountChange::added("c2", "Big", rupees(40_000)),
                &thresholds,
                Utc::now(),
            )
            .unwrap();
        assert_eq!(outcome.kind, EntryKind::Cumulative);
        assert_eq!(outcome.basis, rupees(52_000));
    }

    #[test]
    fn test_stale_previous_amount_is_rejected() {
        let mut record = ledger(TdsRate::Standard);
        apply(&mut record, CampaignAmountChange::added("c1", "Summer", rupees(10_000)));
        let before = record.clone();

        let err = record
            .apply_campaign_amount(
                &CampaignAmountChange::edited("c1", "Summer", rupees(50_000), rupees(0)),
                &Thresholds::default(),
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Computation(_)));
        assert_eq!(record, before);
    }

    #[test]
    fn test_rate_change_and_rebuild_restates_individual_entries() {
        let mut record = ledger(TdsRate::NoPan);
        let snapshot = vec![
            CampaignAmount::new("c1", "Summer", rupees(60_000)),
            CampaignAmount::new("c2", "Diwali", rupees(50_000)),
        ];
        record
            .rebuild_from_snapshot(&snapshot, &Thresholds::default(), Utc::now())
            .unwrap();
        let cumulative = record.cumulative_entry.clone().unwrap();
        assert_eq!(cumulative.rate, TdsRate::NoPan);

        assert!(record.change_rate(TdsRate::Standard));
        assert!(!record.change_rate(TdsRate::Standard));
        record
            .rebuild_from_snapshot(&snapshot, &Thresholds::default(), Utc::now())
            .unwrap();

        assert!(record.individual_entries.iter().all(|e| e.rate == TdsRate::Standard));
        assert_eq!(record.individual_entry("c1").unwrap().withholding, rupees(1_200));
        assert_eq!(record.cumulative_entry, Some(cumulative));
    }

    #[test]
    fn test_verify_transition_rejects_regressions() {
        let mut record = ledger(TdsRate::Standard);
        apply(&mut record, CampaignAmountChange::added("c1", "Mega", rupees(120_000)));
        let before = record.clone();

        let mut lowered = record.clone();
        lowered.peak_committed = rupees(1);
        lowered.total_committed = rupees(1);
        assert!(lowered.verify_transition(&before).is_err());

        let mut reverted = record.clone();
        reverted.threshold_crossed = false;
        reverted.threshold_crossed_at = None;
        reverted.cumulative_entry = None;
        reverted.refresh_totals();
        assert!(reverted.verify_transition(&before).is_err());
    }

    #[test]
    fn test_restore_recomputes_totals() {
        let mut record = ledger(TdsRate::Standard);
        apply(&mut record, CampaignAmountChange::added("c1", "Summer", rupees(40_000)));

        let restored = LedgerRecord::restore(LedgerParts {
            id: record.id.clone(),
            retailer_id: record.retailer_id.clone(),
            fiscal_year: record.fiscal_year,
            total_committed: record.total_committed,
            peak_committed: record.peak_committed,
            threshold_crossed: record.threshold_crossed,
            threshold_crossed_at: record.threshold_crossed_at,
            applicable_rate: record.applicable_rate,
            individual_entries: record.individual_entries.clone(),
            cumulative_entry: record.cumulative_entry.clone(),
            last_calculated_at: record.last_calculated_at,
            is_active: record.is_active,
            version: record.version,
            created_at: record.created_at,
            updated_at: record.updated_at,
        });
        assert_eq!(restored.total_individual_amount(), rupees(800));
        assert_eq!(restored, record);
    }

    #[test]
    fn test_stamp_saved_refreshes_timestamps() {
        let mut record = ledger(TdsRate::Standard);
        let later = record.created_at + Duration::seconds(30);
        record.stamp_saved(later);
        assert_eq!(record.last_calculated_at, later);
        assert_eq!(record.updated_at, later);
        assert!(record.created_at < later);
    }

    #[test]
    fn test_serializes_derived_totals() {
        let mut record = ledger(TdsRate::Standard);
        apply(&mut record, CampaignAmountChange::added("c1", "Summer", rupees(40_000)));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["totalIndividualAmount"], 80_000);
        assert_eq!(json["totalAmount"], 80_000);
        assert_eq!(json["applicableRate"], 2);
        assert_eq!(json["fiscalYear"], "2025-2026");
    }
}
