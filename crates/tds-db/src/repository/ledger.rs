//! # Ledger Repository
//!
//! Persistence for [`LedgerRecord`]: one row per (retailer, fiscal year), with
//! entry collections stored as JSON so the whole aggregate is a single row
//! guarded by one version number.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  get_or_create(retailer, fy, rate)                                      │
//! │    INSERT … ON CONFLICT(retailer_id, fiscal_year) DO NOTHING            │
//! │    SELECT … WHERE retailer_id = ? AND fiscal_year = ?                   │
//! │    → concurrent creators converge on the same row                       │
//! │                                                                         │
//! │  save(&mut record)                                                      │
//! │    record.stamp_saved(now)        derived totals, timestamps            │
//! │    record.verify_invariants()?    refuse to persist a broken record     │
//! │    UPDATE … SET version = version + 1                                   │
//! │      WHERE id = ? AND version = ?                                       │
//! │    0 rows → row exists?  yes → VersionConflict                          │
//! │                          no  → NotFound                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use tds_core::{
    CumulativeEntry, FiscalYear, IndividualEntry, LedgerParts, LedgerRecord, LedgerWithRetailer,
    Money, TdsRate,
};

/// Columns selected for every ledger read, prefixed with the table alias `l`.
const LEDGER_COLUMNS: &str = r#"
    l.id,
    l.retailer_id,
    l.fiscal_year,
    l.total_committed_paise,
    l.peak_committed_paise,
    l.threshold_crossed,
    l.threshold_crossed_at,
    l.applicable_rate,
    l.individual_entries,
    l.cumulative_entry,
    l.last_calculated_at,
    l.is_active,
    l.version,
    l.created_at,
    l.updated_at
"#;

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, FromRow)]
struct LedgerRow {
    id: String,
    retailer_id: String,
    fiscal_year: String,
    total_committed_paise: i64,
    peak_committed_paise: i64,
    threshold_crossed: bool,
    threshold_crossed_at: Option<DateTime<Utc>>,
    applicable_rate: TdsRate,
    individual_entries: String,
    cumulative_entry: Option<String>,
    last_calculated_at: DateTime<Utc>,
    is_active: bool,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LedgerRow {
    fn into_record(self) -> DbResult<LedgerRecord> {
        let fiscal_year: FiscalYear = self
            .fiscal_year
            .parse()
            .map_err(|e| DbError::corrupt(&self.id, e))?;

        let individual_entries: Vec<IndividualEntry> =
            serde_json::from_str(&self.individual_entries)
                .map_err(|e| DbError::corrupt(&self.id, e))?;

        let cumulative_entry: Option<CumulativeEntry> = self
            .cumulative_entry
            .as_deref()
            .map(serde_json::from_str::<CumulativeEntry>)
            .transpose()
            .map_err(|e| DbError::corrupt(&self.id, e))?;

        Ok(LedgerRecord::restore(LedgerParts {
            id: self.id,
            retailer_id: self.retailer_id,
            fiscal_year,
            total_committed: Money::from_paise(self.total_committed_paise),
            peak_committed: Money::from_paise(self.peak_committed_paise),
            threshold_crossed: self.threshold_crossed,
            threshold_crossed_at: self.threshold_crossed_at,
            applicable_rate: self.applicable_rate,
            individual_entries,
            cumulative_entry,
            last_calculated_at: self.last_calculated_at,
            is_active: self.is_active,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }))
    }
}

#[derive(Debug, FromRow)]
struct LedgerRetailerRow {
    #[sqlx(flatten)]
    ledger: LedgerRow,
    retailer_name: String,
    retailer_state: Option<String>,
}

impl LedgerRetailerRow {
    fn into_joined(self) -> DbResult<LedgerWithRetailer> {
        Ok(LedgerWithRetailer {
            record: self.ledger.into_record()?,
            retailer_name: self.retailer_name,
            state: self.retailer_state,
        })
    }
}

/// Serialised entry columns of a record.
struct EntryColumns {
    individual: String,
    cumulative: Option<String>,
}

impl EntryColumns {
    fn encode(record: &LedgerRecord) -> DbResult<Self> {
        let individual = serde_json::to_string(&record.individual_entries)
            .map_err(|e| DbError::Internal(e.to_string()))?;
        let cumulative = record
            .cumulative_entry
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| DbError::Internal(e.to_string()))?;
        Ok(EntryColumns {
            individual,
            cumulative,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for TDS ledger records.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.ledgers();
/// let mut record = repo.get_or_create(&retailer_id, fy, TdsRate::Standard).await?;
/// record.apply_campaign_amount(&change, &thresholds, Utc::now())?;
/// repo.save(&mut record).await?;
/// ```
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// Returns the record for (retailer, fiscal year), creating an empty one
    /// at `rate` if none exists.
    ///
    /// An existing record keeps its own rate; `rate` only seeds new rows.
    pub async fn get_or_create(
        &self,
        retailer_id: &str,
        fiscal_year: FiscalYear,
        rate: TdsRate,
    ) -> DbResult<LedgerRecord> {
        let fresh = LedgerRecord::new(retailer_id, fiscal_year, rate, Utc::now());

        let result = sqlx::query(
            r#"
            INSERT INTO tds_ledgers (
                id, retailer_id, fiscal_year, applicable_rate,
                individual_entries, last_calculated_at, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, '[]', ?5, ?5, ?5)
            ON CONFLICT(retailer_id, fiscal_year) DO NOTHING
            "#,
        )
        .bind(&fresh.id)
        .bind(retailer_id)
        .bind(fiscal_year.to_string())
        .bind(rate)
        .bind(fresh.created_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            debug!(
                retailer_id = %retailer_id,
                fiscal_year = %fiscal_year,
                rate = %rate,
                "Created ledger record"
            );
        }

        self.find_by_retailer_year(retailer_id, fiscal_year)
            .await?
            .ok_or_else(|| DbError::not_found("TDS record", format!("{}/{}", retailer_id, fiscal_year)))
    }

    /// Gets a record by its ID.
    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<LedgerRecord>> {
        let sql = format!("SELECT {} FROM tds_ledgers l WHERE l.id = ?1", LEDGER_COLUMNS);

        sqlx::query_as::<_, LedgerRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(LedgerRow::into_record)
            .transpose()
    }

    /// Gets the record for a retailer in a fiscal year.
    pub async fn find_by_retailer_year(
        &self,
        retailer_id: &str,
        fiscal_year: FiscalYear,
    ) -> DbResult<Option<LedgerRecord>> {
        let sql = format!(
            "SELECT {} FROM tds_ledgers l WHERE l.retailer_id = ?1 AND l.fiscal_year = ?2",
            LEDGER_COLUMNS
        );

        sqlx::query_as::<_, LedgerRow>(&sql)
            .bind(retailer_id)
            .bind(fiscal_year.to_string())
            .fetch_optional(&self.pool)
            .await?
            .map(LedgerRow::into_record)
            .transpose()
    }

    /// Lists every record of a retailer, newest fiscal year first.
    pub async fn list_by_retailer(&self, retailer_id: &str) -> DbResult<Vec<LedgerRecord>> {
        let sql = format!(
            "SELECT {} FROM tds_ledgers l WHERE l.retailer_id = ?1 ORDER BY l.fiscal_year DESC",
            LEDGER_COLUMNS
        );

        let rows = sqlx::query_as::<_, LedgerRow>(&sql)
            .bind(retailer_id)
            .fetch_all(&self.pool)
            .await?;

        debug!(retailer_id = %retailer_id, count = rows.len(), "Loaded retailer history");
        rows.into_iter().map(LedgerRow::into_record).collect()
    }

    /// Lists a fiscal year's active records joined with retailer name and state.
    pub async fn list_for_fiscal_year(&self, fiscal_year: FiscalYear) -> DbResult<Vec<LedgerWithRetailer>> {
        let sql = format!(
            r#"
            SELECT {}, r.name AS retailer_name, r.state AS retailer_state
            FROM tds_ledgers l
            INNER JOIN retailers r ON r.id = l.retailer_id
            WHERE l.fiscal_year = ?1 AND l.is_active = 1
            ORDER BY r.name
            "#,
            LEDGER_COLUMNS
        );

        let rows = sqlx::query_as::<_, LedgerRetailerRow>(&sql)
            .bind(fiscal_year.to_string())
            .fetch_all(&self.pool)
            .await?;

        debug!(fiscal_year = %fiscal_year, count = rows.len(), "Loaded fiscal year records");
        rows.into_iter().map(LedgerRetailerRow::into_joined).collect()
    }

    /// Lists active, uncrossed records of a fiscal year whose committed total
    /// is at least `min_committed`, largest first.
    pub async fn list_uncrossed_at_or_above(
        &self,
        fiscal_year: FiscalYear,
        min_committed: Money,
    ) -> DbResult<Vec<LedgerWithRetailer>> {
        let sql = format!(
            r#"
            SELECT {}, r.name AS retailer_name, r.state AS retailer_state
            FROM tds_ledgers l
            INNER JOIN retailers r ON r.id = l.retailer_id
            WHERE l.fiscal_year = ?1
              AND l.is_active = 1
              AND l.threshold_crossed = 0
              AND l.total_committed_paise >= ?2
            ORDER BY l.total_committed_paise DESC
            "#,
            LEDGER_COLUMNS
        );

        let rows = sqlx::query_as::<_, LedgerRetailerRow>(&sql)
            .bind(fiscal_year.to_string())
            .bind(min_committed.paise())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(LedgerRetailerRow::into_joined).collect()
    }

    /// Persists a record with an optimistic version check.
    ///
    /// ## What This Does
    /// 1. Recomputes derived totals and stamps `last_calculated_at`
    /// 2. Verifies the record's invariants (nothing is written if they fail)
    /// 3. Writes the row only if its version is still `record.version`
    /// 4. On success, copies the stamped state back with `version` bumped;
    ///    on any error `record` is left exactly as it was passed in
    ///
    /// ## Errors
    /// * `DbError::VersionConflict` - another writer saved first
    /// * `DbError::NotFound` - the record was never created
    /// * `DbError::Core` - the record breaks a ledger invariant
    pub async fn save(&self, record: &mut LedgerRecord) -> DbResult<()> {
        let now = Utc::now();
        let mut stamped = record.clone();
        stamped.stamp_saved(now);
        stamped.verify_invariants()?;

        let entries = EntryColumns::encode(&stamped)?;

        let result = sqlx::query(
            r#"
            UPDATE tds_ledgers SET
                total_committed_paise = ?3,
                peak_committed_paise = ?4,
                threshold_crossed = ?5,
                threshold_crossed_at = ?6,
                applicable_rate = ?7,
                individual_entries = ?8,
                cumulative_entry = ?9,
                total_individual_paise = ?10,
                total_cumulative_paise = ?11,
                total_paise = ?12,
                last_calculated_at = ?13,
                is_active = ?14,
                updated_at = ?13,
                version = version + 1
            WHERE id = ?1 AND version = ?2
            "#,
        )
        .bind(&stamped.id)
        .bind(stamped.version)
        .bind(stamped.total_committed.paise())
        .bind(stamped.peak_committed.paise())
        .bind(stamped.threshold_crossed)
        .bind(stamped.threshold_crossed_at)
        .bind(stamped.applicable_rate)
        .bind(&entries.individual)
        .bind(&entries.cumulative)
        .bind(stamped.total_individual_amount().paise())
        .bind(stamped.total_cumulative_amount().paise())
        .bind(stamped.total_amount().paise())
        .bind(now)
        .bind(stamped.is_active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.missed_update(&stamped.id, stamped.version).await);
        }

        stamped.version += 1;
        *record = stamped;

        debug!(
            record_id = %record.id,
            version = record.version,
            total_committed = %record.total_committed,
            total_tds = %record.total_amount(),
            "Saved ledger record"
        );
        Ok(())
    }

    /// Soft-deactivates a record. Inactive records drop out of summaries.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        self.set_active(id, false).await
    }

    /// Reactivates a previously deactivated record.
    pub async fn activate(&self, id: &str) -> DbResult<()> {
        self.set_active(id, true).await
    }

    async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE tds_ledgers SET
                is_active = ?2,
                updated_at = ?3,
                version = version + 1
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("TDS record", id));
        }

        debug!(record_id = %id, active, "Changed ledger record activity");
        Ok(())
    }

    /// Explains why a versioned UPDATE matched no row.
    async fn missed_update(&self, id: &str, expected: i64) -> DbError {
        let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tds_ledgers WHERE id = ?1")
            .bind(id)
            .fetch_one(&self.pool)
            .await;

        match exists {
            Ok(0) => DbError::not_found("TDS record", id),
            Ok(_) => {
                warn!(record_id = %id, expected, "Ledger version conflict");
                DbError::VersionConflict {
                    id: id.to_string(),
                    expected,
                }
            }
            Err(e) => e.into(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
