//! # Budget Repository
//!
//! Per-campaign committed amounts (TCA) for each retailer: the snapshot the
//! full rebuild runs on.
//!
//! ```text
//! campaign_budgets        (retailer_id)            ← budget exists?
//! └── campaign_budget_items (campaign_id, name, tca_paise, position)
//! ```
//!
//! A retailer with a `campaign_budgets` row and no items has an empty budget,
//! which is different from having no budget at all.

use chrono::Utc;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tds_core::{CampaignAmount, Money};

#[derive(Debug, FromRow)]
struct BudgetItemRow {
    campaign_id: String,
    campaign_name: String,
    tca_paise: i64,
}

impl From<BudgetItemRow> for CampaignAmount {
    fn from(row: BudgetItemRow) -> Self {
        CampaignAmount::new(row.campaign_id, row.campaign_name, Money::from_paise(row.tca_paise))
    }
}

#[derive(Debug, Clone)]
pub struct BudgetRepository {
    pool: SqlitePool,
}

impl BudgetRepository {
    /// Creates a new BudgetRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BudgetRepository { pool }
    }

    /// Returns the retailer's campaign snapshot in budget order, or `None`
    /// when the retailer has no budget.
    pub async fn get_snapshot(&self, retailer_id: &str) -> DbResult<Option<Vec<CampaignAmount>>> {
        let exists: Option<String> =
            sqlx::query_scalar("SELECT retailer_id FROM campaign_budgets WHERE retailer_id = ?1")
                .bind(retailer_id)
                .fetch_optional(&self.pool)
                .await?;

        if exists.is_none() {
            return Ok(None);
        }

        let rows = sqlx::query_as::<_, BudgetItemRow>(
            r#"
            SELECT campaign_id, campaign_name, tca_paise
            FROM campaign_budget_items
            WHERE retailer_id = ?1
            ORDER BY position
            "#,
        )
        .bind(retailer_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(retailer_id = %retailer_id, campaigns = rows.len(), "Loaded budget snapshot");
        Ok(Some(rows.into_iter().map(CampaignAmount::from).collect()))
    }

    /// Replaces the retailer's whole budget with `campaigns`.
    ///
    /// Runs in one transaction so readers never see a half-written budget.
    pub async fn replace(&self, retailer_id: &str, campaigns: &[CampaignAmount]) -> DbResult<()> {
        debug!(retailer_id = %retailer_id, campaigns = campaigns.len(), "Replacing budget");

        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO campaign_budgets (retailer_id, updated_at)
            VALUES (?1, ?2)
            ON CONFLICT(retailer_id) DO UPDATE SET updated_at = excluded.updated_at
            "#,
        )
        .bind(retailer_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM campaign_budget_items WHERE retailer_id = ?1")
            .bind(retailer_id)
            .execute(&mut *tx)
            .await?;

        for (position, campaign) in campaigns.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO campaign_budget_items
                    (retailer_id, campaign_id, campaign_name, tca_paise, position)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(retailer_id)
            .bind(&campaign.campaign_id)
            .bind(&campaign.campaign_name)
            .bind(campaign.amount.paise())
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(())
    }
}
