//! # Retailer Repository
//!
//! Read model of the retailer attributes the ledger depends on: ownership
//! type and PAN for rate resolution, state for summaries.
//!
//! Retailers are registered elsewhere on the platform; `upsert` exists so the
//! read model can be kept in step and seeded.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use tds_core::Retailer;

#[derive(Debug, Clone)]
pub struct RetailerRepository {
    pool: SqlitePool,
}

impl RetailerRepository {
    /// Creates a new RetailerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RetailerRepository { pool }
    }

    /// Gets a retailer by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Retailer))` - Retailer found
    /// * `Ok(None)` - Retailer not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Retailer>> {
        let retailer = sqlx::query_as::<_, Retailer>(
            r#"
            SELECT id, name, state, ownership_type, pan, created_at, updated_at
            FROM retailers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(retailer)
    }

    /// Lists all retailers ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Retailer>> {
        let retailers = sqlx::query_as::<_, Retailer>(
            r#"
            SELECT id, name, state, ownership_type, pan, created_at, updated_at
            FROM retailers
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(retailers)
    }

    /// Inserts a retailer or refreshes its attributes.
    ///
    /// `created_at` of an existing row is preserved.
    pub async fn upsert(&self, retailer: &Retailer) -> DbResult<()> {
        debug!(retailer_id = %retailer.id, "Upserting retailer");

        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO retailers (id, name, state, ownership_type, pan, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                state = excluded.state,
                ownership_type = excluded.ownership_type,
                pan = excluded.pan,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&retailer.id)
        .bind(&retailer.name)
        .bind(&retailer.state)
        .bind(&retailer.ownership_type)
        .bind(&retailer.pan)
        .bind(retailer.created_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Counts retailers (used by the seeder).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM retailers")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
