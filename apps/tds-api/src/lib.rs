//! # TDS API
//!
//! HTTP service over the TDS ledger.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          TDS API Server                                 │
//! │                                                                         │
//! │  Portal ───► HTTP (8080) ───► routes ───► services ───► SQLite         │
//! │                                              │                          │
//! │                                              ▼                          │
//! │                                   tds-core (ledger rules)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//! - [`config`] - TOML + environment configuration
//! - [`error`] - `ApiError` and HTTP status mapping
//! - [`services`] - Ledger updates and reporting over core + db
//! - [`routes`] - axum router and handlers

pub mod config;
pub mod error;
pub mod routes;
pub mod services;

use std::sync::Arc;

use tds_db::Database;

use crate::config::TdsConfig;

pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::router;

/// Shared application state.
pub struct AppState {
    pub db: Database,
    pub config: TdsConfig,
}

impl AppState {
    pub fn new(db: Database, config: TdsConfig) -> Arc<Self> {
        Arc::new(AppState { db, config })
    }
}
