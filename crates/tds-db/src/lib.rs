//! # tds-db: Database Layer for the TDS Ledger
//!
//! SQLite storage for ledger records, the retailer read model and campaign
//! budgets, using sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        TDS Ledger Data Flow                             │
//! │                                                                         │
//! │  tds-api service (apply campaign amount)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tds-db (THIS CRATE)                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ LedgerRepo    │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ RetailerRepo  │    │ 001_init.sql │  │   │
//! │  │   │               │    │ BudgetRepo    │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database (tds.db)                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tds_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("tds.db")).await?;
//! let record = db.ledgers().find_by_id(&record_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::budget::BudgetRepository;
pub use repository::ledger::LedgerRepository;
pub use repository::retailer::RetailerRepository;
