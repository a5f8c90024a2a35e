//! # Repository Module
//!
//! Database repository implementations for the TDS ledger.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  tds-api service                                                        │
//! │       │                                                                 │
//! │       │  db.ledgers().get_or_create(retailer_id, fy, rate)              │
//! │       ▼                                                                 │
//! │  LedgerRepository                                                      │
//! │  ├── get_or_create / find_by_id / find_by_retailer_year                │
//! │  ├── list_by_retailer / list_for_fiscal_year                           │
//! │  ├── list_uncrossed_at_or_above                                        │
//! │  └── save (versioned) / deactivate / activate                          │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`LedgerRepository`](ledger::LedgerRepository) - Ledger records
//! - [`RetailerRepository`](retailer::RetailerRepository) - Retailer attributes
//! - [`BudgetRepository`](budget::BudgetRepository) - Campaign budget snapshots

pub mod budget;
pub mod ledger;
pub mod retailer;
