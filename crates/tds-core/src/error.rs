//! # Error Types
//!
//! Domain-specific error types for tds-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tds-core errors (this file)                                           │
//! │  ├── CoreError        - Lookups and ledger invariant failures          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tds-db errors (separate crate)                                        │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  tds-api errors (in app)                                               │
//! │  └── ApiError         - What HTTP callers see (serialized)             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Caller       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Retailer cannot be found.
    #[error("Retailer not found: {0}")]
    RetailerNotFound(String),

    /// No ledger record exists for the lookup key.
    ///
    /// ## When This Occurs
    /// - Unknown record id
    /// - Retailer has no activity in the requested fiscal year
    #[error("TDS record not found: {0}")]
    LedgerNotFound(String),

    /// Retailer has no campaign budget to rebuild from.
    #[error("Budget not found for retailer: {0}")]
    BudgetNotFound(String),

    /// A ledger invariant would be broken by the requested operation.
    ///
    /// ## When This Occurs
    /// - Peak committed amount would decrease
    /// - Threshold flag would revert to false
    /// - Arithmetic overflow on amounts
    /// - Incremental update whose previous amount is larger than the
    ///   recorded total (stale incremental state; recalculate instead)
    #[error("TDS computation failed: {0}")]
    Computation(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a Computation error.
    pub fn computation(reason: impl Into<String>) -> Self {
        CoreError::Computation(reason.into())
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid fiscal year).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., a campaign listed twice in one snapshot).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::BudgetNotFound("r-1".to_string());
        assert_eq!(err.to_string(), "Budget not found for retailer: r-1");

        let err = CoreError::computation("peak decreased");
        assert_eq!(err.to_string(), "TDS computation failed: peak decreased");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "campaign_id".to_string(),
        };
        assert_eq!(err.to_string(), "campaign_id is required");

        let err = ValidationError::Negative {
            field: "amount".to_string(),
        };
        assert_eq!(err.to_string(), "amount must not be negative");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "retailer_id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
