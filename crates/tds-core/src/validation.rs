//! # Validation Module
//!
//! Input validation for everything that reaches the ledger.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP (axum extractors)                                       │
//! │  └── Type validation (JSON / query deserialization)                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── ids, names, non-negative amounts                                  │
//! │  └── no campaign listed twice in a snapshot                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Ledger invariants (LedgerRecord::verify_transition)          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: Database (NOT NULL, UNIQUE, CHECK constraints)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{CampaignAmount, CampaignAmountChange, Thresholds};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted campaign id.
const MAX_CAMPAIGN_ID_LEN: usize = 64;

/// Longest accepted campaign or retailer name.
const MAX_NAME_LEN: usize = 200;

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates a UUID string.
///
/// ## Example
/// ```rust
/// use tds_core::validation::validate_uuid;
///
/// assert!(validate_uuid("retailer_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("retailer_id", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

/// Validates a campaign id.
///
/// Campaign ids come from the campaign service and are opaque here; only
/// presence and length are checked.
pub fn validate_campaign_id(campaign_id: &str) -> ValidationResult<()> {
    let campaign_id = campaign_id.trim();

    if campaign_id.is_empty() {
        return Err(ValidationError::Required {
            field: "campaign_id".to_string(),
        });
    }

    if campaign_id.len() > MAX_CAMPAIGN_ID_LEN {
        return Err(ValidationError::TooLong {
            field: "campaign_id".to_string(),
            max: MAX_CAMPAIGN_ID_LEN,
        });
    }

    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name (campaign or retailer).
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

// =============================================================================
// Amount Validators
// =============================================================================

/// Validates a committed amount.
///
/// Zero is allowed (a campaign whose budget was removed).
///
/// ## Example
/// ```rust
/// use tds_core::money::Money;
/// use tds_core::validation::validate_amount;
///
/// assert!(validate_amount("amount", Money::from_rupees(35_000)).is_ok());
/// assert!(validate_amount("amount", Money::zero()).is_ok());
/// assert!(validate_amount("amount", Money::from_paise(-1)).is_err());
/// ```
pub fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates an incremental campaign change.
pub fn validate_campaign_change(change: &CampaignAmountChange) -> ValidationResult<()> {
    validate_campaign_id(&change.campaign_id)?;
    validate_name("campaign_name", &change.campaign_name)?;
    validate_amount("new_amount", change.new_amount)?;
    validate_amount("previous_amount", change.previous_amount)?;
    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates a full campaign snapshot.
///
/// ## Rules
/// - Every entry has a valid id, name and non-negative amount
/// - No campaign id appears twice
pub fn validate_snapshot(campaigns: &[CampaignAmount]) -> ValidationResult<()> {
    let mut seen = HashSet::with_capacity(campaigns.len());

    for campaign in campaigns {
        validate_campaign_id(&campaign.campaign_id)?;
        validate_name("campaign_name", &campaign.campaign_name)?;
        validate_amount("amount", campaign.amount)?;

        if !seen.insert(campaign.campaign_id.as_str()) {
            return Err(ValidationError::Duplicate {
                field: "campaign_id".to_string(),
                value: campaign.campaign_id.clone(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Configuration Validators
// =============================================================================

/// Validates a threshold pair.
///
/// ## Rules
/// - Both thresholds positive
/// - Per-campaign threshold not above the cumulative one
pub fn validate_thresholds(thresholds: &Thresholds) -> ValidationResult<()> {
    if !thresholds.per_campaign.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "per_campaign_threshold".to_string(),
        });
    }

    if !thresholds.cumulative.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "cumulative_threshold".to_string(),
        });
    }

    if thresholds.per_campaign > thresholds.cumulative {
        return Err(ValidationError::OutOfRange {
            field: "per_campaign_threshold".to_string(),
            min: 1,
            max: thresholds.cumulative.paise(),
        });
    }

    Ok(())
}

/// Validates the near-threshold warning percentage (1-100).
pub fn validate_warning_percent(percent: u8) -> ValidationResult<()> {
    if !(1..=100).contains(&percent) {
        return Err(ValidationError::OutOfRange {
            field: "warning_percent".to_string(),
            min: 1,
            max: 100,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(matches!(
            validate_uuid("id", " "),
            Err(ValidationError::Required { .. })
        ));
        assert!(validate_uuid("id", "123").is_err());
    }

    #[test]
    fn test_validate_campaign_id() {
        assert!(validate_campaign_id("64f1c2e9a7b3d5f0c1e2a3b4").is_ok());
        assert!(validate_campaign_id("").is_err());
        assert!(validate_campaign_id(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("campaign_name", "Diwali Dhamaka").is_ok());
        assert!(validate_name("campaign_name", "  ").is_err());
        assert!(validate_name("campaign_name", &"A".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_campaign_change() {
        let ok = CampaignAmountChange::added("c1", "Summer", Money::from_rupees(10));
        assert!(validate_campaign_change(&ok).is_ok());

        let negative = CampaignAmountChange::edited("c1", "Summer", Money::from_paise(-1), Money::zero());
        assert!(matches!(
            validate_campaign_change(&negative),
            Err(ValidationError::Negative { .. })
        ));
    }

    #[test]
    fn test_validate_snapshot_rejects_duplicates() {
        let snapshot = vec![
            CampaignAmount::new("c1", "Summer", Money::from_rupees(10)),
            CampaignAmount::new("c1", "Summer again", Money::from_rupees(20)),
        ];
        assert!(matches!(
            validate_snapshot(&snapshot),
            Err(ValidationError::Duplicate { .. })
        ));
        assert!(validate_snapshot(&[]).is_ok());
    }

    #[test]
    fn test_validate_thresholds() {
        assert!(validate_thresholds(&Thresholds::default()).is_ok());

        let inverted = Thresholds {
            per_campaign: Money::from_rupees(200_000),
            cumulative: Money::from_rupees(100_000),
        };
        assert!(validate_thresholds(&inverted).is_err());

        let zero = Thresholds {
            per_campaign: Money::zero(),
            cumulative: Money::from_rupees(100_000),
        };
        assert!(validate_thresholds(&zero).is_err());
    }

    #[test]
    fn test_validate_warning_percent() {
        assert!(validate_warning_percent(90).is_ok());
        assert!(validate_warning_percent(100).is_ok());
        assert!(validate_warning_percent(0).is_err());
        assert!(validate_warning_percent(101).is_err());
    }
}
