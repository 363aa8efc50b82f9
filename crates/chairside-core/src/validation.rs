//! # Validation Module
//!
//! Input validation for Chairside requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP handler (apps/api)                                      │
//! │  └── JSON shape, path ids                                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Ids, package lists, codes, amounts                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE (discount_code_id, client_id)                              │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{normalize_code, Percent};
use crate::{MAX_ADDITIONAL_PACKAGES, MAX_SALE_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Identifiers
// =============================================================================

/// Parses a path or body identifier.
///
/// ## Example
/// ```rust
/// use chairside_core::validation::parse_id;
///
/// assert_eq!(parse_id("id", "42").unwrap(), 42);
/// assert!(parse_id("id", "abc").is_err());
/// assert!(parse_id("id", "0").is_err());
/// ```
pub fn parse_id(field: &str, raw: &str) -> ValidationResult<i64> {
    let id: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("'{}' is not a numeric id", raw),
        })?;
    validate_id(field, id)?;
    Ok(id)
}

/// Ids are positive.
pub fn validate_id(field: &str, id: i64) -> ValidationResult<()> {
    if id <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Packages
// =============================================================================

/// Validates the package selection of a booking.
///
/// ## Rules
/// - All ids positive
/// - At most [`MAX_ADDITIONAL_PACKAGES`] additional packages
/// - No package appears twice across base + additional
pub fn validate_package_selection(base: i64, additional: &[i64]) -> ValidationResult<()> {
    validate_id("packageId", base)?;

    if additional.len() > MAX_ADDITIONAL_PACKAGES {
        return Err(ValidationError::OutOfRange {
            field: "additionalPackages".to_string(),
            min: 0,
            max: MAX_ADDITIONAL_PACKAGES as i64,
        });
    }

    let mut seen = HashSet::with_capacity(additional.len() + 1);
    seen.insert(base);
    for &id in additional {
        validate_id("additionalPackages", id)?;
        if !seen.insert(id) {
            return Err(ValidationError::Duplicate {
                field: "additionalPackages".to_string(),
                value: id.to_string(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Discount Codes
// =============================================================================

/// Validates and normalizes a discount code.
///
/// ## Rules
/// - Not empty after trimming
/// - At most 32 characters
/// - Letters, digits, hyphens and underscores only
///
/// ## Returns
/// The trimmed upper-case code.
///
/// ```rust
/// use chairside_core::validation::validate_discount_code;
///
/// assert_eq!(validate_discount_code(" save10 ").unwrap(), "SAVE10");
/// assert!(validate_discount_code("   ").is_err());
/// ```
pub fn validate_discount_code(code: &str) -> ValidationResult<String> {
    let code = normalize_code(code);

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.len() > 32 {
        return Err(ValidationError::OutOfRange {
            field: "code".to_string(),
            min: 1,
            max: 32,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(code)
}

/// A percentage discount must satisfy `0 < p <= 100%`.
pub fn validate_discount_percent(percent: Percent) -> ValidationResult<()> {
    if percent.is_zero() || percent.bps() > Percent::MAX_BPS {
        return Err(ValidationError::OutOfRange {
            field: "discountPercent".to_string(),
            min: 1,
            max: 100,
        });
    }
    Ok(())
}

/// A commission rate must be between 0% and 100% inclusive.
pub fn validate_commission_rate(field: &str, rate: Percent) -> ValidationResult<()> {
    if rate.bps() > Percent::MAX_BPS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 100,
        });
    }
    Ok(())
}

// =============================================================================
// Amounts
// =============================================================================

/// Validates that a monetary amount is strictly positive.
pub fn validate_positive_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a product sale quantity.
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if quantity > MAX_SALE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_SALE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a free-text label (expense description, names).
///
/// ## Returns
/// The trimmed text.
pub fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: max as i64,
        });
    }

    Ok(value.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("id", " 7 ").unwrap(), 7);
        assert!(matches!(
            parse_id("id", "abc"),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert!(matches!(
            parse_id("id", "-3"),
            Err(ValidationError::MustBePositive { .. })
        ));
    }

    #[test]
    fn test_package_selection() {
        assert!(validate_package_selection(1, &[]).is_ok());
        assert!(validate_package_selection(1, &[2, 3]).is_ok());
        assert!(matches!(
            validate_package_selection(1, &[2, 1]),
            Err(ValidationError::Duplicate { .. })
        ));
        assert!(matches!(
            validate_package_selection(1, &[2, 2]),
            Err(ValidationError::Duplicate { .. })
        ));
        assert!(validate_package_selection(0, &[]).is_err());

        let too_many: Vec<i64> = (2..(MAX_ADDITIONAL_PACKAGES as i64 + 3)).collect();
        assert!(matches!(
            validate_package_selection(1, &too_many),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_discount_code() {
        assert_eq!(validate_discount_code("summer-25").unwrap(), "SUMMER-25");
        assert!(validate_discount_code("").is_err());
        assert!(validate_discount_code("NO SPACES").is_err());
        assert!(validate_discount_code(&"X".repeat(33)).is_err());
    }

    #[test]
    fn test_discount_percent() {
        assert!(validate_discount_percent(Percent::from_bps(1000)).is_ok());
        assert!(validate_discount_percent(Percent::from_bps(10_000)).is_ok());
        assert!(validate_discount_percent(Percent::zero()).is_err());
        assert!(validate_discount_percent(Percent::from_bps(10_001)).is_err());
    }

    #[test]
    fn test_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(MAX_SALE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_text() {
        assert_eq!(validate_text("description", "  Rent ", 200).unwrap(), "Rent");
        assert!(validate_text("description", "   ", 200).is_err());
        assert!(validate_text("description", "abcdef", 5).is_err());
    }

    #[test]
    fn test_positive_amount() {
        assert!(validate_positive_amount("amount", Money::from_cents(1)).is_ok());
        assert!(validate_positive_amount("amount", Money::zero()).is_err());
    }
}
