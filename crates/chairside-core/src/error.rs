//! # Error Types
//!
//! Domain-specific error types for chairside-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  chairside-core errors (this file)                                     │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  chairside-db errors (separate crate)                                  │
//! │  └── DbError          - Database failures, wraps CoreError             │
//! │                                                                         │
//! │  HTTP errors (apps/api)                                                │
//! │  └── ApiError         - { success: false, error: CODE, message }       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::AppointmentStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A package id does not exist.
    #[error("Package not found: {0}")]
    PackageNotFound(i64),

    /// The package exists but is no longer offered.
    #[error("Package {0} is not active")]
    PackageInactive(i64),

    /// Unknown or inactive discount code.
    #[error("Discount code not found: {0}")]
    DiscountNotFound(String),

    /// The code is valid but none of the booked packages are in its scope.
    ///
    /// ## User Workflow
    /// ```text
    /// Book "Haircut" with code BEARD20 (only Beard Trim)
    ///      │
    ///      ▼
    /// Intersection of booked packages and applicable packages is empty
    ///      │
    ///      ▼
    /// DiscountNotApplicable { code: "BEARD20" }
    /// ```
    #[error("Discount code {code} does not apply to the selected packages")]
    DiscountNotApplicable { code: String },

    /// Single-use code already consumed by this client.
    #[error("Discount code {code} has already been used by this client")]
    DiscountAlreadyUsed { code: String },

    /// Generic missing entity (appointment, client, user, product).
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The acting user's role may not perform this operation.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The requested status change is not an edge of the lifecycle graph.
    #[error("Cannot change appointment status from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Shorthand for [`CoreError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any business logic or database write runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Invalid format (e.g. a non-numeric id, an unparseable date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g. the same package twice in one booking).
    #[error("{field} '{value}' is duplicated")]
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
