//! # chairside-core: Pure Business Logic for Chairside
//!
//! Pricing, discounts, appointment lifecycle rules and financial reporting as
//! pure functions. No database, no network.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Chairside Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    apps/api (axum)                              │   │
//! │  │    /appointments, /discounts/validate, /financial/*             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    chairside-db (SQLite)                        │   │
//! │  │    Discount Ledger, Appointment Manager, report loading         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ chairside-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐          │   │
//! │  │   │ pricing  │ │ discount │ │lifecycle │ │  report  │          │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘          │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐          │   │
//! │  │   │  money   │ │  types   │ │validation│ │  error   │          │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Package, Appointment, DiscountCode, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`pricing`] - Original price, discountable amount, discount amount
//! - [`discount`] - Usage policies and multi-code batches
//! - [`lifecycle`] - Status transitions, barber assignment, role checks
//! - [`report`] - Commission and revenue aggregation
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chairside_core::money::Money;
//! use chairside_core::types::Percent;
//!
//! let original = Money::from_cents(8000); // RM80.00
//! let commission = original.percentage(Percent::from_bps(4000));
//! assert_eq!(commission.cents(), 3200);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod discount;
pub mod error;
pub mod lifecycle;
pub mod money;
pub mod pricing;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use lifecycle::Actor;
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum additional packages on one appointment.
pub const MAX_ADDITIONAL_PACKAGES: usize = 10;

/// Maximum quantity in one product sale.
pub const MAX_SALE_QUANTITY: i64 = 999;
