//! # Pricing Calculator
//!
//! Computes what an appointment costs: the original price from its packages,
//! and the discount a code takes off it.
//!
//! ## Calculation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Appointment Pricing                              │
//! │                                                                         │
//! │   Base package ─────┐                                                   │
//! │   Additional pkgs ──┴──► compute_original_price ──► PriceBreakdown      │
//! │                                                        │                │
//! │                                                        ▼                │
//! │   DiscountCode + optional subset ──► compute_discount ──► Discount      │
//! │                                                        │                │
//! │                                                        ▼                │
//! │                     final = max(0, original - total discount)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Discountable Amount
//! - Unrestricted code (`applicable_packages` empty): the whole original price.
//!   A caller subset is ignored so codes created before package scoping keep
//!   working.
//! - Restricted code: the prices of `booked ∩ (subset or booked) ∩ applicable`.
//!   An empty intersection is [`CoreError::DiscountNotApplicable`].
//!
//! ## Example
//! ```rust
//! use chairside_core::money::Money;
//! use chairside_core::pricing::{PriceBreakdown, PricedPackage};
//!
//! let breakdown = PriceBreakdown::new(
//!     PricedPackage::new(1, "Haircut", Money::from_cents(5000)),
//!     vec![PricedPackage::new(2, "Beard Trim", Money::from_cents(3000))],
//! );
//! assert_eq!(breakdown.original_price(), Money::from_cents(8000));
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{DiscountCode, DiscountType, Package};

// =============================================================================
// Priced Packages
// =============================================================================

/// A package as it takes part in a price: id, name and list price at the
/// moment of booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PricedPackage {
    pub id: i64,
    pub name: String,
    pub price: Money,
}

impl PricedPackage {
    pub fn new(id: i64, name: impl Into<String>, price: Money) -> Self {
        PricedPackage {
            id,
            name: name.into(),
            price,
        }
    }
}

impl From<&Package> for PricedPackage {
    fn from(package: &Package) -> Self {
        PricedPackage::new(package.id, package.name.clone(), package.price())
    }
}

/// The packages of one appointment and their summed price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PriceBreakdown {
    pub base: PricedPackage,
    /// In requested order.
    pub additional: Vec<PricedPackage>,
}

impl PriceBreakdown {
    pub fn new(base: PricedPackage, additional: Vec<PricedPackage>) -> Self {
        PriceBreakdown { base, additional }
    }

    /// Base price plus every additional package price. Never rounded.
    pub fn original_price(&self) -> Money {
        self.base.price + self.additional.iter().map(|p| p.price).sum::<Money>()
    }

    /// Every package, base first.
    pub fn packages(&self) -> impl Iterator<Item = &PricedPackage> {
        std::iter::once(&self.base).chain(self.additional.iter())
    }

    pub fn package_ids(&self) -> Vec<i64> {
        self.packages().map(|p| p.id).collect()
    }

    pub fn additional_ids(&self) -> Vec<i64> {
        self.additional.iter().map(|p| p.id).collect()
    }

    fn price_of(&self, package_id: i64) -> Option<Money> {
        self.packages()
            .find(|p| p.id == package_id)
            .map(|p| p.price)
    }
}

// =============================================================================
// Original Price
// =============================================================================

/// Resolves the requested additional packages and builds the price breakdown.
///
/// `resolved` is whatever the store returned for `additional_ids`, in any
/// order. Every requested id must be present and active, otherwise the call
/// fails with [`CoreError::PackageNotFound`] or [`CoreError::PackageInactive`]
/// naming the first offending id.
pub fn compute_original_price(
    base: &Package,
    additional_ids: &[i64],
    resolved: &[Package],
) -> CoreResult<PriceBreakdown> {
    ensure_active(base)?;

    let mut additional = Vec::with_capacity(additional_ids.len());
    for &id in additional_ids {
        let package = resolved
            .iter()
            .find(|p| p.id == id)
            .ok_or(CoreError::PackageNotFound(id))?;
        ensure_active(package)?;
        additional.push(PricedPackage::from(package));
    }

    Ok(PriceBreakdown::new(PricedPackage::from(base), additional))
}

fn ensure_active(package: &Package) -> CoreResult<()> {
    if !package.is_active {
        return Err(CoreError::PackageInactive(package.id));
    }
    Ok(())
}

// =============================================================================
// Discounts
// =============================================================================

/// Result of applying one code to one price breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Discount {
    pub discount_code_id: i64,
    pub code: String,
    /// The amount the code's terms were applied to.
    pub discountable: Money,
    /// Never more than `discountable`.
    pub amount: Money,
    /// Package ids the discount was applied to.
    pub applied_to: Vec<i64>,
}

/// Computes the discount a code grants on a breakdown.
///
/// ## Rounding
/// Percentage discounts are rounded half-up to the cent. Fixed amounts are
/// clamped to the discountable amount.
///
/// ```rust
/// use chairside_core::money::Money;
/// use chairside_core::pricing::{compute_discount, PriceBreakdown, PricedPackage};
/// use chairside_core::types::{DiscountCode, DiscountType};
///
/// let breakdown = PriceBreakdown::new(
///     PricedPackage::new(1, "Haircut", Money::from_cents(5000)),
///     vec![PricedPackage::new(2, "Beard Trim", Money::from_cents(3000))],
/// );
/// let code = DiscountCode {
///     id: 1,
///     code: "SAVE10".into(),
///     discount_type: DiscountType::Percentage,
///     discount_percent_bps: Some(1000),
///     discount_amount_cents: None,
///     applicable_packages: vec![],
///     is_active: true,
///     created_at: chrono::Utc::now(),
/// };
///
/// let discount = compute_discount(&code, &breakdown, None).unwrap();
/// assert_eq!(discount.amount, Money::from_cents(800));
/// ```
pub fn compute_discount(
    code: &DiscountCode,
    breakdown: &PriceBreakdown,
    subset: Option<&[i64]>,
) -> CoreResult<Discount> {
    let (discountable, applied_to) = if code.is_restricted() {
        let booked = breakdown.package_ids();
        let requested: &[i64] = match subset {
            Some(ids) if !ids.is_empty() => ids,
            _ => &booked,
        };

        let mut applied_to: Vec<i64> = Vec::new();
        for &id in requested {
            if booked.contains(&id) && code.applies_to(id) && !applied_to.contains(&id) {
                applied_to.push(id);
            }
        }

        if applied_to.is_empty() {
            return Err(CoreError::DiscountNotApplicable {
                code: code.code.clone(),
            });
        }

        let discountable = applied_to
            .iter()
            .filter_map(|&id| breakdown.price_of(id))
            .sum::<Money>();
        (discountable, applied_to)
    } else {
        (breakdown.original_price(), breakdown.package_ids())
    };

    let amount = match code.discount_type {
        DiscountType::Percentage => discountable.percentage(code.percent()),
        DiscountType::FixedAmount => code.fixed_amount().min(discountable),
    }
    .floor_zero();

    Ok(Discount {
        discount_code_id: code.id,
        code: code.code.clone(),
        discountable,
        amount,
        applied_to,
    })
}

// =============================================================================
// Quote
// =============================================================================

/// The three price fields persisted on an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PriceQuote {
    pub original_price: Money,
    pub discount_amount: Money,
    pub final_price: Money,
}

impl PriceQuote {
    /// Builds a quote from the original price and every discount applied.
    ///
    /// The total discount is capped at the original price, so
    /// `final_price == original_price - discount_amount` and is never negative.
    pub fn new(original_price: Money, discounts: &[Discount]) -> Self {
        let total = discounts.iter().map(|d| d.amount).sum::<Money>();
        let discount_amount = total.min(original_price).floor_zero();
        PriceQuote {
            original_price,
            discount_amount,
            final_price: (original_price - discount_amount).floor_zero(),
        }
    }

    /// A quote without any discount.
    pub fn undiscounted(original_price: Money) -> Self {
        PriceQuote::new(original_price, &[])
    }
}

/// Scales stacked discounts down so they sum to at most `original_price`.
///
/// Each code keeps a share proportional to its own amount, so the per-code
/// amounts always add up to the quote's `discount_amount`.
pub fn cap_discounts(original_price: Money, mut discounts: Vec<Discount>) -> Vec<Discount> {
    let total = discounts.iter().map(|d| d.amount).sum::<Money>();
    if total <= original_price {
        return discounts;
    }

    let weights: Vec<Money> = discounts.iter().map(|d| d.amount).collect();
    let shares = original_price.floor_zero().allocate(&weights);
    for (discount, share) in discounts.iter_mut().zip(shares) {
        discount.amount = share;
    }
    discounts
}

// =============================================================================
// Unit Tests
// =============================================================================
