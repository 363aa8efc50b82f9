//! # Domain Types
//!
//! Core domain types used throughout Chairside.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Package      │   │  Appointment    │   │  DiscountCode   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  client_id      │   │  code (UPPER)   │       │
//! │  │  price_cents    │──►│  package snapshot│◄──│  type + value   │       │
//! │  │  is_active      │   │  original/final │   │  applicable pkgs│       │
//! │  └─────────────────┘   └────────┬────────┘   └────────┬────────┘       │
//! │                                 │                     │                 │
//! │                                 ▼                     ▼                 │
//! │                     ┌─────────────────────┐  ┌──────────────────┐      │
//! │                     │ AppointmentDiscount │  │DiscountCodeUsage │      │
//! │                     │ (multi-code path)   │  │ (code, client)   │      │
//! │                     └─────────────────────┘  └──────────────────┘      │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     User        │   │  ProductSale    │   │    Expense      │       │
//! │  │  role           │   │  frozen         │   │  amount_cents   │       │
//! │  │  commission bps │   │  commission     │   │  incurred_at    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Storage Convention
//! Monetary columns are `*_cents: i64` and rates are `*_bps: i64`, with typed
//! accessors (`price()`, `commission_rate()`) returning [`Money`] and
//! [`Percent`]. Flat records derive `sqlx::FromRow` behind the `sqlx` feature;
//! records carrying package id lists are assembled by the db layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Percent
// =============================================================================

/// A percentage represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 4000 bps = 40% (default service commission)
/// 1000 bps = 10% (a typical discount code)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Percent(u32);

impl Percent {
    /// 100% in basis points.
    pub const MAX_BPS: u32 = 10_000;

    /// Creates a percentage from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percent(bps)
    }

    /// Creates a percentage from a float such as `12.5` (meaning 12.5%).
    ///
    /// Rounds to the nearest basis point. Negative and NaN inputs become 0;
    /// range checks against 100% belong to validation, not here.
    pub fn from_percentage(pct: f64) -> Self {
        if !pct.is_finite() || pct <= 0.0 {
            return Percent(0);
        }
        Percent((pct * 100.0).round() as u32)
    }

    /// Creates a percentage from a stored basis-point column.
    #[inline]
    pub fn from_stored(bps: i64) -> Self {
        Percent(bps.clamp(0, u32::MAX as i64) as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display and wire format only).
    #[inline]
    pub fn as_percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero percent.
    #[inline]
    pub const fn zero() -> Self {
        Percent(0)
    }

    /// Checks if the percentage is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Percent {
    fn default() -> Self {
        Percent::zero()
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

// =============================================================================
// Roles & Users
// =============================================================================

/// Role carried by every authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
pub enum Role {
    /// Administrative role with full permissions.
    Boss,
    /// Operating role; can be assigned as barber and earns commission.
    Staff,
    /// A customer account.
    Client,
}

impl Role {
    /// Boss and Staff can perform services, be assigned as barber and
    /// complete appointments.
    #[inline]
    pub const fn can_serve(&self) -> bool {
        matches!(self, Role::Boss | Role::Staff)
    }

    /// Only the Boss can delete appointments and see the full financials.
    #[inline]
    pub const fn is_boss(&self) -> bool {
        matches!(self, Role::Boss)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Boss => "Boss",
            Role::Staff => "Staff",
            Role::Client => "Client",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default commission on services: 40%.
pub const DEFAULT_COMMISSION_BPS: i64 = 4_000;

/// Default commission on product sales: 5%.
pub const DEFAULT_PRODUCT_COMMISSION_BPS: i64 = 500;

/// A system user (Boss, Staff or a client account).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub role: Role,
    /// Commission on service revenue, in basis points.
    pub commission_rate_bps: i64,
    /// Commission on product sales, in basis points.
    pub product_commission_rate_bps: i64,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl User {
    #[inline]
    pub fn commission_rate(&self) -> Percent {
        Percent::from_stored(self.commission_rate_bps)
    }

    #[inline]
    pub fn product_commission_rate(&self) -> Percent {
        Percent::from_stored(self.product_commission_rate_bps)
    }

    /// Active Boss or Staff member.
    #[inline]
    pub fn can_serve(&self) -> bool {
        self.is_active && self.role.can_serve()
    }
}

/// A customer record that appointments are booked for.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Package
// =============================================================================

/// A bookable service package.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Package {
    pub id: i64,
    pub name: String,
    /// List price in cents.
    pub price_cents: i64,
    pub duration_minutes: i64,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Package {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Appointment Status
// =============================================================================

/// The status of an appointment.
///
/// ```text
///   pending ──► confirmed ──► completed
///      │            │
///      └─────┬──────┘
///            ▼
///        cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 4] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    /// Completed and cancelled appointments never change status again.
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled
        )
    }
}

impl Default for AppointmentStatus {
    fn default() -> Self {
        AppointmentStatus::Pending
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AppointmentStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: AppointmentStatus::ALL
                    .iter()
                    .map(|s| s.as_str().to_string())
                    .collect(),
            })
    }
}

// =============================================================================
// Appointment
// =============================================================================

/// An appointment row.
///
/// Price fields are always recomputed as a whole, never patched:
/// `final_price = max(0, original_price - discount_amount)`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Appointment {
    pub id: i64,
    pub client_id: i64,
    /// Base package.
    pub package_id: i64,
    pub barber_id: Option<i64>,
    pub status: AppointmentStatus,
    /// Base + additional package prices. `None` only on rows imported from
    /// before prices were tracked.
    pub original_price_cents: Option<i64>,
    /// Legacy single-code discount.
    pub discount_code_id: Option<i64>,
    pub discount_amount_cents: Option<i64>,
    pub final_price_cents: Option<i64>,
    /// `None` means walk-in: reported by `created_at` instead.
    #[ts(as = "Option<String>")]
    pub appointment_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    /// Set by the monthly reset once commission for this appointment is paid.
    #[ts(as = "Option<String>")]
    pub settled_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn original_price(&self) -> Option<Money> {
        self.original_price_cents.map(Money::from_cents)
    }

    pub fn final_price(&self) -> Option<Money> {
        self.final_price_cents.map(Money::from_cents)
    }

    pub fn discount_amount(&self) -> Money {
        Money::from_cents(self.discount_amount_cents.unwrap_or(0))
    }

    /// The date this appointment is reported under: the scheduled date, or
    /// the booking timestamp for walk-ins.
    pub fn report_date(&self) -> DateTime<Utc> {
        self.appointment_date.unwrap_or(self.created_at)
    }
}

/// One package inside an appointment, frozen at booking time.
///
/// ## Snapshot Pattern
/// Name and price are copied from the package. Later price changes on the
/// package do not touch past appointments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AppointmentPackage {
    pub appointment_id: i64,
    /// 0 for the base package, then 1.. in the requested order.
    pub position: i64,
    pub package_id: i64,
    pub name_snapshot: String,
    pub price_cents: i64,
    pub is_base: bool,
}

impl AppointmentPackage {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

/// Discount applied to one appointment through the multi-code path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AppointmentDiscount {
    pub appointment_id: i64,
    pub discount_code_id: i64,
    pub code: String,
    pub applied_to_packages: Vec<i64>,
    pub discount_amount_cents: i64,
}

impl AppointmentDiscount {
    #[inline]
    pub fn discount_amount(&self) -> Money {
        Money::from_cents(self.discount_amount_cents)
    }
}

/// An appointment with its package snapshot and any multi-code discounts.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AppointmentDetail {
    pub appointment: Appointment,
    /// Ordered: base package first, then additional packages.
    pub packages: Vec<AppointmentPackage>,
    pub discounts: Vec<AppointmentDiscount>,
}

impl AppointmentDetail {
    /// Additional package ids in booking order.
    pub fn additional_package_ids(&self) -> Vec<i64> {
        self.packages
            .iter()
            .filter(|p| !p.is_base)
            .map(|p| p.package_id)
            .collect()
    }
}

// =============================================================================
// Discount Codes
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// `discount_percent_bps` of the discountable amount.
    Percentage,
    /// A flat `discount_amount_cents`, capped at the discountable amount.
    FixedAmount,
}

/// A discount code.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DiscountCode {
    pub id: i64,
    /// Unique, stored trimmed and upper-cased.
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_percent_bps: Option<i64>,
    pub discount_amount_cents: Option<i64>,
    /// Empty means the code applies to every package.
    pub applicable_packages: Vec<i64>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl DiscountCode {
    /// Whether the code is scoped to a subset of packages.
    #[inline]
    pub fn is_restricted(&self) -> bool {
        !self.applicable_packages.is_empty()
    }

    pub fn applies_to(&self, package_id: i64) -> bool {
        !self.is_restricted() || self.applicable_packages.contains(&package_id)
    }

    pub fn percent(&self) -> Percent {
        Percent::from_stored(self.discount_percent_bps.unwrap_or(0))
    }

    pub fn fixed_amount(&self) -> Money {
        Money::from_cents(self.discount_amount_cents.unwrap_or(0))
    }
}

/// Normalizes a user-entered discount code: trimmed, upper-case.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// A record that a client has consumed a discount code.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DiscountCodeUsage {
    pub id: i64,
    pub discount_code_id: i64,
    pub client_id: i64,
    pub appointment_id: i64,
    #[ts(as = "String")]
    pub used_at: DateTime<Utc>,
}

// =============================================================================
// Products & Expenses
// =============================================================================

/// A retail product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price_cents: i64,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

/// A product sale. Price and commission are frozen at sale time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductSale {
    pub id: i64,
    pub product_id: i64,
    pub staff_id: i64,
    pub client_id: Option<i64>,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub total_price_cents: i64,
    pub commission_rate_bps: i64,
    pub commission_amount_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl ProductSale {
    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }

    #[inline]
    pub fn commission_amount(&self) -> Money {
        Money::from_cents(self.commission_amount_cents)
    }
}

/// A business expense (rent, supplies, ...).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Expense {
    pub id: i64,
    pub description: String,
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub incurred_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Expense {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
