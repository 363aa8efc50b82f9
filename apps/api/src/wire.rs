//! # Wire Format
//!
//! JSON shapes of the REST API. Money crosses the boundary as a decimal
//! number in major units (`72.0` = RM72.00) and percentages as 0–100 floats;
//! everything behind this module works in cents and basis points.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use chairside_core::pricing::{Discount, PriceQuote};
use chairside_core::report::{
    DayBreakdown, FinancialOverview, ProductBreakdown, ServiceBreakdown, StaffBreakdown,
};
use chairside_core::{
    AppointmentDetail, AppointmentStatus, DiscountCode, DiscountType, Expense, Money, ProductSale,
    Role, ValidationError,
};
use chairside_db::{DiscountValidation, MonthlyResetSummary};

const MAX_AMOUNT: f64 = 10_000_000.0;

// =============================================================================
// Conversions
// =============================================================================

/// Money in major units, rounded to 2 decimal places.
pub fn money(value: Money) -> f64 {
    value.to_major_f64()
}

fn opt_money(cents: Option<i64>) -> Option<f64> {
    cents.map(|c| money(Money::from_cents(c)))
}

/// Parses a client-supplied amount in major units.
pub fn parse_money(field: &str, value: f64) -> Result<Money, ValidationError> {
    if !value.is_finite() || !(0.0..=MAX_AMOUNT).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT as i64,
        });
    }
    Ok(Money::from_cents((value * 100.0).round() as i64))
}

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`). Use with `#[serde(default)]`.
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Envelope for successful responses.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Envelope {
            success: true,
            data,
        }
    }
}

// =============================================================================
// Appointments
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentView {
    pub id: i64,
    pub client_id: i64,
    pub package_id: i64,
    pub additional_packages: Vec<i64>,
    pub barber_id: Option<i64>,
    pub status: AppointmentStatus,
    pub original_price: Option<f64>,
    pub discount_code_id: Option<i64>,
    pub discount_amount: Option<f64>,
    pub final_price: Option<f64>,
    pub appointment_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub settled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub packages: Vec<PackageLineView>,
    pub discounts: Vec<AppliedDiscountView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageLineView {
    pub package_id: i64,
    pub name: String,
    pub price: f64,
    pub is_base: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedDiscountView {
    pub discount_code_id: i64,
    pub code: String,
    pub applied_to_packages: Vec<i64>,
    pub discount_amount: f64,
}

impl From<AppointmentDetail> for AppointmentView {
    fn from(detail: AppointmentDetail) -> Self {
        let additional_packages = detail.additional_package_ids();
        let a = detail.appointment;
        AppointmentView {
            id: a.id,
            client_id: a.client_id,
            package_id: a.package_id,
            additional_packages,
            barber_id: a.barber_id,
            status: a.status,
            original_price: opt_money(a.original_price_cents),
            discount_code_id: a.discount_code_id,
            discount_amount: opt_money(a.discount_amount_cents),
            final_price: opt_money(a.final_price_cents),
            appointment_date: a.appointment_date,
            notes: a.notes,
            settled_at: a.settled_at,
            created_at: a.created_at,
            updated_at: a.updated_at,
            packages: detail
                .packages
                .into_iter()
                .map(|p| PackageLineView {
                    package_id: p.package_id,
                    price: money(p.price()),
                    name: p.name_snapshot,
                    is_base: p.is_base,
                })
                .collect(),
            discounts: detail
                .discounts
                .into_iter()
                .map(|d| AppliedDiscountView {
                    discount_code_id: d.discount_code_id,
                    discount_amount: money(Money::from_cents(d.discount_amount_cents)),
                    code: d.code,
                    applied_to_packages: d.applied_to_packages,
                })
                .collect(),
        }
    }
}

// =============================================================================
// Discounts
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountTermsView {
    pub id: i64,
    pub code: String,
    pub discount_type: DiscountType,
    /// 0–100, percentage codes only.
    pub discount_percent: Option<f64>,
    /// Fixed-amount codes only.
    pub discount_amount: Option<f64>,
    /// Empty means every package.
    pub applicable_packages: Vec<i64>,
}

impl From<&DiscountCode> for DiscountTermsView {
    fn from(code: &DiscountCode) -> Self {
        DiscountTermsView {
            id: code.id,
            code: code.code.clone(),
            discount_type: code.discount_type,
            discount_percent: code
                .discount_percent_bps
                .map(|_| code.percent().as_percentage()),
            discount_amount: opt_money(code.discount_amount_cents),
            applicable_packages: code.applicable_packages.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountPreviewView {
    pub discountable_amount: f64,
    pub discount_amount: f64,
    pub applied_to_packages: Vec<i64>,
    pub original_price: f64,
    pub final_price: f64,
}

impl DiscountPreviewView {
    fn new(discount: &Discount, quote: &PriceQuote) -> Self {
        DiscountPreviewView {
            discountable_amount: money(discount.discountable),
            discount_amount: money(discount.amount),
            applied_to_packages: discount.applied_to.clone(),
            original_price: money(quote.original_price),
            final_price: money(quote.final_price),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountValidationView {
    pub valid: bool,
    pub message: String,
    pub already_used: bool,
    pub applicable: Option<bool>,
    pub discount: DiscountTermsView,
    pub preview: Option<DiscountPreviewView>,
}

impl From<DiscountValidation> for DiscountValidationView {
    fn from(v: DiscountValidation) -> Self {
        let preview = match (&v.discount, &v.quote) {
            (Some(discount), Some(quote)) => Some(DiscountPreviewView::new(discount, quote)),
            _ => None,
        };
        DiscountValidationView {
            valid: v.is_valid(),
            message: v.message(),
            already_used: v.already_used,
            applicable: v.applicable,
            discount: DiscountTermsView::from(&v.code),
            preview,
        }
    }
}

// =============================================================================
// Sales & Expenses
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSaleView {
    pub id: i64,
    pub product_id: i64,
    pub staff_id: i64,
    pub client_id: Option<i64>,
    pub quantity: i64,
    pub unit_price: f64,
    pub total_price: f64,
    pub commission_rate: f64,
    pub commission_amount: f64,
    pub created_at: DateTime<Utc>,
}

impl From<ProductSale> for ProductSaleView {
    fn from(s: ProductSale) -> Self {
        ProductSaleView {
            id: s.id,
            product_id: s.product_id,
            staff_id: s.staff_id,
            client_id: s.client_id,
            quantity: s.quantity,
            unit_price: money(Money::from_cents(s.unit_price_cents)),
            total_price: money(s.total_price()),
            commission_rate: s.commission_rate_bps as f64 / 100.0,
            commission_amount: money(s.commission_amount()),
            created_at: s.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseView {
    pub id: i64,
    pub description: String,
    pub amount: f64,
    pub incurred_at: DateTime<Utc>,
}

impl From<Expense> for ExpenseView {
    fn from(e: Expense) -> Self {
        ExpenseView {
            id: e.id,
            amount: money(e.amount()),
            description: e.description,
            incurred_at: e.incurred_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyResetView {
    pub cutoff: DateTime<Utc>,
    pub settled_appointments: u64,
    pub deleted_expenses: u64,
}

impl MonthlyResetView {
    pub fn new(cutoff: DateTime<Utc>, summary: MonthlyResetSummary) -> Self {
        MonthlyResetView {
            cutoff,
            settled_appointments: summary.settled_appointments,
            deleted_expenses: summary.deleted_expenses,
        }
    }
}

// =============================================================================
// Reports
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffBreakdownView {
    pub staff_id: i64,
    pub name: String,
    pub role: Role,
    pub commission_rate: f64,
    pub product_commission_rate: f64,
    pub appointments: u32,
    pub service_revenue: f64,
    pub commission_base: f64,
    pub service_commission: f64,
    pub product_sales: u32,
    pub product_revenue: f64,
    pub product_commission: f64,
    pub total_commission: f64,
}

impl From<StaffBreakdown> for StaffBreakdownView {
    fn from(s: StaffBreakdown) -> Self {
        StaffBreakdownView {
            staff_id: s.staff_id,
            name: s.name,
            role: s.role,
            commission_rate: s.commission_rate.as_percentage(),
            product_commission_rate: s.product_commission_rate.as_percentage(),
            appointments: s.appointments,
            service_revenue: money(s.service_revenue),
            commission_base: money(s.commission_base),
            service_commission: money(s.service_commission),
            product_sales: s.product_sales,
            product_revenue: money(s.product_revenue),
            product_commission: money(s.product_commission),
            total_commission: money(s.total_commission),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBreakdownView {
    pub package_id: i64,
    pub name: String,
    pub bookings: u32,
    pub revenue: f64,
    pub commission: f64,
}

impl From<ServiceBreakdown> for ServiceBreakdownView {
    fn from(s: ServiceBreakdown) -> Self {
        ServiceBreakdownView {
            package_id: s.package_id,
            name: s.name,
            bookings: s.bookings,
            revenue: money(s.revenue),
            commission: money(s.commission),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductBreakdownView {
    pub product_id: i64,
    pub name: String,
    pub quantity: i64,
    pub revenue: f64,
    pub commission: f64,
}

impl From<ProductBreakdown> for ProductBreakdownView {
    fn from(p: ProductBreakdown) -> Self {
        ProductBreakdownView {
            product_id: p.product_id,
            name: p.name,
            quantity: p.quantity,
            revenue: money(p.revenue),
            commission: money(p.commission),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayBreakdownView {
    pub date: NaiveDate,
    pub appointments: u32,
    pub service_revenue: f64,
    pub product_revenue: f64,
    pub total_revenue: f64,
}

impl From<DayBreakdown> for DayBreakdownView {
    fn from(d: DayBreakdown) -> Self {
        DayBreakdownView {
            date: d.date,
            appointments: d.appointments,
            service_revenue: money(d.service_revenue),
            product_revenue: money(d.product_revenue),
            total_revenue: money(d.total_revenue),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialOverviewView {
    pub total_revenue: f64,
    pub service_revenue: f64,
    pub product_revenue: f64,
    pub total_commission_paid: f64,
    pub total_expenses: f64,
    pub net_profit: f64,
    pub total_customers: u32,
    pub completed_appointments: u32,
    pub per_staff_breakdown: Vec<StaffBreakdownView>,
    pub per_service_breakdown: Vec<ServiceBreakdownView>,
    pub per_product_breakdown: Vec<ProductBreakdownView>,
    pub per_day_breakdown: Vec<DayBreakdownView>,
}

impl From<FinancialOverview> for FinancialOverviewView {
    fn from(o: FinancialOverview) -> Self {
        FinancialOverviewView {
            total_revenue: money(o.total_revenue),
            service_revenue: money(o.service_revenue),
            product_revenue: money(o.product_revenue),
            total_commission_paid: money(o.total_commission_paid),
            total_expenses: money(o.total_expenses),
            net_profit: money(o.net_profit),
            total_customers: o.total_customers,
            completed_appointments: o.completed_appointments,
            per_staff_breakdown: o.per_staff.into_iter().map(Into::into).collect(),
            per_service_breakdown: o.per_service.into_iter().map(Into::into).collect(),
            per_product_breakdown: o.per_product.into_iter().map(Into::into).collect(),
            per_day_breakdown: o.per_day.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_money_rounds_to_cents() {
        assert_eq!(parse_money("amount", 72.0).unwrap().cents(), 7200);
        assert_eq!(parse_money("amount", 19.999).unwrap().cents(), 2000);
        assert!(parse_money("amount", -1.0).is_err());
        assert!(parse_money("amount", f64::NAN).is_err());
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        barber_id: Option<Option<i64>>,
    }

    #[test]
    fn test_double_option_distinguishes_null_from_absent() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        let null: Patch = serde_json::from_str(r#"{"barberId": null}"#).unwrap();
        let set: Patch = serde_json::from_str(r#"{"barberId": 4}"#).unwrap();

        assert_eq!(absent.barber_id, None);
        assert_eq!(null.barber_id, Some(None));
        assert_eq!(set.barber_id, Some(Some(4)));
    }
}
