//! # Commission & Reporting Aggregator
//!
//! Post-hoc aggregation over completed appointments, product sales and
//! expenses.
//!
//! ## Aggregation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      financial_overview()                               │
//! │                                                                         │
//! │  ReportData ──► filter ──► per appointment:                             │
//! │                  │           commission = original × barber rate        │
//! │                  │           split final + commission by list price     │
//! │                  │                                                      │
//! │                  ├──► per product sale: frozen commission               │
//! │                  └──► expenses in range                                 │
//! │                                                                         │
//! │  net profit = revenue - commission - expenses                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Inclusion Rules
//! - Appointments: status `completed` with a final price, whose report date
//!   (scheduled date, or creation time for walk-ins) lies in range.
//! - Product sales: by sale time. Expenses: by `incurred_at`.
//!
//! ## Commission Basis
//! Service commission uses the original price, falling back to the final
//! price only on rows that predate price tracking. Discounts are absorbed by
//! the business, not the barber. Rounded per appointment, then summed.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::lifecycle::Actor;
use crate::money::Money;
use crate::types::{
    Appointment, AppointmentDetail, AppointmentStatus, Expense, Percent, Product, ProductSale,
    Role, User,
};

// =============================================================================
// Date Range
// =============================================================================

/// Half-open time range `[start, end)`. Missing bounds are unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Every timestamp.
    pub fn all() -> Self {
        DateRange::default()
    }

    /// Builds a range from inclusive calendar dates (UTC).
    ///
    /// `end` covers its whole day.
    ///
    /// ```rust
    /// use chairside_core::report::DateRange;
    /// use chrono::{NaiveDate, TimeZone, Utc};
    ///
    /// let range = DateRange::from_dates(
    ///     NaiveDate::from_ymd_opt(2024, 3, 1),
    ///     NaiveDate::from_ymd_opt(2024, 3, 31),
    /// ).unwrap();
    /// assert!(range.contains(Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 0).unwrap()));
    /// assert!(!range.contains(Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap()));
    /// ```
    pub fn from_dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> CoreResult<Self> {
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(ValidationError::InvalidFormat {
                    field: "startDate".to_string(),
                    reason: format!("{} is after endDate {}", s, e),
                }
                .into());
            }
        }

        Ok(DateRange {
            start: start.map(start_of_day),
            end: end.map(|d| start_of_day(d) + Duration::days(1)),
        })
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| ts >= s) && self.end.map_or(true, |e| ts < e)
    }

    /// Walk-in fallback: an appointment without a scheduled date is placed by
    /// its creation time.
    pub fn includes(&self, appointment: &Appointment) -> bool {
        self.contains(appointment.report_date())
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

// =============================================================================
// Inputs
// =============================================================================

/// Everything the aggregator reads. Loaded by the database layer.
#[derive(Debug, Clone, Default)]
pub struct ReportData {
    pub appointments: Vec<AppointmentDetail>,
    /// Every user that may appear as barber or seller.
    pub staff: Vec<User>,
    pub product_sales: Vec<ProductSale>,
    pub products: Vec<Product>,
    pub expenses: Vec<Expense>,
}

// =============================================================================
// Outputs
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StaffBreakdown {
    pub staff_id: i64,
    pub name: String,
    pub role: Role,
    pub commission_rate: Percent,
    pub product_commission_rate: Percent,
    pub appointments: u32,
    /// Sum of final prices.
    pub service_revenue: Money,
    /// Sum of original prices the commission was computed on.
    pub commission_base: Money,
    pub service_commission: Money,
    pub product_sales: u32,
    pub product_revenue: Money,
    pub product_commission: Money,
    pub total_commission: Money,
}

impl StaffBreakdown {
    fn new(user: &User) -> Self {
        StaffBreakdown {
            staff_id: user.id,
            name: user.name.clone(),
            role: user.role,
            commission_rate: user.commission_rate(),
            product_commission_rate: user.product_commission_rate(),
            appointments: 0,
            service_revenue: Money::zero(),
            commission_base: Money::zero(),
            service_commission: Money::zero(),
            product_sales: 0,
            product_revenue: Money::zero(),
            product_commission: Money::zero(),
            total_commission: Money::zero(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ServiceBreakdown {
    pub package_id: i64,
    pub name: String,
    /// Completed appointments containing this package.
    pub bookings: u32,
    pub revenue: Money,
    pub commission: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductBreakdown {
    pub product_id: i64,
    pub name: String,
    pub quantity: i64,
    pub revenue: Money,
    pub commission: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DayBreakdown {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub appointments: u32,
    pub service_revenue: Money,
    pub product_revenue: Money,
    pub total_revenue: Money,
}

impl DayBreakdown {
    fn new(date: NaiveDate) -> Self {
        DayBreakdown {
            date,
            appointments: 0,
            service_revenue: Money::zero(),
            product_revenue: Money::zero(),
            total_revenue: Money::zero(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct FinancialOverview {
    /// Services plus products.
    pub total_revenue: Money,
    pub service_revenue: Money,
    pub product_revenue: Money,
    /// Service plus product commission.
    pub total_commission_paid: Money,
    pub total_expenses: Money,
    pub net_profit: Money,
    /// Distinct clients among the included appointments.
    pub total_customers: u32,
    pub completed_appointments: u32,
    pub per_staff: Vec<StaffBreakdown>,
    pub per_service: Vec<ServiceBreakdown>,
    pub per_product: Vec<ProductBreakdown>,
    pub per_day: Vec<DayBreakdown>,
}

// =============================================================================
// Aggregation
// =============================================================================

/// Commission a barber earns on one appointment, rounded to the cent.
pub fn appointment_commission(appointment: &Appointment, rate: Percent) -> Money {
    let basis = appointment
        .original_price()
        .or_else(|| appointment.final_price())
        .unwrap_or_default();
    basis.percentage(rate)
}

/// Whether an appointment counts towards the financials of `range`.
pub fn is_reportable(appointment: &Appointment, range: &DateRange) -> bool {
    appointment.status == AppointmentStatus::Completed
        && appointment.final_price_cents.is_some()
        && range.includes(appointment)
}

/// Builds the financial overview for `range`.
pub fn financial_overview(data: &ReportData, range: &DateRange) -> FinancialOverview {
    let staff_by_id: HashMap<i64, &User> = data.staff.iter().map(|u| (u.id, u)).collect();
    let product_names: HashMap<i64, &str> = data
        .products
        .iter()
        .map(|p| (p.id, p.name.as_str()))
        .collect();

    let mut per_staff: BTreeMap<i64, StaffBreakdown> = data
        .staff
        .iter()
        .filter(|u| u.role.can_serve())
        .map(|u| (u.id, StaffBreakdown::new(u)))
        .collect();
    let mut per_service: BTreeMap<i64, ServiceBreakdown> = BTreeMap::new();
    let mut per_product: BTreeMap<i64, ProductBreakdown> = BTreeMap::new();
    let mut per_day: BTreeMap<NaiveDate, DayBreakdown> = BTreeMap::new();
    let mut customers: HashSet<i64> = HashSet::new();

    let mut service_revenue = Money::zero();
    let mut product_revenue = Money::zero();
    let mut commission_paid = Money::zero();
    let mut completed = 0u32;

    // ---- Services ---------------------------------------------------------
    for detail in &data.appointments {
        let appointment = &detail.appointment;
        if !is_reportable(appointment, range) {
            continue;
        }
        let final_price = appointment.final_price().unwrap_or_default();

        completed += 1;
        service_revenue += final_price;
        customers.insert(appointment.client_id);

        let barber = appointment
            .barber_id
            .and_then(|id| staff_by_id.get(&id).copied());
        let commission = match barber {
            Some(user) => {
                let commission = appointment_commission(appointment, user.commission_rate());
                let row = per_staff
                    .entry(user.id)
                    .or_insert_with(|| StaffBreakdown::new(user));
                row.appointments += 1;
                row.service_revenue += final_price;
                row.commission_base += appointment
                    .original_price()
                    .unwrap_or(final_price);
                row.service_commission += commission;
                row.total_commission += commission;
                commission
            }
            None => Money::zero(),
        };
        commission_paid += commission;

        // Proportional split by list price.
        let parts: Vec<(i64, String, Money)> = if detail.packages.is_empty() {
            vec![(
                appointment.package_id,
                format!("Package #{}", appointment.package_id),
                final_price,
            )]
        } else {
            detail
                .packages
                .iter()
                .map(|p| (p.package_id, p.name_snapshot.clone(), p.price()))
                .collect()
        };
        let weights: Vec<Money> = parts.iter().map(|(_, _, w)| *w).collect();
        let revenue_shares = final_price.allocate(&weights);
        let commission_shares = commission.allocate(&weights);

        for (((package_id, name, _), revenue), commission) in parts
            .into_iter()
            .zip(revenue_shares)
            .zip(commission_shares)
        {
            let row = per_service
                .entry(package_id)
                .or_insert_with(|| ServiceBreakdown {
                    package_id,
                    name,
                    bookings: 0,
                    revenue: Money::zero(),
                    commission: Money::zero(),
                });
            row.bookings += 1;
            row.revenue += revenue;
            row.commission += commission;
        }

        let day = per_day
            .entry(appointment.report_date().date_naive())
            .or_insert_with_key(|d| DayBreakdown::new(*d));
        day.appointments += 1;
        day.service_revenue += final_price;
        day.total_revenue += final_price;
    }

    // ---- Products ---------------------------------------------------------
    for sale in data
        .product_sales
        .iter()
        .filter(|s| range.contains(s.created_at))
    {
        let total = sale.total_price();
        let commission = sale.commission_amount();
        product_revenue += total;
        commission_paid += commission;

        if let Some(user) = staff_by_id.get(&sale.staff_id) {
            let row = per_staff
                .entry(user.id)
                .or_insert_with(|| StaffBreakdown::new(user));
            row.product_sales += 1;
            row.product_revenue += total;
            row.product_commission += commission;
            row.total_commission += commission;
        }

        let row = per_product
            .entry(sale.product_id)
            .or_insert_with(|| ProductBreakdown {
                product_id: sale.product_id,
                name: product_names
                    .get(&sale.product_id)
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| format!("Product #{}", sale.product_id)),
                quantity: 0,
                revenue: Money::zero(),
                commission: Money::zero(),
            });
        row.quantity += sale.quantity;
        row.revenue += total;
        row.commission += commission;

        let day = per_day
            .entry(sale.created_at.date_naive())
            .or_insert_with_key(|d| DayBreakdown::new(*d));
        day.product_revenue += total;
        day.total_revenue += total;
    }

    // ---- Expenses ---------------------------------------------------------
    let total_expenses: Money = data
        .expenses
        .iter()
        .filter(|e| range.contains(e.incurred_at))
        .map(|e| e.amount())
        .sum();

    let total_revenue = service_revenue + product_revenue;

    let mut per_service: Vec<ServiceBreakdown> = per_service.into_values().collect();
    per_service.sort_by(|a, b| b.revenue.cmp(&a.revenue).then(a.package_id.cmp(&b.package_id)));
    let mut per_product: Vec<ProductBreakdown> = per_product.into_values().collect();
    per_product.sort_by(|a, b| b.revenue.cmp(&a.revenue).then(a.product_id.cmp(&b.product_id)));

    FinancialOverview {
        total_revenue,
        service_revenue,
        product_revenue,
        total_commission_paid: commission_paid,
        total_expenses,
        net_profit: total_revenue - commission_paid - total_expenses,
        total_customers: customers.len() as u32,
        completed_appointments: completed,
        per_staff: per_staff.into_values().collect(),
        per_service,
        per_product,
        per_day: per_day.into_values().collect(),
    }
}

/// Staff rows visible to `actor`: all of them for a Boss, only their own row
/// for a Staff member.
pub fn staff_report(overview: FinancialOverview, actor: &Actor) -> Vec<StaffBreakdown> {
    if actor.role.is_boss() {
        return overview.per_staff;
    }
    overview
        .per_staff
        .into_iter()
        .filter(|row| row.staff_id == actor.user_id)
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AppointmentPackage;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap()
    }

    fn staff(id: i64, rate_bps: i64) -> User {
        User {
            id,
            name: format!("Staff {}", id),
            role: Role::Staff,
            commission_rate_bps: rate_bps,
            product_commission_rate_bps: 500,
            is_active: true,
            created_at: ts(2024, 1, 1),
        }
    }

    fn appointment(
        id: i64,
        barber: Option<i64>,
        original: i64,
        final_price: i64,
        date: Option<DateTime<Utc>>,
        created: DateTime<Utc>,
    ) -> AppointmentDetail {
        AppointmentDetail {
            appointment: Appointment {
                id,
                client_id: id * 10,
                package_id: 1,
                barber_id: barber,
                status: AppointmentStatus::Completed,
                original_price_cents: Some(original),
                discount_code_id: None,
                discount_amount_cents: Some(original - final_price),
                final_price_cents: Some(final_price),
                appointment_date: date,
                notes: None,
                settled_at: None,
                created_at: created,
                updated_at: created,
            },
            packages: vec![
                AppointmentPackage {
                    appointment_id: id,
                    position: 0,
                    package_id: 1,
                    name_snapshot: "Haircut".to_string(),
                    price_cents: 5000,
                    is_base: true,
                },
                AppointmentPackage {
                    appointment_id: id,
                    position: 1,
                    package_id: 2,
                    name_snapshot: "Beard Trim".to_string(),
                    price_cents: 3000,
                    is_base: false,
                },
            ],
            discounts: vec![],
        }
    }

    fn march() -> DateRange {
        DateRange::from_dates(
            NaiveDate::from_ymd_opt(2024, 3, 1),
            NaiveDate::from_ymd_opt(2024, 3, 31),
        )
        .unwrap()
    }

    #[test]
    fn test_commission_on_original_price() {
        let data = ReportData {
            appointments: vec![appointment(1, Some(7), 8000, 6400, Some(ts(2024, 3, 5)), ts(2024, 3, 1))],
            staff: vec![staff(7, 4000)],
            ..Default::default()
        };

        let overview = financial_overview(&data, &march());
        let row = &overview.per_staff[0];
        assert_eq!(row.service_commission, Money::from_cents(3200));
        assert_eq!(row.service_revenue, Money::from_cents(6400));
        assert_eq!(overview.total_commission_paid, Money::from_cents(3200));
        assert_eq!(overview.net_profit, Money::from_cents(3200));
    }

    #[test]
    fn test_commission_falls_back_to_final_price() {
        let mut detail = appointment(1, Some(7), 8000, 6400, None, ts(2024, 3, 2));
        detail.appointment.original_price_cents = None;
        let commission = appointment_commission(&detail.appointment, Percent::from_bps(4000));
        assert_eq!(commission, Money::from_cents(2560));
    }

    #[test]
    fn test_service_split_is_proportional() {
        let data = ReportData {
            appointments: vec![appointment(1, Some(7), 8000, 6400, Some(ts(2024, 3, 5)), ts(2024, 3, 1))],
            staff: vec![staff(7, 4000)],
            ..Default::default()
        };

        let overview = financial_overview(&data, &march());
        let haircut = overview.per_service.iter().find(|s| s.package_id == 1).unwrap();
        let beard = overview.per_service.iter().find(|s| s.package_id == 2).unwrap();
        assert_eq!(haircut.revenue, Money::from_cents(4000));
        assert_eq!(beard.revenue, Money::from_cents(2400));
        assert_eq!(haircut.commission + beard.commission, Money::from_cents(3200));
    }

    #[test]
    fn test_walk_in_uses_creation_date() {
        let data = ReportData {
            appointments: vec![
                appointment(1, None, 5000, 5000, None, ts(2024, 3, 15)),
                appointment(2, None, 5000, 5000, None, ts(2024, 4, 2)),
                appointment(3, None, 5000, 5000, Some(ts(2024, 4, 2)), ts(2024, 3, 15)),
            ],
            ..Default::default()
        };

        let overview = financial_overview(&data, &march());
        assert_eq!(overview.completed_appointments, 1);
        assert_eq!(overview.service_revenue, Money::from_cents(5000));
        assert_eq!(overview.total_customers, 1);
    }

    #[test]
    fn test_only_completed_with_final_price() {
        let mut pending = appointment(1, Some(7), 5000, 5000, Some(ts(2024, 3, 5)), ts(2024, 3, 1));
        pending.appointment.status = AppointmentStatus::Pending;
        let mut unpriced = appointment(2, Some(7), 5000, 5000, Some(ts(2024, 3, 5)), ts(2024, 3, 1));
        unpriced.appointment.final_price_cents = None;

        let data = ReportData {
            appointments: vec![pending, unpriced],
            staff: vec![staff(7, 4000)],
            ..Default::default()
        };
        let overview = financial_overview(&data, &march());
        assert_eq!(overview.completed_appointments, 0);
        assert_eq!(overview.total_commission_paid, Money::zero());
    }

    #[test]
    fn test_products_and_expenses() {
        let data = ReportData {
            staff: vec![staff(7, 4000)],
            product_sales: vec![ProductSale {
                id: 1,
                product_id: 3,
                staff_id: 7,
                client_id: None,
                quantity: 2,
                unit_price_cents: 2500,
                total_price_cents: 5000,
                commission_rate_bps: 500,
                commission_amount_cents: 250,
                created_at: ts(2024, 3, 10),
            }],
            products: vec![Product {
                id: 3,
                name: "Pomade".to_string(),
                price_cents: 2500,
                is_active: true,
                created_at: ts(2024, 1, 1),
            }],
            expenses: vec![
                Expense {
                    id: 1,
                    description: "Rent".to_string(),
                    amount_cents: 1000,
                    incurred_at: ts(2024, 3, 1),
                    created_at: ts(2024, 3, 1),
                },
                Expense {
                    id: 2,
                    description: "Old rent".to_string(),
                    amount_cents: 9999,
                    incurred_at: ts(2024, 2, 1),
                    created_at: ts(2024, 2, 1),
                },
            ],
            ..Default::default()
        };

        let overview = financial_overview(&data, &march());
        assert_eq!(overview.product_revenue, Money::from_cents(5000));
        assert_eq!(overview.total_expenses, Money::from_cents(1000));
        assert_eq!(overview.total_commission_paid, Money::from_cents(250));
        assert_eq!(overview.net_profit, Money::from_cents(3750));
        assert_eq!(overview.per_product[0].name, "Pomade");
        assert_eq!(overview.per_product[0].quantity, 2);
        assert_eq!(overview.per_staff[0].product_commission, Money::from_cents(250));
        assert_eq!(overview.per_day.len(), 1);
    }

    #[test]
    fn test_staff_report_visibility() {
        let data = ReportData {
            staff: vec![staff(7, 4000), staff(8, 4000)],
            ..Default::default()
        };
        let overview = financial_overview(&data, &DateRange::all());

        let boss = Actor::new(1, Role::Boss);
        assert_eq!(staff_report(overview.clone(), &boss).len(), 2);

        let own = staff_report(overview, &Actor::new(8, Role::Staff));
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].staff_id, 8);
    }

    #[test]
    fn test_date_range_validation() {
        assert!(DateRange::from_dates(
            NaiveDate::from_ymd_opt(2024, 4, 1),
            NaiveDate::from_ymd_opt(2024, 3, 1),
        )
        .is_err());
        assert!(DateRange::all().contains(ts(1999, 1, 1)));
    }
}
