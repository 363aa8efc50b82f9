//! # Report Loader
//!
//! Reads everything the commission aggregator needs in one pass and hands
//! it to `chairside_core::report`. No arithmetic happens here.
//!
//! All reads share one transaction, so a report never mixes rows from
//! before and after a concurrent write.

use std::collections::HashMap;

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::appointment::fetch_completed;
use crate::repository::expense::fetch_expenses;
use crate::repository::product::{fetch_products, fetch_sales};
use chairside_core::report::{self, DateRange, FinancialOverview, ReportData, StaffBreakdown};
use chairside_core::{Actor, AppointmentDetail, AppointmentPackage, User};

/// Repository for financial reports.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Loads completed appointments (with package snapshots), staff,
    /// product sales, products and expenses.
    ///
    /// Range filtering happens in the aggregator; walk-ins are dated by
    /// creation time, which SQL alone cannot express over nullable dates.
    pub async fn load(&self) -> DbResult<ReportData> {
        let mut tx = self.pool.begin().await?;
        let data = load_in(&mut tx).await?;
        tx.commit().await?;

        debug!(
            appointments = data.appointments.len(),
            product_sales = data.product_sales.len(),
            expenses = data.expenses.len(),
            "Report data loaded"
        );
        Ok(data)
    }

    /// Shop-wide financials; Boss only.
    pub async fn financial_overview(
        &self,
        range: &DateRange,
        actor: &Actor,
    ) -> DbResult<FinancialOverview> {
        actor.require_boss("view the financial overview")?;
        let data = self.load().await?;
        Ok(report::financial_overview(&data, range))
    }

    /// Per-staff commission rows: every row for a Boss, the caller's own
    /// row for Staff.
    pub async fn staff_report(
        &self,
        range: &DateRange,
        actor: &Actor,
    ) -> DbResult<Vec<StaffBreakdown>> {
        actor.require_staff("view staff reports")?;
        let data = self.load().await?;
        Ok(report::staff_report(
            report::financial_overview(&data, range),
            actor,
        ))
    }
}

async fn load_in(conn: &mut SqliteConnection) -> DbResult<ReportData> {
    let mut snapshots = fetch_completed_snapshots(conn).await?;
    let appointments = fetch_completed(conn)
        .await?
        .into_iter()
        .map(|appointment| AppointmentDetail {
            packages: snapshots.remove(&appointment.id).unwrap_or_default(),
            discounts: Vec::new(),
            appointment,
        })
        .collect::<Vec<_>>();

    Ok(ReportData {
        appointments,
        staff: fetch_staff(conn).await?,
        product_sales: fetch_sales(conn).await?,
        products: fetch_products(conn).await?,
        expenses: fetch_expenses(conn).await?,
    })
}

async fn fetch_staff(conn: &mut SqliteConnection) -> DbResult<Vec<User>> {
    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, role, commission_rate_bps, product_commission_rate_bps, is_active, created_at
        FROM users
        WHERE role IN ('boss', 'staff')
        ORDER BY id
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(users)
}

/// Package snapshots of every completed appointment, grouped by appointment.
async fn fetch_completed_snapshots(
    conn: &mut SqliteConnection,
) -> DbResult<HashMap<i64, Vec<AppointmentPackage>>> {
    let rows = sqlx::query_as::<_, AppointmentPackage>(
        r#"
        SELECT ap.appointment_id, ap.position, ap.package_id, ap.name_snapshot,
               ap.price_cents, ap.is_base
        FROM appointment_packages ap
        JOIN appointments a ON a.id = ap.appointment_id
        WHERE a.status = 'completed'
        ORDER BY ap.appointment_id, ap.position
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut grouped: HashMap<i64, Vec<AppointmentPackage>> = HashMap::new();
    for row in rows {
        grouped.entry(row.appointment_id).or_default().push(row);
    }
    Ok(grouped)
}
