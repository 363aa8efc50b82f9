//! # Expense Repository & Monthly Reset
//!
//! Shop expenses, and the month-end close that settles completed
//! appointments and clears expenses before a cutoff.
//!
//! ## Monthly Reset
//! ```text
//! BEGIN
//! ├── SELECT completed, unsettled appointments
//! │     └── keep those whose report date < cutoff
//! ├── UPDATE appointments SET settled_at = now   (kept ids)
//! ├── SELECT expenses, keep those incurred < cutoff
//! └── DELETE FROM expenses                       (kept ids)
//! COMMIT
//! ```
//! Dates are compared in Rust, never as SQLite text. A walk-in has no
//! scheduled date and is dated by its creation time.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::info;

use crate::error::DbResult;
use crate::pool::begin_write;
use crate::repository::appointment::fetch_completed;
use chairside_core::validation::{validate_positive_amount, validate_text};
use chairside_core::{Expense, Money};

const EXPENSE_COLUMNS: &str = "id, description, amount_cents, incurred_at, created_at";

/// Outcome of a monthly reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyResetSummary {
    pub settled_appointments: u64,
    pub deleted_expenses: u64,
}

/// Repository for expenses.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    /// Records an expense. `incurred_at` defaults to now.
    pub async fn create(
        &self,
        description: &str,
        amount: Money,
        incurred_at: Option<DateTime<Utc>>,
    ) -> DbResult<Expense> {
        let description = validate_text("description", description, 500)?;
        validate_positive_amount("amount", amount)?;

        let now = Utc::now();
        let incurred_at = incurred_at.unwrap_or(now);

        let result = sqlx::query(
            r#"
            INSERT INTO expenses (description, amount_cents, incurred_at, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&description)
        .bind(amount.cents())
        .bind(incurred_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        info!(amount_cents = amount.cents(), "Expense recorded");

        Ok(Expense {
            id: result.last_insert_rowid(),
            description,
            amount_cents: amount.cents(),
            incurred_at,
            created_at: now,
        })
    }

    pub async fn list_all(&self) -> DbResult<Vec<Expense>> {
        let mut conn = self.pool.acquire().await?;
        fetch_expenses(&mut conn).await
    }

    /// Settles completed appointments and deletes expenses dated before
    /// `cutoff`, atomically.
    pub async fn monthly_reset(&self, cutoff: DateTime<Utc>) -> DbResult<MonthlyResetSummary> {
        let mut tx = begin_write(&self.pool).await?;
        let now = Utc::now();

        let to_settle: Vec<i64> = fetch_completed(&mut tx)
            .await?
            .into_iter()
            .filter(|a| a.settled_at.is_none() && a.report_date() < cutoff)
            .map(|a| a.id)
            .collect();

        let settled_appointments = if to_settle.is_empty() {
            0
        } else {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("UPDATE appointments SET settled_at = ");
            builder.push_bind(now);
            builder.push(" WHERE id IN (");
            let mut separated = builder.separated(", ");
            for id in &to_settle {
                separated.push_bind(*id);
            }
            separated.push_unseparated(")");
            builder.build().execute(&mut *tx).await?.rows_affected()
        };

        let to_delete: Vec<i64> = fetch_expenses(&mut tx)
            .await?
            .into_iter()
            .filter(|e| e.incurred_at < cutoff)
            .map(|e| e.id)
            .collect();
        let deleted_expenses = if to_delete.is_empty() {
            0
        } else {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("DELETE FROM expenses WHERE id IN (");
            let mut separated = builder.separated(", ");
            for id in &to_delete {
                separated.push_bind(*id);
            }
            separated.push_unseparated(")");
            builder.build().execute(&mut *tx).await?.rows_affected()
        };

        tx.commit().await?;

        info!(
            cutoff = %cutoff,
            settled_appointments,
            deleted_expenses,
            "Monthly reset complete"
        );

        Ok(MonthlyResetSummary {
            settled_appointments,
            deleted_expenses,
        })
    }
}

pub(crate) async fn fetch_expenses(conn: &mut SqliteConnection) -> DbResult<Vec<Expense>> {
    let expenses = sqlx::query_as::<_, Expense>(&format!(
        "SELECT {} FROM expenses ORDER BY incurred_at, id",
        EXPENSE_COLUMNS
    ))
    .fetch_all(&mut *conn)
    .await?;

    Ok(expenses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::appointment::{CreateAppointmentInput, UpdateAppointmentInput};
    use crate::repository::test_support::Shop;
    use chairside_core::{Actor, AppointmentStatus, Role};
    use chrono::{Duration, TimeZone};

    #[tokio::test]
    async fn test_create_defaults_incurred_at() {
        let shop = Shop::open().await;
        let expense = shop
            .db
            .expenses()
            .create("Clippers", Money::from_cents(25_000), None)
            .await
            .unwrap();

        assert_eq!(expense.incurred_at, expense.created_at);
        assert!(shop
            .db
            .expenses()
            .create("Nothing", Money::zero(), None)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_monthly_reset_settles_and_clears() {
        let shop = Shop::open().await;
        let manager = shop.db.appointments();
        let boss = Actor::new(shop.boss.id, Role::Boss);
        let complete = || UpdateAppointmentInput {
            status: Some(AppointmentStatus::Completed),
            ..Default::default()
        };

        let march = Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap();
        let cutoff = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();

        // Completed in March: settled.
        let old = manager
            .create(CreateAppointmentInput {
                appointment_date: Some(march),
                ..CreateAppointmentInput::new(shop.client_id, shop.haircut.id)
            })
            .await
            .unwrap();
        manager.update(old.appointment.id, complete(), &boss).await.unwrap();

        // Completed walk-in, created today: after the cutoff.
        let walk_in = manager
            .create(CreateAppointmentInput::new(shop.client_id, shop.haircut.id))
            .await
            .unwrap();
        manager.update(walk_in.appointment.id, complete(), &boss).await.unwrap();

        // Still pending: never settled.
        manager
            .create(CreateAppointmentInput {
                appointment_date: Some(march),
                ..CreateAppointmentInput::new(shop.client_id, shop.beard.id)
            })
            .await
            .unwrap();

        let expenses = shop.db.expenses();
        expenses
            .create("March rent", Money::from_cents(150_000), Some(march))
            .await
            .unwrap();
        expenses
            .create("April towels", Money::from_cents(4_000), Some(cutoff + Duration::days(2)))
            .await
            .unwrap();

        let summary = expenses.monthly_reset(cutoff).await.unwrap();
        assert_eq!(
            summary,
            MonthlyResetSummary {
                settled_appointments: 1,
                deleted_expenses: 1
            }
        );

        let settled = manager.get_detail(old.appointment.id).await.unwrap();
        assert!(settled.appointment.settled_at.is_some());
        let open = manager.get_detail(walk_in.appointment.id).await.unwrap();
        assert!(open.appointment.settled_at.is_none());
        assert_eq!(expenses.list_all().await.unwrap().len(), 1);

        // Running it again finds nothing left to do.
        let again = expenses.monthly_reset(cutoff).await.unwrap();
        assert_eq!(again.settled_appointments, 0);
        assert_eq!(again.deleted_expenses, 0);
    }
}
