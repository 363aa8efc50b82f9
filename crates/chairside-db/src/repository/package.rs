//! # Package Repository
//!
//! Service packages that appointments are priced from.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use chairside_core::validation::{validate_positive_amount, validate_text};
use chairside_core::{Money, Package};

const PACKAGE_COLUMNS: &str =
    "id, name, price_cents, duration_minutes, is_active, created_at";

/// Repository for package database operations.
#[derive(Debug, Clone)]
pub struct PackageRepository {
    pool: SqlitePool,
}

impl PackageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PackageRepository { pool }
    }

    /// Gets a package by ID, active or not.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Package>> {
        let mut conn = self.pool.acquire().await?;
        find_by_id(&mut conn, id).await
    }

    /// Lists active packages by name.
    pub async fn list_active(&self) -> DbResult<Vec<Package>> {
        let packages = sqlx::query_as::<_, Package>(&format!(
            "SELECT {} FROM packages WHERE is_active = 1 ORDER BY name",
            PACKAGE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(packages)
    }

    /// Creates a package.
    pub async fn create(&self, name: &str, price: Money, duration_minutes: i64) -> DbResult<Package> {
        let name = validate_text("name", name, 120)?;
        validate_positive_amount("price", price)?;

        let now = Utc::now();
        debug!(name = %name, price_cents = price.cents(), "Creating package");

        let result = sqlx::query(
            r#"
            INSERT INTO packages (name, price_cents, duration_minutes, is_active, created_at)
            VALUES (?1, ?2, ?3, 1, ?4)
            "#,
        )
        .bind(&name)
        .bind(price.cents())
        .bind(duration_minutes)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Package {
            id: result.last_insert_rowid(),
            name,
            price_cents: price.cents(),
            duration_minutes,
            is_active: true,
            created_at: now,
        })
    }

    /// Activates or retires a package. Past appointments keep their snapshot.
    pub async fn set_active(&self, id: i64, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE packages SET is_active = ?2 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Package", id));
        }
        Ok(())
    }

    /// Updates the list price. Existing appointments are unaffected.
    pub async fn update_price(&self, id: i64, price: Money) -> DbResult<()> {
        validate_positive_amount("price", price)?;

        let result = sqlx::query("UPDATE packages SET price_cents = ?2 WHERE id = ?1")
            .bind(id)
            .bind(price.cents())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Package", id));
        }
        Ok(())
    }
}

// =============================================================================
// Connection-Scoped Queries
// =============================================================================
// Used inside the appointment manager's transaction.

pub(crate) async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Package>> {
    let package = sqlx::query_as::<_, Package>(&format!(
        "SELECT {} FROM packages WHERE id = ?1",
        PACKAGE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(package)
}

/// Fetches every package in `ids`. Missing ids are simply absent.
pub(crate) async fn find_many(conn: &mut SqliteConnection, ids: &[i64]) -> DbResult<Vec<Package>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT {} FROM packages WHERE id IN (",
        PACKAGE_COLUMNS
    ));
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let packages = builder
        .build_query_as::<Package>()
        .fetch_all(&mut *conn)
        .await?;

    Ok(packages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::setup;

    #[tokio::test]
    async fn test_create_and_fetch_many() {
        let db = setup().await;
        let repo = db.packages();

        let haircut = repo.create("Haircut", Money::from_cents(5000), 45).await.unwrap();
        let beard = repo.create("Beard Trim", Money::from_cents(3000), 20).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let found = find_many(&mut conn, &[haircut.id, beard.id, 999]).await.unwrap();
        assert_eq!(found.len(), 2);

        let fetched = repo.get_by_id(beard.id).await.unwrap().unwrap();
        assert_eq!(fetched.price(), Money::from_cents(3000));
    }

    #[tokio::test]
    async fn test_retired_packages_hidden_from_listing() {
        let db = setup().await;
        let repo = db.packages();

        let package = repo.create("Hot Towel", Money::from_cents(1500), 15).await.unwrap();
        repo.set_active(package.id, false).await.unwrap();

        assert!(repo.list_active().await.unwrap().is_empty());
        assert!(!repo.get_by_id(package.id).await.unwrap().unwrap().is_active);
        assert!(matches!(
            repo.set_active(404, true).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_rejects_zero_price() {
        let db = setup().await;
        let result = db.packages().create("Free", Money::zero(), 10).await;
        assert!(matches!(result, Err(DbError::Domain(_))));
    }
}
