//! # User & Client Repositories
//!
//! Staff accounts (with their commission rates) and the clients appointments
//! are booked for.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use chairside_core::validation::{validate_commission_rate, validate_text};
use chairside_core::{
    Client, Percent, Role, User, DEFAULT_COMMISSION_BPS, DEFAULT_PRODUCT_COMMISSION_BPS,
};

const USER_COLUMNS: &str = "id, name, role, commission_rate_bps, product_commission_rate_bps, is_active, created_at";

// =============================================================================
// Users
// =============================================================================

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        find_user(&mut conn, id).await
    }

    /// Every Boss and Staff account, active or not, so historical
    /// commission can still be attributed.
    pub async fn list_staff(&self) -> DbResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE role IN ('boss', 'staff') ORDER BY id",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Creates a user. Rates default to 40% (services) and 5% (products).
    pub async fn create(
        &self,
        name: &str,
        role: Role,
        commission_rate: Option<Percent>,
        product_commission_rate: Option<Percent>,
    ) -> DbResult<User> {
        let name = validate_text("name", name, 120)?;
        let commission_rate_bps = match commission_rate {
            Some(rate) => {
                validate_commission_rate("commissionRate", rate)?;
                rate.bps() as i64
            }
            None => DEFAULT_COMMISSION_BPS,
        };
        let product_commission_rate_bps = match product_commission_rate {
            Some(rate) => {
                validate_commission_rate("productCommissionRate", rate)?;
                rate.bps() as i64
            }
            None => DEFAULT_PRODUCT_COMMISSION_BPS,
        };

        let now = Utc::now();
        debug!(name = %name, role = %role, "Creating user");

        let result = sqlx::query(
            r#"
            INSERT INTO users (
                name, role, commission_rate_bps, product_commission_rate_bps,
                is_active, created_at
            ) VALUES (?1, ?2, ?3, ?4, 1, ?5)
            "#,
        )
        .bind(&name)
        .bind(role)
        .bind(commission_rate_bps)
        .bind(product_commission_rate_bps)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(User {
            id: result.last_insert_rowid(),
            name,
            role,
            commission_rate_bps,
            product_commission_rate_bps,
            is_active: true,
            created_at: now,
        })
    }

    /// Deactivated staff can no longer be assigned as barber or sell.
    pub async fn set_active(&self, id: i64, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE users SET is_active = ?2 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(crate::error::DbError::not_found("User", id));
        }
        Ok(())
    }
}

// =============================================================================
// Clients
// =============================================================================

/// Repository for client database operations.
#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
}

impl ClientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ClientRepository { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Client>> {
        let mut conn = self.pool.acquire().await?;
        find_client(&mut conn, id).await
    }

    pub async fn create(&self, name: &str, phone: Option<&str>) -> DbResult<Client> {
        let name = validate_text("name", name, 120)?;
        let phone = phone.map(str::trim).filter(|p| !p.is_empty()).map(String::from);
        let now = Utc::now();

        let result = sqlx::query("INSERT INTO clients (name, phone, created_at) VALUES (?1, ?2, ?3)")
            .bind(&name)
            .bind(&phone)
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(Client {
            id: result.last_insert_rowid(),
            name,
            phone,
            created_at: now,
        })
    }
}

// =============================================================================
// Connection-Scoped Queries
// =============================================================================

pub(crate) async fn find_user(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE id = ?1",
        USER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(user)
}

pub(crate) async fn find_client(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Client>> {
    let client = sqlx::query_as::<_, Client>(
        "SELECT id, name, phone, created_at FROM clients WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::setup;

    #[tokio::test]
    async fn test_default_commission_rates() {
        let db = setup().await;
        let staff = db.users().create("Amir", Role::Staff, None, None).await.unwrap();

        let fetched = db.users().get_by_id(staff.id).await.unwrap().unwrap();
        assert_eq!(fetched.role, Role::Staff);
        assert_eq!(fetched.commission_rate().bps(), 4000);
        assert_eq!(fetched.product_commission_rate().bps(), 500);
    }

    #[tokio::test]
    async fn test_list_staff_excludes_clients() {
        let db = setup().await;
        let users = db.users();
        users.create("Boss", Role::Boss, None, None).await.unwrap();
        users
            .create("Amir", Role::Staff, Some(Percent::from_percentage(35.0)), None)
            .await
            .unwrap();
        users.create("Walk In", Role::Client, None, None).await.unwrap();

        let staff = users.list_staff().await.unwrap();
        assert_eq!(staff.len(), 2);
        assert_eq!(staff[1].commission_rate().bps(), 3500);
    }

    #[tokio::test]
    async fn test_rejects_commission_above_hundred() {
        let db = setup().await;
        let result = db
            .users()
            .create("Greedy", Role::Staff, Some(Percent::from_bps(10_001)), None)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_client_phone_is_trimmed() {
        let db = setup().await;
        let client = db.clients().create("Farah", Some("  ")).await.unwrap();
        assert_eq!(client.phone, None);
        assert!(db.clients().get_by_id(client.id).await.unwrap().is_some());
    }
}
