//! # Database Connection Pool
//!
//! SQLite connection pool management and repository access.
//!
//! ## Connection Pool Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Connection Pool                                      │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    SqlitePool                                   │   │
//! │  │   ┌─────────┐  ┌─────────┐  ┌─────────┐  ┌─────────┐          │   │
//! │  │   │ Conn 1  │  │ Conn 2  │  │ Conn 3  │  │ Conn N  │          │   │
//! │  │   └─────────┘  └─────────┘  └─────────┘  └─────────┘          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  Request 1 ──► uses Conn1 ──► returns to pool                          │
//! │  Request 2 ──► begins transaction on Conn2 ──► commit/rollback         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! SQLite WAL (Write-Ahead Logging) mode is enabled so report reads do not
//! block appointment writes.
//!
//! ## In-Memory Databases
//! An in-memory database lives as long as its single connection. The pool
//! for [`DbConfig::in_memory`] therefore holds exactly one connection that
//! never idles out, and every query inside a transaction must run on that
//! transaction.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::appointment::AppointmentManager;
use crate::repository::discount::DiscountCodeRepository;
use crate::repository::expense::ExpenseRepository;
use crate::repository::package::PackageRepository;
use crate::repository::product::{ProductRepository, ProductSaleRepository};
use crate::repository::report::ReportRepository;
use crate::repository::user::{ClientRepository, UserRepository};

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Pool settings for a shop database.
///
/// ```rust,ignore
/// let config = DbConfig::new("./chairside.db").max_connections(8);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, created on first open.
    pub database_path: PathBuf,
    /// Pool ceiling (5).
    pub max_connections: u32,
    /// Connections kept open while idle (1).
    pub min_connections: u32,
    /// How long `acquire` waits for a free connection (30s).
    pub connect_timeout: Duration,
    /// Idle connections close after this long (10 min). `None` keeps them.
    pub idle_timeout: Option<Duration>,
    /// How long a writer waits for SQLite's write lock before failing (5s).
    pub busy_timeout: Duration,
    /// Apply embedded migrations in [`Database::new`] (true).
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Off for tools that manage the schema themselves.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// A private, migrated database that disappears with the pool.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let db = Database::new(DbConfig::in_memory()).await?;
    /// // Isolated, migrated, gone when dropped
    /// ```
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(MEMORY_PATH),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: None,
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_PATH
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// Cheap to clone: every repository holds a clone of the same pool.
///
/// ## Usage in Handlers
/// ```rust,ignore
/// async fn get_appointment(
///     State(state): State<AppState>,
///     Path(id): Path<String>,
/// ) -> Result<Json<AppointmentResponse>, ApiError> {
///     let detail = state.db.appointments().get_detail(parse_id("id", &id)?).await?;
///     Ok(Json(detail.into()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and, unless disabled, migrates the schema.
    ///
    /// Every connection runs in WAL mode with `synchronous = NORMAL` and
    /// foreign keys enforced, so `ON DELETE CASCADE` on snapshots and usages
    /// takes effect.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let connect_url = if config.is_in_memory() {
            "sqlite::memory:".to_string()
        } else {
            // sqlite://path creates file if not exists
            format!("sqlite://{}?mode=rwc", config.database_path.display())
        };

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // SQLite has foreign keys disabled by default
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout)
            .create_if_missing(true);

        debug!("Connection options configured");

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout);
        if config.is_in_memory() {
            pool_options = pool_options.max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database { pool };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Runs database migrations.
    ///
    /// Idempotent: applied migrations are tracked in `_sqlx_migrations`.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn packages(&self) -> PackageRepository {
        PackageRepository::new(self.pool.clone())
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    pub fn clients(&self) -> ClientRepository {
        ClientRepository::new(self.pool.clone())
    }

    /// Returns the discount code registry.
    pub fn discount_codes(&self) -> DiscountCodeRepository {
        DiscountCodeRepository::new(self.pool.clone())
    }

    /// Returns the appointment lifecycle manager.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let detail = db.appointments().create(input).await?;
    /// ```
    pub fn appointments(&self) -> AppointmentManager {
        AppointmentManager::new(self.pool.clone())
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn product_sales(&self) -> ProductSaleRepository {
        ProductSaleRepository::new(self.pool.clone())
    }

    pub fn expenses(&self) -> ExpenseRepository {
        ExpenseRepository::new(self.pool.clone())
    }

    /// Returns the report loader.
    pub fn reports(&self) -> ReportRepository {
        ReportRepository::new(self.pool.clone())
    }

    /// Waits for checked-out connections, then closes the pool.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// `SELECT 1` round trip, used by `GET /health`.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Write Transactions
// =============================================================================

/// Opens a transaction that holds SQLite's write lock from the start.
///
/// A deferred `BEGIN` that reads and then writes cannot wait for a
/// concurrent writer: the upgrade fails at once with "database is locked".
/// `BEGIN IMMEDIATE` queues on the busy timeout instead, so racing bookings
/// run one after another and see each other's rows.
pub(crate) async fn begin_write(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert!(db.health_check().await);
        let (total, applied) = migrations::migration_status(db.pool()).await.unwrap();
        assert_eq!(total, applied);
    }

    #[tokio::test]
    async fn test_config_builder() {
        let config = DbConfig::new("/tmp/chairside-test.db")
            .max_connections(10)
            .min_connections(2)
            .run_migrations(false);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert!(!config.run_migrations);
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }
}
