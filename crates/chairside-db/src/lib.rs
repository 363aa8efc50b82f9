//! # chairside-db: Database Layer for Chairside
//!
//! SQLite persistence for the barbershop backend: connection pool, embedded
//! migrations, repositories, and the two components that need transactions
//! (the discount ledger and the appointment lifecycle manager).
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Chairside Data Flow                              │
//! │                                                                         │
//! │  HTTP handler (POST /appointments)                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  chairside-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌──────────────────┐   ┌──────────────┐  │   │
//! │  │   │   Database    │   │  Repositories    │   │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │   │                  │   │  (embedded)  │  │   │
//! │  │   │               │   │ AppointmentMgr   │   │              │  │   │
//! │  │   │ SqlitePool    │◄──│ discount ledger  │   │ 001_initial  │  │   │
//! │  │   │ Transactions  │   │ ReportRepository │   │ _schema.sql  │  │   │
//! │  │   └───────────────┘   └──────────────────┘   └──────────────┘  │   │
//! │  │                                │                                │   │
//! │  │                   pricing / discount / lifecycle / report       │   │
//! │  │                        rules from chairside-core                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and repository access
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repositories, the discount ledger, the appointment
//!   manager and the report loader
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chairside_db::{CreateAppointmentInput, Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./chairside.db")).await?;
//!
//! let detail = db
//!     .appointments()
//!     .create(CreateAppointmentInput::new(client_id, haircut_id))
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::appointment::{
    AppointmentManager, CreateAppointmentInput, EditAppointmentInput, UpdateAppointmentInput,
};
pub use repository::discount::{
    DiscountCodeRepository, DiscountValidation, NewDiscountCode, PlannedDiscounts,
};
pub use repository::expense::{ExpenseRepository, MonthlyResetSummary};
pub use repository::report::ReportRepository;
