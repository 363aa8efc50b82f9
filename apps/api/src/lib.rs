//! # Chairside API
//!
//! REST server for appointments, discounts and financial reports.
//!
//! ## Routes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Chairside API Routes                            │
//! │                                                                         │
//! │  Public                                                                 │
//! │  ├── GET    /health                                                     │
//! │  ├── POST   /appointments              book (status = pending)          │
//! │  └── POST   /discounts/validate        check a code, consume nothing    │
//! │                                                                         │
//! │  Bearer token                                                           │
//! │  ├── GET    /appointments/:id          Boss/Staff                       │
//! │  ├── PUT    /appointments/:id          status, barber, discounts        │
//! │  ├── PATCH  /appointments/:id          full edit, Boss/Staff            │
//! │  ├── DELETE /appointments/:id          Boss                             │
//! │  ├── POST   /product-sales             Boss/Staff                       │
//! │  ├── POST   /expenses                  Boss                             │
//! │  ├── GET    /financial/overview        Boss                             │
//! │  ├── GET    /financial/staff-report    Boss (all) / Staff (own row)     │
//! │  └── POST   /financial/monthly-reset   Boss                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `CHAIRSIDE_PORT` - HTTP port (default: 8080)
//! - `CHAIRSIDE_DB_PATH` - SQLite file (default: ./chairside.db)
//! - `CHAIRSIDE_DB_MAX_CONNECTIONS` - Pool size (default: 5)
//! - `JWT_SECRET` - Secret for JWT verification
//! - `CHAIRSIDE_LOG_JSON` - JSON log output (default: false)

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod wire;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub use auth::JwtManager;
pub use config::ApiConfig;
pub use error::ApiError;

use chairside_db::Database;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtManager>,
}

impl AppState {
    pub fn new(db: Database, jwt: JwtManager) -> Self {
        AppState {
            db,
            jwt: Arc::new(jwt),
        }
    }
}

/// Builds the router with every route and the request trace layer.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/appointments", post(handlers::appointments::create))
        .route(
            "/appointments/:id",
            get(handlers::appointments::get)
                .put(handlers::appointments::update)
                .patch(handlers::appointments::edit)
                .delete(handlers::appointments::delete),
        )
        .route("/discounts/validate", post(handlers::discounts::validate))
        .route("/product-sales", post(handlers::sales::record_product_sale))
        .route("/expenses", post(handlers::sales::record_expense))
        .route("/financial/overview", get(handlers::financial::overview))
        .route("/financial/staff-report", get(handlers::financial::staff_report))
        .route("/financial/monthly-reset", post(handlers::financial::monthly_reset))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
