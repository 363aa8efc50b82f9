//! # Repository Module
//!
//! Database repository implementations for Chairside.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories & Managers                              │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │  db.appointments().create(input)                               │
//! │       ▼                                                                 │
//! │  AppointmentManager ──── one transaction ────┐                         │
//! │  ├── validates client / packages / barber    │                         │
//! │  ├── chairside_core::pricing                 │                         │
//! │  └── ledger::apply_in_tx ────────────────────┤                         │
//! │                                              ▼                         │
//! │                                        SQLite Database                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`package::PackageRepository`] - Service packages
//! - [`user::UserRepository`], [`user::ClientRepository`] - Staff and clients
//! - [`discount::DiscountCodeRepository`] - Code registry and validation preview
//! - [`discount::apply_selection`] - Usage ledger (single-use / reusable)
//! - [`appointment::AppointmentManager`] - Appointment lifecycle
//! - [`product::ProductRepository`], [`product::ProductSaleRepository`] - Retail
//! - [`expense::ExpenseRepository`] - Expenses and the monthly reset
//! - [`report::ReportRepository`] - Financial overview and staff report

pub mod appointment;
pub mod discount;
pub mod expense;
pub mod package;
pub mod product;
pub mod report;
pub mod user;

#[cfg(test)]
pub(crate) mod test_support;
