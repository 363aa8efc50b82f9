//! # Appointment Lifecycle Manager
//!
//! Creates, updates, edits and deletes appointments. Every operation is one
//! transaction: the appointment row, its package snapshot and its discount
//! ledger rows commit together or not at all.
//!
//! ## Create Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CreateAppointmentInput                                                 │
//! │       │  validate ids, package list, discount codes (no I/O)            │
//! │       ▼                                                                 │
//! │  BEGIN IMMEDIATE                                                        │
//! │  ├── client exists?                       → NotFound(Client)            │
//! │  ├── barber is an active Boss/Staff?      → NotFound / Validation       │
//! │  ├── packages resolve and are active?     → PackageNotFound / Inactive  │
//! │  ├── pricing::compute_original_price                                    │
//! │  ├── INSERT appointment (status = pending, undiscounted)                │
//! │  ├── INSERT package snapshot                                            │
//! │  ├── ledger::apply_selection              → DiscountNotFound / Used /   │
//! │  │                                          NotApplicable               │
//! │  └── UPDATE price columns                                               │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Writers take SQLite's write lock at BEGIN, so two bookings racing for the
//! same single-use code run one after the other and the second one sees the
//! first one's usage.
//!
//! ## Repricing
//! Prices are recomputed from scratch whenever packages or discounts change.
//! The discounts are re-applied against the new breakdown, replacing the old
//! ledger rows, so running the same edit twice leaves the same state. Codes
//! the appointment already holds stay valid after they are deactivated.
//! Unchanged package lists are priced from the snapshot, never from the
//! packages' current list prices.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::pool::begin_write;
use crate::repository::discount::{
    apply_selection, load_appointment_discounts, load_breakdown, remove_discount,
};
use crate::repository::user::{find_client, find_user};
use chairside_core::discount::{DiscountRequest, DiscountSelection};
use chairside_core::lifecycle::{
    barber_after_transition, check_transition, ensure_can_be_barber, BarberChange,
};
use chairside_core::pricing::{PriceBreakdown, PriceQuote, PricedPackage};
use chairside_core::validation::{validate_id, validate_package_selection};
use chairside_core::{Actor, Appointment, AppointmentDetail, AppointmentPackage, AppointmentStatus, CoreError};

const APPOINTMENT_COLUMNS: &str = r#"
    id, client_id, package_id, barber_id, status,
    original_price_cents, discount_code_id, discount_amount_cents, final_price_cents,
    appointment_date, notes, settled_at, created_at, updated_at
"#;

const MAX_NOTES_LEN: usize = 1000;

// =============================================================================
// Inputs
// =============================================================================

/// A new booking.
#[derive(Debug, Clone)]
pub struct CreateAppointmentInput {
    pub client_id: i64,
    pub package_id: i64,
    pub barber_id: Option<i64>,
    /// In the order requested.
    pub additional_packages: Vec<i64>,
    /// `None` books a walk-in.
    pub appointment_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub discount: DiscountSelection,
}

impl CreateAppointmentInput {
    /// A walk-in for one package, without barber or discount.
    pub fn new(client_id: i64, package_id: i64) -> Self {
        CreateAppointmentInput {
            client_id,
            package_id,
            barber_id: None,
            additional_packages: Vec::new(),
            appointment_date: None,
            notes: None,
            discount: DiscountSelection::None,
        }
    }
}

/// A status / barber / discount update (`PUT /appointments/:id`).
#[derive(Debug, Clone, Default)]
pub struct UpdateAppointmentInput {
    pub status: Option<AppointmentStatus>,
    pub barber: BarberChange,
    /// `Some(DiscountSelection::None)` removes every discount.
    pub discount: Option<DiscountSelection>,
}

/// A full edit (`PATCH /appointments/:id`). `None` fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct EditAppointmentInput {
    pub package_id: Option<i64>,
    pub additional_packages: Option<Vec<i64>>,
    pub appointment_date: Option<Option<DateTime<Utc>>>,
    pub notes: Option<Option<String>>,
    pub status: Option<AppointmentStatus>,
    pub barber: BarberChange,
    pub discount: Option<DiscountSelection>,
}

impl From<UpdateAppointmentInput> for EditAppointmentInput {
    fn from(update: UpdateAppointmentInput) -> Self {
        EditAppointmentInput {
            status: update.status,
            barber: update.barber,
            discount: update.discount,
            ..Default::default()
        }
    }
}

// =============================================================================
// Manager
// =============================================================================

/// Owns appointment state transitions and pricing writes.
#[derive(Debug, Clone)]
pub struct AppointmentManager {
    pool: SqlitePool,
}

impl AppointmentManager {
    pub fn new(pool: SqlitePool) -> Self {
        AppointmentManager { pool }
    }

    /// Loads an appointment with its package snapshot and discounts.
    pub async fn get_detail(&self, id: i64) -> DbResult<AppointmentDetail> {
        let mut conn = self.pool.acquire().await?;
        load_detail(&mut conn, id).await
    }

    /// Books an appointment with status `pending`.
    pub async fn create(&self, input: CreateAppointmentInput) -> DbResult<AppointmentDetail> {
        validate_id("clientId", input.client_id)?;
        validate_package_selection(input.package_id, &input.additional_packages)?;
        let selection = input.discount.normalized()?;
        let notes = normalize_notes(input.notes)?;

        let mut tx = begin_write(&self.pool).await?;

        if find_client(&mut tx, input.client_id).await?.is_none() {
            return Err(CoreError::not_found("Client", input.client_id).into());
        }
        if let Some(barber_id) = input.barber_id {
            ensure_barber(&mut tx, barber_id).await?;
        }

        let breakdown = load_breakdown(&mut tx, input.package_id, &input.additional_packages).await?;
        let original = breakdown.original_price().cents();

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO appointments (
                client_id, package_id, barber_id, status,
                original_price_cents, discount_amount_cents, final_price_cents,
                appointment_date, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?5, ?6, ?7, ?8, ?8)
            "#,
        )
        .bind(input.client_id)
        .bind(input.package_id)
        .bind(input.barber_id)
        .bind(AppointmentStatus::Pending)
        .bind(original)
        .bind(input.appointment_date)
        .bind(&notes)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        let id = result.last_insert_rowid();

        insert_snapshot(&mut tx, id, &breakdown).await?;

        let plan = apply_selection(&mut tx, selection, input.client_id, id, &breakdown).await?;
        let quote = plan.quote(breakdown.original_price());
        if !plan.discounts.is_empty() {
            write_price(&mut tx, id, &CurrentPrice::quoted(&quote, plan.legacy_code_id())).await?;
        }

        let detail = load_detail(&mut tx, id).await?;
        tx.commit().await?;

        info!(
            appointment_id = id,
            client_id = input.client_id,
            original_cents = quote.original_price.cents(),
            discount_cents = quote.discount_amount.cents(),
            final_cents = quote.final_price.cents(),
            "Appointment created"
        );
        Ok(detail)
    }

    /// Changes status, barber and/or discounts.
    ///
    /// Completing an appointment that has no barber assigns the acting user.
    pub async fn update(
        &self,
        id: i64,
        input: UpdateAppointmentInput,
        actor: &Actor,
    ) -> DbResult<AppointmentDetail> {
        self.apply(id, input.into(), actor).await
    }

    /// Full edit; Boss or Staff only.
    pub async fn edit(
        &self,
        id: i64,
        input: EditAppointmentInput,
        actor: &Actor,
    ) -> DbResult<AppointmentDetail> {
        actor.require_staff("edit appointments")?;
        self.apply(id, input, actor).await
    }

    /// Deletes an appointment and its ledger rows; Boss only.
    pub async fn delete(&self, id: i64, actor: &Actor) -> DbResult<()> {
        actor.require_boss("delete appointments")?;

        let mut tx = begin_write(&self.pool).await?;
        if fetch_appointment(&mut tx, id).await?.is_none() {
            return Err(CoreError::not_found("Appointment", id).into());
        }

        remove_discount(&mut tx, id).await?;
        sqlx::query("DELETE FROM appointment_packages WHERE appointment_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM appointments WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(appointment_id = id, actor_id = actor.user_id, "Appointment deleted");
        Ok(())
    }

    async fn apply(
        &self,
        id: i64,
        changes: EditAppointmentInput,
        actor: &Actor,
    ) -> DbResult<AppointmentDetail> {
        if let Some(package_id) = changes.package_id {
            validate_id("packageId", package_id)?;
        }
        let discount = changes.discount.map(DiscountSelection::normalized).transpose()?;
        let notes = match changes.notes {
            Some(notes) => Some(normalize_notes(notes)?),
            None => None,
        };

        let mut tx = begin_write(&self.pool).await?;

        let current = fetch_appointment(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::not_found("Appointment", id))?;
        let snapshot = fetch_snapshot(&mut tx, id).await?;

        // ---- Status -------------------------------------------------------
        let (status, status_changed) = match changes.status {
            Some(to) => {
                actor.require_staff("change appointment status")?;
                (to, check_transition(current.status, to)?)
            }
            None => (current.status, false),
        };

        // ---- Barber -------------------------------------------------------
        changes.barber.authorize(actor)?;
        let barber_id = match changes.barber {
            BarberChange::Keep => current.barber_id,
            BarberChange::Unassign => None,
            BarberChange::Assign(user_id) => {
                ensure_barber(&mut tx, user_id).await?;
                Some(user_id)
            }
        };
        let barber_id = barber_after_transition(barber_id, status, status_changed, actor);

        // ---- Pricing ------------------------------------------------------
        let current_additional: Vec<i64> = snapshot
            .iter()
            .filter(|p| !p.is_base)
            .map(|p| p.package_id)
            .collect();
        let package_id = changes.package_id.unwrap_or(current.package_id);
        let additional = changes
            .additional_packages
            .unwrap_or_else(|| current_additional.clone());
        let packages_changed = package_id != current.package_id || additional != current_additional;

        let mut price = CurrentPrice::of(&current);
        if packages_changed || discount.is_some() {
            if discount.is_some() {
                actor.require_staff("change discounts")?;
            }

            let from_snapshot = if packages_changed {
                None
            } else {
                breakdown_from_snapshot(&snapshot)
            };
            let rebuild_snapshot = from_snapshot.is_none();
            let breakdown = match from_snapshot {
                Some(breakdown) => breakdown,
                None => load_breakdown(&mut tx, package_id, &additional).await?,
            };

            let selection = match discount {
                Some(selection) => selection,
                None => existing_selection(&mut tx, &current, packages_changed).await?,
            };

            let plan =
                apply_selection(&mut tx, selection, current.client_id, id, &breakdown).await?;

            if rebuild_snapshot {
                sqlx::query("DELETE FROM appointment_packages WHERE appointment_id = ?1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                insert_snapshot(&mut tx, id, &breakdown).await?;
            }

            let quote = plan.quote(breakdown.original_price());
            debug!(
                appointment_id = id,
                original_cents = quote.original_price.cents(),
                discount_cents = quote.discount_amount.cents(),
                "Appointment repriced"
            );
            price = CurrentPrice::quoted(&quote, plan.legacy_code_id());
        }

        sqlx::query(
            r#"
            UPDATE appointments SET
                package_id = ?2,
                barber_id = ?3,
                status = ?4,
                original_price_cents = ?5,
                discount_code_id = ?6,
                discount_amount_cents = ?7,
                final_price_cents = ?8,
                appointment_date = ?9,
                notes = ?10,
                updated_at = ?11
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(package_id)
        .bind(barber_id)
        .bind(status)
        .bind(price.original_price_cents)
        .bind(price.discount_code_id)
        .bind(price.discount_amount_cents)
        .bind(price.final_price_cents)
        .bind(changes.appointment_date.unwrap_or(current.appointment_date))
        .bind(notes.unwrap_or(current.notes))
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let detail = load_detail(&mut tx, id).await?;
        tx.commit().await?;

        info!(
            appointment_id = id,
            actor_id = actor.user_id,
            status = %status,
            barber_id = ?barber_id,
            "Appointment updated"
        );
        Ok(detail)
    }
}

/// The price columns of an appointment row.
struct CurrentPrice {
    original_price_cents: Option<i64>,
    discount_code_id: Option<i64>,
    discount_amount_cents: Option<i64>,
    final_price_cents: Option<i64>,
}

impl CurrentPrice {
    fn quoted(quote: &PriceQuote, discount_code_id: Option<i64>) -> Self {
        CurrentPrice {
            original_price_cents: Some(quote.original_price.cents()),
            discount_code_id,
            discount_amount_cents: discount_column(quote),
            final_price_cents: Some(quote.final_price.cents()),
        }
    }

    fn of(appointment: &Appointment) -> Self {
        CurrentPrice {
            original_price_cents: appointment.original_price_cents,
            discount_code_id: appointment.discount_code_id,
            discount_amount_cents: appointment.discount_amount_cents,
            final_price_cents: appointment.final_price_cents,
        }
    }
}

/// `discount_amount_cents` is NULL for undiscounted appointments.
fn discount_column(quote: &PriceQuote) -> Option<i64> {
    (!quote.discount_amount.is_zero()).then_some(quote.discount_amount.cents())
}

fn normalize_notes(notes: Option<String>) -> DbResult<Option<String>> {
    let notes = notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    if let Some(n) = &notes {
        if n.chars().count() > MAX_NOTES_LEN {
            return Err(chairside_core::ValidationError::OutOfRange {
                field: "notes".to_string(),
                min: 0,
                max: MAX_NOTES_LEN as i64,
            }
            .into());
        }
    }
    Ok(notes)
}

// =============================================================================
// Connection-Scoped Queries
// =============================================================================

async fn ensure_barber(conn: &mut SqliteConnection, user_id: i64) -> DbResult<()> {
    let user = find_user(conn, user_id)
        .await?
        .ok_or_else(|| CoreError::not_found("User", user_id))?;
    ensure_can_be_barber(&user)?;
    Ok(())
}

pub(crate) async fn fetch_appointment(
    conn: &mut SqliteConnection,
    id: i64,
) -> DbResult<Option<Appointment>> {
    let appointment = sqlx::query_as::<_, Appointment>(&format!(
        "SELECT {} FROM appointments WHERE id = ?1",
        APPOINTMENT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(appointment)
}

/// Completed appointments, oldest first.
pub(crate) async fn fetch_completed(conn: &mut SqliteConnection) -> DbResult<Vec<Appointment>> {
    let appointments = sqlx::query_as::<_, Appointment>(&format!(
        "SELECT {} FROM appointments WHERE status = 'completed' ORDER BY id",
        APPOINTMENT_COLUMNS
    ))
    .fetch_all(&mut *conn)
    .await?;

    Ok(appointments)
}

pub(crate) async fn fetch_snapshot(
    conn: &mut SqliteConnection,
    appointment_id: i64,
) -> DbResult<Vec<AppointmentPackage>> {
    let packages = sqlx::query_as::<_, AppointmentPackage>(
        r#"
        SELECT appointment_id, position, package_id, name_snapshot, price_cents, is_base
        FROM appointment_packages
        WHERE appointment_id = ?1
        ORDER BY position
        "#,
    )
    .bind(appointment_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(packages)
}

async fn load_detail(conn: &mut SqliteConnection, id: i64) -> DbResult<AppointmentDetail> {
    let appointment = fetch_appointment(conn, id)
        .await?
        .ok_or_else(|| DbError::from(CoreError::not_found("Appointment", id)))?;
    let packages = fetch_snapshot(conn, id).await?;
    let discounts = load_appointment_discounts(conn, id).await?;

    Ok(AppointmentDetail {
        appointment,
        packages,
        discounts,
    })
}

async fn insert_snapshot(
    conn: &mut SqliteConnection,
    appointment_id: i64,
    breakdown: &PriceBreakdown,
) -> DbResult<()> {
    for (position, package) in breakdown.packages().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO appointment_packages (
                appointment_id, position, package_id, name_snapshot, price_cents, is_base
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(appointment_id)
        .bind(position as i64)
        .bind(package.id)
        .bind(&package.name)
        .bind(package.price.cents())
        .bind(position == 0)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn write_price(conn: &mut SqliteConnection, id: i64, price: &CurrentPrice) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE appointments SET
            original_price_cents = ?2,
            discount_code_id = ?3,
            discount_amount_cents = ?4,
            final_price_cents = ?5
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(price.original_price_cents)
    .bind(price.discount_code_id)
    .bind(price.discount_amount_cents)
    .bind(price.final_price_cents)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

fn breakdown_from_snapshot(snapshot: &[AppointmentPackage]) -> Option<PriceBreakdown> {
    let priced = |p: &AppointmentPackage| PricedPackage::new(p.package_id, p.name_snapshot.clone(), p.price());

    let base = snapshot.iter().find(|p| p.is_base).map(priced)?;
    let additional = snapshot.iter().filter(|p| !p.is_base).map(priced).collect();
    Some(PriceBreakdown::new(base, additional))
}

/// The discounts an appointment currently holds, as a selection that can be
/// re-planned against a new breakdown.
///
/// Stored package subsets are kept only while the package list is unchanged.
async fn existing_selection(
    conn: &mut SqliteConnection,
    appointment: &Appointment,
    packages_changed: bool,
) -> DbResult<DiscountSelection> {
    let multi = load_appointment_discounts(conn, appointment.id).await?;
    if !multi.is_empty() {
        let requests = multi
            .into_iter()
            .map(|d| DiscountRequest {
                code: d.code,
                applied_to_packages: (!packages_changed).then_some(d.applied_to_packages),
            })
            .collect();
        return Ok(DiscountSelection::Multiple(requests));
    }

    if let Some(code_id) = appointment.discount_code_id {
        let code: Option<String> =
            sqlx::query_scalar("SELECT code FROM discount_codes WHERE id = ?1")
                .bind(code_id)
                .fetch_optional(&mut *conn)
                .await?;
        if let Some(code) = code {
            return Ok(DiscountSelection::Single(code));
        }
    }

    Ok(DiscountSelection::None)
}

// =============================================================================
// Unit Tests
// =============================================================================
