//! # Discount Codes & Usage Ledger
//!
//! The code registry and the ledger of which client consumed which code.
//!
//! ## Ledger Flow (inside the appointment transaction)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  apply_selection(DiscountSelection)                                     │
//! │  ├── None     → remove_discount()                                       │
//! │  ├── Single   → apply_discount()            UsagePolicy::SingleUse      │
//! │  └── Multiple → apply_multiple_discounts()  UsagePolicy::Reusable       │
//! │                     │                                                   │
//! │                     ▼                                                   │
//! │  plan: look up codes (inactive → DiscountNotFound unless already held), │
//! │        prior usages, plan_discounts (all or nothing), cap at the price  │
//! │                     │                                                   │
//! │                     ▼                                                   │
//! │  record: remove_discount(), then                                        │
//! │  ├── SingleUse: INSERT usage (UNIQUE race → DiscountAlreadyUsed)        │
//! │  └── Reusable:  INSERT usage ON CONFLICT DO NOTHING                     │
//! │                 + one appointment_discounts row per code                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage rows are one per (code, client). [`remove_discount`] hands a row to
//! another appointment of the client that still carries the code.
//!
//! The ledger functions take `&mut SqliteConnection` so they run on the
//! caller's transaction; none of them commits.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::package::find_many;
use crate::repository::user::find_client;
use chairside_core::discount::{
    ensure_usable, ensure_usable_for, plan_discounts, total_discount, DiscountRequest,
    DiscountSelection, ResolvedCode, UsagePolicy,
};
use chairside_core::pricing::{
    cap_discounts, compute_discount, compute_original_price, Discount, PriceBreakdown, PriceQuote,
};
use chairside_core::types::normalize_code;
use chairside_core::validation::{
    validate_discount_code, validate_discount_percent, validate_id, validate_package_selection,
    validate_positive_amount,
};
use chairside_core::{
    AppointmentDiscount, CoreError, DiscountCode, DiscountCodeUsage, DiscountType, Money, Percent,
    ValidationError,
};

const CODE_COLUMNS: &str = "id, code, discount_type, discount_percent_bps, discount_amount_cents, applicable_packages, is_active, created_at";

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct DiscountCodeRow {
    id: i64,
    code: String,
    discount_type: DiscountType,
    discount_percent_bps: Option<i64>,
    discount_amount_cents: Option<i64>,
    applicable_packages: Json<Vec<i64>>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<DiscountCodeRow> for DiscountCode {
    fn from(row: DiscountCodeRow) -> Self {
        DiscountCode {
            id: row.id,
            code: row.code,
            discount_type: row.discount_type,
            discount_percent_bps: row.discount_percent_bps,
            discount_amount_cents: row.discount_amount_cents,
            applicable_packages: row.applicable_packages.0,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AppointmentDiscountRow {
    appointment_id: i64,
    discount_code_id: i64,
    code: String,
    applied_to_packages: Json<Vec<i64>>,
    discount_amount_cents: i64,
}

impl From<AppointmentDiscountRow> for AppointmentDiscount {
    fn from(row: AppointmentDiscountRow) -> Self {
        AppointmentDiscount {
            appointment_id: row.appointment_id,
            discount_code_id: row.discount_code_id,
            code: row.code,
            applied_to_packages: row.applied_to_packages.0,
            discount_amount_cents: row.discount_amount_cents,
        }
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Input for creating a discount code.
#[derive(Debug, Clone)]
pub struct NewDiscountCode {
    pub code: String,
    pub discount_type: DiscountType,
    /// Required for [`DiscountType::Percentage`].
    pub percent: Option<Percent>,
    /// Required for [`DiscountType::FixedAmount`].
    pub amount: Option<Money>,
    /// Empty means every package.
    pub applicable_packages: Vec<i64>,
}

/// Outcome of checking a code without consuming it.
#[derive(Debug, Clone)]
pub struct DiscountValidation {
    pub code: DiscountCode,
    /// The client already holds a usage of this code.
    pub already_used: bool,
    /// `None` when no packages were supplied.
    pub applicable: Option<bool>,
    /// The discount on the supplied packages, when applicable.
    pub discount: Option<Discount>,
    pub quote: Option<PriceQuote>,
}

impl DiscountValidation {
    /// Valid for a single-code booking by this client.
    pub fn is_valid(&self) -> bool {
        !self.already_used && self.applicable != Some(false)
    }

    pub fn message(&self) -> String {
        if self.already_used {
            format!("Discount code {} has already been used by this client", self.code.code)
        } else if self.applicable == Some(false) {
            format!(
                "Discount code {} does not apply to the selected packages",
                self.code.code
            )
        } else {
            format!("Discount code {} is valid", self.code.code)
        }
    }
}

/// Repository for the discount code registry.
#[derive(Debug, Clone)]
pub struct DiscountCodeRepository {
    pool: SqlitePool,
}

impl DiscountCodeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DiscountCodeRepository { pool }
    }

    /// Creates a code.
    ///
    /// ## Rules
    /// - Code is trimmed and upper-cased, and must be unique
    /// - Percentage: `0 < percent <= 100`
    /// - Fixed amount: `amount > 0`
    pub async fn create(&self, input: NewDiscountCode) -> DbResult<DiscountCode> {
        let code = validate_discount_code(&input.code)?;

        let (percent_bps, amount_cents) = match input.discount_type {
            DiscountType::Percentage => {
                let percent = input.percent.ok_or_else(|| ValidationError::Required {
                    field: "discountPercent".to_string(),
                })?;
                validate_discount_percent(percent)?;
                (Some(percent.bps() as i64), None)
            }
            DiscountType::FixedAmount => {
                let amount = input.amount.ok_or_else(|| ValidationError::Required {
                    field: "discountAmount".to_string(),
                })?;
                validate_positive_amount("discountAmount", amount)?;
                (None, Some(amount.cents()))
            }
        };

        let mut applicable: Vec<i64> = Vec::with_capacity(input.applicable_packages.len());
        for id in input.applicable_packages {
            validate_id("applicablePackages", id)?;
            if !applicable.contains(&id) {
                applicable.push(id);
            }
        }

        let now = Utc::now();
        debug!(code = %code, discount_type = ?input.discount_type, "Creating discount code");

        let result = sqlx::query(
            r#"
            INSERT INTO discount_codes (
                code, discount_type, discount_percent_bps, discount_amount_cents,
                applicable_packages, is_active, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)
            "#,
        )
        .bind(&code)
        .bind(input.discount_type)
        .bind(percent_bps)
        .bind(amount_cents)
        .bind(Json(&applicable))
        .bind(now)
        .execute(&self.pool)
        .await;

        let result = match result {
            Ok(result) => result,
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                return Err(ValidationError::Duplicate {
                    field: "code".to_string(),
                    value: code,
                }
                .into());
            }
            Err(err) => return Err(err.into()),
        };

        Ok(DiscountCode {
            id: result.last_insert_rowid(),
            code,
            discount_type: input.discount_type,
            discount_percent_bps: percent_bps,
            discount_amount_cents: amount_cents,
            applicable_packages: applicable,
            is_active: true,
            created_at: now,
        })
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<DiscountCode>> {
        let row = sqlx::query_as::<_, DiscountCodeRow>(&format!(
            "SELECT {} FROM discount_codes WHERE id = ?1",
            CODE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(DiscountCode::from))
    }

    /// Looks a code up case-insensitively.
    pub async fn find_by_code(&self, code: &str) -> DbResult<Option<DiscountCode>> {
        let mut conn = self.pool.acquire().await?;
        find_code(&mut conn, &normalize_code(code)).await
    }

    pub async fn set_active(&self, id: i64, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE discount_codes SET is_active = ?2 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Discount code", id));
        }
        Ok(())
    }

    /// Checks a code for a client without consuming it.
    ///
    /// With `package_ids` (base first, then additional), also reports
    /// applicability and previews the discount.
    ///
    /// ## Errors
    /// - [`CoreError::DiscountNotFound`] for unknown or inactive codes
    /// - `NotFound` for an unknown client
    /// - [`CoreError::PackageNotFound`] for unknown packages
    pub async fn validate(
        &self,
        code: &str,
        client_id: i64,
        package_ids: Option<&[i64]>,
    ) -> DbResult<DiscountValidation> {
        let requested = validate_discount_code(code)?;
        validate_id("clientId", client_id)?;

        let mut conn = self.pool.acquire().await?;

        let found = find_code(&mut conn, &requested).await?;
        let code = ensure_usable(&requested, found.as_ref())?.clone();

        if find_client(&mut conn, client_id).await?.is_none() {
            return Err(CoreError::not_found("Client", client_id).into());
        }

        let usages = find_usages(&mut conn, code.id, client_id).await?;
        let already_used = !usages.is_empty();

        let (applicable, discount, quote) = match package_ids {
            Some(ids) if !ids.is_empty() => {
                let breakdown = load_breakdown(&mut conn, ids[0], &ids[1..]).await?;
                match compute_discount(&code, &breakdown, None) {
                    Ok(discount) => {
                        let quote = PriceQuote::new(
                            breakdown.original_price(),
                            std::slice::from_ref(&discount),
                        );
                        (Some(true), Some(discount), Some(quote))
                    }
                    Err(CoreError::DiscountNotApplicable { .. }) => (Some(false), None, None),
                    Err(err) => return Err(err.into()),
                }
            }
            _ => (None, None, None),
        };

        debug!(
            code = %code.code,
            client_id,
            already_used,
            applicable = ?applicable,
            "Validated discount code"
        );

        Ok(DiscountValidation {
            code,
            already_used,
            applicable,
            discount,
            quote,
        })
    }
}

// =============================================================================
// Ledger
// =============================================================================
//
// Every function here runs on the caller's connection or transaction and
// never commits by itself.

/// Discounts validated and priced for one appointment.
#[derive(Debug, Clone)]
pub struct PlannedDiscounts {
    pub policy: UsagePolicy,
    /// Capped so the amounts sum to at most the original price.
    pub discounts: Vec<Discount>,
}

impl PlannedDiscounts {
    pub fn none() -> Self {
        PlannedDiscounts {
            policy: UsagePolicy::SingleUse,
            discounts: Vec::new(),
        }
    }

    pub fn total(&self) -> Money {
        total_discount(&self.discounts)
    }

    pub fn quote(&self, original_price: Money) -> PriceQuote {
        PriceQuote::new(original_price, &self.discounts)
    }

    /// The `discount_code_id` column: set for the single-code path only.
    pub fn legacy_code_id(&self) -> Option<i64> {
        match self.policy {
            UsagePolicy::SingleUse => self.discounts.first().map(|d| d.discount_code_id),
            UsagePolicy::Reusable => None,
        }
    }
}

pub(crate) async fn find_code(
    conn: &mut SqliteConnection,
    code: &str,
) -> DbResult<Option<DiscountCode>> {
    let row = sqlx::query_as::<_, DiscountCodeRow>(&format!(
        "SELECT {} FROM discount_codes WHERE code = ?1",
        CODE_COLUMNS
    ))
    .bind(code)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(DiscountCode::from))
}

const USAGE_COLUMNS: &str = "id, discount_code_id, client_id, appointment_id, used_at";

async fn find_usages(
    conn: &mut SqliteConnection,
    discount_code_id: i64,
    client_id: i64,
) -> DbResult<Vec<DiscountCodeUsage>> {
    let usages = sqlx::query_as::<_, DiscountCodeUsage>(&format!(
        "SELECT {} FROM discount_code_usages WHERE discount_code_id = ?1 AND client_id = ?2",
        USAGE_COLUMNS
    ))
    .bind(discount_code_id)
    .bind(client_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(usages)
}

/// Builds a price breakdown from current package prices.
pub(crate) async fn load_breakdown(
    conn: &mut SqliteConnection,
    base_id: i64,
    additional_ids: &[i64],
) -> DbResult<PriceBreakdown> {
    validate_package_selection(base_id, additional_ids)?;

    let base = crate::repository::package::find_by_id(conn, base_id)
        .await?
        .ok_or(CoreError::PackageNotFound(base_id))?;
    let resolved = find_many(conn, additional_ids).await?;

    Ok(compute_original_price(&base, additional_ids, &resolved)?)
}

/// Code ids an appointment currently carries, on either path.
async fn held_code_ids(conn: &mut SqliteConnection, appointment_id: i64) -> DbResult<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT discount_code_id FROM appointment_discounts WHERE appointment_id = ?1
        UNION
        SELECT discount_code_id FROM discount_code_usages WHERE appointment_id = ?1
        UNION
        SELECT discount_code_id FROM appointments
        WHERE id = ?1 AND discount_code_id IS NOT NULL
        "#,
    )
    .bind(appointment_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(ids)
}

/// Resolves every code of a selection: the code row plus the client's prior
/// usages of it. Codes in `held` may be inactive.
async fn resolve_codes(
    conn: &mut SqliteConnection,
    requests: &[DiscountRequest],
    client_id: i64,
    held: &[i64],
) -> DbResult<Vec<ResolvedCode>> {
    let mut resolved = Vec::with_capacity(requests.len());
    for request in requests {
        let found = find_code(conn, &request.code).await?;
        let code = ensure_usable_for(&request.code, found.as_ref(), held)?.clone();
        let prior_usages = find_usages(conn, code.id, client_id).await?;
        resolved.push(ResolvedCode {
            code,
            applied_to_packages: request.applied_to_packages.clone(),
            prior_usages,
        });
    }
    Ok(resolved)
}

/// Validates and prices a selection for one appointment. All codes pass or
/// none do. Usages already tied to the appointment do not count as prior use.
async fn plan_selection(
    conn: &mut SqliteConnection,
    selection: &DiscountSelection,
    client_id: i64,
    appointment_id: i64,
    breakdown: &PriceBreakdown,
) -> DbResult<PlannedDiscounts> {
    if selection.is_none() {
        return Ok(PlannedDiscounts::none());
    }

    let policy = selection.policy();
    let held = held_code_ids(conn, appointment_id).await?;
    let resolved = resolve_codes(conn, &selection.requests(), client_id, &held).await?;
    let discounts = plan_discounts(policy, &resolved, breakdown, Some(appointment_id))?;
    let discounts = cap_discounts(breakdown.original_price(), discounts);

    debug!(
        appointment_id,
        client_id,
        policy = ?policy,
        codes = discounts.len(),
        discount_cents = total_discount(&discounts).cents(),
        "Planned discounts"
    );

    Ok(PlannedDiscounts { policy, discounts })
}

/// Swaps the appointment's ledger rows for the ones of `plan`.
async fn record_plan(
    conn: &mut SqliteConnection,
    plan: &PlannedDiscounts,
    client_id: i64,
    appointment_id: i64,
) -> DbResult<()> {
    remove_discount(conn, appointment_id).await?;

    for discount in &plan.discounts {
        insert_usage(
            conn,
            plan.policy,
            &discount.code,
            discount.discount_code_id,
            client_id,
            appointment_id,
        )
        .await?;

        if plan.policy == UsagePolicy::Reusable {
            sqlx::query(
                r#"
                INSERT INTO appointment_discounts (
                    appointment_id, discount_code_id, applied_to_packages, discount_amount_cents
                ) VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(appointment_id)
            .bind(discount.discount_code_id)
            .bind(Json(&discount.applied_to))
            .bind(discount.amount.cents())
            .execute(&mut *conn)
            .await?;
        }
    }
    Ok(())
}

/// Single-code path: applies `code` to the appointment under
/// [`UsagePolicy::SingleUse`], replacing whatever discounts it held.
///
/// ## Errors
/// - [`CoreError::DiscountNotFound`] for unknown or inactive codes
/// - [`CoreError::DiscountAlreadyUsed`] if the client used the code on
///   another appointment
/// - [`CoreError::DiscountNotApplicable`] if no booked package qualifies
pub async fn apply_discount(
    conn: &mut SqliteConnection,
    code: &str,
    client_id: i64,
    appointment_id: i64,
    breakdown: &PriceBreakdown,
) -> DbResult<PlannedDiscounts> {
    let selection = DiscountSelection::Single(code.to_string()).normalized()?;
    let plan = plan_selection(conn, &selection, client_id, appointment_id, breakdown).await?;
    record_plan(conn, &plan, client_id, appointment_id).await?;

    info!(code = %code, client_id, appointment_id, "Discount applied");
    Ok(plan)
}

/// Multi-code path: applies every requested code under
/// [`UsagePolicy::Reusable`], each on its own package subset. One failing
/// code fails the batch and nothing is written.
pub async fn apply_multiple_discounts(
    conn: &mut SqliteConnection,
    appointment_id: i64,
    requests: Vec<DiscountRequest>,
    client_id: i64,
    breakdown: &PriceBreakdown,
) -> DbResult<PlannedDiscounts> {
    let selection = DiscountSelection::Multiple(requests).normalized()?;
    let plan = plan_selection(conn, &selection, client_id, appointment_id, breakdown).await?;
    record_plan(conn, &plan, client_id, appointment_id).await?;

    info!(
        client_id,
        appointment_id,
        codes = plan.discounts.len(),
        discount_cents = plan.total().cents(),
        "Discounts applied"
    );
    Ok(plan)
}

/// Applies the path a selection names. [`DiscountSelection::None`] only
/// removes what the appointment held.
pub async fn apply_selection(
    conn: &mut SqliteConnection,
    selection: DiscountSelection,
    client_id: i64,
    appointment_id: i64,
    breakdown: &PriceBreakdown,
) -> DbResult<PlannedDiscounts> {
    match selection {
        DiscountSelection::None => {
            remove_discount(conn, appointment_id).await?;
            Ok(PlannedDiscounts::none())
        }
        DiscountSelection::Single(code) => {
            apply_discount(conn, &code, client_id, appointment_id, breakdown).await
        }
        DiscountSelection::Multiple(requests) => {
            apply_multiple_discounts(conn, appointment_id, requests, client_id, breakdown).await
        }
    }
}

/// Removes an appointment's ledger rows: its usages and multi-code rows.
///
/// A usage row is one per (code, client). When another appointment of the
/// same client still carries the code through the multi-code path, the row
/// moves to that appointment instead of disappearing, so single-use checks
/// keep seeing it.
///
/// ## Returns
/// Number of usage rows released from this appointment.
pub async fn remove_discount(conn: &mut SqliteConnection, appointment_id: i64) -> DbResult<u64> {
    let released = sqlx::query_as::<_, DiscountCodeUsage>(&format!(
        "SELECT {} FROM discount_code_usages WHERE appointment_id = ?1",
        USAGE_COLUMNS
    ))
    .bind(appointment_id)
    .fetch_all(&mut *conn)
    .await?;

    sqlx::query("DELETE FROM appointment_discounts WHERE appointment_id = ?1")
        .bind(appointment_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM discount_code_usages WHERE appointment_id = ?1")
        .bind(appointment_id)
        .execute(&mut *conn)
        .await?;

    for usage in &released {
        let holder: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT ad.appointment_id
            FROM appointment_discounts ad
            JOIN appointments a ON a.id = ad.appointment_id
            WHERE ad.discount_code_id = ?1 AND a.client_id = ?2
            ORDER BY ad.appointment_id
            LIMIT 1
            "#,
        )
        .bind(usage.discount_code_id)
        .bind(usage.client_id)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(holder) = holder {
            sqlx::query(
                r#"
                INSERT INTO discount_code_usages (discount_code_id, client_id, appointment_id, used_at)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(usage.discount_code_id)
            .bind(usage.client_id)
            .bind(holder)
            .bind(usage.used_at)
            .execute(&mut *conn)
            .await?;
            debug!(
                discount_code_id = usage.discount_code_id,
                from = appointment_id,
                to = holder,
                "Discount usage moved"
            );
        }
    }

    debug!(appointment_id, released = released.len(), "Discount usage removed");
    Ok(released.len() as u64)
}

/// Multi-code rows of one appointment.
pub(crate) async fn load_appointment_discounts(
    conn: &mut SqliteConnection,
    appointment_id: i64,
) -> DbResult<Vec<AppointmentDiscount>> {
    let rows = sqlx::query_as::<_, AppointmentDiscountRow>(
        r#"
        SELECT ad.appointment_id, ad.discount_code_id, dc.code,
               ad.applied_to_packages, ad.discount_amount_cents
        FROM appointment_discounts ad
        JOIN discount_codes dc ON dc.id = ad.discount_code_id
        WHERE ad.appointment_id = ?1
        ORDER BY dc.code
        "#,
    )
    .bind(appointment_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(AppointmentDiscount::from).collect())
}

async fn insert_usage(
    conn: &mut SqliteConnection,
    policy: UsagePolicy,
    code: &str,
    discount_code_id: i64,
    client_id: i64,
    appointment_id: i64,
) -> DbResult<()> {
    let sql = match policy {
        UsagePolicy::SingleUse => {
            r#"
            INSERT INTO discount_code_usages (discount_code_id, client_id, appointment_id, used_at)
            VALUES (?1, ?2, ?3, ?4)
            "#
        }
        UsagePolicy::Reusable => {
            r#"
            INSERT INTO discount_code_usages (discount_code_id, client_id, appointment_id, used_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (discount_code_id, client_id) DO NOTHING
            "#
        }
    };

    let result = sqlx::query(sql)
        .bind(discount_code_id)
        .bind(client_id)
        .bind(appointment_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            warn!(code, client_id, "Discount usage already recorded for this client");
            Err(CoreError::DiscountAlreadyUsed {
                code: code.to_string(),
            }
            .into())
        }
        Err(err) => Err(err.into()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
