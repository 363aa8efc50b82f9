//! Appointment endpoints.
//!
//! Request bodies are explicit per operation. The legacy single code
//! (`discountCode` / `discountCodeId`) and the multi-code list
//! (`multipleDiscountCodes`) stay separate because they carry different
//! reuse rules; sending both is rejected.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::auth::{AuthUser, MaybeAuthUser};
use crate::error::{ApiError, ApiResult};
use crate::handlers::ApiJson;
use crate::wire::{double_option, AppointmentView, Envelope};
use crate::AppState;
use chairside_core::discount::{DiscountRequest, DiscountSelection};
use chairside_core::lifecycle::BarberChange;
use chairside_core::validation::parse_id;
use chairside_core::{AppointmentStatus, CoreError, ValidationError};
use chairside_db::{CreateAppointmentInput, EditAppointmentInput, UpdateAppointmentInput};

// =============================================================================
// Request Bodies
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub client_id: i64,
    pub package_id: i64,
    pub barber_id: Option<i64>,
    #[serde(default)]
    pub additional_packages: Vec<i64>,
    pub appointment_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub discount_code: Option<String>,
    pub multiple_discount_codes: Option<Vec<DiscountRequest>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentRequest {
    pub status: Option<AppointmentStatus>,
    /// `null` unassigns.
    #[serde(default, deserialize_with = "double_option")]
    pub barber_id: Option<Option<i64>>,
    /// `null` removes the discount.
    #[serde(default, deserialize_with = "double_option")]
    pub discount_code_id: Option<Option<i64>>,
    pub multiple_discount_codes: Option<Vec<DiscountRequest>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditAppointmentRequest {
    pub package_id: Option<i64>,
    pub additional_packages: Option<Vec<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub appointment_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
    pub status: Option<AppointmentStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub barber_id: Option<Option<i64>>,
    /// `null` removes every discount.
    #[serde(default, deserialize_with = "double_option")]
    pub discount_code: Option<Option<String>>,
    pub multiple_discount_codes: Option<Vec<DiscountRequest>>,
}

fn both_discount_forms() -> ApiError {
    ValidationError::InvalidFormat {
        field: "multipleDiscountCodes".to_string(),
        reason: "send either a single discount code or multipleDiscountCodes, not both".to_string(),
    }
    .into()
}

fn appointment_id(raw: &str) -> ApiResult<i64> {
    Ok(parse_id("id", raw)?)
}

// =============================================================================
// Handlers
// =============================================================================

/// `POST /appointments` (public)
pub async fn create(
    State(state): State<AppState>,
    MaybeAuthUser(actor): MaybeAuthUser,
    ApiJson(body): ApiJson<CreateAppointmentRequest>,
) -> ApiResult<(StatusCode, Json<Envelope<AppointmentView>>)> {
    debug!(
        client_id = body.client_id,
        booked_by = actor.map(|a| a.user_id),
        "Booking appointment"
    );

    let discount = match (body.discount_code, body.multiple_discount_codes) {
        (Some(_), Some(_)) => return Err(both_discount_forms()),
        (Some(code), None) => DiscountSelection::Single(code),
        (None, Some(requests)) => DiscountSelection::Multiple(requests),
        (None, None) => DiscountSelection::None,
    };

    let input = CreateAppointmentInput {
        client_id: body.client_id,
        package_id: body.package_id,
        barber_id: body.barber_id,
        additional_packages: body.additional_packages,
        appointment_date: body.appointment_date,
        notes: body.notes,
        discount,
    };

    let detail = state.db.appointments().create(input).await?;
    Ok((StatusCode::CREATED, Json(Envelope::ok(detail.into()))))
}

/// `GET /appointments/:id` (Boss/Staff)
pub async fn get(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<AppointmentView>>> {
    actor.require_staff("view appointments")?;
    let id = appointment_id(&id)?;

    let detail = state.db.appointments().get_detail(id).await?;
    Ok(Json(Envelope::ok(detail.into())))
}

/// `PUT /appointments/:id`: status, barber and discount changes.
pub async fn update(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateAppointmentRequest>,
) -> ApiResult<Json<Envelope<AppointmentView>>> {
    let id = appointment_id(&id)?;

    let discount = match (body.discount_code_id, body.multiple_discount_codes) {
        (Some(_), Some(_)) => return Err(both_discount_forms()),
        (None, Some(requests)) => Some(DiscountSelection::Multiple(requests)),
        (Some(None), None) => Some(DiscountSelection::None),
        (Some(Some(code_id)), None) => {
            let code = state
                .db
                .discount_codes()
                .get_by_id(code_id)
                .await?
                .ok_or_else(|| CoreError::not_found("Discount code", code_id))?;
            Some(DiscountSelection::Single(code.code))
        }
        (None, None) => None,
    };

    debug!(appointment_id = id, actor_id = actor.user_id, "Updating appointment");

    let input = UpdateAppointmentInput {
        status: body.status,
        barber: BarberChange::from(body.barber_id),
        discount,
    };
    let detail = state.db.appointments().update(id, input, &actor).await?;
    Ok(Json(Envelope::ok(detail.into())))
}

/// `PATCH /appointments/:id`: full edit (Boss/Staff).
pub async fn edit(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<EditAppointmentRequest>,
) -> ApiResult<Json<Envelope<AppointmentView>>> {
    let id = appointment_id(&id)?;

    let discount = match (body.discount_code, body.multiple_discount_codes) {
        (Some(_), Some(_)) => return Err(both_discount_forms()),
        (None, Some(requests)) => Some(DiscountSelection::Multiple(requests)),
        (Some(Some(code)), None) => Some(DiscountSelection::Single(code)),
        (Some(None), None) => Some(DiscountSelection::None),
        (None, None) => None,
    };

    let input = EditAppointmentInput {
        package_id: body.package_id,
        additional_packages: body.additional_packages,
        appointment_date: body.appointment_date,
        notes: body.notes,
        status: body.status,
        barber: BarberChange::from(body.barber_id),
        discount,
    };
    let detail = state.db.appointments().edit(id, input, &actor).await?;
    Ok(Json(Envelope::ok(detail.into())))
}

/// `DELETE /appointments/:id` (Boss)
pub async fn delete(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = appointment_id(&id)?;
    state.db.appointments().delete(id, &actor).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Appointment {} deleted", id),
    })))
}
