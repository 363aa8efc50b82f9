use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::handlers::ApiJson;
use crate::wire::{DiscountValidationView, Envelope};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateDiscountRequest {
    pub code: String,
    pub client_id: i64,
    /// Base package first, then additional packages.
    pub package_ids: Option<Vec<i64>>,
}

/// `POST /discounts/validate` (public)
///
/// Reports whether the client may use the code and, given packages, what it
/// would take off. Nothing is consumed. Unknown or inactive codes are 404.
pub async fn validate(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ValidateDiscountRequest>,
) -> ApiResult<Json<Envelope<DiscountValidationView>>> {
    let validation = state
        .db
        .discount_codes()
        .validate(&body.code, body.client_id, body.package_ids.as_deref())
        .await?;

    Ok(Json(Envelope::ok(validation.into())))
}
