//! Product sales and expenses.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::handlers::ApiJson;
use crate::wire::{parse_money, Envelope, ExpenseView, ProductSaleView};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSaleRequest {
    pub product_id: i64,
    /// Defaults to the caller. Only a Boss may record for someone else.
    pub staff_id: Option<i64>,
    pub client_id: Option<i64>,
    pub quantity: i64,
}

/// `POST /product-sales` (Boss/Staff)
pub async fn record_product_sale(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiJson(body): ApiJson<ProductSaleRequest>,
) -> ApiResult<(StatusCode, Json<Envelope<ProductSaleView>>)> {
    actor.require_staff("record product sales")?;

    let staff_id = body.staff_id.unwrap_or(actor.user_id);
    if staff_id != actor.user_id {
        actor.require_boss("record sales for another staff member")?;
    }

    let sale = state
        .db
        .product_sales()
        .record(body.product_id, staff_id, body.client_id, body.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(Envelope::ok(sale.into()))))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRequest {
    pub description: String,
    pub amount: f64,
    pub incurred_at: Option<DateTime<Utc>>,
}

/// `POST /expenses` (Boss)
pub async fn record_expense(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiJson(body): ApiJson<ExpenseRequest>,
) -> ApiResult<(StatusCode, Json<Envelope<ExpenseView>>)> {
    actor.require_boss("record expenses")?;

    let amount = parse_money("amount", body.amount)?;
    let expense = state
        .db
        .expenses()
        .create(&body.description, amount, body.incurred_at)
        .await?;
    Ok((StatusCode::CREATED, Json(Envelope::ok(expense.into()))))
}
