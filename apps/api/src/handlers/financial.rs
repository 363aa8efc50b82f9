//! Financial reports and the month-end reset.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::handlers::ApiJson;
use crate::wire::{Envelope, FinancialOverviewView, MonthlyResetView, StaffBreakdownView};
use crate::AppState;
use chairside_core::report::DateRange;
use chairside_core::ValidationError;

/// `?startDate=YYYY-MM-DD&endDate=YYYY-MM-DD`, both inclusive and optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl RangeQuery {
    pub fn to_range(&self) -> ApiResult<DateRange> {
        let start = parse_date("startDate", self.start_date.as_deref())?;
        let end = parse_date("endDate", self.end_date.as_deref())?;
        Ok(DateRange::from_dates(start, end)?)
    }
}

fn parse_date(field: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, ValidationError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ValidationError::InvalidFormat {
                field: field.to_string(),
                reason: format!("'{}' is not a YYYY-MM-DD date", s),
            }),
    }
}

/// Query rejections use the API error body.
fn range_query(query: Result<Query<RangeQuery>, QueryRejection>) -> ApiResult<DateRange> {
    let Query(query) = query.map_err(|e| ApiError::Validation(e.body_text()))?;
    query.to_range()
}

/// `GET /financial/overview` (Boss)
pub async fn overview(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    query: Result<Query<RangeQuery>, QueryRejection>,
) -> ApiResult<Json<Envelope<FinancialOverviewView>>> {
    let range = range_query(query)?;
    let overview = state.db.reports().financial_overview(&range, &actor).await?;
    Ok(Json(Envelope::ok(overview.into())))
}

/// `GET /financial/staff-report` (Boss sees all rows, Staff their own)
pub async fn staff_report(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    query: Result<Query<RangeQuery>, QueryRejection>,
) -> ApiResult<Json<Envelope<Vec<StaffBreakdownView>>>> {
    let range = range_query(query)?;
    let rows = state.db.reports().staff_report(&range, &actor).await?;
    Ok(Json(Envelope::ok(rows.into_iter().map(Into::into).collect())))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyResetRequest {
    /// Defaults to the start of the current month (UTC).
    pub cutoff: Option<DateTime<Utc>>,
}

fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// `POST /financial/monthly-reset` (Boss)
pub async fn monthly_reset(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    body: Option<ApiJson<MonthlyResetRequest>>,
) -> ApiResult<Json<Envelope<MonthlyResetView>>> {
    actor.require_boss("run the monthly reset")?;

    let cutoff = body
        .and_then(|ApiJson(b)| b.cutoff)
        .unwrap_or_else(|| start_of_month(Utc::now()));

    let summary = state.db.expenses().monthly_reset(cutoff).await?;
    Ok(Json(Envelope::ok(MonthlyResetView::new(cutoff, summary))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_query_parses_inclusive_dates() {
        let query = RangeQuery {
            start_date: Some("2024-03-01".into()),
            end_date: Some("2024-03-31".into()),
        };
        let range = query.to_range().unwrap();
        assert!(range.contains(Utc.with_ymd_and_hms(2024, 3, 31, 23, 0, 0).unwrap()));
        assert!(!range.contains(Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_range_query_rejects_bad_input() {
        let malformed = RangeQuery {
            start_date: Some("03/01/2024".into()),
            end_date: None,
        };
        assert!(matches!(malformed.to_range(), Err(ApiError::Validation(_))));

        let reversed = RangeQuery {
            start_date: Some("2024-04-01".into()),
            end_date: Some("2024-03-01".into()),
        };
        assert!(reversed.to_range().is_err());
    }

    #[test]
    fn test_start_of_month() {
        let now = Utc.with_ymd_and_hms(2024, 5, 17, 13, 45, 0).unwrap();
        assert_eq!(
            start_of_month(now),
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
        );
    }
}
