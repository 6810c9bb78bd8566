//! Handler for the daily attendance view.

use axum::{
  Json,
  extract::{Query, State},
};
use chrono::NaiveDate;
use serde::Deserialize;

use rollcall_core::{
  attendance::AttendanceRecord,
  store::{AttendanceQuery, RollcallStore},
};

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct DayParams {
  /// Calendar day in the reference timezone, `YYYY-MM-DD`.
  pub day: String,
}

/// `GET /attendance?day=YYYY-MM-DD` — canonical records for one admission
/// window.
pub async fn on_day<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<DayParams>,
) -> Result<Json<Vec<AttendanceRecord>>, ApiError>
where
  S: RollcallStore + Clone + Send + Sync + 'static,
{
  let day = NaiveDate::parse_from_str(&params.day, "%Y-%m-%d").map_err(|_| {
    ApiError::BadRequest(format!("day must be YYYY-MM-DD, got {:?}", params.day))
  })?;

  let records = state
    .store
    .search_scans(&AttendanceQuery { day: Some(day), ..Default::default() })
    .await
    .map_err(ApiError::store)?;

  Ok(Json(records))
}
