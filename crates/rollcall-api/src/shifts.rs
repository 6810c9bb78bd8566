//! Handlers for shift lifecycle endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/shifts` | Body: [`OpenShiftBody`]; 201, or 400 if one is already open |
//! | `POST` | `/shifts/close` | Body: [`CloseShiftBody`]; 200, or 404 |
//! | `GET`  | `/shifts/:id` | Derived [`ShiftView`]; 404 if unknown |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use rollcall_core::{
  shift::{NewShift, Shift, ShiftView},
  store::{AttendanceQuery, RollcallStore, ShiftOpen},
};

use crate::{AppState, error::ApiError};

// ─── Open ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenShiftBody {
  pub supervisor_id:    String,
  pub supervisor_email: String,
}

/// `POST /shifts` — body: `{"supervisorId":"...","supervisorEmail":"..."}`
pub async fn open<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<OpenShiftBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RollcallStore + Clone + Send + Sync + 'static,
{
  let outcome = state
    .store
    .open_shift(NewShift {
      supervisor_id:    body.supervisor_id,
      supervisor_email: body.supervisor_email,
    })
    .await
    .map_err(ApiError::store)?;

  match outcome {
    ShiftOpen::Opened(shift) => Ok((StatusCode::CREATED, Json(shift))),
    ShiftOpen::AlreadyOpen(existing) => Err(ApiError::BadRequest(format!(
      "supervisor {} already has an open shift ({})",
      existing.supervisor_id, existing.shift_id
    ))),
  }
}

// ─── Close ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseShiftBody {
  pub shift_id:      Uuid,
  pub supervisor_id: String,
}

/// `POST /shifts/close` — body: `{"shiftId":"...","supervisorId":"..."}`
pub async fn close<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<CloseShiftBody>,
) -> Result<Json<Shift>, ApiError>
where
  S: RollcallStore + Clone + Send + Sync + 'static,
{
  let closed = state
    .store
    .close_shift(body.shift_id, &body.supervisor_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!(
        "no open shift {} for supervisor {}",
        body.shift_id, body.supervisor_id
      ))
    })?;
  Ok(Json(closed))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /shifts/:id` — the derived view: shift, records, count.
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<ShiftView>, ApiError>
where
  S: RollcallStore + Clone + Send + Sync + 'static,
{
  let shift = state
    .store
    .get_shift(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("shift {id} not found")))?;

  let records = state
    .store
    .search_scans(&AttendanceQuery { shift_id: Some(id), ..Default::default() })
    .await
    .map_err(ApiError::store)?;

  Ok(Json(ShiftView::assemble(shift, records)))
}
