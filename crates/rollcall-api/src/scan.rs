//! The scan endpoint — the full admission path in one handler.
//!
//! Rate limiter, then shift-open check, then payload parse, then student
//! resolution, then the admission guard. Outcomes:
//!
//! | Status | Meaning |
//! |--------|---------|
//! | `200`  | Admitted; body carries the record, the student, and the shift's derived scan count |
//! | `409`  | Already scanned today; body carries the winning record |
//! | `404`  | Shift unknown or not open |
//! | `400`  | Malformed payload |
//! | `429`  | Supervisor over the request throttle |
//! | `500`  | Store failure; the whole scan is safe to retry |

use std::time::Instant;

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rollcall_core::{
  attendance::AttendanceRecord,
  guard::{Admission, ScanAttempt},
  resolver,
  shift::ShiftStatus,
  store::{AttendanceQuery, RollcallStore},
  student::StudentIdentity,
};

use crate::{AppState, error::ApiError};

// ─── Bodies ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanBody {
  pub shift_id:      Uuid,
  /// The raw QR payload, passed through opaque.
  pub qr_code_data:  String,
  pub supervisor_id: String,
  pub location:      Option<String>,
  pub notes:         Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanAccepted {
  pub success:     bool,
  pub record:      AttendanceRecord,
  pub student:     StudentIdentity,
  /// Derived count of records on this shift, including this one.
  pub total_scans: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanDuplicate {
  pub success:         bool,
  pub is_duplicate:    bool,
  /// The record that won this student's admission window, so the operator
  /// can see who scanned them and when.
  pub existing_record: AttendanceRecord,
}

// ─── Handler ──────────────────────────────────────────────────────────────────

/// `POST /shifts/scan` — body: [`ScanBody`].
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<ScanBody>,
) -> Result<Response, ApiError>
where
  S: RollcallStore + Clone + Send + Sync + 'static,
{
  if !state.limiter.admit(&body.supervisor_id, Instant::now()) {
    return Err(ApiError::RateLimited);
  }

  let shift = state
    .store
    .get_shift(body.shift_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("shift {} not found", body.shift_id)))?;
  if shift.status != ShiftStatus::Open {
    return Err(ApiError::NotFound(format!("shift {} is not open", shift.shift_id)));
  }

  let fields = rollcall_payload::parse(&body.qr_code_data)?;
  let resolution = resolver::resolve(state.store.as_ref(), &fields)
    .await
    .map_err(ApiError::store)?;

  if resolution.newly_registered {
    tracing::info!(
      student_key = %resolution.student.student_key,
      "auto-registered student from scan payload"
    );
  }

  let attempt = ScanAttempt {
    student_key:   resolution.student.student_key.clone(),
    shift_id:      shift.shift_id,
    supervisor_id: body.supervisor_id,
    scan_time:     Utc::now(),
    location:      body.location,
    notes:         body.notes,
  };

  match state
    .guard
    .admit(state.store.as_ref(), attempt)
    .await
    .map_err(ApiError::store)?
  {
    Admission::Admitted(record) => {
      let total_scans = state
        .store
        .search_scans(&AttendanceQuery {
          shift_id: Some(shift.shift_id),
          ..Default::default()
        })
        .await
        .map_err(ApiError::store)?
        .len();

      let body = ScanAccepted {
        success: true,
        record,
        student: resolution.student,
        total_scans,
      };
      Ok((StatusCode::OK, Json(body)).into_response())
    }
    Admission::AlreadyScanned { existing } => {
      let body = ScanDuplicate {
        success:         false,
        is_duplicate:    true,
        existing_record: existing,
      };
      Ok((StatusCode::CONFLICT, Json(body)).into_response())
    }
  }
}
