//! Handler for student lookup.

use axum::{
  Json,
  extract::{Path, State},
};

use rollcall_core::{
  store::RollcallStore,
  student::{StudentIdentity, StudentKey},
};

use crate::{AppState, error::ApiError};

/// `GET /students/:key` — the key as previously issued by the resolver.
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(key): Path<String>,
) -> Result<Json<StudentIdentity>, ApiError>
where
  S: RollcallStore + Clone + Send + Sync + 'static,
{
  let key = StudentKey::from_canonical(key);
  let student = state
    .store
    .get_student(&key)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("student {key} not found")))?;
  Ok(Json(student))
}
