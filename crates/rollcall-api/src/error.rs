//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error body is `{"success": false, "message": "..."}` so operator
//! UIs have one shape to handle. The duplicate-scan outcome is not an error
//! and is rendered by the scan handler itself.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// The actor exceeded the scan-request throttle. Transient; the caller
  /// should back off. Not a system error and not logged as one.
  #[error("rate limited; retry shortly")]
  RateLimited,

  /// The scanned payload cannot identify a student. Permanent for this
  /// input.
  #[error(transparent)]
  MalformedPayload(#[from] rollcall_payload::Error),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("not found: {0}")]
  NotFound(String),

  /// Storage failure. Surfaced as 500; the whole scan is safe to retry
  /// because the duplicate check is idempotent.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
      ApiError::MalformedPayload(_) | ApiError::BadRequest(_) => {
        StatusCode::BAD_REQUEST
      }
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure reached the HTTP boundary");
        StatusCode::INTERNAL_SERVER_ERROR
      }
    };
    let body = json!({ "success": false, "message": self.to_string() });
    (status, Json(body)).into_response()
  }
}
