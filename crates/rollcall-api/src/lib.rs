//! JSON HTTP surface for Rollcall.
//!
//! Exposes an axum [`Router`] backed by any
//! [`rollcall_core::store::RollcallStore`]. Transport concerns (TLS, reverse
//! proxying) are the caller's responsibility.
//!
//! Correctness of the admission path does not depend on anything in this
//! crate: handlers here are stateless and many of them may run concurrently,
//! in one process or several, against the same store.

pub mod attendance;
pub mod error;
pub mod scan;
pub mod shifts;
pub mod students;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Json, Router,
  routing::{get, post},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use rollcall_core::{
  guard::AdmissionGuard,
  ratelimit::{RateLimitConfig, RateLimiter},
  store::RollcallStore,
};

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `ROLLCALL_`-prefixed environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,

  /// Offset of the reference timezone from UTC, in minutes. The admission
  /// window (one scan per student per day) is midnight-to-midnight at this
  /// offset.
  #[serde(default)]
  pub utc_offset_minutes: i32,

  #[serde(default = "default_rate_limit_window_ms")]
  pub rate_limit_window_ms: u64,
  #[serde(default = "default_rate_limit_burst")]
  pub rate_limit_burst: usize,
  #[serde(default = "default_rate_limit_gc_secs")]
  pub rate_limit_gc_secs: u64,
}

fn default_rate_limit_window_ms() -> u64 { 1000 }
fn default_rate_limit_burst() -> usize { 5 }
fn default_rate_limit_gc_secs() -> u64 { 30 }

impl ServerConfig {
  pub fn rate_limit(&self) -> RateLimitConfig {
    RateLimitConfig {
      window:      Duration::from_millis(self.rate_limit_window_ms),
      burst:       self.rate_limit_burst,
      gc_interval: Duration::from_secs(self.rate_limit_gc_secs),
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers. Everything here is
/// constructed once at startup and injected; no process-wide singletons.
#[derive(Clone)]
pub struct AppState<S: RollcallStore> {
  pub store:   Arc<S>,
  pub limiter: Arc<RateLimiter>,
  pub guard:   AdmissionGuard,
  pub config:  Arc<ServerConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build an axum [`Router`] for the Rollcall API.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: RollcallStore + Clone + Send + Sync + 'static,
{
  Router::new()
    .route("/healthz", get(healthz))
    // Shifts
    .route("/shifts", post(shifts::open::<S>))
    .route("/shifts/close", post(shifts::close::<S>))
    .route("/shifts/scan", post(scan::handler::<S>))
    .route("/shifts/{id}", get(shifts::get_one::<S>))
    // Derived views
    .route("/attendance", get(attendance::on_day::<S>))
    .route("/students/{key}", get(students::get_one::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

async fn healthz() -> Json<serde_json::Value> {
  Json(serde_json::json!({ "status": "ok" }))
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
  };
  use chrono::Utc;
  use rollcall_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tokio::task::JoinSet;
  use tower::ServiceExt as _;
  use uuid::Uuid;

  use super::*;

  async fn state_with_limits(rl: RateLimitConfig) -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let config = ServerConfig {
      host:                 "127.0.0.1".to_string(),
      port:                 0,
      store_path:           PathBuf::from(":memory:"),
      utc_offset_minutes:   0,
      rate_limit_window_ms: rl.window.as_millis() as u64,
      rate_limit_burst:     rl.burst,
      rate_limit_gc_secs:   rl.gc_interval.as_secs(),
    };
    AppState {
      store:   Arc::new(store),
      limiter: Arc::new(RateLimiter::new(rl)),
      guard:   AdmissionGuard::utc(),
      config:  Arc::new(config),
    }
  }

  /// State with a throttle generous enough that functional tests never
  /// brush against it.
  async fn make_state() -> AppState<SqliteStore> {
    state_with_limits(RateLimitConfig {
      window:      Duration::from_millis(1000),
      burst:       100,
      gc_interval: Duration::from_secs(30),
    })
    .await
  }

  async fn send(
    state: AppState<SqliteStore>,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    let req = builder.body(body).unwrap();
    router(state).oneshot(req).await.unwrap()
  }

  async fn json_of(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  async fn open_shift(state: &AppState<SqliteStore>, supervisor: &str) -> Uuid {
    let resp = send(
      state.clone(),
      "POST",
      "/shifts",
      Some(json!({
        "supervisorId": supervisor,
        "supervisorEmail": format!("{supervisor}@bus.example"),
      })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json_of(resp).await;
    body["shiftId"].as_str().unwrap().parse().unwrap()
  }

  async fn scan(
    state: &AppState<SqliteStore>,
    shift_id: Uuid,
    supervisor: &str,
    payload: &str,
  ) -> (StatusCode, Value) {
    let resp = send(
      state.clone(),
      "POST",
      "/shifts/scan",
      Some(json!({
        "shiftId": shift_id,
        "qrCodeData": payload,
        "supervisorId": supervisor,
      })),
    )
    .await;
    let status = resp.status();
    (status, json_of(resp).await)
  }

  // ── Liveness ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn healthz_returns_ok() {
    let state = make_state().await;
    let resp = send(state, "GET", "/healthz", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_of(resp).await["status"], "ok");
  }

  // ── Shift lifecycle ─────────────────────────────────────────────────────────

  #[tokio::test]
  async fn open_shift_returns_created_shift() {
    let state = make_state().await;
    let resp = send(
      state,
      "POST",
      "/shifts",
      Some(json!({"supervisorId": "sup-1", "supervisorEmail": "s@bus.example"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json_of(resp).await;
    assert_eq!(body["supervisorId"], "sup-1");
    assert_eq!(body["status"], "open");
    assert!(body["closedAt"].is_null());
  }

  #[tokio::test]
  async fn second_open_shift_is_rejected() {
    let state = make_state().await;
    open_shift(&state, "sup-1").await;

    let resp = send(
      state,
      "POST",
      "/shifts",
      Some(json!({"supervisorId": "sup-1", "supervisorEmail": "s@bus.example"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_of(resp).await;
    assert_eq!(body["success"], false);
  }

  #[tokio::test]
  async fn close_shift_then_second_close_is_404() {
    let state = make_state().await;
    let shift_id = open_shift(&state, "sup-1").await;

    let close_body =
      json!({"shiftId": shift_id, "supervisorId": "sup-1"});
    let resp =
      send(state.clone(), "POST", "/shifts/close", Some(close_body.clone())).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_of(resp).await;
    assert_eq!(body["status"], "closed");
    assert!(!body["closedAt"].is_null());

    let resp = send(state, "POST", "/shifts/close", Some(close_body)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  // ── Scan admission ──────────────────────────────────────────────────────────

  #[tokio::test]
  async fn first_scan_is_accepted_with_one_total() {
    let state = make_state().await;
    let shift_id = open_shift(&state, "sup-1").await;

    let (status, body) = scan(
      &state,
      shift_id,
      "sup-1",
      r#"{"email":"ahmed@x.edu","studentId":"S1"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["totalScans"], 1);
    assert_eq!(body["record"]["studentKey"], "ahmed@x.edu");
    assert_eq!(body["student"]["studentId"], "S1");
    assert_eq!(body["student"]["autoCreated"], true);
  }

  #[tokio::test]
  async fn same_payload_from_another_shift_is_duplicate() {
    let state = make_state().await;
    let first = open_shift(&state, "sup-a").await;
    let second = open_shift(&state, "sup-b").await;
    let payload = r#"{"email":"ahmed@x.edu","studentId":"S1"}"#;

    let (status, _) = scan(&state, first, "sup-a", payload).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = scan(&state, second, "sup-b", payload).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["isDuplicate"], true);
    assert_eq!(body["existingRecord"]["supervisorId"], "sup-a");
  }

  #[tokio::test]
  async fn bare_token_payloads_resolve() {
    let state = make_state().await;
    let shift_id = open_shift(&state, "sup-1").await;

    let (status, body) = scan(&state, shift_id, "sup-1", "mona@x.edu").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["record"]["studentKey"], "mona@x.edu");

    let (status, body) = scan(&state, shift_id, "sup-1", "S-42").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["record"]["studentKey"], "S-42");
  }

  #[tokio::test]
  async fn malformed_payload_is_400() {
    let state = make_state().await;
    let shift_id = open_shift(&state, "sup-1").await;

    let (status, body) =
      scan(&state, shift_id, "sup-1", "!!!not-json-or-email").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
  }

  #[tokio::test]
  async fn scan_against_closed_or_unknown_shift_is_404() {
    let state = make_state().await;
    let shift_id = open_shift(&state, "sup-1").await;
    send(
      state.clone(),
      "POST",
      "/shifts/close",
      Some(json!({"shiftId": shift_id, "supervisorId": "sup-1"})),
    )
    .await;

    let (status, _) = scan(&state, shift_id, "sup-1", "S-1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = scan(&state, Uuid::new_v4(), "sup-1", "S-1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn over_limit_supervisor_is_throttled() {
    // Burst of 2 over a minute: the third request must be throttled no
    // matter how fast the test runs.
    let state = state_with_limits(RateLimitConfig {
      window:      Duration::from_secs(60),
      burst:       2,
      gc_interval: Duration::from_secs(30),
    })
    .await;
    let shift_id = open_shift(&state, "sup-1").await;

    let (s1, _) = scan(&state, shift_id, "sup-1", "S-1").await;
    let (s2, _) = scan(&state, shift_id, "sup-1", "S-2").await;
    let (s3, body) = scan(&state, shift_id, "sup-1", "S-3").await;

    assert_eq!(s1, StatusCode::OK);
    assert_eq!(s2, StatusCode::OK);
    assert_eq!(s3, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["success"], false);

    // Other supervisors are unaffected.
    let (s4, _) = scan(&state, shift_id, "sup-2", "S-4").await;
    assert_eq!(s4, StatusCode::OK);
  }

  #[tokio::test]
  async fn ten_concurrent_scans_admit_exactly_one() {
    let state = make_state().await;
    let shift_id = open_shift(&state, "sup-0").await;

    let mut tasks = JoinSet::new();
    for i in 0..10 {
      let state = state.clone();
      tasks.spawn(async move {
        let resp = send(
          state,
          "POST",
          "/shifts/scan",
          Some(json!({
            "shiftId": shift_id,
            "qrCodeData": r#"{"studentId":"RACE1"}"#,
            "supervisorId": format!("sup-{i}"),
          })),
        )
        .await;
        resp.status()
      });
    }

    let mut ok = 0;
    let mut conflict = 0;
    while let Some(joined) = tasks.join_next().await {
      match joined.unwrap() {
        StatusCode::OK => ok += 1,
        StatusCode::CONFLICT => conflict += 1,
        other => panic!("unexpected status {other}"),
      }
    }
    assert_eq!(ok, 1);
    assert_eq!(conflict, 9);

    // Exactly one canonical record was persisted.
    let today = Utc::now().date_naive().format("%Y-%m-%d");
    let resp =
      send(state, "GET", &format!("/attendance?day={today}"), None).await;
    let records = json_of(resp).await;
    assert_eq!(records.as_array().unwrap().len(), 1);
  }

  // ── Derived views ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn shift_view_is_derived_from_attendance() {
    let state = make_state().await;
    let shift_id = open_shift(&state, "sup-1").await;

    scan(&state, shift_id, "sup-1", "S-1").await;
    scan(&state, shift_id, "sup-1", "S-2").await;

    let resp =
      send(state, "GET", &format!("/shifts/{shift_id}"), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_of(resp).await;
    assert_eq!(body["totalScans"], 2);
    assert_eq!(body["records"].as_array().unwrap().len(), 2);
    assert_eq!(body["shift"]["supervisorId"], "sup-1");
  }

  #[tokio::test]
  async fn unknown_shift_view_is_404() {
    let state = make_state().await;
    let resp =
      send(state, "GET", &format!("/shifts/{}", Uuid::new_v4()), None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn student_lookup_round_trips_the_issued_key() {
    let state = make_state().await;
    let shift_id = open_shift(&state, "sup-1").await;
    let (_, body) = scan(
      &state,
      shift_id,
      "sup-1",
      r#"{"email":"Mona@X.edu","fullName":"Mona Ali"}"#,
    )
    .await;
    let key = body["record"]["studentKey"].as_str().unwrap().to_owned();
    assert_eq!(key, "mona@x.edu");

    let resp =
      send(state, "GET", &format!("/students/{key}"), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let student = json_of(resp).await;
    assert_eq!(student["displayName"], "Mona Ali");
  }

  #[tokio::test]
  async fn unknown_student_is_404() {
    let state = make_state().await;
    let resp = send(state, "GET", "/students/nobody", None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn attendance_rejects_bad_day() {
    let state = make_state().await;
    let resp = send(state, "GET", "/attendance?day=15-09-2024", None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }
}
