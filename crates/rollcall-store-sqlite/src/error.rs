//! Error type for `rollcall-store-sqlite`.

use chrono::NaiveDate;
use rollcall_core::student::StudentKey;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// The unique constraint rejected an insert but the winning row could not
  /// be read back. Attendance rows are never deleted, so this indicates a
  /// corrupted store.
  #[error("constraint hit for {key} on {day} but no existing record found")]
  WinnerMissing { key: StudentKey, day: NaiveDate },

  /// The open-shift constraint rejected an insert but no open shift row
  /// could be read back for the supervisor.
  #[error("open-shift constraint hit for {0} but no open shift found")]
  OpenShiftMissing(String),

  /// The student-key constraint rejected a registration but no student row
  /// could be read back.
  #[error("registration constraint hit for {0} but no student row found")]
  StudentMissing(StudentKey),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
