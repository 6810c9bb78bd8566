//! Attendance records and the calendar-day admission window.
//!
//! Records are append-only: created exclusively by the admission guard and
//! never mutated afterwards. At most one record exists per
//! (`student_key`, `scan_day`) — the storage layer enforces this.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::student::StudentKey;

// ─── Calendar day ────────────────────────────────────────────────────────────

/// The calendar day an instant falls on in the service's reference timezone.
///
/// The admission window is midnight-to-midnight in that timezone; two scans
/// of the same student land in the same window exactly when this function
/// returns the same date for both.
pub fn scan_day(scan_time: DateTime<Utc>, tz: FixedOffset) -> NaiveDate {
  scan_time.with_timezone(&tz).date_naive()
}

// ─── AttendanceRecord ────────────────────────────────────────────────────────

/// One accepted scan. Once written, no field is ever updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
  pub record_id:     Uuid,
  pub student_key:   StudentKey,
  pub shift_id:      Uuid,
  /// UTC instant of the accepted scan.
  pub scan_time:     DateTime<Utc>,
  /// The admission window this record occupies; derived from `scan_time`
  /// in the reference timezone, stored so the store can constrain on it.
  pub scan_day:      NaiveDate,
  pub supervisor_id: String,
  pub location:      Option<String>,
  pub notes:         Option<String>,
}

// ─── NewScan ─────────────────────────────────────────────────────────────────

/// Input to [`crate::store::RollcallStore::insert_scan`].
/// `record_id` is always assigned by the store.
#[derive(Debug, Clone)]
pub struct NewScan {
  pub student_key:   StudentKey,
  pub shift_id:      Uuid,
  pub scan_time:     DateTime<Utc>,
  pub scan_day:      NaiveDate,
  pub supervisor_id: String,
  pub location:      Option<String>,
  pub notes:         Option<String>,
}
