//! Shift — a supervisor's attendance-taking session.
//!
//! A shift only ever moves `open -> closed` and never reopens; a new session
//! is always a new entity. Its attendance view is derived by querying the
//! canonical attendance table, never stored alongside the shift row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attendance::AttendanceRecord;

/// Lifecycle state of a shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftStatus {
  Open,
  Closed,
}

/// A supervisor's session. A supervisor has at most one `Open` shift at any
/// time (enforced by the storage layer).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
  pub shift_id:         Uuid,
  pub supervisor_id:    String,
  pub supervisor_email: String,
  pub status:           ShiftStatus,
  pub started_at:       DateTime<Utc>,
  pub closed_at:        Option<DateTime<Utc>>,
}

/// Input to [`crate::store::RollcallStore::open_shift`].
/// Id and `started_at` are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewShift {
  pub supervisor_id:    String,
  pub supervisor_email: String,
}

// ─── Derived view ────────────────────────────────────────────────────────────

/// The computed read model for a shift — never stored, always derived from
/// the canonical attendance table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftView {
  pub shift:       Shift,
  pub total_scans: usize,
  pub records:     Vec<AttendanceRecord>,
}

impl ShiftView {
  pub fn assemble(shift: Shift, records: Vec<AttendanceRecord>) -> Self {
    Self { total_scans: records.len(), shift, records }
  }
}
