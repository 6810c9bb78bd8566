//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, calendar days as `YYYY-MM-DD`,
//! UUIDs as hyphenated lowercase strings, and student metadata as compact
//! JSON.

use chrono::{DateTime, NaiveDate, Utc};
use rollcall_core::{
  attendance::AttendanceRecord,
  shift::{Shift, ShiftStatus},
  student::{StudentIdentity, StudentKey},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_day(day: NaiveDate) -> String { day.format("%Y-%m-%d").to_string() }

pub fn decode_day(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── ShiftStatus ─────────────────────────────────────────────────────────────

pub fn encode_shift_status(s: ShiftStatus) -> &'static str {
  match s {
    ShiftStatus::Open => "open",
    ShiftStatus::Closed => "closed",
  }
}

pub fn decode_shift_status(s: &str) -> Result<ShiftStatus> {
  match s {
    "open" => Ok(ShiftStatus::Open),
    "closed" => Ok(ShiftStatus::Closed),
    other => Err(Error::DateParse(format!("unknown shift status: {other:?}"))),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `students` row.
pub struct RawStudent {
  pub student_key:  String,
  pub student_id:   String,
  pub email:        Option<String>,
  pub display_name: String,
  pub metadata:     String,
  pub auto_created: bool,
  pub created_at:   String,
}

impl RawStudent {
  pub fn into_student(self) -> Result<StudentIdentity> {
    Ok(StudentIdentity {
      student_key:  StudentKey::from_canonical(self.student_key),
      student_id:   self.student_id,
      email:        self.email,
      display_name: self.display_name,
      metadata:     serde_json::from_str(&self.metadata)?,
      auto_created: self.auto_created,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `shifts` row.
pub struct RawShift {
  pub shift_id:         String,
  pub supervisor_id:    String,
  pub supervisor_email: String,
  pub status:           String,
  pub started_at:       String,
  pub closed_at:        Option<String>,
}

impl RawShift {
  pub fn into_shift(self) -> Result<Shift> {
    Ok(Shift {
      shift_id:         decode_uuid(&self.shift_id)?,
      supervisor_id:    self.supervisor_id,
      supervisor_email: self.supervisor_email,
      status:           decode_shift_status(&self.status)?,
      started_at:       decode_dt(&self.started_at)?,
      closed_at:        self.closed_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// Raw strings read directly from an `attendance` row.
pub struct RawScan {
  pub record_id:     String,
  pub student_key:   String,
  pub shift_id:      String,
  pub scan_time:     String,
  pub scan_day:      String,
  pub supervisor_id: String,
  pub location:      Option<String>,
  pub notes:         Option<String>,
}

impl RawScan {
  pub fn into_record(self) -> Result<AttendanceRecord> {
    Ok(AttendanceRecord {
      record_id:     decode_uuid(&self.record_id)?,
      student_key:   StudentKey::from_canonical(self.student_key),
      shift_id:      decode_uuid(&self.shift_id)?,
      scan_time:     decode_dt(&self.scan_time)?,
      scan_day:      decode_day(&self.scan_day)?,
      supervisor_id: self.supervisor_id,
      location:      self.location,
      notes:         self.notes,
    })
  }
}
