//! In-memory [`RollcallStore`] used by guard and resolver tests.
//!
//! Mirrors the storage contract: inserts are checked against the same
//! uniqueness rules a real backend enforces, and reads can be made to fail
//! to exercise the guard's degraded paths.

use std::sync::{
  Mutex, PoisonError,
  atomic::{AtomicUsize, Ordering},
};

use chrono::{NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::{
  attendance::{AttendanceRecord, NewScan},
  shift::{NewShift, Shift, ShiftStatus},
  store::{AttendanceQuery, RollcallStore, ScanInsert, ShiftOpen},
  student::{NewStudent, StudentIdentity, StudentKey},
};

#[derive(Debug, Error)]
#[error("injected store failure")]
pub(crate) struct MemoryError;

#[derive(Default)]
struct Tables {
  students: Vec<StudentIdentity>,
  shifts:   Vec<Shift>,
  scans:    Vec<AttendanceRecord>,
}

pub(crate) struct MemoryStore {
  tables:     Mutex<Tables>,
  fail_reads: AtomicUsize,
}

impl MemoryStore {
  pub(crate) fn new() -> Self {
    Self { tables: Mutex::new(Tables::default()), fail_reads: AtomicUsize::new(0) }
  }

  /// Make the next `n` calls to `find_scan_on_day` fail.
  pub(crate) fn fail_next_reads(&self, n: usize) {
    self.fail_reads.store(n, Ordering::SeqCst);
  }

  pub(crate) fn scan_count(&self) -> usize { self.lock().scans.len() }

  fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
    self.tables.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn take_injected_failure(&self) -> bool {
    self
      .fail_reads
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
      .is_ok()
  }
}

impl RollcallStore for MemoryStore {
  type Error = MemoryError;

  async fn add_student(
    &self,
    input: NewStudent,
  ) -> Result<StudentIdentity, MemoryError> {
    let mut tables = self.lock();
    if let Some(existing) = tables
      .students
      .iter()
      .find(|s| s.student_key == input.student_key)
    {
      return Ok(existing.clone());
    }
    let student = StudentIdentity {
      student_key:  input.student_key,
      student_id:   input.student_id,
      email:        input.email,
      display_name: input.display_name,
      metadata:     input.metadata,
      auto_created: input.auto_created,
      created_at:   Utc::now(),
    };
    tables.students.push(student.clone());
    Ok(student)
  }

  async fn get_student(
    &self,
    key: &StudentKey,
  ) -> Result<Option<StudentIdentity>, MemoryError> {
    Ok(
      self
        .lock()
        .students
        .iter()
        .find(|s| &s.student_key == key)
        .cloned(),
    )
  }

  async fn find_student_by_email(
    &self,
    email: &str,
  ) -> Result<Option<StudentIdentity>, MemoryError> {
    let needle = email.trim().to_ascii_lowercase();
    Ok(
      self
        .lock()
        .students
        .iter()
        .find(|s| s.email.as_deref() == Some(needle.as_str()))
        .cloned(),
    )
  }

  async fn find_student_by_student_id(
    &self,
    student_id: &str,
  ) -> Result<Option<StudentIdentity>, MemoryError> {
    Ok(
      self
        .lock()
        .students
        .iter()
        .find(|s| s.student_id == student_id)
        .cloned(),
    )
  }

  async fn find_student_by_name(
    &self,
    name: &str,
  ) -> Result<Option<StudentIdentity>, MemoryError> {
    Ok(
      self
        .lock()
        .students
        .iter()
        .find(|s| s.display_name == name)
        .cloned(),
    )
  }

  async fn open_shift(&self, input: NewShift) -> Result<ShiftOpen, MemoryError> {
    let mut tables = self.lock();
    if let Some(existing) = tables
      .shifts
      .iter()
      .find(|s| s.supervisor_id == input.supervisor_id && s.status == ShiftStatus::Open)
    {
      return Ok(ShiftOpen::AlreadyOpen(existing.clone()));
    }
    let shift = Shift {
      shift_id:         Uuid::new_v4(),
      supervisor_id:    input.supervisor_id,
      supervisor_email: input.supervisor_email,
      status:           ShiftStatus::Open,
      started_at:       Utc::now(),
      closed_at:        None,
    };
    tables.shifts.push(shift.clone());
    Ok(ShiftOpen::Opened(shift))
  }

  async fn close_shift(
    &self,
    shift_id: Uuid,
    supervisor_id: &str,
  ) -> Result<Option<Shift>, MemoryError> {
    let mut tables = self.lock();
    let Some(shift) = tables.shifts.iter_mut().find(|s| {
      s.shift_id == shift_id
        && s.supervisor_id == supervisor_id
        && s.status == ShiftStatus::Open
    }) else {
      return Ok(None);
    };
    shift.status = ShiftStatus::Closed;
    shift.closed_at = Some(Utc::now());
    Ok(Some(shift.clone()))
  }

  async fn get_shift(&self, shift_id: Uuid) -> Result<Option<Shift>, MemoryError> {
    Ok(
      self
        .lock()
        .shifts
        .iter()
        .find(|s| s.shift_id == shift_id)
        .cloned(),
    )
  }

  async fn insert_scan(&self, input: NewScan) -> Result<ScanInsert, MemoryError> {
    // One lock for check + insert: the atomicity a unique constraint gives
    // a real backend.
    let mut tables = self.lock();
    if let Some(existing) = tables
      .scans
      .iter()
      .find(|r| r.student_key == input.student_key && r.scan_day == input.scan_day)
    {
      return Ok(ScanInsert::Duplicate(existing.clone()));
    }
    let record = AttendanceRecord {
      record_id:     Uuid::new_v4(),
      student_key:   input.student_key,
      shift_id:      input.shift_id,
      scan_time:     input.scan_time,
      scan_day:      input.scan_day,
      supervisor_id: input.supervisor_id,
      location:      input.location,
      notes:         input.notes,
    };
    tables.scans.push(record.clone());
    Ok(ScanInsert::Recorded(record))
  }

  async fn find_scan_on_day(
    &self,
    key: &StudentKey,
    day: NaiveDate,
  ) -> Result<Option<AttendanceRecord>, MemoryError> {
    if self.take_injected_failure() {
      return Err(MemoryError);
    }
    Ok(
      self
        .lock()
        .scans
        .iter()
        .find(|r| &r.student_key == key && r.scan_day == day)
        .cloned(),
    )
  }

  async fn search_scans(
    &self,
    query: &AttendanceQuery,
  ) -> Result<Vec<AttendanceRecord>, MemoryError> {
    let tables = self.lock();
    let hits = tables
      .scans
      .iter()
      .filter(|r| {
        query.student_key.as_ref().is_none_or(|k| &r.student_key == k)
          && query.shift_id.is_none_or(|id| r.shift_id == id)
          && query.day.is_none_or(|d| r.scan_day == d)
      })
      .skip(query.offset.unwrap_or(0))
      .take(query.limit.unwrap_or(usize::MAX))
      .cloned()
      .collect();
    Ok(hits)
  }
}
