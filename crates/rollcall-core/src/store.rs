//! The `RollcallStore` trait and supporting query/outcome types.
//!
//! The trait is implemented by storage backends (e.g. `rollcall-store-sqlite`).
//! Higher layers (`rollcall-api`, the guard, the resolver) depend on this
//! abstraction, not on any concrete backend.
//!
//! The duplicate-scan and single-open-shift invariants are part of this
//! contract: implementations must enforce them at the storage layer (a unique
//! constraint, not an application-level check) and report violations through
//! the typed outcomes below. An in-process check cannot be the mechanism —
//! many server processes may share one database.

use std::future::Future;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  attendance::{AttendanceRecord, NewScan},
  shift::{NewShift, Shift},
  student::{NewStudent, StudentIdentity, StudentKey},
};

// ─── Write outcomes ──────────────────────────────────────────────────────────

/// Result of attempting to persist a scan.
///
/// `Duplicate` is produced when the storage-level uniqueness constraint on
/// (`student_key`, `scan_day`) rejects the insert; it carries the record
/// that won. This outcome — not any pre-check — is the authoritative
/// duplicate signal.
#[derive(Debug, Clone)]
pub enum ScanInsert {
  Recorded(AttendanceRecord),
  Duplicate(AttendanceRecord),
}

/// Result of attempting to open a shift.
///
/// `AlreadyOpen` carries the supervisor's existing open shift when the
/// at-most-one-open constraint rejects the insert.
#[derive(Debug, Clone)]
pub enum ShiftOpen {
  Opened(Shift),
  AlreadyOpen(Shift),
}

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`RollcallStore::search_scans`]. All filters are
/// conjunctive; an empty query returns every record (paged).
#[derive(Debug, Clone, Default)]
pub struct AttendanceQuery {
  pub student_key: Option<StudentKey>,
  pub shift_id:    Option<Uuid>,
  /// Restrict to one admission window (calendar day).
  pub day:         Option<NaiveDate>,
  pub limit:       Option<usize>,
  pub offset:      Option<usize>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Rollcall storage backend.
///
/// Attendance writes are append-only. All methods return `Send` futures so
/// the trait can be used in multi-threaded async runtimes (e.g. tokio with
/// `axum`).
pub trait RollcallStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Students ──────────────────────────────────────────────────────────

  /// Persist a new student identity. `created_at` is set by the store.
  ///
  /// First writer wins: when an identity with the same key already exists
  /// (two concurrent scans of one unseen student both auto-registering),
  /// the existing row is returned instead of an error.
  fn add_student(
    &self,
    input: NewStudent,
  ) -> impl Future<Output = Result<StudentIdentity, Self::Error>> + Send + '_;

  /// Retrieve a student by canonical key. Returns `None` if not found.
  fn get_student<'a>(
    &'a self,
    key: &'a StudentKey,
  ) -> impl Future<Output = Result<Option<StudentIdentity>, Self::Error>> + Send + 'a;

  /// Look up a student by email, case-insensitively.
  fn find_student_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<StudentIdentity>, Self::Error>> + Send + 'a;

  /// Look up a student by institutional id (exact match).
  fn find_student_by_student_id<'a>(
    &'a self,
    student_id: &'a str,
  ) -> impl Future<Output = Result<Option<StudentIdentity>, Self::Error>> + Send + 'a;

  /// Look up a student by display name (exact match). Lowest-priority
  /// lookup; used only when a payload carries nothing better.
  fn find_student_by_name<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<StudentIdentity>, Self::Error>> + Send + 'a;

  // ── Shifts ────────────────────────────────────────────────────────────

  /// Open a new shift, or report the supervisor's existing open one.
  fn open_shift(
    &self,
    input: NewShift,
  ) -> impl Future<Output = Result<ShiftOpen, Self::Error>> + Send + '_;

  /// Close the matching open shift. Returns `None` when no open shift
  /// exists for this (`shift_id`, `supervisor_id`) pair.
  fn close_shift<'a>(
    &'a self,
    shift_id: Uuid,
    supervisor_id: &'a str,
  ) -> impl Future<Output = Result<Option<Shift>, Self::Error>> + Send + 'a;

  /// Retrieve a shift by id, open or closed. Returns `None` if not found.
  fn get_shift(
    &self,
    shift_id: Uuid,
  ) -> impl Future<Output = Result<Option<Shift>, Self::Error>> + Send + '_;

  // ── Attendance ────────────────────────────────────────────────────────

  /// Append one scan, or report the existing record for the same
  /// (`student_key`, `scan_day`). See [`ScanInsert`].
  fn insert_scan(
    &self,
    input: NewScan,
  ) -> impl Future<Output = Result<ScanInsert, Self::Error>> + Send + '_;

  /// The record occupying this student's admission window for `day`,
  /// if any. This is the guard's fast-path duplicate check.
  fn find_scan_on_day<'a>(
    &'a self,
    key: &'a StudentKey,
    day: NaiveDate,
  ) -> impl Future<Output = Result<Option<AttendanceRecord>, Self::Error>> + Send + 'a;

  /// Search attendance records. Backs the derived shift and daily views.
  fn search_scans<'a>(
    &'a self,
    query: &'a AttendanceQuery,
  ) -> impl Future<Output = Result<Vec<AttendanceRecord>, Self::Error>> + Send + 'a;
}
