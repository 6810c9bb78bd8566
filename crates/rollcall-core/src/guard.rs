//! The scan admission guard — decides whether a scan becomes a record.
//!
//! One student is admitted at most once per calendar day, regardless of
//! which shift or supervisor scans them. The guard's pre-check gives fast,
//! friendly rejections; correctness comes from the store's uniqueness
//! constraint, which picks exactly one winner among concurrent attempts.
//! Losers are rejected, not queued or retried.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
  attendance::{AttendanceRecord, NewScan, scan_day},
  store::{RollcallStore, ScanInsert},
  student::StudentKey,
};

// ─── Input / outcome ─────────────────────────────────────────────────────────

/// One scan attempt, after payload resolution. Ephemeral; never persisted
/// in this form.
#[derive(Debug, Clone)]
pub struct ScanAttempt {
  pub student_key:   StudentKey,
  pub shift_id:      Uuid,
  pub supervisor_id: String,
  pub scan_time:     DateTime<Utc>,
  pub location:      Option<String>,
  pub notes:         Option<String>,
}

/// The guard's verdict on a scan attempt.
#[derive(Debug, Clone)]
pub enum Admission {
  Admitted(AttendanceRecord),
  /// Terminal for the calendar day. Carries the winning record so callers
  /// can tell the operator who scanned this student, and when.
  AlreadyScanned { existing: AttendanceRecord },
}

// ─── Guard ───────────────────────────────────────────────────────────────────

/// Admission guard for scan attempts.
///
/// Cheap to copy; holds only the reference timezone that defines the
/// midnight-to-midnight admission window.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionGuard {
  tz: FixedOffset,
}

impl AdmissionGuard {
  pub fn new(tz: FixedOffset) -> Self { Self { tz } }

  /// Guard with a UTC admission window.
  pub fn utc() -> Self {
    Self { tz: FixedOffset::east_opt(0).expect("zero offset is valid") }
  }

  /// Decide whether `attempt` may be recorded.
  ///
  /// The duplicate pre-check is an optimization only. If it cannot be
  /// answered (one automatic retry, then give up), the attempt proceeds to
  /// the insert, whose uniqueness constraint is the real arbiter. The
  /// insert itself is never retried: a timed-out insert has an unknown
  /// outcome, and the caller re-submitting the same payload will observe
  /// the duplicate if the write actually landed.
  pub async fn admit<S>(
    &self,
    store: &S,
    attempt: ScanAttempt,
  ) -> Result<Admission, S::Error>
  where
    S: RollcallStore,
  {
    let day = scan_day(attempt.scan_time, self.tz);

    match self.precheck(store, &attempt.student_key, day).await {
      Ok(Some(existing)) => {
        return Ok(Admission::AlreadyScanned { existing });
      }
      Ok(None) => {}
      Err(e) => {
        tracing::warn!(
          student_key = %attempt.student_key,
          error = %e,
          "duplicate pre-check unavailable; deferring to insert constraint"
        );
      }
    }

    let input = NewScan {
      student_key:   attempt.student_key,
      shift_id:      attempt.shift_id,
      scan_time:     attempt.scan_time,
      scan_day:      day,
      supervisor_id: attempt.supervisor_id,
      location:      attempt.location,
      notes:         attempt.notes,
    };

    match store.insert_scan(input).await? {
      ScanInsert::Recorded(record) => Ok(Admission::Admitted(record)),
      ScanInsert::Duplicate(existing) => {
        Ok(Admission::AlreadyScanned { existing })
      }
    }
  }

  /// Read-side duplicate check with one automatic retry. The read is
  /// idempotent, so retrying it is safe; the insert is not retried.
  async fn precheck<S>(
    &self,
    store: &S,
    key: &StudentKey,
    day: NaiveDate,
  ) -> Result<Option<AttendanceRecord>, S::Error>
  where
    S: RollcallStore,
  {
    match store.find_scan_on_day(key, day).await {
      Ok(found) => Ok(found),
      Err(first) => {
        tracing::warn!(student_key = %key, error = %first, "pre-check read failed; retrying once");
        store.find_scan_on_day(key, day).await
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use chrono::TimeZone;
  use tokio::task::JoinSet;

  use super::*;
  use crate::test_store::MemoryStore;

  fn attempt(key: &str, at: DateTime<Utc>) -> ScanAttempt {
    ScanAttempt {
      student_key:   StudentKey::from_student_id(key),
      shift_id:      Uuid::new_v4(),
      supervisor_id: "sup-1".to_string(),
      scan_time:     at,
      location:      None,
      notes:         None,
    }
  }

  fn morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 15, 8, 0, 0).unwrap()
  }

  fn next_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 16, 8, 0, 0).unwrap()
  }

  #[tokio::test]
  async fn first_scan_is_admitted() {
    let store = MemoryStore::new();
    let guard = AdmissionGuard::utc();

    let verdict = guard.admit(&store, attempt("S1", morning())).await.unwrap();
    assert!(matches!(verdict, Admission::Admitted(_)));
  }

  #[tokio::test]
  async fn second_scan_same_day_is_rejected_with_existing_record() {
    let store = MemoryStore::new();
    let guard = AdmissionGuard::utc();

    let first = guard.admit(&store, attempt("S1", morning())).await.unwrap();
    let Admission::Admitted(record) = first else {
      panic!("first scan not admitted")
    };

    // Different shift, different supervisor, same day: still a duplicate.
    let mut second = attempt("S1", morning());
    second.supervisor_id = "sup-2".to_string();
    let verdict = guard.admit(&store, second).await.unwrap();
    let Admission::AlreadyScanned { existing } = verdict else {
      panic!("second scan was admitted")
    };
    assert_eq!(existing.record_id, record.record_id);
    assert_eq!(existing.supervisor_id, "sup-1");
  }

  #[tokio::test]
  async fn same_student_next_day_is_admitted_again() {
    let store = MemoryStore::new();
    let guard = AdmissionGuard::utc();

    let first = guard.admit(&store, attempt("S1", morning())).await.unwrap();
    assert!(matches!(first, Admission::Admitted(_)));

    let second = guard
      .admit(&store, attempt("S1", next_morning()))
      .await
      .unwrap();
    assert!(matches!(second, Admission::Admitted(_)));
  }

  #[tokio::test]
  async fn failed_precheck_falls_through_to_insert() {
    let store = MemoryStore::new();
    let guard = AdmissionGuard::utc();

    // Both the pre-check and its retry fail; the insert still decides.
    store.fail_next_reads(2);
    let verdict = guard.admit(&store, attempt("S1", morning())).await.unwrap();
    assert!(matches!(verdict, Admission::Admitted(_)));
  }

  #[tokio::test]
  async fn failed_precheck_still_detects_duplicate_via_insert() {
    let store = MemoryStore::new();
    let guard = AdmissionGuard::utc();

    guard.admit(&store, attempt("S1", morning())).await.unwrap();

    store.fail_next_reads(2);
    let verdict = guard.admit(&store, attempt("S1", morning())).await.unwrap();
    assert!(matches!(verdict, Admission::AlreadyScanned { .. }));
  }

  #[tokio::test]
  async fn precheck_retry_succeeds_after_one_failure() {
    let store = MemoryStore::new();
    let guard = AdmissionGuard::utc();

    guard.admit(&store, attempt("S1", morning())).await.unwrap();

    store.fail_next_reads(1);
    let verdict = guard.admit(&store, attempt("S1", morning())).await.unwrap();
    assert!(matches!(verdict, Admission::AlreadyScanned { .. }));
  }

  #[tokio::test]
  async fn concurrent_scans_admit_exactly_one() {
    let store = Arc::new(MemoryStore::new());
    let guard = AdmissionGuard::utc();

    let mut tasks = JoinSet::new();
    for i in 0..10 {
      let store = Arc::clone(&store);
      let mut att = attempt("RACE1", morning());
      att.supervisor_id = format!("sup-{i}");
      tasks.spawn(async move { guard.admit(store.as_ref(), att).await });
    }

    let mut admitted = 0;
    let mut rejected = 0;
    while let Some(joined) = tasks.join_next().await {
      match joined.unwrap().unwrap() {
        Admission::Admitted(_) => admitted += 1,
        Admission::AlreadyScanned { .. } => rejected += 1,
      }
    }

    assert_eq!(admitted, 1);
    assert_eq!(rejected, 9);
    assert_eq!(store.scan_count(), 1);
  }

  #[tokio::test]
  async fn offset_window_splits_utc_day() {
    // At UTC+1, 23:30 UTC and 00:30 UTC the next day are the same local
    // day, so the second scan is a duplicate.
    let store = MemoryStore::new();
    let guard = AdmissionGuard::new(FixedOffset::east_opt(3600).unwrap());

    let late = Utc.with_ymd_and_hms(2024, 9, 15, 23, 30, 0).unwrap();
    let early = Utc.with_ymd_and_hms(2024, 9, 16, 0, 30, 0).unwrap();

    let first = guard.admit(&store, attempt("S1", late)).await.unwrap();
    assert!(matches!(first, Admission::Admitted(_)));

    let second = guard.admit(&store, attempt("S1", early)).await.unwrap();
    assert!(matches!(second, Admission::AlreadyScanned { .. }));
  }
}
