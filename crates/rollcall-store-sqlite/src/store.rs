//! [`SqliteStore`] — the SQLite implementation of [`RollcallStore`].

use std::path::Path;

use chrono::{NaiveDate, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use rollcall_core::{
  attendance::{AttendanceRecord, NewScan},
  shift::{NewShift, Shift, ShiftStatus},
  store::{AttendanceQuery, RollcallStore, ScanInsert, ShiftOpen},
  student::{NewStudent, StudentIdentity, StudentKey},
};

use crate::{
  Error, Result,
  encode::{
    RawScan, RawShift, RawStudent, encode_day, encode_dt, encode_shift_status,
    encode_uuid,
  },
  schema::SCHEMA,
};

const STUDENT_COLS: &str =
  "student_key, student_id, email, display_name, metadata, auto_created, created_at";
const SHIFT_COLS: &str =
  "shift_id, supervisor_id, supervisor_email, status, started_at, closed_at";
const SCAN_COLS: &str =
  "record_id, student_key, shift_id, scan_time, scan_day, supervisor_id, location, notes";

fn student_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawStudent> {
  Ok(RawStudent {
    student_key:  row.get(0)?,
    student_id:   row.get(1)?,
    email:        row.get(2)?,
    display_name: row.get(3)?,
    metadata:     row.get(4)?,
    auto_created: row.get(5)?,
    created_at:   row.get(6)?,
  })
}

fn shift_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawShift> {
  Ok(RawShift {
    shift_id:         row.get(0)?,
    supervisor_id:    row.get(1)?,
    supervisor_email: row.get(2)?,
    status:           row.get(3)?,
    started_at:       row.get(4)?,
    closed_at:        row.get(5)?,
  })
}

fn scan_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawScan> {
  Ok(RawScan {
    record_id:     row.get(0)?,
    student_key:   row.get(1)?,
    shift_id:      row.get(2)?,
    scan_time:     row.get(3)?,
    scan_day:      row.get(4)?,
    supervisor_id: row.get(5)?,
    location:      row.get(6)?,
    notes:         row.get(7)?,
  })
}

/// True when `e` is a rejection by a UNIQUE constraint (as opposed to any
/// other constraint class, e.g. a foreign key).
fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _)
      if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Rollcall store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// The supervisor's current open shift, if any.
  async fn find_open_shift(&self, supervisor_id: &str) -> Result<Option<Shift>> {
    let supervisor = supervisor_id.to_owned();

    let raw: Option<RawShift> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {SHIFT_COLS} FROM shifts
                 WHERE supervisor_id = ?1 AND status = 'open'"
              ),
              rusqlite::params![supervisor],
              shift_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawShift::into_shift).transpose()
  }
}

// ─── RollcallStore impl ──────────────────────────────────────────────────────

impl RollcallStore for SqliteStore {
  type Error = Error;

  // ── Students ──────────────────────────────────────────────────────────────

  async fn add_student(&self, input: NewStudent) -> Result<StudentIdentity> {
    let student = StudentIdentity {
      student_key:  input.student_key,
      student_id:   input.student_id,
      email:        input.email,
      display_name: input.display_name,
      metadata:     input.metadata,
      auto_created: input.auto_created,
      created_at:   Utc::now(),
    };

    let key_str      = student.student_key.as_str().to_owned();
    let student_id   = student.student_id.clone();
    let email        = student.email.clone();
    let display_name = student.display_name.clone();
    let metadata_str = serde_json::to_string(&student.metadata)?;
    let auto_created = student.auto_created;
    let at_str       = encode_dt(student.created_at);

    // First writer wins when two scans auto-register the same student
    // concurrently; the loser reads the winning row back.
    let inserted: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO students (
             student_key, student_id, email, display_name,
             metadata, auto_created, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
           ON CONFLICT(student_key) DO NOTHING",
          rusqlite::params![
            key_str,
            student_id,
            email,
            display_name,
            metadata_str,
            auto_created,
            at_str,
          ],
        )?)
      })
      .await?;

    if inserted > 0 {
      return Ok(student);
    }
    match self.get_student(&student.student_key).await? {
      Some(existing) => Ok(existing),
      None => Err(Error::StudentMissing(student.student_key)),
    }
  }

  async fn get_student(&self, key: &StudentKey) -> Result<Option<StudentIdentity>> {
    let key_str = key.as_str().to_owned();

    let raw: Option<RawStudent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {STUDENT_COLS} FROM students WHERE student_key = ?1"),
              rusqlite::params![key_str],
              student_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawStudent::into_student).transpose()
  }

  async fn find_student_by_email(&self, email: &str) -> Result<Option<StudentIdentity>> {
    let needle = email.trim().to_ascii_lowercase();

    let raw: Option<RawStudent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {STUDENT_COLS} FROM students WHERE LOWER(email) = ?1"),
              rusqlite::params![needle],
              student_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawStudent::into_student).transpose()
  }

  async fn find_student_by_student_id(
    &self,
    student_id: &str,
  ) -> Result<Option<StudentIdentity>> {
    let needle = student_id.to_owned();

    let raw: Option<RawStudent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {STUDENT_COLS} FROM students WHERE student_id = ?1"),
              rusqlite::params![needle],
              student_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawStudent::into_student).transpose()
  }

  async fn find_student_by_name(&self, name: &str) -> Result<Option<StudentIdentity>> {
    let needle = name.to_owned();

    let raw: Option<RawStudent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {STUDENT_COLS} FROM students WHERE display_name = ?1"),
              rusqlite::params![needle],
              student_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawStudent::into_student).transpose()
  }

  // ── Shifts ────────────────────────────────────────────────────────────────

  async fn open_shift(&self, input: NewShift) -> Result<ShiftOpen> {
    let shift = Shift {
      shift_id:         Uuid::new_v4(),
      supervisor_id:    input.supervisor_id,
      supervisor_email: input.supervisor_email,
      status:           ShiftStatus::Open,
      started_at:       Utc::now(),
      closed_at:        None,
    };

    let id_str     = encode_uuid(shift.shift_id);
    let supervisor = shift.supervisor_id.clone();
    let email      = shift.supervisor_email.clone();
    let status_str = encode_shift_status(shift.status).to_owned();
    let at_str     = encode_dt(shift.started_at);

    // The partial unique index on open shifts arbitrates; no pre-check.
    let inserted: bool = self
      .conn
      .call(move |conn| {
        match conn.execute(
          "INSERT INTO shifts (
             shift_id, supervisor_id, supervisor_email, status, started_at, closed_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, NULL)",
          rusqlite::params![id_str, supervisor, email, status_str, at_str],
        ) {
          Ok(_) => Ok(true),
          Err(e) if is_unique_violation(&e) => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    if inserted {
      return Ok(ShiftOpen::Opened(shift));
    }

    match self.find_open_shift(&shift.supervisor_id).await? {
      Some(existing) => Ok(ShiftOpen::AlreadyOpen(existing)),
      None => Err(Error::OpenShiftMissing(shift.supervisor_id)),
    }
  }

  async fn close_shift(
    &self,
    shift_id: Uuid,
    supervisor_id: &str,
  ) -> Result<Option<Shift>> {
    let id_str     = encode_uuid(shift_id);
    let supervisor = supervisor_id.to_owned();
    let at_str     = encode_dt(Utc::now());

    let changed: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE shifts SET status = 'closed', closed_at = ?3
           WHERE shift_id = ?1 AND supervisor_id = ?2 AND status = 'open'",
          rusqlite::params![id_str, supervisor, at_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_shift(shift_id).await
  }

  async fn get_shift(&self, shift_id: Uuid) -> Result<Option<Shift>> {
    let id_str = encode_uuid(shift_id);

    let raw: Option<RawShift> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {SHIFT_COLS} FROM shifts WHERE shift_id = ?1"),
              rusqlite::params![id_str],
              shift_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawShift::into_shift).transpose()
  }

  // ── Attendance ────────────────────────────────────────────────────────────

  async fn insert_scan(&self, input: NewScan) -> Result<ScanInsert> {
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

    let id_str     = encode_uuid(record.record_id);
    let key_str    = record.student_key.as_str().to_owned();
    let shift_str  = encode_uuid(record.shift_id);
    let time_str   = encode_dt(record.scan_time);
    let day_str    = encode_day(record.scan_day);
    let supervisor = record.supervisor_id.clone();
    let location   = record.location.clone();
    let notes      = record.notes.clone();

    // The UNIQUE (student_key, scan_day) pair arbitrates between concurrent
    // inserts; exactly one wins.
    let inserted: bool = self
      .conn
      .call(move |conn| {
        match conn.execute(
          "INSERT INTO attendance (
             record_id, student_key, shift_id, scan_time, scan_day,
             supervisor_id, location, notes
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str, key_str, shift_str, time_str, day_str, supervisor, location,
            notes,
          ],
        ) {
          Ok(_) => Ok(true),
          Err(e) if is_unique_violation(&e) => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    if inserted {
      return Ok(ScanInsert::Recorded(record));
    }

    match self
      .find_scan_on_day(&record.student_key, record.scan_day)
      .await?
    {
      Some(existing) => Ok(ScanInsert::Duplicate(existing)),
      None => Err(Error::WinnerMissing {
        key: record.student_key,
        day: record.scan_day,
      }),
    }
  }

  async fn find_scan_on_day(
    &self,
    key: &StudentKey,
    day: NaiveDate,
  ) -> Result<Option<AttendanceRecord>> {
    let key_str = key.as_str().to_owned();
    let day_str = encode_day(day);

    let raw: Option<RawScan> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {SCAN_COLS} FROM attendance
                 WHERE student_key = ?1 AND scan_day = ?2"
              ),
              rusqlite::params![key_str, day_str],
              scan_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawScan::into_record).transpose()
  }

  async fn search_scans(&self, query: &AttendanceQuery) -> Result<Vec<AttendanceRecord>> {
    let key_str    = query.student_key.as_ref().map(|k| k.as_str().to_owned());
    let shift_str  = query.shift_id.map(encode_uuid);
    let day_str    = query.day.map(encode_day);
    let limit_val  = query.limit.unwrap_or(1000) as i64;
    let offset_val = query.offset.unwrap_or(0) as i64;

    let raws: Vec<RawScan> = self
      .conn
      .call(move |conn| {
        // Numbered placeholders keep the binding stable regardless of which
        // filters are present.
        let mut conds: Vec<&'static str> = vec![];
        if key_str.is_some() {
          conds.push("student_key = ?1");
        }
        if shift_str.is_some() {
          conds.push("shift_id = ?2");
        }
        if day_str.is_some() {
          conds.push("scan_day = ?3");
        }

        let where_clause = if conds.is_empty() {
          String::new()
        } else {
          format!("WHERE {}", conds.join(" AND "))
        };

        let sql = format!(
          "SELECT {SCAN_COLS} FROM attendance
           {where_clause}
           ORDER BY scan_time
           LIMIT ?4 OFFSET ?5"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              key_str.as_deref(),
              shift_str.as_deref(),
              day_str.as_deref(),
              limit_val,
              offset_val,
            ],
            scan_from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawScan::into_record).collect()
  }
}
