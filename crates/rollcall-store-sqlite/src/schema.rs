//! SQL schema for the Rollcall SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS students (
    student_key   TEXT PRIMARY KEY,
    student_id    TEXT NOT NULL,
    email         TEXT,            -- stored lowercased; NULL for id/name-only
    display_name  TEXT NOT NULL,
    metadata      TEXT NOT NULL DEFAULT 'null',  -- opaque JSON passthrough
    auto_created  INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL    -- ISO 8601 UTC; server-assigned
);

CREATE INDEX IF NOT EXISTS students_email_idx ON students(email);
CREATE INDEX IF NOT EXISTS students_sid_idx   ON students(student_id);

CREATE TABLE IF NOT EXISTS shifts (
    shift_id         TEXT PRIMARY KEY,
    supervisor_id    TEXT NOT NULL,
    supervisor_email TEXT NOT NULL,
    status           TEXT NOT NULL,   -- 'open' | 'closed'
    started_at       TEXT NOT NULL,
    closed_at        TEXT
);

-- At most one open shift per supervisor.
CREATE UNIQUE INDEX IF NOT EXISTS shifts_one_open_idx
    ON shifts(supervisor_id) WHERE status = 'open';

-- Attendance is strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
-- The UNIQUE pair is the linearization point for concurrent scans of the
-- same student: exactly one insert per admission window wins.
CREATE TABLE IF NOT EXISTS attendance (
    record_id     TEXT PRIMARY KEY,
    student_key   TEXT NOT NULL REFERENCES students(student_key),
    shift_id      TEXT NOT NULL REFERENCES shifts(shift_id),
    scan_time     TEXT NOT NULL,   -- ISO 8601 UTC
    scan_day      TEXT NOT NULL,   -- YYYY-MM-DD in the reference timezone
    supervisor_id TEXT NOT NULL,
    location      TEXT,
    notes         TEXT,
    UNIQUE (student_key, scan_day)
);

CREATE INDEX IF NOT EXISTS attendance_shift_idx ON attendance(shift_id);
CREATE INDEX IF NOT EXISTS attendance_day_idx   ON attendance(scan_day);

PRAGMA user_version = 1;
";
