//! Student identity — the canonical entity behind every scanned payload.
//!
//! A scanned QR payload never carries a trustworthy primary key. The resolver
//! reduces whatever fields it finds to a single [`StudentKey`], and that key
//! is the only identifier the admission path ever compares.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── StudentKey ──────────────────────────────────────────────────────────────

/// Canonical student identifier used for duplicate detection.
///
/// Produced only by the resolver: a lowercased email when the payload has
/// one, else the literal student id, else a generated placeholder id.
/// Derivation is deterministic for a given payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentKey(String);

impl StudentKey {
  /// Key for a student identified by email. Case-insensitive by
  /// construction: the address is trimmed and lowercased.
  pub fn from_email(email: &str) -> Self {
    Self(email.trim().to_ascii_lowercase())
  }

  /// Key for a student identified by an institutional id.
  pub fn from_student_id(id: &str) -> Self { Self(id.trim().to_owned()) }

  /// Key for a walk-up student with neither email nor id in the payload.
  pub fn placeholder(id: Uuid) -> Self { Self(format!("anon-{}", id.simple())) }

  /// Rehydrate a key previously issued by the resolver — storage rows and
  /// URL paths round-trip through this. Not for deriving keys from raw
  /// payload fields.
  pub fn from_canonical(key: String) -> Self { Self(key) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl std::fmt::Display for StudentKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

// ─── StudentIdentity ─────────────────────────────────────────────────────────

/// The resolved student entity. Created on the first unseen scan
/// (auto-registration) and never deleted by the admission path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentIdentity {
  pub student_key:  StudentKey,
  pub student_id:   String,
  /// Stored lowercased; absent for id-only or name-only registrations.
  pub email:        Option<String>,
  pub display_name: String,
  /// Opaque passthrough (college/major/grade). Never interpreted here.
  pub metadata:     serde_json::Value,
  /// True when the record was synthesized from a scan rather than entered
  /// through registration. Walk-up identities are admitted knowingly.
  pub auto_created: bool,
  pub created_at:   DateTime<Utc>,
}

// ─── NewStudent ──────────────────────────────────────────────────────────────

/// Input to [`crate::store::RollcallStore::add_student`].
/// `created_at` is always set by the store; it is not accepted from callers.
#[derive(Debug, Clone)]
pub struct NewStudent {
  pub student_key:  StudentKey,
  pub student_id:   String,
  pub email:        Option<String>,
  pub display_name: String,
  pub metadata:     serde_json::Value,
  pub auto_created: bool,
}
