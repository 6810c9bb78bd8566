//! Student resolution — from parsed payload fields to a canonical identity.
//!
//! Lookup priority is email, then student id, then display name; first match
//! wins. An unmatched payload auto-registers a new student on the spot. That
//! favors availability over registration control — a walk-up payload mints a
//! real (flagged) identity — and is intentional.

use serde_json::Value;
use uuid::Uuid;

use crate::{
  store::RollcallStore,
  student::{NewStudent, StudentIdentity, StudentKey},
};

// ─── Input ───────────────────────────────────────────────────────────────────

/// Identity fields extracted from a scanned payload. Produced by the payload
/// codec; at least one of the three identity fields is always present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayloadFields {
  pub email:      Option<String>,
  pub student_id: Option<String>,
  pub full_name:  Option<String>,
  /// Opaque passthrough (college/major/grade), kept verbatim on
  /// auto-registration.
  pub metadata:   Value,
}

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// A resolved student, with a flag telling whether resolution had to
/// register them.
#[derive(Debug, Clone)]
pub struct Resolution {
  pub student:          StudentIdentity,
  pub newly_registered: bool,
}

// ─── Resolution ──────────────────────────────────────────────────────────────

/// Resolve `fields` to a student, auto-registering when nothing matches.
///
/// For a payload that resolves to an existing student, the returned key is
/// stable across calls.
pub async fn resolve<S>(
  store: &S,
  fields: &PayloadFields,
) -> Result<Resolution, S::Error>
where
  S: RollcallStore,
{
  if let Some(email) = &fields.email
    && let Some(student) = store.find_student_by_email(email).await?
  {
    return Ok(Resolution { student, newly_registered: false });
  }

  if let Some(id) = &fields.student_id
    && let Some(student) = store.find_student_by_student_id(id).await?
  {
    return Ok(Resolution { student, newly_registered: false });
  }

  if let Some(name) = &fields.full_name
    && let Some(student) = store.find_student_by_name(name).await?
  {
    return Ok(Resolution { student, newly_registered: false });
  }

  let student = store.add_student(auto_registration(fields)).await?;
  Ok(Resolution { student, newly_registered: true })
}

/// Build the auto-registered identity for an unmatched payload.
///
/// The key mirrors the lookup priority: email, else student id, else a
/// generated placeholder. A missing student id is generated so every
/// identity carries one.
fn auto_registration(fields: &PayloadFields) -> NewStudent {
  let email = fields.email.as_deref().map(|e| e.trim().to_ascii_lowercase());

  let (student_key, student_id) = match (&email, &fields.student_id) {
    (Some(e), id) => (
      StudentKey::from_email(e),
      id.clone().unwrap_or_else(generated_student_id),
    ),
    (None, Some(id)) => (StudentKey::from_student_id(id), id.clone()),
    (None, None) => {
      let placeholder = Uuid::new_v4();
      (StudentKey::placeholder(placeholder), generated_student_id())
    }
  };

  let display_name = fields
    .full_name
    .clone()
    .or_else(|| email.clone())
    .unwrap_or_else(|| student_id.clone());

  NewStudent {
    student_key,
    student_id,
    email,
    display_name,
    metadata: fields.metadata.clone(),
    auto_created: true,
  }
}

fn generated_student_id() -> String {
  format!("auto-{}", Uuid::new_v4().simple())
}
