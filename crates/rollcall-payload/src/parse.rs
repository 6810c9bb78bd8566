//! Payload parsing internals.

use rollcall_core::resolver::PayloadFields;
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Keys copied verbatim into `metadata` when present on a JSON payload.
const PASSTHROUGH_KEYS: [&str; 3] = ["college", "major", "grade"];

pub(crate) fn parse_payload(raw: &str) -> Result<PayloadFields> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return Err(Error::MalformedPayload("empty payload"));
  }

  // Structured form first. A JSON scalar (a bare number would parse) is not
  // a structured payload; fall through to token handling of the raw text.
  if let Ok(value) = serde_json::from_str::<Value>(trimmed)
    && let Value::Object(obj) = value
  {
    return from_object(&obj);
  }

  from_token(trimmed)
}

// ─── Structured payloads ─────────────────────────────────────────────────────

fn from_object(obj: &Map<String, Value>) -> Result<PayloadFields> {
  let email = string_field(obj, &["email"]);
  let student_id = string_field(obj, &["studentId", "student_id"]);
  let full_name = string_field(obj, &["fullName", "name", "full_name"]);

  if email.is_none() && student_id.is_none() && full_name.is_none() {
    return Err(Error::MalformedPayload("object carries no identity fields"));
  }

  let mut metadata = Map::new();
  for key in PASSTHROUGH_KEYS {
    if let Some(v) = obj.get(key) {
      metadata.insert(key.to_owned(), v.clone());
    }
  }
  let metadata = if metadata.is_empty() {
    Value::Null
  } else {
    Value::Object(metadata)
  };

  Ok(PayloadFields { email, student_id, full_name, metadata })
}

/// First non-empty string value among `keys`, trimmed.
fn string_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
  keys
    .iter()
    .filter_map(|k| obj.get(*k))
    .filter_map(Value::as_str)
    .map(str::trim)
    .find(|s| !s.is_empty())
    .map(str::to_owned)
}

// ─── Bare tokens ─────────────────────────────────────────────────────────────

fn from_token(token: &str) -> Result<PayloadFields> {
  if looks_like_email(token) {
    return Ok(PayloadFields {
      email: Some(token.to_owned()),
      ..PayloadFields::default()
    });
  }
  if plausible_student_id(token) {
    return Ok(PayloadFields {
      student_id: Some(token.to_owned()),
      ..PayloadFields::default()
    });
  }
  Err(Error::MalformedPayload("not a JSON object, email, or student id"))
}

fn looks_like_email(s: &str) -> bool {
  fn plain(part: &str) -> bool {
    part
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+'))
  }
  let Some((local, domain)) = s.split_once('@') else {
    return false;
  };
  !local.is_empty()
    && plain(local)
    && plain(domain)
    && domain.contains('.')
    && !domain.starts_with('.')
    && !domain.ends_with('.')
}

fn plausible_student_id(s: &str) -> bool {
  s.len() <= 64
    && s
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn json_object_with_all_fields() {
    let fields = parse_payload(
      r#"{"email":"Ahmed@X.edu","studentId":"S1","fullName":"Ahmed Hassan"}"#,
    )
    .unwrap();
    assert_eq!(fields.email.as_deref(), Some("Ahmed@X.edu"));
    assert_eq!(fields.student_id.as_deref(), Some("S1"));
    assert_eq!(fields.full_name.as_deref(), Some("Ahmed Hassan"));
  }

  #[test]
  fn snake_case_aliases_are_accepted() {
    let fields =
      parse_payload(r#"{"student_id":"S2","full_name":"Mona"}"#).unwrap();
    assert_eq!(fields.student_id.as_deref(), Some("S2"));
    assert_eq!(fields.full_name.as_deref(), Some("Mona"));
  }

  #[test]
  fn name_key_is_an_alias_for_full_name() {
    let fields = parse_payload(r#"{"name":"Mona Ali"}"#).unwrap();
    assert_eq!(fields.full_name.as_deref(), Some("Mona Ali"));
  }

  #[test]
  fn empty_strings_do_not_count_as_fields() {
    let err = parse_payload(r#"{"email":"","studentId":"  "}"#).unwrap_err();
    assert!(matches!(err, Error::MalformedPayload(_)));
  }

  #[test]
  fn metadata_keys_pass_through() {
    let fields = parse_payload(
      r#"{"studentId":"S1","college":"Engineering","grade":3,"unrelated":true}"#,
    )
    .unwrap();
    assert_eq!(fields.metadata["college"], "Engineering");
    assert_eq!(fields.metadata["grade"], 3);
    assert!(fields.metadata.get("unrelated").is_none());
  }

  #[test]
  fn object_without_identity_fields_is_malformed() {
    let err = parse_payload(r#"{"college":"Engineering"}"#).unwrap_err();
    assert!(matches!(err, Error::MalformedPayload(_)));
  }

  #[test]
  fn bare_email_token() {
    let fields = parse_payload("ahmed@x.edu").unwrap();
    assert_eq!(fields.email.as_deref(), Some("ahmed@x.edu"));
    assert!(fields.student_id.is_none());
  }

  #[test]
  fn bare_id_token() {
    let fields = parse_payload("  S-2024.001  ").unwrap();
    assert_eq!(fields.student_id.as_deref(), Some("S-2024.001"));
  }

  #[test]
  fn numeric_token_is_a_student_id_not_json() {
    // "12345" parses as a JSON number; it must still resolve as an id.
    let fields = parse_payload("12345").unwrap();
    assert_eq!(fields.student_id.as_deref(), Some("12345"));
  }

  #[test]
  fn garbage_is_malformed() {
    assert!(parse_payload("!!!not-json-or-email").is_err());
  }

  #[test]
  fn empty_and_whitespace_are_malformed() {
    assert!(parse_payload("").is_err());
    assert!(parse_payload("   ").is_err());
  }

  #[test]
  fn email_shape_edge_cases() {
    assert!(looks_like_email("a@b.c"));
    assert!(!looks_like_email("@b.c"));
    assert!(!looks_like_email("a@b"));
    assert!(!looks_like_email("a@.c"));
    assert!(!looks_like_email("a@b.c."));
    assert!(!looks_like_email("a b@c.d"));
    assert!(!looks_like_email("a@b@c.d"));
    assert!(!looks_like_email("\"a@b.c\""));
  }

  #[test]
  fn overlong_token_is_malformed() {
    let long = "x".repeat(65);
    assert!(parse_payload(&long).is_err());
  }
}
