//! QR payload codec for Rollcall.
//!
//! Converts the opaque string carried by a scanned QR code into
//! [`rollcall_core`] payload fields. Pure synchronous; no HTTP or database
//! dependencies.
//!
//! Two shapes are accepted: a JSON object carrying identity fields, or a
//! bare token (an email address or a literal student id). Anything else is
//! a malformed payload.
//!
//! # Quick start
//!
//! ```
//! let fields = rollcall_payload::parse(r#"{"email":"ahmed@x.edu"}"#).unwrap();
//! assert_eq!(fields.email.as_deref(), Some("ahmed@x.edu"));
//! ```

pub mod error;
mod parse;

pub use error::{Error, Result};
use rollcall_core::resolver::PayloadFields;

/// Parse a raw scanned payload into identity fields.
///
/// At least one of email / student id / full name is present in a
/// successful result.
pub fn parse(raw: &str) -> Result<PayloadFields> { parse::parse_payload(raw) }
