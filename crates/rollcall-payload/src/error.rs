//! Error type for `rollcall-payload`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The payload is neither a usable JSON object nor a plausible bare
  /// token. Permanent for this input; scanning it again cannot help.
  #[error("malformed payload: {0}")]
  MalformedPayload(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
