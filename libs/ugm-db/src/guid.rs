//! Identifier codec for principal keys.
//!
//! Every backend stores identifiers as `CHAR(32)` lowercase hex without
//! hyphens, so entity models keep one shape. `None` passes through both
//! directions unchanged.

use thiserror::Error;
use uuid::Uuid;

/// Length of the hex representation.
pub const HEX_LEN: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GuidError {
    #[error("invalid stored identifier '{value}': {reason}")]
    Invalid { value: String, reason: String },
}

/// Encode into the hex form.
#[must_use]
pub fn encode(value: Option<Uuid>) -> Option<String> {
    value.map(|v| v.simple().to_string())
}

/// Decode a stored identifier.
///
/// Accepts the 32-digit hex form as well as the hyphenated canonical form.
///
/// # Errors
/// Returns [`GuidError::Invalid`] when the stored text is not an identifier.
pub fn decode(stored: Option<&str>) -> Result<Option<Uuid>, GuidError> {
    let Some(raw) = stored else {
        return Ok(None);
    };
    Uuid::try_parse(raw.trim())
        .map(Some)
        .map_err(|e| GuidError::Invalid {
            value: raw.to_owned(),
            reason: e.to_string(),
        })
}

/// Generate a fresh identifier in hex form.
#[must_use]
pub fn new_hex() -> String {
    Uuid::new_v4().simple().to_string()
}
