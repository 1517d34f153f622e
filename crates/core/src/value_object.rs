//! Value objects: equality by value, validated at construction.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Marker trait for value objects.
///
/// Value objects should be immutable and compared by their contained values.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// Maximum post body length, measured in code units.
pub const MAX_BODY_CHARS: usize = 280;

/// Username bounds (bytes; the allowed alphabet is single-byte).
pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 20;

/// A validated username.
///
/// 3–20 characters from `[A-Za-z0-9_]`. Equality is byte-exact; global
/// uniqueness is enforced at command time against the read store, not here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    pub fn new(raw: impl Into<String>) -> Result<Self, DomainError> {
        let raw = raw.into();
        if raw.len() < MIN_USERNAME_LEN || raw.len() > MAX_USERNAME_LEN {
            return Err(DomainError::invalid_username(format!(
                "length must be {MIN_USERNAME_LEN}..={MAX_USERNAME_LEN}, got {}",
                raw.len()
            )));
        }
        if !raw.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
            return Err(DomainError::invalid_username(
                "only [A-Za-z0-9_] is allowed",
            ));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for Username {}

impl core::fmt::Display for Username {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A validated post body.
///
/// Must be non-empty after whitespace trim and at most [`MAX_BODY_CHARS`]
/// code units. The original input is stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostBody(String);

impl PostBody {
    pub fn new(raw: impl Into<String>) -> Result<Self, DomainError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(DomainError::invalid_body("body cannot be empty"));
        }
        let chars = raw.chars().count();
        if chars > MAX_BODY_CHARS {
            return Err(DomainError::invalid_body(format!(
                "body is {chars} characters, maximum is {MAX_BODY_CHARS}"
            )));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for PostBody {}

impl core::fmt::Display for PostBody {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PostBody {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
