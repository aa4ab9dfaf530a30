//! Type-safe identifiers for verification records and users.
//!
//! [`VerificationId`] and [`UserId`] are newtypes over `String` so that a
//! user id can never be passed where a verification id is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Identifier of a purchase verification record.
///
/// Always a non-empty run of ASCII alphanumerics, since it is embedded in
/// the administrator's `ok <id>` reply and extracted back out of free text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerificationId(String);

impl VerificationId {
    /// Generates a fresh identifier (UUID v4 in simple, hyphen-free form).
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Validates and wraps an existing identifier.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if `raw` is empty or contains
    /// anything other than ASCII letters and digits.
    pub fn parse(raw: &str) -> Result<Self, GatewayError> {
        if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(GatewayError::InvalidRequest(format!(
                "invalid verification id: {raw:?}"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VerificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a user, matching the authentication identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Validates and wraps a user identifier.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if `raw` is blank.
    pub fn parse(raw: &str) -> Result<Self, GatewayError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(GatewayError::InvalidRequest(
                "user id must not be empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
