//! Value types shared by publishers and stores
//!
//! - [`ProjectId`]: a validated, non-empty project identifier
//! - [`SecureSecret`]: a secret payload that is zeroed on drop and never printed

use crate::SecretError;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the cloud project that owns the secrets.
///
/// Fixed for the lifetime of whatever holds it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectId(String);

impl ProjectId {
    /// Create a project id, rejecting empty or whitespace-only values.
    ///
    /// # Errors
    /// Returns [`SecretError::InvalidProjectId`] for an empty id.
    pub fn new(id: impl Into<String>) -> Result<Self, SecretError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(SecretError::InvalidProjectId { project_id: id });
        }
        Ok(Self(id))
    }

    /// Borrow the raw id
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parent path used to scope project-level calls: `projects/{id}`
    #[must_use]
    pub fn parent(&self) -> String {
        format!("projects/{}", self.0)
    }

    /// Resource path of a secret in this project: `projects/{id}/secrets/{secret_id}`
    #[must_use]
    pub fn secret_path(&self, secret_id: &str) -> String {
        format!("projects/{}/secrets/{secret_id}", self.0)
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ProjectId {
    type Error = SecretError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProjectId> for String {
    fn from(id: ProjectId) -> Self {
        id.0
    }
}

impl std::str::FromStr for ProjectId {
    type Err = SecretError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Payload of one secret version.
///
/// Backed by `secrecy::SecretString`, so the value is zeroed when dropped.
/// `Debug` and `Display` print `[REDACTED]`; read it with [`Self::expose`]
/// or [`Self::as_bytes`].
#[derive(Clone)]
pub struct SecureSecret {
    inner: SecretString,
}

impl SecureSecret {
    /// Wrap a payload value
    #[must_use]
    pub fn new(value: String) -> Self {
        Self {
            inner: SecretString::from(value),
        }
    }

    /// Plain value. Never log it.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.inner.expose_secret()
    }

    /// Raw UTF-8 bytes of the value, as sent to the secret service
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.inner.expose_secret().as_bytes()
    }

    /// Payload length in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.expose_secret().len()
    }

    /// Whether the payload is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.expose_secret().is_empty()
    }
}

impl From<String> for SecureSecret {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for SecureSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecureSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}
