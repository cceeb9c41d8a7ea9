//! Secret publishing for envsecrets
//!
//! Provides a [`SecretPublisher`] that makes sure a secret container exists in
//! a project and appends a new version holding the payload bytes. The actual
//! service is reached through the [`SecretStore`] trait so that providers
//! (GCP Secret Manager, in-memory fakes in tests) can be swapped.
//!
//! # Example
//!
//! ```ignore
//! use envsecrets_secrets::{ProjectId, SecretPublisher, SecureSecret};
//!
//! let publisher = SecretPublisher::new(store, ProjectId::new("my-project")?);
//! let outcome = publisher
//!     .publish("DB_PASSWORD", &SecureSecret::new("hunter2".to_string()))
//!     .await?;
//! ```

mod publisher;
mod types;

pub use publisher::{ExistingSecretPolicy, PublishOutcome, SecretPublisher};
pub use types::{ProjectId, SecureSecret};

use async_trait::async_trait;
use thiserror::Error;

/// Error types for secret publishing
#[derive(Debug, Error)]
pub enum SecretError {
    /// Secret ids must be non-empty
    #[error("Invalid secret id '{secret_id}': {reason}")]
    InvalidSecretId {
        /// The rejected id
        secret_id: String,
        /// Why it was rejected
        reason: String,
    },

    /// Project ids must be non-empty
    #[error("Invalid project id '{project_id}'")]
    InvalidProjectId {
        /// The rejected id
        project_id: String,
    },

    /// Credentials could not be loaded or exchanged for a token
    #[error("Failed to load credentials from '{path}': {message}")]
    Credentials {
        /// Path of the credential file
        path: String,
        /// Error message from the loader
        message: String,
    },

    /// The secret service rejected or failed a call
    #[error("Secret service call '{operation}' failed for '{resource}': {message}")]
    Api {
        /// Operation that failed (e.g. `create_secret`)
        operation: &'static str,
        /// Resource path the call was scoped to
        resource: String,
        /// Error message from the provider
        message: String,
    },
}

/// Result of asking a store to create a secret container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The container was created; `name` is its full resource name
    Created {
        /// Resource name returned by the service
        name: String,
    },
    /// A container with the requested id is already present
    AlreadyExists,
}

/// Trait for secret services that hold versioned secrets.
///
/// Implementors must map the provider's "already exists" condition to
/// [`CreateOutcome::AlreadyExists`] instead of an error; every other failure
/// is returned as [`SecretError`].
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Create a secret container with automatic replication under `parent`
    /// (`projects/{project}`).
    async fn create_secret(
        &self,
        parent: &str,
        secret_id: &str,
    ) -> Result<CreateOutcome, SecretError>;

    /// Append a version holding `payload` to the secret at `secret`
    /// (`projects/{project}/secrets/{id}`), returning the version's resource name.
    async fn add_version(&self, secret: &str, payload: &[u8]) -> Result<String, SecretError>;

    /// Get the provider name for this store.
    ///
    /// Examples: `"gcp"`, `"memory"`
    fn provider_name(&self) -> &'static str;
}

#[async_trait]
impl<S: SecretStore + ?Sized> SecretStore for std::sync::Arc<S> {
    async fn create_secret(
        &self,
        parent: &str,
        secret_id: &str,
    ) -> Result<CreateOutcome, SecretError> {
        (**self).create_secret(parent, secret_id).await
    }

    async fn add_version(&self, secret: &str, payload: &[u8]) -> Result<String, SecretError> {
        (**self).add_version(secret, payload).await
    }

    fn provider_name(&self) -> &'static str {
        (**self).provider_name()
    }
}
