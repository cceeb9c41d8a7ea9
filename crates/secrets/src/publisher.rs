//! Create-if-missing then append-version publishing

use crate::{CreateOutcome, ProjectId, SecretError, SecretStore, SecureSecret};
use serde::{Deserialize, Serialize};

/// What to do when the secret container already exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExistingSecretPolicy {
    /// Leave the existing secret untouched and add no version
    #[default]
    Skip,
    /// Append a new version to the existing secret
    AddVersion,
}

/// Result of publishing one secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// A new container was created and the payload stored as its first version
    Created {
        /// Resource name of the container
        secret: String,
        /// Resource name of the new version
        version: String,
    },
    /// The container already existed and nothing was written
    Skipped {
        /// Resource path of the existing container
        secret: String,
    },
    /// The container already existed and a new version was appended
    VersionAdded {
        /// Resource path of the existing container
        secret: String,
        /// Resource name of the new version
        version: String,
    },
}

impl PublishOutcome {
    /// Resource name of the version written, if any
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        match self {
            Self::Created { version, .. } | Self::VersionAdded { version, .. } => Some(version),
            Self::Skipped { .. } => None,
        }
    }
}

/// Publishes secret payloads into a fixed project through a [`SecretStore`].
#[derive(Debug)]
pub struct SecretPublisher<S> {
    store: S,
    project: ProjectId,
    on_existing: ExistingSecretPolicy,
}

impl<S: SecretStore> SecretPublisher<S> {
    /// Create a publisher that skips secrets that already exist
    #[must_use]
    pub fn new(store: S, project: ProjectId) -> Self {
        Self {
            store,
            project,
            on_existing: ExistingSecretPolicy::default(),
        }
    }

    /// Set the policy applied to secrets that already exist
    #[must_use]
    pub fn with_existing_policy(mut self, policy: ExistingSecretPolicy) -> Self {
        self.on_existing = policy;
        self
    }

    /// Project this publisher writes into
    #[must_use]
    pub fn project(&self) -> &ProjectId {
        &self.project
    }

    /// Underlying store
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Ensure the secret `secret_id` exists and store `payload` as a new version.
    ///
    /// An already existing secret is not an error. Under
    /// [`ExistingSecretPolicy::Skip`] it is left untouched.
    ///
    /// # Errors
    /// Returns [`SecretError::InvalidSecretId`] for an empty id, or the
    /// store's error if creating the secret or adding the version fails.
    /// There are no retries.
    pub async fn publish(
        &self,
        secret_id: &str,
        payload: &SecureSecret,
    ) -> Result<PublishOutcome, SecretError> {
        validate_secret_id(secret_id)?;

        let parent = self.project.parent();
        let secret_path = self.project.secret_path(secret_id);

        let created = match self.store.create_secret(&parent, secret_id).await? {
            CreateOutcome::Created { name } => {
                tracing::info!(
                    provider = self.store.provider_name(),
                    secret = %name,
                    "Added secret"
                );
                Some(name)
            }
            CreateOutcome::AlreadyExists => match self.on_existing {
                ExistingSecretPolicy::Skip => {
                    tracing::info!(
                        secret_id,
                        project = %self.project,
                        "Secret already exists, skipping creation"
                    );
                    return Ok(PublishOutcome::Skipped {
                        secret: secret_path,
                    });
                }
                ExistingSecretPolicy::AddVersion => {
                    tracing::info!(
                        secret_id,
                        project = %self.project,
                        "Secret already exists, adding a new version"
                    );
                    None
                }
            },
        };

        let version = self
            .store
            .add_version(&secret_path, payload.as_bytes())
            .await?;
        tracing::info!(version = %version, bytes = payload.len(), "Added secret version");

        Ok(match created {
            Some(secret) => PublishOutcome::Created { secret, version },
            None => PublishOutcome::VersionAdded {
                secret: secret_path,
                version,
            },
        })
    }
}

fn validate_secret_id(secret_id: &str) -> Result<(), SecretError> {
    if secret_id.is_empty() {
        return Err(SecretError::InvalidSecretId {
            secret_id: secret_id.to_string(),
            reason: "secret id must not be empty".to_string(),
        });
    }
    Ok(())
}
