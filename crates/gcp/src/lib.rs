//! GCP integration for envsecrets
//!
//! Provides [`GcpSecretStore`], a [`SecretStore`](envsecrets_secrets::SecretStore)
//! backed by the Google Cloud Secret Manager REST API and authenticated with a
//! service account key file.

pub mod store;

// Re-export main types for convenience
pub use store::{DEFAULT_CREDENTIALS_FILE, GcpSecretStore, GcpStoreConfig};
