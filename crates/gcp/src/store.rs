//! GCP Secret Manager store
//!
//! ## Configuration
//!
//! - `GOOGLE_APPLICATION_CREDENTIALS` - Optional path to the service account key
//!   (defaults to `service_acc_key.json` in the working directory)
//!
//! Secrets are created with automatic replication. Every version carries a
//! CRC32C checksum of its payload so the service can reject corrupted writes.

use async_trait::async_trait;
use envsecrets_secrets::{CreateOutcome, SecretError, SecretStore};
use google_secretmanager1::api::{
    AddSecretVersionRequest, Automatic, Replication, Secret, SecretPayload,
};
use google_secretmanager1::{SecretManager, hyper_rustls, hyper_util};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, error, info};

/// Key file used when neither a flag nor `GOOGLE_APPLICATION_CREDENTIALS` names one
pub const DEFAULT_CREDENTIALS_FILE: &str = "service_acc_key.json";

const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Configuration for the GCP Secret Manager store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GcpStoreConfig {
    /// Path to the service account key file
    #[serde(default = "default_credentials")]
    pub credentials: PathBuf,
}

fn default_credentials() -> PathBuf {
    PathBuf::from(DEFAULT_CREDENTIALS_FILE)
}

impl Default for GcpStoreConfig {
    fn default() -> Self {
        Self {
            credentials: default_credentials(),
        }
    }
}

impl GcpStoreConfig {
    /// Create a config using the given key file
    #[must_use]
    pub fn new(credentials: impl Into<PathBuf>) -> Self {
        Self {
            credentials: credentials.into(),
        }
    }

    /// Load configuration from the environment
    ///
    /// Uses `GOOGLE_APPLICATION_CREDENTIALS` when set, otherwise
    /// [`DEFAULT_CREDENTIALS_FILE`].
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var_os(CREDENTIALS_ENV)
            .filter(|path| !path.is_empty())
            .map_or_else(Self::default, Self::new)
    }
}

type Hub = SecretManager<
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>,
>;

/// Secret Manager backed [`SecretStore`]
pub struct GcpSecretStore {
    hub: Hub,
    credentials: PathBuf,
}

impl std::fmt::Debug for GcpSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcpSecretStore")
            .field("credentials", &self.credentials)
            .field("hub", &"[SecretManager]")
            .finish()
    }
}

impl GcpSecretStore {
    /// Build an authenticated store from a service account key file
    ///
    /// # Errors
    /// Returns [`SecretError::Credentials`] if the key file cannot be read or
    /// the authenticator cannot be built, or if the TLS roots cannot be loaded.
    pub async fn new(config: GcpStoreConfig) -> Result<Self, SecretError> {
        let credentials = config.credentials;
        let credentials_error = |message: String| SecretError::Credentials {
            path: credentials.display().to_string(),
            message,
        };

        install_crypto_provider();

        let client =
            hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
                .build(
                    hyper_rustls::HttpsConnectorBuilder::new()
                        .with_native_roots()
                        .map_err(|e| {
                            credentials_error(format!("Failed to load native TLS roots: {e}"))
                        })?
                        .https_or_http()
                        .enable_http1()
                        .enable_http2()
                        .build(),
                );

        let key = yup_oauth2::read_service_account_key(&credentials)
            .await
            .map_err(|e| credentials_error(format!("Failed to read service account key: {e}")))?;
        let auth = yup_oauth2::ServiceAccountAuthenticator::builder(key)
            .build()
            .await
            .map_err(|e| credentials_error(format!("Failed to build authenticator: {e}")))?;

        info!(
            credentials = %credentials.display(),
            "Initialized GCP Secret Manager store"
        );

        Ok(Self {
            hub: SecretManager::new(client, auth),
            credentials,
        })
    }
}

/// Make ring the process-wide rustls provider.
///
/// yup-oauth2 builds its own rustls client, so setting the provider on the hub
/// connector alone is not enough. With both ring and aws-lc-rs enabled in the
/// dependency graph rustls cannot pick one itself.
fn install_crypto_provider() {
    use rustls::crypto::{CryptoProvider, ring};

    if CryptoProvider::get_default().is_none()
        && ring::default_provider().install_default().is_err()
    {
        // Lost a race with another thread; its provider is in place
        debug!("rustls crypto provider already installed");
    }
}

/// Secret body requesting automatic replication
fn automatic_secret() -> Secret {
    Secret {
        replication: Some(Replication {
            automatic: Some(Automatic::default()),
            ..Replication::default()
        }),
        ..Secret::default()
    }
}

/// Version payload with its CRC32C checksum
fn checksummed_payload(data: &[u8]) -> SecretPayload {
    SecretPayload {
        data: Some(data.to_vec()),
        data_crc32c: Some(i64::from(crc32c::crc32c(data))),
        ..SecretPayload::default()
    }
}

/// Whether a service error reports that the resource is already present
fn is_already_exists(message: &str) -> bool {
    message.contains("ALREADY_EXISTS")
        || message.contains("\"code\":409")
        || message.contains("409 Conflict")
}

#[async_trait]
impl SecretStore for GcpSecretStore {
    async fn create_secret(
        &self,
        parent: &str,
        secret_id: &str,
    ) -> Result<CreateOutcome, SecretError> {
        debug!(parent, secret_id, "Creating secret in GCP Secret Manager");

        match self
            .hub
            .projects()
            .secrets_create(automatic_secret(), parent)
            .secret_id(secret_id)
            .doit()
            .await
        {
            Ok((_, secret)) => Ok(CreateOutcome::Created {
                name: secret
                    .name
                    .unwrap_or_else(|| format!("{parent}/secrets/{secret_id}")),
            }),
            Err(e) => {
                let message = e.to_string();
                if is_already_exists(&message) {
                    debug!(parent, secret_id, "Secret already exists in GCP");
                    Ok(CreateOutcome::AlreadyExists)
                } else {
                    error!(parent, secret_id, error = %message, "Failed to create secret");
                    Err(SecretError::Api {
                        operation: "create_secret",
                        resource: format!("{parent}/secrets/{secret_id}"),
                        message,
                    })
                }
            }
        }
    }

    async fn add_version(&self, secret: &str, payload: &[u8]) -> Result<String, SecretError> {
        debug!(secret, bytes = payload.len(), "Adding secret version in GCP");

        let request = AddSecretVersionRequest {
            payload: Some(checksummed_payload(payload)),
        };

        match self
            .hub
            .projects()
            .secrets_add_version(request, secret)
            .doit()
            .await
        {
            Ok((_, version)) => version.name.ok_or_else(|| SecretError::Api {
                operation: "add_version",
                resource: secret.to_string(),
                message: "response did not include a version name".to_string(),
            }),
            Err(e) => {
                error!(secret, error = %e, "Failed to add secret version");
                Err(SecretError::Api {
                    operation: "add_version",
                    resource: secret.to_string(),
                    message: e.to_string(),
                })
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "gcp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const TEST_PRIVATE_KEY: &str = include_str!("../testdata/service_account_key.pem");

    #[test]
    fn test_config_default_credentials() {
        let config = GcpStoreConfig::default();
        assert_eq!(config.credentials, PathBuf::from("service_acc_key.json"));
    }

    #[test]
    fn test_config_from_env_uses_application_credentials() {
        temp_env::with_var(CREDENTIALS_ENV, Some("/tmp/sa.json"), || {
            let config = GcpStoreConfig::from_env();
            assert_eq!(config.credentials, PathBuf::from("/tmp/sa.json"));
        });
    }

    #[test]
    fn test_config_from_env_falls_back_to_default() {
        temp_env::with_var_unset(CREDENTIALS_ENV, || {
            assert_eq!(GcpStoreConfig::from_env(), GcpStoreConfig::default());
        });
        temp_env::with_var(CREDENTIALS_ENV, Some(""), || {
            assert_eq!(GcpStoreConfig::from_env(), GcpStoreConfig::default());
        });
    }

    #[test]
    fn test_config_deserialization_with_defaults() {
        let config: GcpStoreConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, GcpStoreConfig::default());

        let config: GcpStoreConfig =
            serde_json::from_str(r#"{"credentials": "keys/prod.json"}"#).unwrap();
        assert_eq!(config.credentials, PathBuf::from("keys/prod.json"));
    }

    #[test]
    fn test_automatic_secret_replication() {
        let secret = automatic_secret();
        let replication = secret.replication.unwrap();
        assert!(replication.automatic.is_some());
        assert!(replication.user_managed.is_none());
        assert!(secret.name.is_none());
    }

    #[test]
    fn test_checksummed_payload() {
        let payload = checksummed_payload(b"hunter2");
        assert_eq!(payload.data.as_deref(), Some(b"hunter2".as_slice()));
        assert_eq!(
            payload.data_crc32c,
            Some(i64::from(crc32c::crc32c(b"hunter2")))
        );
        // CRC32C check value from RFC 3720
        assert_eq!(checksummed_payload(b"123456789").data_crc32c, Some(0xE306_9283));
    }

    #[test]
    fn test_is_already_exists() {
        assert!(is_already_exists(
            r#"Bad Request: {"error":{"code":409,"message":"Secret [projects/1/secrets/A] already exists.","status":"ALREADY_EXISTS"}}"#
        ));
        assert!(!is_already_exists(
            r#"Bad Request: {"error":{"code":403,"status":"PERMISSION_DENIED"}}"#
        ));
        assert!(!is_already_exists("connection refused"));
        // project numbers that happen to contain 409 are not conflicts
        assert!(!is_already_exists(
            r#"Bad Request: {"error":{"code":404,"message":"projects/14093/secrets/A not found"}}"#
        ));
    }

    #[tokio::test]
    async fn test_new_with_missing_key_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = GcpStoreConfig::new(dir.path().join("missing.json"));

        let err = GcpSecretStore::new(config).await.unwrap_err();

        assert!(matches!(err, SecretError::Credentials { .. }));
        assert!(err.to_string().contains("missing.json"));
    }

    fn service_account_key(base_url: &str) -> serde_json::Value {
        json!({
            "type": "service_account",
            "project_id": "p",
            "private_key_id": "test-key",
            "private_key": TEST_PRIVATE_KEY,
            "client_email": "envsecrets@p.iam.gserviceaccount.com",
            "client_id": "1",
            "auth_uri": format!("{base_url}auth"),
            "token_uri": format!("{base_url}token"),
        })
    }

    /// Request line and body of one HTTP/1.1 request
    async fn read_request(socket: &mut TcpStream) -> (String, String) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before headers ended");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while buf.len() < header_end + length {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        let request_line = head.lines().next().unwrap_or_default().to_string();
        let body = String::from_utf8_lossy(&buf[header_end..]).to_string();
        (request_line, body)
    }

    /// Canned responses keyed on the secret id in the request
    fn respond(request_line: &str) -> (&'static str, serde_json::Value) {
        let path = request_line.split_whitespace().nth(1).unwrap_or_default();
        if path.starts_with("/token") {
            (
                "200 OK",
                json!({"access_token": "test-token", "token_type": "Bearer", "expires_in": 3600}),
            )
        } else if path.contains("secretId=EXISTING") {
            (
                "409 Conflict",
                json!({"error": {
                    "code": 409,
                    "message": "Secret [projects/p/secrets/EXISTING] already exists.",
                    "status": "ALREADY_EXISTS"
                }}),
            )
        } else if path.contains("secretId=DENIED") {
            (
                "403 Forbidden",
                json!({"error": {
                    "code": 403,
                    "message": "Permission denied on resource project p.",
                    "status": "PERMISSION_DENIED"
                }}),
            )
        } else if path.contains("secretId=NEW") {
            (
                "200 OK",
                json!({"name": "projects/p/secrets/NEW", "replication": {"automatic": {}}}),
            )
        } else if path.contains("/secrets/NEW:addVersion") {
            ("200 OK", json!({"name": "projects/p/secrets/NEW/versions/1"}))
        } else {
            (
                "404 Not Found",
                json!({"error": {"code": 404, "status": "NOT_FOUND"}}),
            )
        }
    }

    /// Serve the token endpoint and the Secret Manager calls on a local port.
    /// Returns the base URL and every request seen as `"<request line>\n<body>"`.
    async fn spawn_secret_manager() -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&requests);
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let seen = Arc::clone(&seen);
                tokio::spawn(async move {
                    let (request_line, body) = read_request(&mut socket).await;
                    let (status, response) = respond(&request_line);
                    seen.lock().unwrap().push(format!("{request_line}\n{body}"));
                    let response = response.to_string();
                    let reply = format!(
                        "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{response}",
                        response.len()
                    );
                    socket.write_all(reply.as_bytes()).await.unwrap();
                    let _ = socket.shutdown().await;
                });
            }
        });

        (base_url, requests)
    }

    #[tokio::test]
    async fn test_store_calls_secret_manager() {
        let (base_url, requests) = spawn_secret_manager().await;
        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("service_acc_key.json");
        std::fs::write(&key_path, service_account_key(&base_url).to_string()).unwrap();

        let mut store = GcpSecretStore::new(GcpStoreConfig::new(&key_path))
            .await
            .unwrap();
        store.hub.base_url(base_url.clone());

        assert_eq!(
            store.create_secret("projects/p", "EXISTING").await.unwrap(),
            CreateOutcome::AlreadyExists
        );

        let err = store.create_secret("projects/p", "DENIED").await.unwrap_err();
        assert!(matches!(
            err,
            SecretError::Api {
                operation: "create_secret",
                ..
            }
        ));
        assert!(err.to_string().contains("PERMISSION_DENIED"));

        assert_eq!(
            store.create_secret("projects/p", "NEW").await.unwrap(),
            CreateOutcome::Created {
                name: "projects/p/secrets/NEW".to_string()
            }
        );
        let version = store
            .add_version("projects/p/secrets/NEW", b"hunter2")
            .await
            .unwrap();
        assert_eq!(version, "projects/p/secrets/NEW/versions/1");

        let requests = requests.lock().unwrap();
        assert!(requests.iter().any(|r| r.starts_with("POST /token")));
        let create = requests
            .iter()
            .find(|r| r.contains("secretId=NEW"))
            .unwrap();
        assert!(create.starts_with("POST /v1/projects/p/secrets?"));
        assert!(create.contains("automatic"));
        let add = requests
            .iter()
            .find(|r| r.contains(":addVersion"))
            .unwrap();
        assert!(add.starts_with("POST /v1/projects/p/secrets/NEW:addVersion"));
        assert!(add.contains("aHVudGVyMg"));
        assert!(add.contains("dataCrc32c"));
        assert!(add.contains(&crc32c::crc32c(b"hunter2").to_string()));
    }
}
