//! Command implementations

pub mod grants;
pub mod publish;

pub use grants::{execute_grants, grant_target, write_grants};
pub use publish::{PublishSummary, execute_publish};

use crate::cli::{CliError, Commands, OnExisting};
use envsecrets_envfile::EnvEntries;
use envsecrets_gcp::{GcpSecretStore, GcpStoreConfig};
use envsecrets_secrets::{ProjectId, SecretPublisher};
use std::io;
use std::path::PathBuf;

/// Whether a command talks to the secret service and needs the tokio runtime
#[must_use]
pub const fn requires_async_runtime(command: &Commands) -> bool {
    match command {
        Commands::Publish { .. } => true,
        Commands::Grants { .. } => false,
    }
}

/// Run a command that needs no runtime, writing its output to stdout
///
/// # Errors
/// Returns the command's error; see [`crate::cli::exit_code_for`]. Commands
/// for which [`requires_async_runtime`] holds are rejected.
pub fn execute_sync(command: Commands, project: &str) -> Result<(), CliError> {
    match command {
        Commands::Grants { env_file, backend } => {
            let target = grant_target(project, backend.as_deref())?;
            let mut stdout = io::stdout().lock();
            execute_grants(&env_file.env_file, target, &mut stdout).map(|_| ())
        }
        Commands::Publish { .. } => Err(CliError::other(
            "publish must run on the tokio runtime",
        )),
    }
}

/// Run any command on the current tokio runtime
///
/// # Errors
/// Returns the command's error; see [`crate::cli::exit_code_for`].
pub async fn execute_async(command: Commands, project: &str) -> Result<(), CliError> {
    match command {
        Commands::Publish {
            env_file,
            credentials,
            on_existing,
            keys,
        } => run_publish(project, env_file.env_file, credentials, on_existing, &keys).await,
        grants @ Commands::Grants { .. } => execute_sync(grants, project),
    }
}

async fn run_publish(
    project: &str,
    env_file: PathBuf,
    credentials: PathBuf,
    on_existing: OnExisting,
    keys: &[String],
) -> Result<(), CliError> {
    let project = ProjectId::new(project)?;
    // Open the env file before authenticating so a typo fails fast
    let entries = EnvEntries::open(&env_file)?;
    let store = GcpSecretStore::new(GcpStoreConfig::new(credentials)).await?;
    let publisher = SecretPublisher::new(store, project).with_existing_policy(on_existing.into());

    let mut stdout = io::stdout().lock();
    let summary = execute_publish(&publisher, entries, keys, &mut stdout).await?;
    tracing::debug!(?summary, env_file = %env_file.display(), "Publish command completed");
    Ok(())
}
