//! `envsecrets publish`: create secrets from env file entries

use crate::cli::CliError;
use envsecrets_envfile::{EnvEntry, EnvFileError};
use envsecrets_secrets::{PublishOutcome, SecretPublisher, SecretStore};
use std::collections::BTreeSet;
use std::io::Write;

/// Counts of what a publish run did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishSummary {
    /// Secrets created with a first version
    pub created: usize,
    /// Existing secrets given a new version
    pub versions_added: usize,
    /// Existing secrets left untouched
    pub skipped: usize,
}

/// Publish entries one at a time, in file order, stopping at the first error.
///
/// With a non-empty `keys`, only entries whose key is listed are published.
/// Results are written to `out` as they happen.
///
/// # Errors
/// Returns the first env file, secret service or write error. Secrets
/// published before the error are not rolled back.
pub async fn execute_publish<S, I>(
    publisher: &SecretPublisher<S>,
    entries: I,
    keys: &[String],
    out: &mut impl Write,
) -> Result<PublishSummary, CliError>
where
    S: SecretStore,
    I: IntoIterator<Item = Result<EnvEntry, EnvFileError>>,
{
    let wanted: BTreeSet<&str> = keys.iter().map(String::as_str).collect();
    let mut seen = BTreeSet::new();
    let mut summary = PublishSummary::default();

    for entry in entries {
        let entry = entry?;
        if !wanted.is_empty() && !wanted.contains(entry.key.as_str()) {
            tracing::trace!(key = %entry.key, line = entry.line, "Key not selected, skipping");
            continue;
        }
        seen.insert(entry.key.clone());

        let outcome = publisher.publish(&entry.key, &entry.value).await?;
        match &outcome {
            PublishOutcome::Created { secret, version } => {
                writeln!(out, "Added secret: {secret}")?;
                writeln!(out, "Added secret version: {version}")?;
                summary.created += 1;
            }
            PublishOutcome::VersionAdded { version, .. } => {
                writeln!(out, "Added secret version: {version}")?;
                summary.versions_added += 1;
            }
            PublishOutcome::Skipped { .. } => {
                writeln!(
                    out,
                    "Secret {} already exists, skipping creation",
                    entry.key
                )?;
                summary.skipped += 1;
            }
        }
    }
    out.flush()?;

    for missing in wanted.iter().filter(|key| !seen.contains(**key)) {
        tracing::warn!(key = %missing, "Requested key not found in env file");
    }

    tracing::info!(
        project = %publisher.project(),
        created = summary.created,
        versions_added = summary.versions_added,
        skipped = summary.skipped,
        "Publish finished"
    );
    Ok(summary)
}
