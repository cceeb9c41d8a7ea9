//! `envsecrets grants`: print Firebase App Hosting grant commands

use crate::cli::CliError;
use envsecrets_envfile::{EnvFileError, GrantCommands, GrantTarget};
use envsecrets_secrets::ProjectId;
use std::io::{BufRead, Write};
use std::path::Path;

/// Build the grant target for `project`, optionally naming another backend
///
/// # Errors
/// Returns a configuration error for an empty project id.
pub fn grant_target(project: &str, backend: Option<&str>) -> Result<GrantTarget, CliError> {
    let target = GrantTarget::for_project(ProjectId::new(project)?);
    Ok(match backend {
        Some(backend) => target.with_backend(backend),
        None => target,
    })
}

/// Execute the grants command against the env file at `path`
///
/// # Errors
/// Returns an error if the file cannot be opened, a line has no `=`, or
/// writing to `out` fails. Commands already written stay written.
pub fn execute_grants(
    path: &Path,
    target: GrantTarget,
    out: &mut impl Write,
) -> Result<usize, CliError> {
    write_grants(GrantCommands::open(path, target)?, out)
}

/// Write every command of `commands` to `out`, one per line
///
/// # Errors
/// Stops at the first env file or write error.
pub fn write_grants<R: BufRead>(
    commands: GrantCommands<R>,
    out: &mut impl Write,
) -> Result<usize, CliError> {
    let mut written = 0;
    for command in commands {
        let command = command.map_err(|e: EnvFileError| {
            tracing::warn!(after = written, error = %e, "Aborting grant command output");
            CliError::from(e)
        })?;
        writeln!(out, "{command}")?;
        written += 1;
    }
    out.flush()?;
    tracing::debug!(count = written, "Printed grant commands");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{EXIT_CLI, exit_code_for};

    #[test]
    fn test_grant_target_defaults_backend_to_project() {
        let target = grant_target("nutriplan-7wkxu", None).unwrap();
        assert_eq!(target.backend(), "nutriplan-7wkxu");

        let target = grant_target("nutriplan-7wkxu", Some("web")).unwrap();
        assert_eq!(target.backend(), "web");
    }

    #[test]
    fn test_grant_target_rejects_empty_project() {
        let err = grant_target("", None).unwrap_err();
        assert_eq!(exit_code_for(&err), EXIT_CLI);
    }

    #[test]
    fn test_execute_grants_writes_commands() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "A=1").unwrap();
        writeln!(file, "B=2").unwrap();
        let mut out = Vec::new();

        let count = execute_grants(
            file.path(),
            grant_target("nutriplan-7wkxu", None).unwrap(),
            &mut out,
        )
        .unwrap();

        assert_eq!(count, 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "firebase apphosting:secrets:grantaccess A -b nutriplan-7wkxu --project nutriplan-7wkxu\n\
             firebase apphosting:secrets:grantaccess B -b nutriplan-7wkxu --project nutriplan-7wkxu\n"
        );
    }

    #[test]
    fn test_write_grants_stops_at_malformed_line() {
        let commands = GrantCommands::new(
            "A=1\nbroken\nC=3\n".as_bytes(),
            grant_target("p", None).unwrap(),
        );
        let mut out = Vec::new();

        let err = write_grants(commands, &mut out).unwrap_err();

        assert_eq!(exit_code_for(&err), EXIT_CLI);
        let printed = String::from_utf8(out).unwrap();
        assert_eq!(printed.lines().count(), 1);
        assert!(printed.contains("grantaccess A "));
    }

    #[test]
    fn test_execute_grants_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = Vec::new();

        let err = execute_grants(
            &dir.path().join(".env"),
            grant_target("p", None).unwrap(),
            &mut out,
        )
        .unwrap_err();

        assert!(matches!(err, CliError::Config { .. }));
        assert!(out.is_empty());
    }
}
