use crate::tracing::{LogLevel, TracingFormat};
use clap::{Args, Parser, Subcommand, ValueEnum};
use envsecrets_envfile::{DEFAULT_ENV_FILE, EnvFileError};
use envsecrets_gcp::DEFAULT_CREDENTIALS_FILE;
use envsecrets_secrets::{ExistingSecretPolicy, SecretError};
use miette::{Diagnostic, Report};
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// CLI, configuration or env file error exit code
pub const EXIT_CLI: i32 = 2;
/// Secret service error exit code
pub const EXIT_SERVICE: i32 = 3;

/// Project used when neither `--project` nor `ENVSECRETS_PROJECT_ID` is set
pub const DEFAULT_PROJECT_ID: &str = "nutriplan-7wkxu";

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// CLI, configuration or input file error (exit code 2)
    #[error("Configuration error: {message}")]
    #[diagnostic(code(envsecrets::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Secret service call failed (exit code 3)
    #[error("Secret service error: {message}")]
    #[diagnostic(code(envsecrets::cli::service))]
    Service {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Other unexpected error (exit code 3)
    #[error("Unexpected error: {message}")]
    #[diagnostic(code(envsecrets::cli::other))]
    Other {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new configuration error with help text
    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a new service error
    #[must_use]
    pub fn service(message: impl Into<String>) -> Self {
        Self::Service {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new other error
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            help: None,
        }
    }
}

/// Env file problems are input errors the user fixes in the file.
impl From<EnvFileError> for CliError {
    fn from(err: EnvFileError) -> Self {
        match err {
            EnvFileError::Open { .. } => Self::config_with_help(
                err.to_string(),
                "Pass --env-file to point at your KEY=VALUE file",
            ),
            EnvFileError::MissingSeparator { .. } => Self::config_with_help(
                err.to_string(),
                "Every line must have the form KEY=VALUE",
            ),
            EnvFileError::Io { .. } => Self::other(err.to_string()),
        }
    }
}

/// Maps secret errors to their CLI categories:
/// - invalid ids and credentials -> Config (exit code 2)
/// - failed service calls -> Service (exit code 3)
impl From<SecretError> for CliError {
    fn from(err: SecretError) -> Self {
        match err {
            SecretError::InvalidSecretId { .. } | SecretError::InvalidProjectId { .. } => {
                Self::config(err.to_string())
            }
            SecretError::Credentials { .. } => Self::config_with_help(
                err.to_string(),
                "Pass --credentials or set GOOGLE_APPLICATION_CREDENTIALS to a service account key file",
            ),
            SecretError::Api { .. } => Self::service(err.to_string()),
        }
    }
}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        Self::other(format!("Failed to write output: {err}"))
    }
}

/// Get the exit code for a given CLI error
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::Service { .. } | CliError::Other { .. } => EXIT_SERVICE,
    }
}

/// Render an error to stderr using miette
pub fn render_error(err: &CliError) {
    let report = Report::new(err.clone());
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "{report:?}");
    let _ = stderr.flush();
}

/// What to do with secrets that already exist
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum OnExisting {
    /// Leave the secret untouched
    #[default]
    Skip,
    /// Append a new version
    AddVersion,
}

impl From<OnExisting> for ExistingSecretPolicy {
    fn from(value: OnExisting) -> Self {
        match value {
            OnExisting::Skip => Self::Skip,
            OnExisting::AddVersion => Self::AddVersion,
        }
    }
}

/// Main CLI entry point for envsecrets.
///
/// Publishes `.env` entries to GCP Secret Manager and prints the Firebase App
/// Hosting commands that grant a backend access to them.
#[derive(Parser, Debug)]
#[command(name = "envsecrets")]
#[command(about = "Publish .env secrets to GCP Secret Manager and print Firebase grant commands")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Logging verbosity level.
    #[arg(
        short = 'L',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    /// Log output format.
    #[arg(long, global = true, default_value = "pretty", value_enum)]
    pub log_format: TracingFormat,

    /// Tracing filter directive, e.g. `envsecrets_gcp=trace,hyper=debug`.
    /// Takes precedence over `--level` and `RUST_LOG`.
    #[arg(long, global = true, value_name = "DIRECTIVE")]
    pub log_filter: Option<String>,

    /// Target project id.
    #[arg(
        long,
        short = 'p',
        global = true,
        env = "ENVSECRETS_PROJECT_ID",
        default_value = DEFAULT_PROJECT_ID
    )]
    pub project: String,
}

/// Options shared by commands that read an env file
#[derive(Args, Debug, Clone)]
pub struct EnvFileArgs {
    /// Path of the KEY=VALUE file.
    #[arg(long, short = 'f', value_name = "PATH", default_value = DEFAULT_ENV_FILE)]
    pub env_file: PathBuf,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create secrets from env file entries and store their values as versions.
    #[command(about = "Create secrets from env file entries and add their values as versions")]
    Publish {
        /// Env file to read
        #[command(flatten)]
        env_file: EnvFileArgs,

        /// Service account key file.
        #[arg(
            long,
            value_name = "PATH",
            env = "GOOGLE_APPLICATION_CREDENTIALS",
            default_value = DEFAULT_CREDENTIALS_FILE
        )]
        credentials: PathBuf,

        /// What to do when a secret already exists.
        #[arg(long, value_enum, default_value_t = OnExisting::Skip)]
        on_existing: OnExisting,

        /// Only publish these keys (default: every entry).
        #[arg(value_name = "KEY")]
        keys: Vec<String>,
    },
    /// Print one `firebase apphosting:secrets:grantaccess` command per env file line.
    #[command(about = "Print Firebase App Hosting grant commands for each env file line")]
    Grants {
        /// Env file to read
        #[command(flatten)]
        env_file: EnvFileArgs,

        /// App Hosting backend id (default: the project id).
        #[arg(long, short = 'b', value_name = "ID")]
        backend: Option<String>,
    },
}

/// Parse command-line arguments into the CLI structure.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}
