//! envsecrets - publish `.env` secrets to GCP Secret Manager
//!
//! The binary has two commands:
//!
//! - `publish` creates a secret per env file entry (skipping or versioning
//!   existing ones) and stores the entry's value as a secret version.
//! - `grants` prints one `firebase apphosting:secrets:grantaccess` command per
//!   env file line. The commands are printed, never executed.

/// CLI argument parsing, errors and exit codes.
pub mod cli;
/// Command implementations.
pub mod commands;
/// Tracing and logging configuration.
pub mod tracing;
