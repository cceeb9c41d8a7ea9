//! `.env` file reading for envsecrets
//!
//! Reads `KEY=VALUE` files lazily, one line at a time, and turns each line
//! either into an [`EnvEntry`] (for publishing) or into a Firebase App Hosting
//! grant command (see [`GrantCommands`]).
//!
//! Both iterators own their reader: dropping the iterator, whether it is
//! exhausted, abandoned half way or stopped by an error, closes the file.
//! A line without `=` is an error and ends the iteration.

mod entries;
mod grants;
mod line;

pub use entries::{EnvEntries, EnvEntry};
pub use grants::{GrantCommand, GrantCommands, GrantTarget};
pub use line::EnvLine;

use std::path::PathBuf;
use thiserror::Error;

/// Default env file read when no path is given
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Error types for env file reading
#[derive(Debug, Error)]
pub enum EnvFileError {
    /// The file could not be opened
    #[error("Failed to open env file '{}': {source}", path.display())]
    Open {
        /// Path that was opened
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Reading a line failed
    #[error("Failed to read line {line}: {source}")]
    Io {
        /// 1-based number of the line being read
        line: usize,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A line had no `=` separating key and value
    #[error("Line {line} has no '=' separator: {content:?}")]
    MissingSeparator {
        /// 1-based line number
        line: usize,
        /// The offending line, without its terminator
        content: String,
    },
}

impl EnvFileError {
    /// 1-based line number the error refers to, if any
    #[must_use]
    pub const fn line(&self) -> Option<usize> {
        match self {
            Self::Open { .. } => None,
            Self::Io { line, .. } | Self::MissingSeparator { line, .. } => Some(*line),
        }
    }
}
