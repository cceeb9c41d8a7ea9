//! Firebase App Hosting grant commands, one per env file line

use crate::EnvFileError;
use crate::line::NumberedLines;
use envsecrets_secrets::ProjectId;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Backend and project that grant commands are issued for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantTarget {
    backend: String,
    project: ProjectId,
}

impl GrantTarget {
    /// Target whose backend id is the project id itself
    #[must_use]
    pub fn for_project(project: ProjectId) -> Self {
        Self {
            backend: project.as_str().to_string(),
            project,
        }
    }

    /// Target an explicitly named backend
    #[must_use]
    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = backend.into();
        self
    }

    /// App Hosting backend id
    #[must_use]
    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Project id
    #[must_use]
    pub const fn project(&self) -> &ProjectId {
        &self.project
    }

    /// Grant command for the secret named `key`
    #[must_use]
    pub fn command<'a>(&'a self, key: &'a str) -> GrantCommand<'a> {
        GrantCommand { key, target: self }
    }
}

/// `firebase apphosting:secrets:grantaccess` invocation for one secret
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrantCommand<'a> {
    key: &'a str,
    target: &'a GrantTarget,
}

impl fmt::Display for GrantCommand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "firebase apphosting:secrets:grantaccess {} -b {} --project {}",
            self.key, self.target.backend, self.target.project
        )
    }
}

/// Lazy, single-pass sequence of grant commands read from an env file.
///
/// Yields one command per input line, in input order. A line without `=`
/// yields [`EnvFileError::MissingSeparator`] and ends the sequence. The
/// reader is owned and released when the iterator is dropped.
#[derive(Debug)]
pub struct GrantCommands<R> {
    lines: NumberedLines<R>,
    target: GrantTarget,
}

impl GrantCommands<BufReader<File>> {
    /// Open `path` and emit grant commands for each of its lines
    ///
    /// # Errors
    /// Returns [`EnvFileError::Open`] if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>, target: GrantTarget) -> Result<Self, EnvFileError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| EnvFileError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Opened env file for grant commands");
        Ok(Self::new(BufReader::new(file), target))
    }
}

impl<R: BufRead> GrantCommands<R> {
    /// Emit grant commands for each line of `reader`
    #[must_use]
    pub fn new(reader: R, target: GrantTarget) -> Self {
        Self {
            lines: NumberedLines::new(reader),
            target,
        }
    }
}

impl<R: BufRead> Iterator for GrantCommands<R> {
    type Item = Result<String, EnvFileError>;

    fn next(&mut self) -> Option<Self::Item> {
        let target = &self.target;
        self.lines
            .next_with(|_, line| target.command(line.key()).to_string())
    }
}

impl<R: BufRead> std::iter::FusedIterator for GrantCommands<R> {}
