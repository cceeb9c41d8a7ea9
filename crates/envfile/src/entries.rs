//! Key/value entries of an env file, for publishing

use crate::EnvFileError;
use crate::line::NumberedLines;
use envsecrets_secrets::SecureSecret;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One `KEY=VALUE` pair. The value is redacted in `Debug` output.
#[derive(Debug, Clone)]
pub struct EnvEntry {
    /// 1-based line the entry was read from
    pub line: usize,
    /// Text before the first `=`
    pub key: String,
    /// Text after the first `=`
    pub value: SecureSecret,
}

/// Lazy, single-pass sequence of [`EnvEntry`] values.
///
/// Same error behavior as [`GrantCommands`](crate::GrantCommands): the first
/// malformed line is yielded as an error and ends the sequence.
#[derive(Debug)]
pub struct EnvEntries<R> {
    lines: NumberedLines<R>,
}

impl EnvEntries<BufReader<File>> {
    /// Open `path` for reading
    ///
    /// # Errors
    /// Returns [`EnvFileError::Open`] if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EnvFileError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| EnvFileError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Opened env file for entries");
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> EnvEntries<R> {
    /// Read entries from `reader`
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            lines: NumberedLines::new(reader),
        }
    }
}

impl<R: BufRead> Iterator for EnvEntries<R> {
    type Item = Result<EnvEntry, EnvFileError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.lines.next_with(|line, parsed| EnvEntry {
            line,
            key: parsed.key().to_string(),
            value: SecureSecret::new(parsed.value().to_string()),
        })
    }
}

impl<R: BufRead> std::iter::FusedIterator for EnvEntries<R> {}
