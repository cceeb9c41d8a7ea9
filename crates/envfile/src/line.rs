//! Single `KEY=VALUE` lines and the fused line reader shared by the iterators

use crate::EnvFileError;
use std::io::{BufRead, Lines};

/// One `KEY=VALUE` line, split at the first `=`.
///
/// Neither side is trimmed: `KEY =1` has the key `"KEY "`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvLine<'a> {
    key: &'a str,
    value: &'a str,
}

impl<'a> EnvLine<'a> {
    /// Split `line` at its first `=`.
    ///
    /// # Errors
    /// Returns [`EnvFileError::MissingSeparator`] when the line has no `=`.
    /// `line_number` is only used for that error.
    pub fn parse(line: &'a str, line_number: usize) -> Result<Self, EnvFileError> {
        line.split_once('=')
            .map(|(key, value)| Self { key, value })
            .ok_or_else(|| EnvFileError::MissingSeparator {
                line: line_number,
                content: line.to_string(),
            })
    }

    /// Text before the first `=`
    #[must_use]
    pub const fn key(&self) -> &'a str {
        self.key
    }

    /// Text after the first `=`
    #[must_use]
    pub const fn value(&self) -> &'a str {
        self.value
    }
}

/// Numbered lines of a reader that stop for good after the first error.
#[derive(Debug)]
pub(crate) struct NumberedLines<R> {
    lines: Lines<R>,
    line_number: usize,
    done: bool,
}

impl<R: BufRead> NumberedLines<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
            done: false,
        }
    }

    /// Next line and its 1-based number mapped through `f`. A read or parse
    /// error is yielded once and then the sequence ends.
    pub(crate) fn next_with<T>(
        &mut self,
        f: impl FnOnce(usize, EnvLine<'_>) -> T,
    ) -> Option<Result<T, EnvFileError>> {
        if self.done {
            return None;
        }
        let Some(read) = self.lines.next() else {
            self.done = true;
            return None;
        };
        self.line_number += 1;
        let number = self.line_number;

        let result = read
            .map_err(|source| EnvFileError::Io {
                line: number,
                source,
            })
            .and_then(|line| EnvLine::parse(&line, number).map(|parsed| f(number, parsed)));

        if let Err(e) = &result {
            tracing::debug!(line = number, error = %e, "Stopped reading env file");
            self.done = true;
        }
        Some(result)
    }
}
