// Copyright (c) The quick-xunit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::NO_HEADING_TARGET;
use camino::Utf8PathBuf;
use quick_xunit::errors::{ConfigParseError, WriteReportError};
use std::{error::Error, fmt};
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

/// Exit codes returned by xunit-report.
pub struct ReportExitCode;

impl ReportExitCode {
    /// The report was written and every record was accepted.
    pub const OK: i32 = 0;

    /// The report was written, but some records were rejected.
    pub const RECORDS_REJECTED: i32 = 1;

    /// The config could not be read.
    pub const CONFIG_ERROR: i32 = 2;

    /// The input could not be read.
    pub const INPUT_READ_ERROR: i32 = 3;

    /// The report could not be written.
    pub const WRITE_REPORT_ERROR: i32 = 4;
}

// Note that the #[error()] strings are mostly placeholder messages -- the expected way to print out
// errors is with the display_to_stderr method.

/// An error that is expected to happen in normal operation, such as a bad input path.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("could not determine current directory")]
    CurrentDirFailed {
        #[source]
        error: std::io::Error,
    },
    #[error("current directory is not valid UTF-8")]
    CurrentDirInvalidUtf8 {
        #[source]
        error: camino::FromPathBufError,
    },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("failed to read input")]
    InputReadError {
        input: Option<Utf8PathBuf>,
        #[source]
        err: std::io::Error,
    },
    #[error("failed to write report")]
    WriteReportError {
        #[from]
        err: WriteReportError,
    },
    #[error("invalid timestamp `{input}`")]
    InvalidTimestamp {
        input: String,
        #[source]
        err: chrono::ParseError,
    },
}

impl ExpectedError {
    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDirFailed { .. }
            | Self::CurrentDirInvalidUtf8 { .. }
            | Self::ConfigParseError { .. }
            | Self::InvalidTimestamp { .. } => ReportExitCode::CONFIG_ERROR,
            Self::InputReadError { .. } => ReportExitCode::INPUT_READ_ERROR,
            Self::WriteReportError { .. } => ReportExitCode::WRITE_REPORT_ERROR,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self) {
        let mut next_error = match self {
            Self::CurrentDirFailed { error } => {
                error!("could not determine current directory");
                Some(error as &dyn Error)
            }
            Self::CurrentDirInvalidUtf8 { error } => {
                error!("current directory is not valid UTF-8");
                Some(error as &dyn Error)
            }
            Self::ConfigParseError { err } => {
                error!("{err}");
                err.source()
            }
            Self::InputReadError { input, err } => {
                match input {
                    Some(input) => error!("failed to read input from `{input}`"),
                    None => error!("failed to read input from stdin"),
                }
                Some(err as &dyn Error)
            }
            Self::WriteReportError { err } => {
                error!("{err}");
                err.source()
            }
            Self::InvalidTimestamp { input, err } => {
                error!("invalid timestamp `{input}` (expected RFC 3339, e.g. 2024-05-01T10:00:00Z)");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}

/// Displays an error followed by its chain of sources on a single line.
pub(crate) struct DisplayErrorChain<'a> {
    error: &'a dyn Error,
}

impl<'a> DisplayErrorChain<'a> {
    pub(crate) fn new(error: &'a dyn Error) -> Self {
        Self { error }
    }
}

impl fmt::Display for DisplayErrorChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        let mut source = self.error.source();
        while let Some(error) = source {
            write!(f, ": {error}")?;
            source = error.source();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Error)]
    #[error("outer")]
    struct Outer(#[source] Inner);

    #[derive(Debug, Error)]
    #[error("inner")]
    struct Inner;

    #[test]
    fn error_chain_display() {
        let error = Outer(Inner);
        assert_eq!(DisplayErrorChain::new(&error).to_string(), "outer: inner");
    }

    #[test]
    fn exit_codes() {
        let error = ExpectedError::InputReadError {
            input: None,
            err: std::io::Error::other("broken pipe"),
        };
        assert_eq!(error.process_exit_code(), ReportExitCode::INPUT_READ_ERROR);
    }
}
