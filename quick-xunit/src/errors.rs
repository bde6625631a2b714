// Copyright (c) The quick-xunit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by quick-xunit.

use camino::Utf8PathBuf;
use config::ConfigError;
use std::{fmt, io};
use thiserror::Error;

/// An outcome or harness error record was rejected by a
/// [`ReportBuilder`](crate::ReportBuilder).
///
/// A rejected record is never inserted: other records are not affected.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid record{}: {kind}", DisplayRecordName(.name.as_deref()))]
pub struct ValidationError {
    name: Option<String>,
    kind: ValidationErrorKind,
}

impl ValidationError {
    pub(crate) fn new(name: Option<&str>, kind: ValidationErrorKind) -> Self {
        Self {
            name: name.filter(|name| !name.is_empty()).map(|name| name.to_owned()),
            kind,
        }
    }

    /// Returns the name of the rejected test, if it was known.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the reason the record was rejected.
    pub fn kind(&self) -> &ValidationErrorKind {
        &self.kind
    }
}

struct DisplayRecordName<'a>(Option<&'a str>);

impl fmt::Display for DisplayRecordName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(name) => write!(f, " for `{name}`"),
            None => Ok(()),
        }
    }
}

/// The reason a record was rejected.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationErrorKind {
    /// The assembly path was empty.
    #[error("assembly path is missing")]
    MissingAssemblyPath,

    /// The assembly path was not absolute.
    #[error("assembly path `{path}` is not absolute")]
    RelativeAssemblyPath {
        /// The path that was supplied.
        path: Utf8PathBuf,
    },

    /// A required field was empty.
    #[error("required field `{field}` is empty")]
    EmptyField {
        /// The name of the field, as it appears in the XML output.
        field: &'static str,
    },

    /// A field written to an XML attribute contained a character that cannot be represented
    /// there.
    ///
    /// This covers characters that XML 1.0 cannot carry at all, and tabs and line breaks, which
    /// XML parsers normalize to spaces inside attribute values.
    #[error("field `{field}` contains a character that cannot be written to an XML attribute ({ch:?})")]
    InvalidXmlChar {
        /// The name of the field, as it appears in the XML output.
        field: &'static str,
        /// The offending character.
        ch: char,
    },
}

/// A [`RenderOptions`](crate::RenderOptions) value cannot be written to an XML attribute.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("option `{option}` contains a character that cannot be written to an XML attribute ({ch:?})")]
pub struct InvalidOptionError {
    option: &'static str,
    ch: char,
}

impl InvalidOptionError {
    pub(crate) fn new(option: &'static str, ch: char) -> Self {
        Self { option, ch }
    }

    /// Returns the name of the option, as it appears in the XML output.
    pub fn option(&self) -> &'static str {
        self.option
    }

    /// Returns the offending character.
    pub fn ch(&self) -> char {
        self.ch
    }
}

/// An error that occurs while serializing a [`Report`](crate::Report).
///
/// Returned by [`Report::serialize`](crate::Report::serialize) and
/// [`Report::to_string`](crate::Report::to_string).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SerializeError {
    /// The XML writer failed.
    #[error("error serializing xUnit report")]
    Xml(#[from] quick_xml::Error),

    /// Writing to the underlying writer failed.
    #[error("error writing xUnit report")]
    Io(#[from] io::Error),

    /// The serialized report was not valid UTF-8.
    #[error("serialized xUnit report is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// An error that occurs while writing a [`Report`](crate::Report) to disk.
///
/// The destination is never left holding a partially written report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteReportError {
    /// The parent directory of the report could not be created.
    #[error("error creating directory `{dir}`")]
    CreateDir {
        /// The directory that could not be created.
        dir: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The report could not be serialized.
    #[error("error serializing xUnit report to `{path}`")]
    Serialize {
        /// The destination path.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: SerializeError,
    },

    /// The temporary file could not be written or moved into place.
    #[error("error writing xUnit report to `{path}`")]
    Io {
        /// The destination path.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },
}

impl WriteReportError {
    /// Returns the path the report was being written to.
    pub fn path(&self) -> &Utf8PathBuf {
        match self {
            Self::CreateDir { dir, .. } => dir,
            Self::Serialize { path, .. } | Self::Io { path, .. } => path,
        }
    }
}

/// An error that occurred while parsing the report config.
#[derive(Debug, Error)]
#[error("failed to parse xunit-report config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    err: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, err: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            err,
        }
    }

    /// Returns the config file this error is for.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }

    /// Returns the kind of error.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.err
    }
}

/// The kind of error that occurred while parsing the report config.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// The config sources could not be merged.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// The merged config could not be deserialized.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),

    /// The indent width was out of range.
    #[error("report.indent must be at most {max}, found {found}")]
    IndentOutOfRange {
        /// The largest supported indent.
        max: usize,
        /// The configured indent.
        found: usize,
    },

    /// An option value cannot be written to the report.
    #[error("invalid value for report.{}", .0.option())]
    InvalidOption(#[source] InvalidOptionError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn validation_error_display() {
        let error = ValidationError::new(
            Some("Ns.Type.Method"),
            ValidationErrorKind::EmptyField { field: "type" },
        );
        assert_eq!(
            error.to_string(),
            "invalid record for `Ns.Type.Method`: required field `type` is empty"
        );

        let error = ValidationError::new(Some(""), ValidationErrorKind::MissingAssemblyPath);
        assert_eq!(error.name(), None);
        assert_eq!(error.to_string(), "invalid record: assembly path is missing");
    }

    #[test]
    fn invalid_option_display() {
        let error = InvalidOptionError::new("environment", '\n');
        assert_eq!(
            error.to_string(),
            "option `environment` contains a character that cannot be written to an XML \
             attribute ('\\n')"
        );
        assert_eq!(
            ConfigParseErrorKind::InvalidOption(error).to_string(),
            "invalid value for report.environment"
        );
    }
}
