// Copyright (c) The quick-xunit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reading outcome records, one JSON object per line.

use crate::errors::DisplayErrorChain;
use camino::Utf8PathBuf;
use quick_xunit::{
    HarnessError, HarnessErrorKind, ReportBuilder, TestOutcome, TestResult, Trait,
    errors::ValidationError,
};
use serde::Deserialize;
use std::{io, time::Duration};
use thiserror::Error;
use tracing::{debug, warn};

/// A single line of input could not be turned into a record.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RecordError {
    /// The line is not valid UTF-8.
    #[error("record is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The line is not valid JSON, or is missing required fields.
    #[error("failed to parse record")]
    Json(#[from] serde_json::Error),

    /// The `kind` field is not `test` or `error`.
    #[error("unknown record kind `{0}` (expected `test` or `error`)")]
    UnknownKind(String),

    /// The `time` field is negative, infinite or NaN.
    #[error("invalid test time {0}")]
    InvalidTime(f64),

    /// A field required for this result is missing.
    #[error("`{field}` is required for `{result}` records")]
    MissingField {
        /// The missing field.
        field: &'static str,
        /// The result of the record.
        result: &'static str,
    },

    /// The `error-type` of a harness error is not known.
    #[error("unknown error type `{0}`")]
    UnknownErrorType(String),

    /// The record was rejected by the report builder.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Counts of records read from an input.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadSummary {
    /// The number of test outcomes added.
    pub tests: usize,

    /// The number of harness errors added.
    pub errors: usize,

    /// The number of lines that were rejected.
    pub rejected: usize,
}

/// Reads records from `reader` and adds them to `builder`.
///
/// Blank lines are skipped. A line that is not UTF-8, cannot be parsed or is rejected by the
/// builder is logged and counted in [`ReadSummary::rejected`]; reading continues with the next
/// line. Only I/O errors stop reading.
pub fn read_records(
    mut reader: impl io::BufRead,
    builder: &mut ReportBuilder,
) -> io::Result<ReadSummary> {
    let mut summary = ReadSummary::default();
    let mut buf = Vec::new();
    let mut line_number = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_number += 1;

        let result = std::str::from_utf8(&buf)
            .map_err(RecordError::from)
            .and_then(|line| {
                let line = line.trim();
                if line.is_empty() {
                    return Ok(None);
                }
                parse_record(line)
                    .and_then(|record| record.add_to(builder))
                    .map(Some)
            });
        match result {
            Ok(None) => {}
            Ok(Some(RecordKind::Test)) => summary.tests += 1,
            Ok(Some(RecordKind::Error)) => summary.errors += 1,
            Err(error) => {
                warn!("skipping line {line_number}: {}", DisplayErrorChain::new(&error));
                summary.rejected += 1;
            }
        }
    }

    debug!(
        "read {} test outcomes and {} harness errors ({} rejected)",
        summary.tests, summary.errors, summary.rejected,
    );
    Ok(summary)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum RecordKind {
    Test,
    Error,
}

#[derive(Debug)]
enum Record {
    Test(Box<TestOutcome>),
    Error(HarnessError),
}

impl Record {
    fn add_to(self, builder: &mut ReportBuilder) -> Result<RecordKind, RecordError> {
        match self {
            Record::Test(outcome) => {
                builder.add(*outcome)?;
                Ok(RecordKind::Test)
            }
            Record::Error(error) => {
                builder.add_error(error)?;
                Ok(RecordKind::Error)
            }
        }
    }
}

#[derive(Deserialize)]
struct RecordKindField {
    #[serde(default)]
    kind: Option<String>,
}

fn parse_record(line: &str) -> Result<Record, RecordError> {
    let value: serde_json::Value = serde_json::from_str(line)?;
    let kind_field = RecordKindField::deserialize(&value)?;
    match kind_field.kind.as_deref() {
        None | Some("test") => {
            let record: TestRecord = serde_json::from_value(value)?;
            Ok(Record::Test(Box::new(record.into_outcome()?)))
        }
        Some("error") => {
            let record: ErrorRecord = serde_json::from_value(value)?;
            Ok(Record::Error(record.into_harness_error()?))
        }
        Some(other) => Err(RecordError::UnknownKind(other.to_owned())),
    }
}

#[derive(Copy, Clone, Debug, Deserialize)]
enum RecordResult {
    Pass,
    Fail,
    Skip,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct TestRecord {
    assembly: Utf8PathBuf,
    #[serde(rename = "type")]
    type_name: String,
    method: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    collection: Option<String>,
    result: RecordResult,
    #[serde(default)]
    time: f64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    stack_trace: Option<String>,
    #[serde(default)]
    exception_type: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    traits: Vec<TraitRecord>,
    #[serde(default)]
    output: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TraitRecord {
    name: String,
    value: String,
}

impl TestRecord {
    fn into_outcome(self) -> Result<TestOutcome, RecordError> {
        let time =
            Duration::try_from_secs_f64(self.time).map_err(|_| RecordError::InvalidTime(self.time))?;

        let result = match self.result {
            RecordResult::Pass => TestResult::Pass,
            RecordResult::Fail => {
                let message = self.message.ok_or(RecordError::MissingField {
                    field: "message",
                    result: "Fail",
                })?;
                let mut result = TestResult::fail(message);
                if let Some(stack_trace) = self.stack_trace {
                    result.set_stack_trace(stack_trace);
                }
                if let Some(exception_type) = self.exception_type {
                    result.set_exception_type(exception_type);
                }
                result
            }
            RecordResult::Skip => {
                let reason = self.reason.ok_or(RecordError::MissingField {
                    field: "reason",
                    result: "Skip",
                })?;
                TestResult::skip(reason)
            }
        };

        let mut outcome = TestOutcome::new(self.assembly, self.type_name, self.method, result);
        outcome
            .set_time(time)
            .add_traits(self.traits.into_iter().map(|t| Trait::new(t.name, t.value)));
        if let Some(name) = self.name {
            outcome.set_name(name);
        }
        if let Some(collection) = self.collection {
            outcome.set_collection_name(collection);
        }
        if let Some(output) = self.output {
            outcome.set_output(output);
        }
        Ok(outcome)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ErrorRecord {
    assembly: Utf8PathBuf,
    error_type: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    exception_type: Option<String>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    stack_trace: Option<String>,
}

impl ErrorRecord {
    fn into_harness_error(self) -> Result<HarnessError, RecordError> {
        let kind = HarnessErrorKind::from_str_opt(&self.error_type)
            .ok_or(RecordError::UnknownErrorType(self.error_type))?;
        let mut error = HarnessError::new(self.assembly, kind, self.message);
        if let Some(name) = self.name {
            error.set_name(name);
        }
        if let Some(exception_type) = self.exception_type {
            error.set_exception_type(exception_type);
        }
        if let Some(stack_trace) = self.stack_trace {
            error.set_stack_trace(stack_trace);
        }
        Ok(error)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn render(builder: &ReportBuilder) -> quick_xunit::Report {
        let timestamp = FixedOffset::east_opt(0)
            .and_then(|tz| tz.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single())
            .expect("valid timestamp");
        builder.render(timestamp)
    }

    #[test]
    fn reads_tests_and_errors() {
        let input = indoc! {r#"
            {"assembly": "/work/T.dll", "type": "N.T", "method": "A", "result": "Pass", "time": 0.25}

            {"assembly": "/work/T.dll", "type": "N.T", "method": "B", "result": "Fail", "message": "no", "exception-type": "Xunit.Sdk.FalseException"}
            {"kind": "test", "assembly": "/work/T.dll", "type": "N.T", "method": "C", "result": "Skip", "reason": "Skipped", "traits": [{"name": "Category", "value": "Slow"}]}
            {"kind": "error", "assembly": "/work/T.dll", "error-type": "test-class-cleanup", "name": "N.T", "message": "cleanup failed"}
        "#};

        let mut builder = ReportBuilder::new();
        let summary = read_records(input.as_bytes(), &mut builder).expect("no I/O errors");
        assert_eq!(
            summary,
            ReadSummary {
                tests: 3,
                errors: 1,
                rejected: 0,
            }
        );

        let report = render(&builder);
        let assembly = &report.assemblies[0];
        assert_eq!(assembly.counts.total, 3);
        assert_eq!(assembly.error_count(), 1);
        assert_eq!(assembly.time, Duration::from_millis(250));

        let tests = &assembly.collections[0].tests;
        assert_eq!(tests[2].traits, [Trait::new("Category", "Slow")]);
        match &tests[1].result {
            TestResult::Fail {
                exception_type,
                message,
                stack_trace,
            } => {
                assert_eq!(exception_type.as_deref(), Some("Xunit.Sdk.FalseException"));
                assert_eq!(message.as_str(), "no");
                assert_eq!(stack_trace, &None);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test_case(br#"{"assembly": "/w/T.dll""# ; "truncated json")]
    #[test_case(br#"{"assembly": "/w/T.dll", "type": "N.T", "result": "Pass"}"# ; "missing method")]
    #[test_case(br#"{"assembly": "/w/T.dll", "type": "N.T", "method": "M", "result": "Maybe"}"# ; "unknown result")]
    #[test_case(br#"{"assembly": "/w/T.dll", "type": "N.T", "method": "M", "result": "Fail"}"# ; "fail without message")]
    #[test_case(br#"{"assembly": "/w/T.dll", "type": "N.T", "method": "M", "result": "Skip"}"# ; "skip without reason")]
    #[test_case(br#"{"assembly": "/w/T.dll", "type": "N.T", "method": "M", "result": "Pass", "time": -1.0}"# ; "negative time")]
    #[test_case(br#"{"assembly": "", "type": "N.T", "method": "M", "result": "Pass"}"# ; "missing assembly")]
    #[test_case(br#"{"kind": "bogus"}"# ; "unknown kind")]
    #[test_case(br#"{"kind": "error", "assembly": "/w/T.dll", "error-type": "oops"}"# ; "unknown error type")]
    #[test_case(br#"{"assembly": "/w/T.dll", "type": "N.T", "method": "M\n", "result": "Pass"}"# ; "line break in method")]
    #[test_case(b"{\"assembly\": \"/w/T.dll\", \"type\": \"N.T\", \"method\": \"M\xff\", \"result\": \"Pass\"}" ; "invalid utf-8")]
    #[test_case(b"\xfe\xff" ; "binary garbage")]
    fn rejects_bad_lines(line: &[u8]) {
        let mut builder = ReportBuilder::new();
        let mut input = line.to_vec();
        input.extend_from_slice(
            b"\n{\"assembly\": \"/w/T.dll\", \"type\": \"N.T\", \"method\": \"Ok\", \"result\": \"Pass\"}\n",
        );
        let summary = read_records(input.as_slice(), &mut builder).expect("no I/O errors");
        assert_eq!(
            summary,
            ReadSummary {
                tests: 1,
                errors: 0,
                rejected: 1,
            }
        );
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn invalid_utf8_does_not_stop_reading() {
        let mut input = Vec::new();
        input.extend_from_slice(
            b"{\"assembly\": \"/w/T.dll\", \"type\": \"N.T\", \"method\": \"A\", \"result\": \"Pass\"}\n",
        );
        input.extend_from_slice(b"{\"bad\": \"\xff\"}\r\n");
        input.extend_from_slice(
            b"{\"assembly\": \"/w/T.dll\", \"type\": \"N.T\", \"method\": \"B\", \"result\": \"Pass\"}",
        );

        let mut builder = ReportBuilder::new();
        let summary = read_records(input.as_slice(), &mut builder).expect("no I/O errors");
        assert_eq!(
            summary,
            ReadSummary {
                tests: 2,
                errors: 0,
                rejected: 1,
            }
        );

        let report = render(&builder);
        let methods: Vec<_> = report.assemblies[0].collections[0]
            .tests
            .iter()
            .map(|t| t.method_name.as_str())
            .collect();
        assert_eq!(methods, ["A", "B"]);
    }
}
