// Copyright (c) The quick-xunit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::{SerializeError, WriteReportError},
    outcome::{HarnessError, ResultKind, TestOutcome},
    serialize::{SerializeOptions, serialize_report},
};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDateTime;
use std::{
    io::{self, BufWriter, Write},
    time::Duration,
};
use tracing::{debug, info};

/// The root element of an xUnit report: `<assemblies>`.
///
/// Produced by [`ReportBuilder::render`](crate::ReportBuilder::render).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    /// The time at which the run happened, in local wall-clock time.
    pub timestamp: NaiveDateTime,

    /// The assemblies in this report, in the order they were first seen.
    pub assemblies: Vec<AssemblyReport>,
}

impl Report {
    /// Returns the total counts across all assemblies.
    pub fn counts(&self) -> Counts {
        self.assemblies
            .iter()
            .fold(Counts::default(), |acc, assembly| acc + assembly.counts)
    }

    /// Serialize this report to the given writer.
    pub fn serialize(&self, writer: impl io::Write) -> Result<(), SerializeError> {
        self.serialize_with(&SerializeOptions::default(), writer)
    }

    /// Serialize this report to the given writer with the given options.
    pub fn serialize_with(
        &self,
        options: &SerializeOptions,
        writer: impl io::Write,
    ) -> Result<(), SerializeError> {
        serialize_report(self, options, writer)
    }

    /// Serialize this report to a string.
    pub fn to_string(&self) -> Result<String, SerializeError> {
        self.to_string_with(&SerializeOptions::default())
    }

    /// Serialize this report to a string with the given options.
    pub fn to_string_with(&self, options: &SerializeOptions) -> Result<String, SerializeError> {
        let mut buf: Vec<u8> = vec![];
        self.serialize_with(options, &mut buf)?;
        Ok(String::from_utf8(buf)?)
    }

    /// Writes this report to `path`.
    ///
    /// The report is written to a temporary file in the same directory and renamed into place
    /// once it is complete, so `path` never holds a partial report. Parent directories are
    /// created as needed.
    pub fn write_to_path(
        &self,
        options: &SerializeOptions,
        path: &Utf8Path,
    ) -> Result<(), WriteReportError> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|error| WriteReportError::CreateDir {
                dir: dir.to_owned(),
                error,
            })?;
        }

        let atomic_file = AtomicFile::new(path, OverwriteBehavior::AllowOverwrite);
        atomic_file
            .write(|file| {
                let mut writer = BufWriter::new(file);
                self.serialize_with(options, &mut writer)
                    .map_err(|error| WriteReportError::Serialize {
                        path: path.to_owned(),
                        error,
                    })?;
                writer.flush().map_err(|error| WriteReportError::Io {
                    path: path.to_owned(),
                    error,
                })
            })
            .map_err(|err| match err {
                atomicwrites::Error::Internal(error) => WriteReportError::Io {
                    path: path.to_owned(),
                    error,
                },
                atomicwrites::Error::User(err) => err,
            })?;

        let counts = self.counts();
        info!(
            target: "quick_xunit::report",
            "wrote xUnit report to {path} ({} tests: {} passed, {} failed, {} skipped)",
            counts.total,
            counts.passed,
            counts.failed,
            counts.skipped,
        );
        Ok(())
    }
}

/// A single `<assembly>` element.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct AssemblyReport {
    /// The absolute path to the assembly.
    pub name: Utf8PathBuf,

    /// The test framework that ran this assembly, if configured.
    pub test_framework: Option<String>,

    /// A description of the environment the assembly ran in, if configured.
    pub environment: Option<String>,

    /// Test counts, summed over all collections.
    pub counts: Counts,

    /// Cumulative test time, summed over all collections.
    pub time: Duration,

    /// Errors that happened outside of any test.
    pub errors: Vec<HarnessError>,

    /// The collections in this assembly, in the order they were first seen.
    pub collections: Vec<CollectionReport>,
}

impl AssemblyReport {
    /// The number of harness errors, as written to the `errors` attribute.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

/// A single `<collection>` element.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct CollectionReport {
    /// The name of the collection.
    pub name: String,

    /// Test counts.
    pub counts: Counts,

    /// Cumulative test time.
    pub time: Duration,

    /// The tests in this collection, in the order they were added.
    pub tests: Vec<TestOutcome>,
}

/// Aggregate test counts.
///
/// `total` is always `passed + failed + skipped`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Counts {
    /// The total number of tests.
    pub total: usize,

    /// The number of tests that passed.
    pub passed: usize,

    /// The number of tests that failed.
    pub failed: usize,

    /// The number of tests that were skipped.
    pub skipped: usize,
}

impl Counts {
    /// Records a single result.
    pub fn record(&mut self, kind: ResultKind) {
        self.total += 1;
        match kind {
            ResultKind::Pass => self.passed += 1,
            ResultKind::Fail => self.failed += 1,
            ResultKind::Skip => self.skipped += 1,
        }
    }
}

impl std::ops::Add for Counts {
    type Output = Counts;

    fn add(self, other: Counts) -> Counts {
        Counts {
            total: self.total + other.total,
            passed: self.passed + other.passed,
            failed: self.failed + other.failed,
            skipped: self.skipped + other.skipped,
        }
    }
}

const NANOS_PER_TICK: u32 = 100;

/// Truncates a duration to 100ns ticks, the resolution test times are reported with.
pub(crate) fn truncate_to_ticks(time: Duration) -> Duration {
    let nanos = time.subsec_nanos();
    Duration::new(time.as_secs(), nanos - nanos % NANOS_PER_TICK)
}

/// Sums test times at tick resolution.
pub(crate) fn sum_times<'a>(times: impl IntoIterator<Item = &'a Duration>) -> Duration {
    times.into_iter().fold(Duration::ZERO, |acc, time| {
        acc.saturating_add(truncate_to_ticks(*time))
    })
}

// Test times are serialized in seconds with 7 decimal points (100ns ticks).
pub(crate) fn format_test_time(time: &Duration) -> String {
    format!("{}.{:07}", time.as_secs(), time.subsec_nanos() / NANOS_PER_TICK)
}

// Rollup times are serialized in seconds with 3 decimal points, rounded half up.
pub(crate) fn format_rollup_time(time: &Duration) -> String {
    let mut millis = time.as_millis();
    if time.subsec_nanos() % 1_000_000 >= 500_000 {
        millis += 1;
    }
    format!("{}.{:03}", millis / 1000, millis % 1000)
}

pub(crate) fn log_report_shape(report: &Report) {
    for assembly in &report.assemblies {
        debug!(
            target: "quick_xunit::report",
            "rendered assembly {} ({} collections, {} tests, {} errors)",
            assembly.name,
            assembly.collections.len(),
            assembly.counts.total,
            assembly.errors.len(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(Duration::ZERO, "0.0000000" ; "zero")]
    #[test_case(Duration::from_nanos(1_234_567_891), "1.2345678" ; "truncates below a tick")]
    #[test_case(Duration::from_micros(3_900), "0.0039000" ; "sub-millisecond")]
    #[test_case(Duration::from_secs(62), "62.0000000" ; "whole seconds")]
    fn test_time_format(time: Duration, expected: &str) {
        assert_eq!(format_test_time(&time), expected);
    }

    #[test_case(Duration::ZERO, "0.000" ; "zero")]
    #[test_case(Duration::from_micros(1_499), "0.001" ; "rounds down")]
    #[test_case(Duration::from_micros(1_500), "0.002" ; "rounds half up")]
    #[test_case(Duration::from_micros(999_700), "1.000" ; "carries into seconds")]
    #[test_case(Duration::from_millis(42_234), "42.234" ; "exact")]
    fn rollup_time_format(time: Duration, expected: &str) {
        assert_eq!(format_rollup_time(&time), expected);
    }

    #[test]
    fn sums_at_tick_resolution() {
        let times = [
            Duration::from_nanos(150),
            Duration::from_nanos(250),
            Duration::from_nanos(1_000_099),
        ];
        assert_eq!(sum_times(&times), Duration::from_nanos(100 + 200 + 1_000_000));
    }

    #[test]
    fn counts_record_and_add() {
        let mut a = Counts::default();
        a.record(ResultKind::Pass);
        a.record(ResultKind::Fail);
        let mut b = Counts::default();
        b.record(ResultKind::Skip);

        let sum = a + b;
        assert_eq!(
            sum,
            Counts {
                total: 3,
                passed: 1,
                failed: 1,
                skipped: 1,
            }
        );
    }
}
