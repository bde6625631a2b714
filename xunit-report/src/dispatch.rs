// Copyright (c) The quick-xunit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::{ExpectedError, ReportExitCode, Result},
    output::{Color, OutputContext},
    record::{ReadSummary, read_records},
};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, FixedOffset, Local};
use clap::Parser;
use quick_xunit::{ReportBuilder, ReportConfig};
use std::{
    fs::File,
    io::{self, BufReader},
};
use tracing::{info, warn};

/// Build an xUnit v2 XML report from test outcome records.
///
/// Records are read as newline-delimited JSON, one test outcome (or harness error) per line.
#[derive(Debug, Parser)]
#[command(version, bin_name = "xunit-report", max_term_width = 100)]
pub struct XunitReportApp {
    /// File to read records from [default: stdin]
    #[arg(value_name = "INPUT")]
    input: Option<Utf8PathBuf>,

    /// Path to write the report to [default: from config]
    #[arg(short, long, value_name = "PATH")]
    output: Option<Utf8PathBuf>,

    /// Config file [default: .config/xunit-report.toml, if present]
    #[arg(long, value_name = "PATH")]
    config_file: Option<Utf8PathBuf>,

    /// Run timestamp in RFC 3339 format [default: now]
    #[arg(long, value_name = "TIMESTAMP")]
    timestamp: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Produce color output
    #[arg(long, value_enum, default_value_t, value_name = "WHEN")]
    color: Color,
}

impl XunitReportApp {
    /// Initializes logging.
    pub fn init_output(&self) -> OutputContext {
        OutputContext {
            verbose: self.verbose,
            color: self.color,
        }
        .init()
    }

    /// Executes the app, returning the process exit code.
    pub fn exec(self) -> Result<i32> {
        let cwd = std::env::current_dir()
            .map_err(|error| ExpectedError::CurrentDirFailed { error })?;
        let cwd = Utf8PathBuf::try_from(cwd)
            .map_err(|error| ExpectedError::CurrentDirInvalidUtf8 { error })?;
        self.exec_in(&cwd)
    }

    fn exec_in(self, cwd: &Utf8Path) -> Result<i32> {
        let config_file = self.config_file.as_deref().map(|file| cwd.join(file));
        let mut config = ReportConfig::from_sources(cwd, config_file.as_deref())?;
        if let Some(output) = &self.output {
            config.set_path(cwd.join(output));
        }
        let timestamp = parse_timestamp(self.timestamp.as_deref())?;

        let mut builder = ReportBuilder::with_options(config.render_options());
        let summary = self.read_input(cwd, &mut builder)?;

        let report = builder.render(timestamp);
        report.write_to_path(&config.serialize_options(), config.path())?;

        if summary.rejected > 0 {
            warn!(
                "{} {} rejected, see above for details",
                summary.rejected,
                if summary.rejected == 1 {
                    "record was"
                } else {
                    "records were"
                },
            );
            Ok(ReportExitCode::RECORDS_REJECTED)
        } else {
            Ok(ReportExitCode::OK)
        }
    }

    fn read_input(&self, cwd: &Utf8Path, builder: &mut ReportBuilder) -> Result<ReadSummary> {
        match self.input.as_deref() {
            None => read_stdin(builder),
            Some(path) if path.as_str() == "-" => read_stdin(builder),
            Some(path) => {
                let path = cwd.join(path);
                info!("reading records from {path}");
                let file = File::open(&path).map_err(|err| ExpectedError::InputReadError {
                    input: Some(path.clone()),
                    err,
                })?;
                read_records(BufReader::new(file), builder).map_err(|err| {
                    ExpectedError::InputReadError {
                        input: Some(path),
                        err,
                    }
                })
            }
        }
    }
}

fn read_stdin(builder: &mut ReportBuilder) -> Result<ReadSummary> {
    read_records(io::stdin().lock(), builder)
        .map_err(|err| ExpectedError::InputReadError { input: None, err })
}

fn parse_timestamp(input: Option<&str>) -> Result<DateTime<FixedOffset>> {
    match input {
        Some(input) => DateTime::parse_from_rfc3339(input).map_err(|err| {
            ExpectedError::InvalidTimestamp {
                input: input.to_owned(),
                err,
            }
        }),
        None => Ok(Local::now().fixed_offset()),
    }
}
