// Copyright (c) The quick-xunit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Build xUnit v2 XML reports in Rust.
//!
//! Outcomes are added one at a time to a [`ReportBuilder`], which groups them by assembly and by
//! collection and keeps running counts. [`ReportBuilder::render`] materializes a [`Report`],
//! which can be serialized to any writer or atomically written to a file.
//!
//! ```
//! use quick_xunit::{ReportBuilder, TestOutcome, TestResult};
//! use chrono::{FixedOffset, TimeZone};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut builder = ReportBuilder::new();
//! builder.add(TestOutcome::new("/work/Tests.dll", "Tests.UnitTest1", "PassTest", TestResult::Pass))?;
//! builder.add(TestOutcome::new("/work/Tests.dll", "Tests.UnitTest1", "SkipTest", TestResult::skip("Skipped")))?;
//!
//! let timestamp = FixedOffset::east_opt(0).unwrap().with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
//! let xml = builder.render(timestamp).to_string()?;
//! assert!(xml.contains("<reason><![CDATA[Skipped]]></reason>"));
//! # Ok(())
//! # }
//! ```

mod builder;
mod config;
pub mod errors;
mod outcome;
mod report;
mod serialize;

pub use builder::*;
pub use crate::config::ReportConfig;
pub use outcome::{
    COLLECTION_PREFIX, HarnessError, HarnessErrorKind, ResultKind, TestOutcome, TestResult, Trait,
    XmlString,
};
pub use report::*;
pub use serialize::{MAX_INDENT, SerializeOptions};
