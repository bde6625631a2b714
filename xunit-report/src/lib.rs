// Copyright (c) The quick-xunit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn newline-delimited JSON test outcomes into an xUnit v2 XML report.
//!
//! Each input line is one record. Test outcomes look like:
//!
//! ```json
//! {"assembly": "/work/Tests.dll", "type": "Tests.UnitTest1", "method": "PassTest", "result": "Pass", "time": 0.012}
//! ```
//!
//! Harness errors set `"kind": "error"`. Lines that cannot be parsed or are rejected are logged and
//! skipped, and the report is still written.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;
mod record;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
pub use output::{Color, LOG_ENV, OutputContext};
pub use record::{ReadSummary, RecordError, read_records};
