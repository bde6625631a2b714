// Copyright (c) The quick-xunit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

// Assembly paths must be absolute, and these fixtures use Unix paths.
#![cfg(unix)]

use chrono::{FixedOffset, TimeZone};
use goldenfile::Mint;
use quick_xunit::{
    HarnessError, HarnessErrorKind, RenderOptions, Report, ReportBuilder, TestOutcome, TestResult,
};
use std::time::Duration;

static ASSEMBLY: &str = "/work/Xunit.Xml.TestLogger.NetCore.Tests.dll";
static UNIT_TEST_1: &str = "Xunit.Xml.TestLogger.NetCore.Tests.UnitTest1";
static UNIT_TEST_2: &str = "Xunit.Xml.TestLogger.NetCore.Tests.UnitTest2";

#[test]
fn fixtures() {
    let mut mint = Mint::new("tests/fixtures");

    let f = mint
        .new_goldenfile("xunit_report.xml")
        .expect("creating new goldenfile succeeds");

    let report = xunit_report();
    report.serialize(f).expect("serializing xunit_report succeeds");
}

fn xunit_report() -> Report {
    let mut options = RenderOptions::new();
    options
        .set_test_framework("xUnit.net 2.4.0")
        .and_then(|options| options.set_environment("64-bit .NET Core"))
        .expect("options are valid");
    let mut builder = ReportBuilder::with_options(options);

    let mut outcome = TestOutcome::new(ASSEMBLY, UNIT_TEST_1, "PassTest11", TestResult::Pass);
    outcome.set_time(Duration::from_nanos(1_234_567));
    builder.add(outcome).expect("PassTest11 is valid");

    let mut result = TestResult::fail("Assert.False() Failure");
    result
        .set_exception_type("Xunit.Sdk.FalseException")
        .set_stack_trace(
            "at Xunit.Xml.TestLogger.NetCore.Tests.UnitTest1.FailTest11() in UnitTest1.cs:line 21",
        );
    let mut outcome = TestOutcome::new(ASSEMBLY, UNIT_TEST_1, "FailTest11", result);
    outcome.set_time(Duration::from_millis(12));
    builder.add(outcome).expect("FailTest11 is valid");

    let mut outcome = TestOutcome::new(
        ASSEMBLY,
        UNIT_TEST_2,
        "PassTest21",
        TestResult::Pass,
    );
    outcome
        .set_time(Duration::from_millis(250))
        .set_output("hello world");
    builder.add(outcome).expect("PassTest21 is valid");

    // no stack trace to test that.
    let mut outcome = TestOutcome::new(
        ASSEMBLY,
        UNIT_TEST_2,
        "FailTest21",
        TestResult::fail("Assert.Equal() Failure"),
    );
    outcome.set_time(Duration::from_millis(1500));
    builder.add(outcome).expect("FailTest21 is valid");

    let mut outcome = TestOutcome::new(
        ASSEMBLY,
        UNIT_TEST_1,
        "SkipTest11",
        TestResult::skip("Skipped"),
    );
    outcome.add_trait(("Category", "Unit"));
    builder.add(outcome).expect("SkipTest11 is valid");

    let mut error = HarnessError::new(
        ASSEMBLY,
        HarnessErrorKind::TestClassCleanup,
        "Cleanup failed",
    );
    error
        .set_name(UNIT_TEST_2)
        .set_exception_type("System.InvalidOperationException")
        .set_stack_trace("at UnitTest2.Dispose()");
    builder.add_error(error).expect("harness error is valid");

    let timestamp = FixedOffset::east_opt(0)
        .and_then(|tz| tz.with_ymd_and_hms(2017, 10, 31, 9, 15, 2).single())
        .expect("valid timestamp");
    builder.render(timestamp)
}
