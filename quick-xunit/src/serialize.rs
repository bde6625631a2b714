// Copyright (c) The quick-xunit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serialize a `Report`.

use crate::{
    errors::SerializeError,
    outcome::{HarnessError, TestOutcome, TestResult, Trait, XmlString},
    report::{AssemblyReport, CollectionReport, Report, format_rollup_time, format_test_time},
};
use quick_xml::{
    Writer,
    events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};
use std::io;

static ASSEMBLIES_TAG: &str = "assemblies";
static ASSEMBLY_TAG: &str = "assembly";
static ERRORS_TAG: &str = "errors";
static ERROR_TAG: &str = "error";
static COLLECTION_TAG: &str = "collection";
static TEST_TAG: &str = "test";
static TRAITS_TAG: &str = "traits";
static TRAIT_TAG: &str = "trait";
static FAILURE_TAG: &str = "failure";
static MESSAGE_TAG: &str = "message";
static STACK_TRACE_TAG: &str = "stack-trace";
static REASON_TAG: &str = "reason";
static OUTPUT_TAG: &str = "output";

static TIMESTAMP_FORMAT: &str = "%m/%d/%Y %H:%M:%S";
static RUN_DATE_FORMAT: &str = "%Y-%m-%d";
static RUN_TIME_FORMAT: &str = "%H:%M:%S";

/// The largest supported indent width.
pub const MAX_INDENT: usize = 16;

/// Options controlling how a [`Report`] is written out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SerializeOptions {
    indent: usize,
}

impl SerializeOptions {
    /// Creates the default options: two-space indentation.
    pub fn new() -> Self {
        Self { indent: 2 }
    }

    /// Sets the number of spaces per nesting level, capped at [`MAX_INDENT`].
    pub fn set_indent(&mut self, indent: usize) -> &mut Self {
        self.indent = indent.min(MAX_INDENT);
        self
    }

    /// Returns the number of spaces per nesting level.
    pub fn indent(&self) -> usize {
        self.indent
    }
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn serialize_report(
    report: &Report,
    options: &SerializeOptions,
    writer: impl io::Write,
) -> Result<(), SerializeError> {
    let mut writer = Writer::new_with_indent(writer, b' ', options.indent);

    let decl = BytesDecl::new("1.0", Some("UTF-8"), None);
    writer.write_event(Event::Decl(decl))?;

    serialize_report_impl(report, &mut writer)?;

    // Add a trailing newline.
    writer.write_indent()?;
    Ok(())
}

fn serialize_report_impl(
    report: &Report,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    // Use the destructuring syntax to ensure that all fields are handled.
    let Report {
        timestamp,
        assemblies,
    } = report;

    let run_date = timestamp.format(RUN_DATE_FORMAT).to_string();
    let run_time = timestamp.format(RUN_TIME_FORMAT).to_string();

    let mut assemblies_tag = BytesStart::new(ASSEMBLIES_TAG);
    assemblies_tag.push_attribute((
        "timestamp",
        timestamp.format(TIMESTAMP_FORMAT).to_string().as_str(),
    ));
    writer.write_event(Event::Start(assemblies_tag))?;

    for assembly in assemblies {
        serialize_assembly(assembly, &run_date, &run_time, writer)?;
    }

    serialize_end_tag(ASSEMBLIES_TAG, writer)?;
    writer.write_event(Event::Eof)?;

    Ok(())
}

fn serialize_assembly(
    assembly: &AssemblyReport,
    run_date: &str,
    run_time: &str,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let AssemblyReport {
        name,
        test_framework,
        environment,
        counts,
        time,
        errors,
        collections,
    } = assembly;

    let mut assembly_tag = BytesStart::new(ASSEMBLY_TAG);
    assembly_tag.push_attribute(("name", name.as_str()));
    if let Some(test_framework) = test_framework {
        assembly_tag.push_attribute(("test-framework", test_framework.as_str()));
    }
    if let Some(environment) = environment {
        assembly_tag.push_attribute(("environment", environment.as_str()));
    }
    assembly_tag.extend_attributes([
        ("run-date", run_date),
        ("run-time", run_time),
        ("total", counts.total.to_string().as_str()),
        ("passed", counts.passed.to_string().as_str()),
        ("failed", counts.failed.to_string().as_str()),
        ("skipped", counts.skipped.to_string().as_str()),
        ("errors", errors.len().to_string().as_str()),
        ("time", format_rollup_time(time).as_str()),
    ]);
    writer.write_event(Event::Start(assembly_tag))?;

    if errors.is_empty() {
        serialize_empty_element(ERRORS_TAG, writer)?;
    } else {
        serialize_empty_start_tag(ERRORS_TAG, writer)?;
        for error in errors {
            serialize_harness_error(error, writer)?;
        }
        serialize_end_tag(ERRORS_TAG, writer)?;
    }

    for collection in collections {
        serialize_collection(collection, writer)?;
    }

    serialize_end_tag(ASSEMBLY_TAG, writer)
}

fn serialize_harness_error(
    error: &HarnessError,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let HarnessError {
        assembly_path: _,
        kind,
        name,
        exception_type,
        message,
        stack_trace,
    } = error;

    let mut error_tag = BytesStart::new(ERROR_TAG);
    error_tag.push_attribute(("type", kind.as_str()));
    if let Some(name) = name {
        error_tag.push_attribute(("name", name.as_str()));
    }
    writer.write_event(Event::Start(error_tag))?;
    serialize_failure(
        exception_type.as_deref(),
        message,
        stack_trace.as_ref(),
        writer,
    )?;
    serialize_end_tag(ERROR_TAG, writer)
}

fn serialize_collection(
    collection: &CollectionReport,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let CollectionReport {
        name,
        counts,
        time,
        tests,
    } = collection;

    let mut collection_tag = BytesStart::new(COLLECTION_TAG);
    collection_tag.extend_attributes([
        ("name", name.as_str()),
        ("total", counts.total.to_string().as_str()),
        ("passed", counts.passed.to_string().as_str()),
        ("failed", counts.failed.to_string().as_str()),
        ("skipped", counts.skipped.to_string().as_str()),
        ("time", format_rollup_time(time).as_str()),
    ]);
    writer.write_event(Event::Start(collection_tag))?;

    for test in tests {
        serialize_test(test, writer)?;
    }

    serialize_end_tag(COLLECTION_TAG, writer)
}

fn serialize_test(
    test: &TestOutcome,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let TestOutcome {
        assembly_path: _,
        collection_name: _,
        type_name,
        method_name,
        name,
        result,
        time,
        traits,
        output,
    } = test;

    let mut test_tag = BytesStart::new(TEST_TAG);
    test_tag.extend_attributes([
        ("name", name.as_str()),
        ("type", type_name.as_str()),
        ("method", method_name.as_str()),
        ("time", format_test_time(time).as_str()),
        ("result", result.kind().as_str()),
    ]);
    writer.write_event(Event::Start(test_tag))?;

    serialize_traits(traits, writer)?;

    match result {
        TestResult::Pass => {}
        TestResult::Fail {
            exception_type,
            message,
            stack_trace,
        } => {
            serialize_failure(
                exception_type.as_deref(),
                message,
                stack_trace.as_ref(),
                writer,
            )?;
        }
        TestResult::Skip { reason } => {
            serialize_cdata_element(REASON_TAG, reason, writer)?;
        }
    }

    if let Some(output) = output {
        serialize_cdata_element(OUTPUT_TAG, output, writer)?;
    }

    serialize_end_tag(TEST_TAG, writer)
}

fn serialize_traits(
    traits: &[Trait],
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    if traits.is_empty() {
        return serialize_empty_element(TRAITS_TAG, writer);
    }

    serialize_empty_start_tag(TRAITS_TAG, writer)?;
    for t in traits {
        let mut trait_tag = BytesStart::new(TRAIT_TAG);
        trait_tag.extend_attributes([("name", t.name.as_str()), ("value", t.value.as_str())]);
        writer.write_event(Event::Empty(trait_tag))?;
    }
    serialize_end_tag(TRAITS_TAG, writer)
}

fn serialize_failure(
    exception_type: Option<&str>,
    message: &XmlString,
    stack_trace: Option<&XmlString>,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let mut failure_tag = BytesStart::new(FAILURE_TAG);
    failure_tag.push_attribute(("exception-type", exception_type.unwrap_or_default()));
    writer.write_event(Event::Start(failure_tag))?;

    serialize_text_element(MESSAGE_TAG, message.as_str(), writer)?;
    // The stack-trace element is always present, and empty if no trace is available.
    serialize_text_element(
        STACK_TRACE_TAG,
        stack_trace.map_or("", |trace| trace.as_str()),
        writer,
    )?;

    serialize_end_tag(FAILURE_TAG, writer)
}

fn serialize_text_element(
    tag_name: &'static str,
    text: &str,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    serialize_empty_start_tag(tag_name, writer)?;
    // A text event, even an empty one, keeps the end tag on the same line.
    writer.write_event(Event::Text(BytesText::new(text)))?;
    serialize_end_tag(tag_name, writer)
}

fn serialize_empty_element(
    tag_name: &'static str,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    serialize_text_element(tag_name, "", writer)
}

fn serialize_cdata_element(
    tag_name: &'static str,
    text: &XmlString,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    serialize_empty_start_tag(tag_name, writer)?;

    // "]]>" cannot appear inside a CDATA section: split it across two adjacent sections.
    let mut rest = text.as_str();
    while let Some(pos) = rest.find("]]>") {
        let (head, tail) = rest.split_at(pos + 2);
        writer.write_event(Event::CData(BytesCData::new(head)))?;
        rest = tail;
    }
    writer.write_event(Event::CData(BytesCData::new(rest)))?;

    serialize_end_tag(tag_name, writer)
}

fn serialize_empty_start_tag(
    tag_name: &'static str,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    writer.write_event(Event::Start(BytesStart::new(tag_name)))?;
    Ok(())
}

fn serialize_end_tag(
    tag_name: &'static str,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    writer.write_event(Event::End(BytesEnd::new(tag_name)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Counts;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn report_with(tests: Vec<TestOutcome>) -> Report {
        let timestamp = NaiveDate::from_ymd_opt(2017, 10, 31)
            .and_then(|date| date.and_hms_opt(12, 1, 2))
            .expect("valid timestamp");
        let mut counts = Counts::default();
        for test in &tests {
            counts.record(test.result.kind());
        }
        Report {
            timestamp,
            assemblies: vec![AssemblyReport {
                name: "/t/T.dll".into(),
                test_framework: None,
                environment: None,
                counts,
                time: Duration::ZERO,
                errors: vec![],
                collections: vec![CollectionReport {
                    name: "Test collection for N.T".to_owned(),
                    counts,
                    time: Duration::ZERO,
                    tests,
                }],
            }],
        }
    }

    fn serialize_to_string(report: &Report) -> String {
        report.to_string().expect("serializing succeeds")
    }

    #[test]
    fn empty_report() {
        let report = Report {
            timestamp: NaiveDate::from_ymd_opt(2024, 2, 9)
                .and_then(|date| date.and_hms_opt(8, 5, 0))
                .expect("valid timestamp"),
            assemblies: vec![],
        };
        assert_eq!(
            serialize_to_string(&report),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <assemblies timestamp=\"02/09/2024 08:05:00\">\n\
             </assemblies>\n"
        );
    }

    #[test]
    fn failure_without_stack_trace() {
        let outcome = TestOutcome::new(
            "/t/T.dll",
            "N.T",
            "F",
            TestResult::fail("Assert.False() Failure\nExpected: False\nActual:   True"),
        );
        let xml = serialize_to_string(&report_with(vec![outcome]));
        assert!(
            xml.contains(
                "<failure exception-type=\"\">\n\
                 \x20         <message>Assert.False() Failure\nExpected: False\nActual:   True</message>\n\
                 \x20         <stack-trace></stack-trace>\n\
                 \x20       </failure>"
            ),
            "unexpected output:\n{xml}"
        );
    }

    #[test]
    fn skip_reason_is_cdata() {
        let outcome = TestOutcome::new("/t/T.dll", "N.T", "S", TestResult::skip("Skipped"));
        let xml = serialize_to_string(&report_with(vec![outcome]));
        assert!(xml.contains("<reason><![CDATA[Skipped]]></reason>"), "{xml}");
    }

    #[test]
    fn skip_reason_with_cdata_terminator_is_split() {
        let outcome = TestOutcome::new("/t/T.dll", "N.T", "S", TestResult::skip("a]]>b <c/>"));
        let xml = serialize_to_string(&report_with(vec![outcome]));
        assert!(
            xml.contains("<reason><![CDATA[a]]]]><![CDATA[>b <c/>]]></reason>"),
            "{xml}"
        );
    }

    #[test]
    fn text_and_attributes_are_escaped() {
        let mut outcome = TestOutcome::new("/t/T.dll", "N.T", "M", TestResult::fail("1 < 2 & 3"));
        outcome.add_trait(("Category", "a&b"));
        let xml = serialize_to_string(&report_with(vec![outcome]));
        assert!(xml.contains("<message>1 &lt; 2 &amp; 3</message>"), "{xml}");
        assert!(
            xml.contains("<trait name=\"Category\" value=\"a&amp;b\"/>"),
            "{xml}"
        );
    }

    #[test]
    fn empty_traits_and_errors_are_present() {
        let outcome = TestOutcome::new("/t/T.dll", "N.T", "P", TestResult::Pass);
        let xml = serialize_to_string(&report_with(vec![outcome]));
        assert!(xml.contains("<errors></errors>"), "{xml}");
        assert!(xml.contains("<traits></traits>"), "{xml}");
    }

    #[test]
    fn indent_is_configurable() {
        let outcome = TestOutcome::new("/t/T.dll", "N.T", "P", TestResult::Pass);
        let report = report_with(vec![outcome]);
        let mut options = SerializeOptions::new();
        options.set_indent(4);
        let xml = report.to_string_with(&options).expect("serializing succeeds");
        assert!(xml.contains("\n    <assembly name=\"/t/T.dll\""), "{xml}");
        assert!(xml.contains("\n        <errors></errors>"), "{xml}");

        options.set_indent(100);
        assert_eq!(options.indent(), MAX_INDENT);
    }
}
