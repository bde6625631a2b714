// Copyright (c) The quick-xunit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use std::{fmt, time::Duration};

/// The prefix xUnit uses for collections derived from a test class.
pub const COLLECTION_PREFIX: &str = "Test collection for ";

/// The recorded result of executing a single test.
///
/// Outcomes are added to a [`ReportBuilder`](crate::ReportBuilder) as tests complete.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct TestOutcome {
    /// The absolute path to the binary containing the test.
    pub assembly_path: Utf8PathBuf,

    /// The collection this test belongs to.
    ///
    /// Defaults to `Test collection for <type_name>`.
    pub collection_name: String,

    /// The fully qualified name of the type declaring the test.
    pub type_name: String,

    /// The name of the test method.
    pub method_name: String,

    /// The display name of the test.
    ///
    /// Defaults to `<type_name>.<method_name>`.
    pub name: String,

    /// The result of this test.
    pub result: TestResult,

    /// The time it took to execute this test.
    pub time: Duration,

    /// Traits attached to this test, in declaration order.
    pub traits: Vec<Trait>,

    /// Output captured while the test was executed.
    pub output: Option<XmlString>,
}

impl TestOutcome {
    /// Creates a new outcome for `<type_name>.<method_name>`.
    pub fn new(
        assembly_path: impl Into<Utf8PathBuf>,
        type_name: impl Into<String>,
        method_name: impl Into<String>,
        result: TestResult,
    ) -> Self {
        let type_name = type_name.into();
        let method_name = method_name.into();
        Self {
            assembly_path: assembly_path.into(),
            collection_name: format!("{COLLECTION_PREFIX}{type_name}"),
            name: format!("{type_name}.{method_name}"),
            type_name,
            method_name,
            result,
            time: Duration::ZERO,
            traits: vec![],
            output: None,
        }
    }

    /// Overrides the collection name.
    pub fn set_collection_name(&mut self, collection_name: impl Into<String>) -> &mut Self {
        self.collection_name = collection_name.into();
        self
    }

    /// Overrides the display name.
    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self
    }

    /// Sets the time taken for the test.
    pub fn set_time(&mut self, time: Duration) -> &mut Self {
        self.time = time;
        self
    }

    /// Adds a trait to this test.
    pub fn add_trait(&mut self, t: impl Into<Trait>) -> &mut Self {
        self.traits.push(t.into());
        self
    }

    /// Adds several traits to this test, in order.
    pub fn add_traits(&mut self, traits: impl IntoIterator<Item = impl Into<Trait>>) -> &mut Self {
        for t in traits {
            self.add_trait(t);
        }
        self
    }

    /// Sets captured output.
    pub fn set_output(&mut self, output: impl AsRef<str>) -> &mut Self {
        self.output = Some(XmlString::new(output));
        self
    }

    /// Sets captured output from a `Vec<u8>`.
    ///
    /// The output is converted to a string, lossily.
    pub fn set_output_lossy(&mut self, output: impl AsRef<[u8]>) -> &mut Self {
        self.set_output(String::from_utf8_lossy(output.as_ref()))
    }

    /// Returns the assembly path.
    pub fn assembly_path(&self) -> &Utf8Path {
        &self.assembly_path
    }
}

/// The result of a single test.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TestResult {
    /// The test passed.
    Pass,

    /// The test failed.
    Fail {
        /// The type of the exception that caused the failure, if known.
        exception_type: Option<String>,

        /// The failure message.
        message: XmlString,

        /// The stack trace, if the test framework provided one.
        stack_trace: Option<XmlString>,
    },

    /// The test was not run.
    Skip {
        /// Why the test was skipped.
        reason: XmlString,
    },
}

impl TestResult {
    /// Creates a new `TestResult` that represents a failed test.
    pub fn fail(message: impl AsRef<str>) -> Self {
        TestResult::Fail {
            exception_type: None,
            message: XmlString::new(message),
            stack_trace: None,
        }
    }

    /// Creates a new `TestResult` that represents a skipped test.
    pub fn skip(reason: impl AsRef<str>) -> Self {
        TestResult::Skip {
            reason: XmlString::new(reason),
        }
    }

    /// Sets the exception type. No-op unless this is a failure.
    pub fn set_exception_type(&mut self, ty: impl Into<String>) -> &mut Self {
        if let TestResult::Fail { exception_type, .. } = self {
            *exception_type = Some(ty.into());
        }
        self
    }

    /// Sets the stack trace. No-op unless this is a failure.
    pub fn set_stack_trace(&mut self, trace: impl AsRef<str>) -> &mut Self {
        if let TestResult::Fail { stack_trace, .. } = self {
            *stack_trace = Some(XmlString::new(trace));
        }
        self
    }

    /// Returns the kind of this result.
    pub fn kind(&self) -> ResultKind {
        match self {
            TestResult::Pass => ResultKind::Pass,
            TestResult::Fail { .. } => ResultKind::Fail,
            TestResult::Skip { .. } => ResultKind::Skip,
        }
    }
}

/// The kind of a [`TestResult`], as written to the `result` attribute.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ResultKind {
    /// The test passed. Written as `Pass`.
    Pass,

    /// The test failed. Written as `Fail`.
    Fail,

    /// The test was not run. Written as `Skip`.
    Skip,
}

impl ResultKind {
    /// Returns the string written to the XML.
    pub fn as_str(self) -> &'static str {
        match self {
            ResultKind::Pass => "Pass",
            ResultKind::Fail => "Fail",
            ResultKind::Skip => "Skip",
        }
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A name/value pair attached to a test.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Trait {
    /// The name of the trait.
    pub name: String,

    /// The value of the trait.
    pub value: String,
}

impl Trait {
    /// Creates a new `Trait` instance.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl<T> From<(T, T)> for Trait
where
    T: Into<String>,
{
    fn from((k, v): (T, T)) -> Self {
        Trait::new(k, v)
    }
}

/// An infrastructure error that happened outside of any individual test.
///
/// Harness errors are listed under the assembly's `errors` element and counted
/// in its `errors` attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct HarnessError {
    /// The assembly this error is attributed to.
    pub assembly_path: Utf8PathBuf,

    /// Where the error happened.
    pub kind: HarnessErrorKind,

    /// The name of the failing entity (collection, class or test), if any.
    pub name: Option<String>,

    /// The type of the exception, if known.
    pub exception_type: Option<String>,

    /// The error message.
    pub message: XmlString,

    /// The stack trace, if known.
    pub stack_trace: Option<XmlString>,
}

impl HarnessError {
    /// Creates a new harness error.
    pub fn new(
        assembly_path: impl Into<Utf8PathBuf>,
        kind: HarnessErrorKind,
        message: impl AsRef<str>,
    ) -> Self {
        Self {
            assembly_path: assembly_path.into(),
            kind,
            name: None,
            exception_type: None,
            message: XmlString::new(message),
            stack_trace: None,
        }
    }

    /// Sets the name of the failing entity.
    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the exception type.
    pub fn set_exception_type(&mut self, ty: impl Into<String>) -> &mut Self {
        self.exception_type = Some(ty.into());
        self
    }

    /// Sets the stack trace.
    pub fn set_stack_trace(&mut self, trace: impl AsRef<str>) -> &mut Self {
        self.stack_trace = Some(XmlString::new(trace));
        self
    }
}

/// Where a [`HarnessError`] happened.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HarnessErrorKind {
    /// Tearing down the assembly failed.
    AssemblyCleanup,

    /// Tearing down a test collection failed.
    TestCollectionCleanup,

    /// Tearing down a test class failed.
    TestClassCleanup,

    /// Tearing down a test method failed.
    TestMethodCleanup,

    /// Tearing down a test case failed.
    TestCaseCleanup,

    /// Tearing down a single test failed.
    TestCleanup,

    /// The test run itself failed, outside of any cleanup step.
    Fatal,
}

impl HarnessErrorKind {
    /// Returns the string written to the `type` attribute.
    pub fn as_str(self) -> &'static str {
        match self {
            HarnessErrorKind::AssemblyCleanup => "assembly-cleanup",
            HarnessErrorKind::TestCollectionCleanup => "test-collection-cleanup",
            HarnessErrorKind::TestClassCleanup => "test-class-cleanup",
            HarnessErrorKind::TestMethodCleanup => "test-method-cleanup",
            HarnessErrorKind::TestCaseCleanup => "test-case-cleanup",
            HarnessErrorKind::TestCleanup => "test-cleanup",
            HarnessErrorKind::Fatal => "fatal",
        }
    }

    /// Parses the string written to the `type` attribute.
    pub fn from_str_opt(s: &str) -> Option<Self> {
        let kind = match s {
            "assembly-cleanup" => HarnessErrorKind::AssemblyCleanup,
            "test-collection-cleanup" => HarnessErrorKind::TestCollectionCleanup,
            "test-class-cleanup" => HarnessErrorKind::TestClassCleanup,
            "test-method-cleanup" => HarnessErrorKind::TestMethodCleanup,
            "test-case-cleanup" => HarnessErrorKind::TestCaseCleanup,
            "test-cleanup" => HarnessErrorKind::TestCleanup,
            "fatal" => HarnessErrorKind::Fatal,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for HarnessErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form text that is written out to the XML, such as failure messages,
/// skip reasons and captured output.
///
/// # Encoding
///
/// XML 1.0 cannot represent most ASCII control characters, even escaped. They are
/// removed on construction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct XmlString {
    data: Box<str>,
}

impl XmlString {
    /// Creates a new `XmlString`, removing any characters XML cannot carry.
    pub fn new(data: impl AsRef<str>) -> Self {
        let data = data
            .as_ref()
            .replace(is_invalid_xml_char, "")
            .into_boxed_str();
        Self { data }
    }

    /// Returns the text.
    pub fn as_str(&self) -> &str {
        &self.data
    }

    /// Converts the text into a string.
    pub fn into_string(self) -> String {
        self.data.into_string()
    }
}

impl AsRef<str> for XmlString {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for XmlString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.data)
    }
}

impl From<XmlString> for String {
    fn from(s: XmlString) -> Self {
        s.into_string()
    }
}

impl PartialEq<str> for XmlString {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for XmlString {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

pub(crate) fn is_invalid_xml_char(c: char) -> bool {
    matches!(c, '\x00'..='\x08' | '\x0b' | '\x0c' | '\x0e'..='\x1f')
}

/// Attribute values are written unescaped apart from markup, and parsers normalize tabs and line
/// breaks in them to spaces.
pub(crate) fn find_invalid_attribute_char(value: &str) -> Option<char> {
    value
        .chars()
        .find(|&c| is_invalid_xml_char(c) || matches!(c, '\t' | '\n' | '\r'))
}
