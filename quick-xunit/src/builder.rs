// Copyright (c) The quick-xunit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Accumulate test outcomes into an xUnit report.

use crate::{
    errors::{InvalidOptionError, ValidationError, ValidationErrorKind},
    outcome::{HarnessError, ResultKind, TestOutcome, TestResult, find_invalid_attribute_char},
    report::{
        AssemblyReport, CollectionReport, Counts, Report, log_report_shape, sum_times,
        truncate_to_ticks,
    },
};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};
use tracing::{debug, warn};

/// Options that apply while rendering a [`Report`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderOptions {
    test_framework: Option<String>,
    environment: Option<String>,
    store_success_output: bool,
    store_failure_output: bool,
}

impl RenderOptions {
    /// Creates options that store all captured output and set no optional attributes.
    pub fn new() -> Self {
        Self {
            test_framework: None,
            environment: None,
            store_success_output: true,
            store_failure_output: true,
        }
    }

    /// Sets the `test-framework` attribute written on every assembly.
    ///
    /// Returns an error, and leaves the options unchanged, if the value contains a character that
    /// cannot be written to an XML attribute.
    pub fn set_test_framework(
        &mut self,
        test_framework: impl Into<String>,
    ) -> Result<&mut Self, InvalidOptionError> {
        self.test_framework = Some(validate_option("test-framework", test_framework.into())?);
        Ok(self)
    }

    /// Sets the `environment` attribute written on every assembly.
    ///
    /// Returns an error, and leaves the options unchanged, if the value contains a character that
    /// cannot be written to an XML attribute.
    pub fn set_environment(
        &mut self,
        environment: impl Into<String>,
    ) -> Result<&mut Self, InvalidOptionError> {
        self.environment = Some(validate_option("environment", environment.into())?);
        Ok(self)
    }

    /// Sets whether output is stored for tests that passed or were skipped.
    pub fn set_store_success_output(&mut self, store: bool) -> &mut Self {
        self.store_success_output = store;
        self
    }

    /// Sets whether output is stored for tests that failed.
    pub fn set_store_failure_output(&mut self, store: bool) -> &mut Self {
        self.store_failure_output = store;
        self
    }

    fn stores_output_for(&self, kind: ResultKind) -> bool {
        match kind {
            ResultKind::Pass | ResultKind::Skip => self.store_success_output,
            ResultKind::Fail => self.store_failure_output,
        }
    }
}

fn validate_option(option: &'static str, value: String) -> Result<String, InvalidOptionError> {
    match find_invalid_attribute_char(&value) {
        Some(ch) => Err(InvalidOptionError::new(option, ch)),
        None => Ok(value),
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Folds a stream of [`TestOutcome`] records into an assembly → collection → test hierarchy.
///
/// Groups are created on first sight and keep that order; lookup is by path or name. Records are
/// append-only: nothing is mutated once added.
#[derive(Clone, Debug, Default)]
pub struct ReportBuilder {
    options: RenderOptions,
    assemblies: IndexMap<Utf8PathBuf, AssemblyGroup>,
    len: usize,
}

#[derive(Clone, Debug, Default)]
struct AssemblyGroup {
    collections: IndexMap<String, CollectionGroup>,
    errors: Vec<HarnessError>,
}

#[derive(Clone, Debug, Default)]
struct CollectionGroup {
    tests: Vec<TestOutcome>,
    counts: Counts,
    time: Duration,
}

impl ReportBuilder {
    /// Creates an empty builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty builder with the given options.
    pub fn with_options(options: RenderOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Returns the render options.
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Adds a test outcome.
    ///
    /// Returns an error, and leaves the builder unchanged, if the outcome is missing a required
    /// field.
    pub fn add(&mut self, outcome: TestOutcome) -> Result<&mut Self, ValidationError> {
        validate_outcome(&outcome)?;
        self.insert(outcome);
        Ok(self)
    }

    fn insert(&mut self, outcome: TestOutcome) {
        let kind = outcome.result.kind();
        let assembly = self.assembly_group(&outcome.assembly_path);
        if !assembly.collections.contains_key(&outcome.collection_name) {
            debug!(
                target: "quick_xunit::builder",
                "new collection `{}` in {}", outcome.collection_name, outcome.assembly_path,
            );
        }
        let collection = assembly
            .collections
            .entry(outcome.collection_name.clone())
            .or_default();

        collection.counts.record(kind);
        collection.time = collection
            .time
            .saturating_add(truncate_to_ticks(outcome.time));
        debug!(target: "quick_xunit::builder", "added {} ({kind})", outcome.name);
        collection.tests.push(outcome);
        self.len += 1;
    }

    /// Adds several test outcomes, stopping at the first invalid one.
    pub fn add_all(
        &mut self,
        outcomes: impl IntoIterator<Item = TestOutcome>,
    ) -> Result<&mut Self, ValidationError> {
        for outcome in outcomes {
            self.add(outcome)?;
        }
        Ok(self)
    }

    /// Adds an error that happened outside of any test.
    pub fn add_error(&mut self, error: HarnessError) -> Result<&mut Self, ValidationError> {
        let name = error.name.as_deref();
        validate_assembly_path(name, &error.assembly_path)
            .and_then(|()| {
                name.map_or(Ok(()), |name| validate_name(Some(name), "name", name))
            })
            .and_then(|()| {
                validate_attribute(name, "exception-type", error.exception_type.as_deref())
            })
            .inspect_err(|error| {
                warn!(target: "quick_xunit::builder", "rejected harness error: {error}");
            })?;

        debug!(
            target: "quick_xunit::builder",
            "added {} error for {}", error.kind, error.assembly_path,
        );
        let group = self.assembly_group(&error.assembly_path);
        group.errors.push(error);
        Ok(self)
    }

    /// Returns the number of test outcomes added so far.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no test outcomes have been added.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of assemblies seen so far.
    pub fn assembly_count(&self) -> usize {
        self.assemblies.len()
    }

    /// Materializes the report.
    ///
    /// This is a pure function of the outcomes added so far and `timestamp`: rendering twice with
    /// the same timestamp produces identical reports. Only the local wall-clock part of
    /// `timestamp` is written out.
    pub fn render(&self, timestamp: impl Into<DateTime<FixedOffset>>) -> Report {
        let timestamp = timestamp.into().naive_local();

        let assemblies = self
            .assemblies
            .iter()
            .map(|(path, group)| self.render_assembly(path, group))
            .collect();

        let report = Report {
            timestamp,
            assemblies,
        };
        log_report_shape(&report);
        report
    }

    fn render_assembly(&self, path: &Utf8Path, group: &AssemblyGroup) -> AssemblyReport {
        let collections: Vec<_> = group
            .collections
            .iter()
            .map(|(name, collection)| CollectionReport {
                name: name.clone(),
                counts: collection.counts,
                time: collection.time,
                tests: collection
                    .tests
                    .iter()
                    .map(|test| self.render_test(test))
                    .collect(),
            })
            .collect();

        let counts = collections
            .iter()
            .fold(Counts::default(), |acc, collection| acc + collection.counts);
        let time = sum_times(
            collections
                .iter()
                .flat_map(|collection| collection.tests.iter().map(|test| &test.time)),
        );

        AssemblyReport {
            name: path.to_owned(),
            test_framework: self.options.test_framework.clone(),
            environment: self.options.environment.clone(),
            counts,
            time,
            errors: group.errors.clone(),
            collections,
        }
    }

    fn render_test(&self, test: &TestOutcome) -> TestOutcome {
        let mut test = test.clone();
        test.time = truncate_to_ticks(test.time);
        if !self.options.stores_output_for(test.result.kind()) {
            test.output = None;
        }
        test
    }

    fn assembly_group(&mut self, path: &Utf8Path) -> &mut AssemblyGroup {
        if !self.assemblies.contains_key(path) {
            debug!(target: "quick_xunit::builder", "new assembly {path}");
        }
        self.assemblies.entry(path.to_owned()).or_default()
    }
}

/// A [`ReportBuilder`] that outcomes can be added to from several threads at once.
///
/// Each `add` holds the lock only while the record is inserted. Rendering needs the builder back
/// through [`into_inner`](Self::into_inner), so it can only happen once every producer is done.
#[derive(Debug, Default)]
pub struct SyncReportBuilder {
    inner: Mutex<ReportBuilder>,
}

impl SyncReportBuilder {
    /// Creates an empty builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty builder with the given options.
    pub fn with_options(options: RenderOptions) -> Self {
        Self {
            inner: Mutex::new(ReportBuilder::with_options(options)),
        }
    }

    /// Adds a test outcome. See [`ReportBuilder::add`].
    pub fn add(&self, outcome: TestOutcome) -> Result<(), ValidationError> {
        // Validate outside the lock.
        validate_outcome(&outcome)?;
        self.lock().insert(outcome);
        Ok(())
    }

    /// Adds an error that happened outside of any test. See [`ReportBuilder::add_error`].
    pub fn add_error(&self, error: HarnessError) -> Result<(), ValidationError> {
        self.lock().add_error(error)?;
        Ok(())
    }

    /// Returns the number of test outcomes added so far.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if no test outcomes have been added.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns the underlying builder.
    pub fn into_inner(self) -> ReportBuilder {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ReportBuilder> {
        // Every critical section leaves the builder consistent, so a poisoned lock is still
        // usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl From<ReportBuilder> for SyncReportBuilder {
    fn from(builder: ReportBuilder) -> Self {
        Self {
            inner: Mutex::new(builder),
        }
    }
}

fn validate_outcome(outcome: &TestOutcome) -> Result<(), ValidationError> {
    validate_outcome_impl(outcome).inspect_err(|error| {
        warn!(target: "quick_xunit::builder", "rejected test outcome: {error}");
    })
}

fn validate_outcome_impl(outcome: &TestOutcome) -> Result<(), ValidationError> {
    let name = Some(outcome.name.as_str());
    validate_assembly_path(name, &outcome.assembly_path)?;
    validate_name(name, "name", &outcome.name)?;
    validate_name(name, "type", &outcome.type_name)?;
    validate_name(name, "method", &outcome.method_name)?;
    validate_name(name, "collection", &outcome.collection_name)?;
    for t in &outcome.traits {
        validate_name(name, "trait name", &t.name)?;
        validate_attribute(name, "trait value", Some(t.value.as_str()))?;
    }
    if let TestResult::Fail { exception_type, .. } = &outcome.result {
        validate_attribute(name, "exception-type", exception_type.as_deref())?;
    }
    Ok(())
}

fn validate_assembly_path(name: Option<&str>, path: &Utf8Path) -> Result<(), ValidationError> {
    if path.as_str().is_empty() {
        return Err(ValidationError::new(
            name,
            ValidationErrorKind::MissingAssemblyPath,
        ));
    }
    if !path.is_absolute() {
        return Err(ValidationError::new(
            name,
            ValidationErrorKind::RelativeAssemblyPath {
                path: path.to_owned(),
            },
        ));
    }
    validate_name(name, "assembly", path.as_str())
}

fn validate_name(
    name: Option<&str>,
    field: &'static str,
    value: &str,
) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::new(
            name,
            ValidationErrorKind::EmptyField { field },
        ));
    }
    validate_attribute(name, field, Some(value))
}

/// Checks a value that may be empty, or absent, but is still written to an attribute.
fn validate_attribute(
    name: Option<&str>,
    field: &'static str,
    value: Option<&str>,
) -> Result<(), ValidationError> {
    match value.and_then(find_invalid_attribute_char) {
        Some(ch) => Err(ValidationError::new(
            name,
            ValidationErrorKind::InvalidXmlChar { field, ch },
        )),
        None => Ok(()),
    }
}
