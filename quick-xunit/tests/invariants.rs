// Copyright (c) The quick-xunit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

// Assembly paths must be absolute, and these tests use Unix paths.
#![cfg(unix)]

use chrono::{FixedOffset, TimeZone};
use proptest::{collection::vec, prelude::*};
use quick_xunit::{Counts, ReportBuilder, SyncReportBuilder, TestOutcome, TestResult};
use std::time::Duration;

fn arb_outcome() -> impl Strategy<Value = TestOutcome> {
    (0..3usize, 0..4usize, 0..100usize, 0..3u8, 0..5_000_000_000u64).prop_map(
        |(assembly, ty, method, result, nanos)| {
            let result = match result {
                0 => TestResult::Pass,
                1 => TestResult::fail("failed"),
                _ => TestResult::skip("skipped"),
            };
            let mut outcome = TestOutcome::new(
                format!("/work/Assembly{assembly}.dll"),
                format!("N.Type{ty}"),
                format!("Method{method}"),
                result,
            );
            outcome.set_time(Duration::from_nanos(nanos));
            outcome
        },
    )
}

fn timestamp() -> chrono::DateTime<FixedOffset> {
    FixedOffset::east_opt(3600)
        .and_then(|tz| tz.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).single())
        .expect("valid timestamp")
}

fn check_counts(counts: &Counts) -> Result<(), TestCaseError> {
    prop_assert_eq!(counts.total, counts.passed + counts.failed + counts.skipped);
    Ok(())
}

proptest! {
    #[test]
    fn rollups_are_consistent(outcomes in vec(arb_outcome(), 0..64)) {
        let mut builder = ReportBuilder::new();
        builder.add_all(outcomes.clone()).expect("outcomes are valid");
        prop_assert_eq!(builder.len(), outcomes.len());

        let report = builder.render(timestamp());
        prop_assert_eq!(report.counts().total, outcomes.len());
        check_counts(&report.counts())?;

        for assembly in &report.assemblies {
            check_counts(&assembly.counts)?;
            let collection_total: usize = assembly.collections.iter().map(|c| c.counts.total).sum();
            prop_assert_eq!(collection_total, assembly.counts.total);
            let collection_time: Duration = assembly.collections.iter().map(|c| c.time).sum();
            prop_assert_eq!(collection_time, assembly.time);

            for collection in &assembly.collections {
                check_counts(&collection.counts)?;
                prop_assert_eq!(collection.tests.len(), collection.counts.total);
                let test_time: Duration = collection.tests.iter().map(|t| t.time).sum();
                prop_assert_eq!(test_time, collection.time);

                for test in &collection.tests {
                    prop_assert_eq!(test.time.subsec_nanos() % 100, 0);
                    prop_assert_eq!(test.assembly_path(), assembly.name.as_path());
                    prop_assert_eq!(
                        &collection.name,
                        &format!("Test collection for {}", test.type_name)
                    );
                }
            }
        }
    }

    #[test]
    fn rendering_is_deterministic(outcomes in vec(arb_outcome(), 0..32)) {
        let mut builder = ReportBuilder::new();
        builder.add_all(outcomes).expect("outcomes are valid");

        let first = builder.render(timestamp());
        let second = builder.render(timestamp());
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(
            first.to_string().expect("serializing succeeds"),
            second.to_string().expect("serializing succeeds")
        );
    }

    #[test]
    fn sync_builder_matches_sequential(outcomes in vec(arb_outcome(), 0..32)) {
        let mut sequential = ReportBuilder::new();
        let sync = SyncReportBuilder::new();
        for outcome in &outcomes {
            sequential.add(outcome.clone()).expect("outcome is valid");
            sync.add(outcome.clone()).expect("outcome is valid");
        }
        prop_assert_eq!(
            sequential.render(timestamp()),
            sync.into_inner().render(timestamp())
        );
    }
}
