// Copyright (c) The devshard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::{BROWSER_TESTS, contains_slice, init_tracing};
use devshard_filtering::resolve_filters;
use devshard_runner::{
    batching::DeviceBatcher,
    config::PlannerConfig,
    errors::PartitionConfigError,
    grouping::group_tests,
    partition::ExternalShard,
    planner::TestPlanner,
    retry::expand_retries,
    test_id::TestIdentifier,
};
use indoc::indoc;
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;

#[test]
fn group_tests_keeps_chains_contiguous() {
    init_tracing();

    let flat = group_tests([
        "TestClass1.testcase1",
        "TestClass1.otherTestCase",
        "TestClass1.PRE_testcase1",
        "TestClass1.abc_testcase2",
        "TestClass1.PRE_PRE_testcase1",
        "TestClass1.PRE_abc_testcase2",
        "TestClass1.PRE_PRE_abc_testcase2",
    ])
    .flatten();

    assert!(contains_slice(
        &flat,
        &[
            "TestClass1.PRE_PRE_testcase1",
            "TestClass1.PRE_testcase1",
            "TestClass1.testcase1",
        ]
    ));
    assert!(contains_slice(
        &flat,
        &[
            "TestClass1.PRE_PRE_abc_testcase2",
            "TestClass1.PRE_abc_testcase2",
            "TestClass1.abc_testcase2",
        ]
    ));
    assert!(contains_slice(&flat, &["TestClass1.otherTestCase"]));
}

#[test]
fn retry_includes_prerequisite_chains() {
    init_tracing();

    let plan = expand_retries(
        [
            "TestClass1.PRE_PRE_testcase1",
            "TestClass1.abc_testcase2",
            "TestClass1.PRE_def_testcase3",
            "TestClass1.otherTestCase",
        ],
        BROWSER_TESTS.iter().copied(),
    );
    let flat = plan.flatten();

    for chain in [
        &[
            "TestClass1.PRE_PRE_testcase1",
            "TestClass1.PRE_testcase1",
            "TestClass1.testcase1",
        ][..],
        &[
            "TestClass1.PRE_PRE_abc_testcase2",
            "TestClass1.PRE_abc_testcase2",
            "TestClass1.abc_testcase2",
        ],
        &["TestClass1.PRE_def_testcase3", "TestClass1.def_testcase3"],
        &["TestClass1.otherTestCase"],
    ] {
        assert!(contains_slice(&flat, chain), "{chain:?} is retried in order");
    }
    assert_eq!(flat.len(), BROWSER_TESTS.len());
}

#[test]
fn external_sharding_partitions_exactly() {
    let tests = [
        "TestClass1.testcase1",
        "TestClass1.testcase2",
        "TestClass2.testcase1",
        "TestClass3.testcase1",
    ];
    let units = group_tests(tests).into_units();
    let expected: BTreeSet<_> = tests.iter().map(|test| TestIdentifier::new(*test)).collect();

    let one = ExternalShard::new(0, 1).expect("valid shard").apply(&units);
    let one: BTreeSet<_> = one.into_iter().flat_map(|unit| unit.into_tests()).collect();
    assert_eq!(one, expected);

    let mut union = BTreeSet::new();
    for index in 0..2 {
        let shard = ExternalShard::new(index, 2).expect("valid shard");
        for test in shard.apply(&units).into_iter().flat_map(|unit| unit.into_tests()) {
            assert!(union.insert(test), "test assigned to more than one shard");
        }
    }
    assert_eq!(union, expected);
}

#[test]
fn full_pipeline_from_config() {
    init_tracing();

    let config = PlannerConfig::from_toml(indoc! {r#"
        [batching]
        batch-limit = 2
        isolate = ["TestClass1.otherTestCase"]
    "#})
    .expect("config is valid");
    let planner = TestPlanner::new(&config, 2).expect("valid planner");

    let resolution = resolve_filters(&["TestClass1.*"]);
    assert!(resolution.is_resolved());

    let plan = planner.plan_filtered(BROWSER_TESTS.iter().copied(), &resolution);
    let shards = plan.shards();
    assert_eq!(shards.test_count(), BROWSER_TESTS.len());
    assert!(shards.batches()[0].is_isolated());
    assert_eq!(
        shards.batches()[0].tests(),
        &[TestIdentifier::new("TestClass1.otherTestCase")]
    );

    // Retrying the failures of the first attempt goes through the same batching.
    let retry = planner.plan_retry(["TestClass1.testcase1"], BROWSER_TESTS.iter().copied());
    assert_eq!(retry.shards().test_count(), 3);
    assert_eq!(retry.shards().batches().len(), 1);
}

#[test]
fn zero_devices_fails() {
    assert_eq!(
        DeviceBatcher::new(0, 2).map(|_| ()),
        Err(PartitionConfigError::ZeroDevices)
    );
    assert_eq!(
        TestPlanner::new(&PlannerConfig::default(), 0).map(|_| ()),
        Err(PartitionConfigError::ZeroDevices)
    );
}
