// Copyright (c) The devshard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::test_list;
use devshard_runner::{
    batching::DeviceBatcher,
    grouping::{RunUnit, group_tests},
    partition::ExternalShard,
    retry::expand_retries,
    test_id::{RunKey, TestIdentifier},
};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use test_strategy::proptest;

#[proptest(cases = 256)]
fn grouping_is_idempotent(#[strategy(test_list())] tests: Vec<TestIdentifier>) {
    let once = group_tests(tests.iter()).flatten();
    let twice = group_tests(once.iter()).flatten();
    prop_assert_eq!(&once, &twice);

    let input: BTreeSet<_> = tests.into_iter().collect();
    let output: BTreeSet<_> = once.into_iter().collect();
    prop_assert_eq!(input, output);
}

#[proptest(cases = 256)]
fn grouping_orders_chains(#[strategy(test_list())] tests: Vec<TestIdentifier>) {
    for unit in group_tests(tests).units() {
        let counts: Vec<_> = unit.iter().map(TestIdentifier::prefix_count).collect();
        prop_assert!(counts.windows(2).all(|pair| pair[0] > pair[1]));
    }
}

#[proptest(cases = 256)]
fn external_shards_are_exhaustive_and_disjoint(
    #[strategy(test_list())] tests: Vec<TestIdentifier>,
    #[strategy(1..6u64)] total: u64,
) {
    let units = group_tests(tests.iter()).into_units();
    let mut seen = BTreeSet::new();
    for index in 0..total {
        let shard = ExternalShard::new(index, total).expect("valid shard");
        for test in shard.apply(&units).into_iter().flat_map(|unit| unit.into_tests()) {
            prop_assert!(seen.insert(test));
        }
    }
    prop_assert_eq!(seen, tests.into_iter().collect::<BTreeSet<_>>());
}

fn shard_assignments(units: &[RunUnit], total: u64) -> BTreeMap<RunKey, u64> {
    let mut assignments = BTreeMap::new();
    for index in 0..total {
        let shard = ExternalShard::new(index, total).expect("valid shard");
        for unit in shard.apply(units) {
            assignments.insert(unit.key().clone(), index);
        }
    }
    assignments
}

#[proptest(cases = 256)]
fn external_shard_ignores_unrelated_tests(
    #[strategy(test_list())] tests: Vec<TestIdentifier>,
    #[strategy(test_list())] extra: Vec<TestIdentifier>,
    #[strategy(2..6u64)] total: u64,
) {
    let units = group_tests(tests.iter()).into_units();
    let superset = group_tests(tests.iter().chain(extra.iter())).into_units();
    // Every other unit dropped.
    let subset: Vec<_> = units.iter().step_by(2).cloned().collect();

    let base = shard_assignments(&units, total);
    let grown = shard_assignments(&superset, total);
    let shrunk = shard_assignments(&subset, total);

    for (key, index) in &base {
        prop_assert_eq!(grown.get(key), Some(index), "`{}` moved after adding tests", key);
    }
    for (key, index) in &shrunk {
        prop_assert_eq!(base.get(key), Some(index), "`{}` moved after removing tests", key);
    }
}

#[proptest(cases = 256)]
fn batches_cover_every_test_once(
    #[strategy(test_list())] tests: Vec<TestIdentifier>,
    #[strategy(1..4usize)] device_count: usize,
    #[strategy(1..5usize)] batch_limit: usize,
) {
    let units = group_tests(tests.iter()).into_units();
    let shards = DeviceBatcher::new(device_count, batch_limit)
        .expect("valid config")
        .batch(&units);

    let flattened: Vec<_> = shards
        .batches()
        .iter()
        .flat_map(|batch| batch.tests().iter().cloned())
        .collect();
    let expected: Vec<_> = units.iter().flat_map(|unit| unit.iter().cloned()).collect();
    prop_assert_eq!(flattened, expected);

    for batch in shards.batches() {
        let oversized_unit = units.iter().any(|unit| unit.tests() == batch.tests());
        prop_assert!(batch.len() <= batch_limit || oversized_unit);
    }

    let per_device: usize = shards
        .devices()
        .iter()
        .map(|batches| batches.iter().map(|batch| batch.len()).sum::<usize>())
        .sum();
    prop_assert_eq!(per_device, shards.test_count());
}

#[proptest(cases = 128)]
fn retries_contain_failures(
    #[strategy(test_list())] tests: Vec<TestIdentifier>,
    #[strategy(proptest::collection::vec(any::<proptest::sample::Index>(), 0..4))] picks: Vec<
        proptest::sample::Index,
    >,
) {
    prop_assume!(!tests.is_empty());
    let failed: Vec<_> = picks.iter().map(|pick| pick.get(&tests).clone()).collect();
    let plan = expand_retries(failed.iter(), tests.iter());

    let retried = plan.flatten();
    for test in &failed {
        prop_assert!(retried.contains(test));
    }
    prop_assert!(plan.unknown_failures().is_empty());

    let unique: BTreeSet<_> = retried.iter().collect();
    prop_assert_eq!(unique.len(), retried.len());
}
