// Copyright (c) The devshard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Planning a test run end to end.
//!
//! [`TestPlanner`] composes the other modules: tests reported by the test binary are grouped into
//! run units, narrowed to this machine's external shard, and batched onto devices. After an
//! attempt, failures are expanded into a retry plan that goes through the same batching.

use crate::{
    batching::{DeviceBatcher, DeviceShards},
    config::PlannerConfig,
    errors::PartitionConfigError,
    grouping::{GroupedTests, group_tests},
    partition::ExternalShard,
    retry::expand_retries,
    test_id::TestIdentifier,
};
use devshard_filtering::{FilterResolution, FilterTerm};
use tracing::debug;

/// Builds [`TestPlan`]s for a machine with a fixed set of devices.
#[derive(Clone, Debug)]
pub struct TestPlanner {
    external_shard: ExternalShard,
    batcher: DeviceBatcher,
}

impl TestPlanner {
    /// Creates a new planner for `device_count` devices.
    ///
    /// Returns an error if there are no devices, the batch limit is 0, or the configured external
    /// shard is invalid.
    pub fn new(config: &PlannerConfig, device_count: usize) -> Result<Self, PartitionConfigError> {
        let external_shard = config.external_shard()?;
        let batcher = DeviceBatcher::new(device_count, config.batch_limit())?
            .with_isolated(config.isolated_tests());
        Ok(Self {
            external_shard,
            batcher,
        })
    }

    /// Returns the external shard this planner selects tests for.
    pub fn external_shard(&self) -> ExternalShard {
        self.external_shard
    }

    /// Plans a run of `tests`, as reported by the test binary.
    pub fn plan<I>(&self, tests: I) -> TestPlan
    where
        I: IntoIterator,
        I::Item: Into<TestIdentifier>,
    {
        self.plan_grouped(group_tests(tests))
    }

    /// Plans a run of the tests in `tests` selected by `resolution`.
    ///
    /// See [`select_tests`].
    pub fn plan_filtered<I>(&self, tests: I, resolution: &FilterResolution) -> TestPlan
    where
        I: IntoIterator,
        I::Item: Into<TestIdentifier>,
    {
        let mut grouped = group_tests(tests);
        select_tests(&mut grouped, resolution);
        self.plan_grouped(grouped)
    }

    fn plan_grouped(&self, grouped: GroupedTests) -> TestPlan {
        let units = self.external_shard.apply(&grouped.into_units());
        let shards = self.batcher.batch(&units);
        debug!(
            "planned {} tests in {} batches over {} devices (shard {})",
            shards.test_count(),
            shards.batches().len(),
            shards.device_count(),
            self.external_shard,
        );
        TestPlan {
            shards,
            unknown_failures: Vec::new(),
        }
    }

    /// Plans a retry of the tests in `failed`.
    ///
    /// `all_tests` is the list the failed attempt was planned from. The external shard is not
    /// applied again: every test in that list already belongs to this machine.
    pub fn plan_retry<F, A>(&self, failed: F, all_tests: A) -> TestPlan
    where
        F: IntoIterator,
        F::Item: Into<TestIdentifier>,
        A: IntoIterator,
        A::Item: Into<TestIdentifier>,
    {
        let retry = expand_retries(failed, all_tests);
        let shards = self.batcher.batch(retry.units());
        debug!(
            "planned retry of {} tests in {} batches",
            shards.test_count(),
            shards.batches().len(),
        );
        TestPlan {
            shards,
            unknown_failures: retry.unknown_failures().to_vec(),
        }
    }
}

/// The outcome of planning: batches of tests for each device.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestPlan {
    shards: DeviceShards,
    unknown_failures: Vec<TestIdentifier>,
}

impl TestPlan {
    /// Returns the batches for each device.
    pub fn shards(&self) -> &DeviceShards {
        &self.shards
    }

    /// For retry plans, returns failed tests that weren't in the list of all tests.
    pub fn unknown_failures(&self) -> &[TestIdentifier] {
        &self.unknown_failures
    }

    /// Consumes self, returning the batches for each device.
    pub fn into_shards(self) -> DeviceShards {
        self.shards
    }
}

/// Narrows `grouped` to the run units selected by `resolution`.
///
/// A unit is kept if any of its tests matches a resolved term, so a selected test always runs
/// with its `PRE_` chain. An unresolved filter keeps everything: in that case the test binary has
/// already applied the filter while listing tests.
pub fn select_tests(grouped: &mut GroupedTests, resolution: &FilterResolution) {
    let Some(terms) = resolution.resolved() else {
        return;
    };
    let terms: Vec<_> = terms
        .iter()
        .filter_map(|term| FilterTerm::parse(term).ok())
        .collect();

    let before = grouped.len();
    grouped.retain(|unit| {
        unit.iter()
            .any(|test| terms.iter().any(|term| term.matches(test.as_str())))
    });
    debug!(
        "filter selected {} of {before} run units",
        grouped.len()
    );
}
