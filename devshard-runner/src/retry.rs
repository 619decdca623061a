// Copyright (c) The devshard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry support.
//!
//! This module computes which tests to schedule again after a failed attempt. A failed test can't
//! simply be rerun on its own if it belongs to a `PRE_` chain: the state it depends on is created
//! by the other tests in the chain, so the whole chain is scheduled again.

use crate::{
    grouping::{RunUnit, group_tests},
    test_id::TestIdentifier,
};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// The tests to run in a retry attempt.
///
/// Created by [`expand_retries`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RetryPlan {
    units: Vec<RunUnit>,
    unknown_failures: Vec<TestIdentifier>,
}

impl RetryPlan {
    /// Returns the run units to retry, in scheduling order.
    pub fn units(&self) -> &[RunUnit] {
        &self.units
    }

    /// Returns every test to retry, in run order.
    pub fn flatten(&self) -> Vec<TestIdentifier> {
        self.units
            .iter()
            .flat_map(|unit| unit.tests().iter().cloned())
            .collect()
    }

    /// Returns failed tests that weren't in the list of all tests.
    ///
    /// This usually means the set of tests in the binary changed between attempts. These tests are
    /// still scheduled (as units of their own, after every known unit) but callers may want to
    /// report them.
    pub fn unknown_failures(&self) -> &[TestIdentifier] {
        &self.unknown_failures
    }

    /// Returns true if there is nothing to retry.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Returns the total number of tests to retry.
    pub fn test_count(&self) -> usize {
        self.units.iter().map(RunUnit::len).sum()
    }

    /// Consumes self, returning the run units to retry.
    pub fn into_units(self) -> Vec<RunUnit> {
        self.units
    }
}

/// Expands the tests that failed in a previous attempt into the tests to run next.
///
/// `all_tests` is the full list the failed attempt was scheduled from. Each failed test pulls in
/// the whole [`RunUnit`] it belongs to: its `PRE_` prerequisites, which must run first to recreate
/// its starting state even if they passed, and the tests that depend on it. Units appear once and
/// in the order [`group_tests`] gives them over `all_tests`.
pub fn expand_retries<F, A>(failed: F, all_tests: A) -> RetryPlan
where
    F: IntoIterator,
    F::Item: Into<TestIdentifier>,
    A: IntoIterator,
    A::Item: Into<TestIdentifier>,
{
    let grouped = group_tests(all_tests);

    let mut selected = BTreeSet::new();
    let mut unknown_failures = Vec::new();
    for test in failed {
        let test = test.into();
        match grouped.unit_for(&test) {
            Some((index, unit)) => {
                if selected.insert(index) && unit.len() > 1 {
                    debug!(
                        "retrying `{test}` along with {} related tests in `{}`",
                        unit.len() - 1,
                        unit.key(),
                    );
                }
            }
            None => {
                if !unknown_failures.contains(&test) {
                    warn!("failed test `{test}` isn't in the current test list, retrying it alone");
                    unknown_failures.push(test);
                }
            }
        }
    }

    let mut units: Vec<_> = selected
        .into_iter()
        .filter_map(|index| grouped.get_index(index).cloned())
        .collect();
    units.extend(group_tests(unknown_failures.iter()).into_units());

    RetryPlan {
        units,
        unknown_failures,
    }
}
