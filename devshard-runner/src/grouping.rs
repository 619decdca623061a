// Copyright (c) The devshard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Grouping tests with their `PRE_` prerequisites.
//!
//! gtest-based browser tests use a naming convention to express ordering: `Suite.PRE_foo` must run
//! immediately before `Suite.foo`, in the same process invocation, so that `foo` observes the
//! state `PRE_foo` left behind. Prefixes stack, so `PRE_PRE_foo` runs before `PRE_foo`.
//!
//! The main entry point is [`group_tests`], which turns the flat list reported by a test binary
//! into [`RunUnit`]s: chains of tests that must be scheduled together, in order.

use crate::test_id::{RunKey, TestIdentifier};
use indexmap::IndexMap;
use std::cmp::Reverse;
use tracing::{debug, warn};

/// An ordered chain of tests sharing a suite and an unprefixed case name.
///
/// Tests are ordered from the most-prefixed (runs first) to the least-prefixed (runs last). A test
/// without relatives forms a unit of its own.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunUnit {
    key: RunKey,
    tests: Vec<TestIdentifier>,
}

impl RunUnit {
    /// Creates a unit containing a single test.
    pub fn singleton(test: TestIdentifier) -> Self {
        Self {
            key: test.run_key(),
            tests: vec![test],
        }
    }

    fn from_bucket(key: RunKey, mut tests: Vec<TestIdentifier>) -> Self {
        // Stable, so equal prefix counts keep their input order.
        tests.sort_by_key(|test| Reverse(test.prefix_count()));
        Self { key, tests }
    }

    /// Returns the key shared by every test in this unit.
    pub fn key(&self) -> &RunKey {
        &self.key
    }

    /// Returns the tests in this unit, in run order.
    pub fn tests(&self) -> &[TestIdentifier] {
        &self.tests
    }

    /// Returns the number of tests in this unit.
    pub fn len(&self) -> usize {
        self.tests.len()
    }

    /// Returns true if this unit has no tests.
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// Returns true if `test` is part of this unit.
    pub fn contains(&self, test: &TestIdentifier) -> bool {
        self.tests.contains(test)
    }

    /// Returns true if this unit is a complete chain.
    ///
    /// A complete chain has prefix counts `n, n - 1, ..., 0` with no gaps, e.g. `PRE_PRE_foo`,
    /// `PRE_foo`, `foo`. Incomplete chains such as `PRE_PRE_foo`, `foo` are still grouped and run
    /// in prefix order, but the tests may not observe the state they expect.
    pub fn is_well_formed(&self) -> bool {
        let len = self.tests.len();
        self.tests
            .iter()
            .enumerate()
            .all(|(index, test)| test.prefix_count() == len - index - 1)
    }

    /// Iterates over the tests in this unit, in run order.
    pub fn iter(&self) -> std::slice::Iter<'_, TestIdentifier> {
        self.tests.iter()
    }

    /// Consumes self, returning the tests in run order.
    pub fn into_tests(self) -> Vec<TestIdentifier> {
        self.tests
    }
}

impl<'a> IntoIterator for &'a RunUnit {
    type Item = &'a TestIdentifier;
    type IntoIter = std::slice::Iter<'a, TestIdentifier>;

    fn into_iter(self) -> Self::IntoIter {
        self.tests.iter()
    }
}

/// Tests grouped into [`RunUnit`]s, in scheduling order.
///
/// Created by [`group_tests`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct GroupedTests {
    units: IndexMap<RunKey, RunUnit>,
}

impl GroupedTests {
    /// Returns the number of run units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns true if there are no tests.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Returns the total number of tests across all units.
    pub fn test_count(&self) -> usize {
        self.units.values().map(RunUnit::len).sum()
    }

    /// Iterates over the run units in scheduling order.
    pub fn units(&self) -> impl ExactSizeIterator<Item = &RunUnit> + '_ {
        self.units.values()
    }

    /// Returns the unit at `index` in scheduling order.
    pub fn get_index(&self, index: usize) -> Option<&RunUnit> {
        self.units.get_index(index).map(|(_, unit)| unit)
    }

    /// Looks up the unit containing `test`, along with its position in scheduling order.
    pub fn unit_for(&self, test: &TestIdentifier) -> Option<(usize, &RunUnit)> {
        self.units
            .get_full(&test.run_key())
            .filter(|(_, _, unit)| unit.contains(test))
            .map(|(index, _, unit)| (index, unit))
    }

    /// Returns every test in scheduling order.
    pub fn flatten(&self) -> Vec<TestIdentifier> {
        self.units
            .values()
            .flat_map(|unit| unit.tests.iter().cloned())
            .collect()
    }

    /// Consumes self, returning the run units in scheduling order.
    pub fn into_units(self) -> Vec<RunUnit> {
        self.units.into_values().collect()
    }

    /// Keeps only the units for which `f` returns true, preserving order.
    pub fn retain(&mut self, mut f: impl FnMut(&RunUnit) -> bool) {
        self.units.retain(|_, unit| f(unit));
    }
}

/// Groups a flat list of tests into [`RunUnit`]s.
///
/// * Tests sharing a suite and unprefixed case name are merged into one unit, ordered from the
///   most `PRE_` prefixes to none.
/// * Units are ordered by the first appearance of any of their tests in `tests`.
/// * A test listed more than once is scheduled once.
///
/// Grouping the flattened output again returns the same units.
pub fn group_tests<I>(tests: I) -> GroupedTests
where
    I: IntoIterator,
    I::Item: Into<TestIdentifier>,
{
    let mut buckets: IndexMap<RunKey, Vec<TestIdentifier>> = IndexMap::new();
    for test in tests {
        let test = test.into();
        let bucket = buckets.entry(test.run_key()).or_default();
        if bucket.contains(&test) {
            debug!("test `{test}` was listed more than once, scheduling it once");
            continue;
        }
        bucket.push(test);
    }

    let units = buckets
        .into_iter()
        .map(|(key, tests)| {
            let unit = RunUnit::from_bucket(key.clone(), tests);
            if !unit.is_well_formed() {
                warn!(
                    "tests for `{key}` don't form a complete PRE_ chain ({}), \
                     running them in prefix order",
                    unit.tests.iter().map(TestIdentifier::as_str).collect::<Vec<_>>().join(", "),
                );
            }
            (key, unit)
        })
        .collect();

    GroupedTests { units }
}
