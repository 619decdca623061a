// Copyright (c) The devshard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test identifiers as reported by gtest-style test binaries.

use serde::{Deserialize, Serialize};
use std::{borrow::Borrow, fmt};

/// The prefix marking a test as a prerequisite of the test named without it.
///
/// `Suite.PRE_PRE_foo` runs immediately before `Suite.PRE_foo`, which runs immediately before
/// `Suite.foo`.
pub const PRE_TEST_PREFIX: &str = "PRE_";

/// A test case identifier of the form `<Suite>.<Case>`.
///
/// Identifiers are opaque apart from the first `.` separating the suite from the case, and any
/// number of [`PRE_TEST_PREFIX`] tokens at the start of the case. An identifier without a `.` is
/// kept as-is and never has prerequisites.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestIdentifier(String);

impl TestIdentifier {
    /// Creates a new identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the suite name, or `None` if this identifier has no `.`.
    pub fn suite(&self) -> Option<&str> {
        self.0.split_once('.').map(|(suite, _)| suite)
    }

    /// Returns the case name, including any `PRE_` prefixes.
    pub fn case(&self) -> &str {
        match self.0.split_once('.') {
            Some((_, case)) => case,
            None => &self.0,
        }
    }

    /// Returns the number of `PRE_` prefixes on the case name.
    pub fn prefix_count(&self) -> usize {
        self.split_prefixes().0
    }

    /// Returns the case name with every `PRE_` prefix removed.
    pub fn base_case(&self) -> &str {
        self.split_prefixes().1
    }

    /// Returns the key shared by this test and all of its prerequisites.
    pub fn run_key(&self) -> RunKey {
        match self.suite() {
            Some(suite) if self.prefix_count() > 0 => {
                RunKey(format!("{suite}.{}", self.base_case()))
            }
            _ => RunKey(self.0.clone()),
        }
    }

    fn split_prefixes(&self) -> (usize, &str) {
        let Some((_, mut case)) = self.0.split_once('.') else {
            return (0, &self.0);
        };
        let mut count = 0;
        while let Some(rest) = case.strip_prefix(PRE_TEST_PREFIX) {
            // A case named just `PRE_` is a test in its own right.
            if rest.is_empty() {
                break;
            }
            case = rest;
            count += 1;
        }
        (count, case)
    }
}

impl fmt::Display for TestIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TestIdentifier {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<&String> for TestIdentifier {
    fn from(id: &String) -> Self {
        Self::new(id.as_str())
    }
}

impl From<String> for TestIdentifier {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl From<&TestIdentifier> for TestIdentifier {
    fn from(id: &TestIdentifier) -> Self {
        id.clone()
    }
}

impl Borrow<str> for TestIdentifier {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TestIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifies a [`RunUnit`](crate::grouping::RunUnit): the suite plus the case name with all
/// `PRE_` prefixes removed.
///
/// The key is spelled as the unprefixed test name, e.g. `Suite.foo` for `Suite.PRE_PRE_foo`.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct RunKey(String);

impl RunKey {
    /// Returns the key as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
