// Copyright (c) The devshard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use devshard_runner::test_id::{PRE_TEST_PREFIX, TestIdentifier};
use proptest::prelude::*;

/// Tests as listed by a browser test binary, with `PRE_` chains interleaved with other tests.
pub(crate) static BROWSER_TESTS: &[&str] = &[
    "TestClass1.testcase1",
    "TestClass1.otherTestCase",
    "TestClass1.def_testcase3",
    "TestClass1.PRE_testcase1",
    "TestClass1.abc_testcase2",
    "TestClass1.PRE_PRE_testcase1",
    "TestClass1.PRE_abc_testcase2",
    "TestClass1.PRE_def_testcase3",
    "TestClass1.PRE_PRE_abc_testcase2",
];

pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Returns true if `slice` appears contiguously in `list`.
pub(crate) fn contains_slice(list: &[TestIdentifier], slice: &[&str]) -> bool {
    list.windows(slice.len()).any(|window| {
        window
            .iter()
            .zip(slice)
            .all(|(test, expected)| test.as_str() == *expected)
    })
}

/// Generates a test list with a mix of suites, case names and `PRE_` chains.
pub(crate) fn test_list() -> impl Strategy<Value = Vec<TestIdentifier>> {
    proptest::collection::vec((0..3usize, 0..3usize, 0..5usize), 0..32).prop_map(|specs| {
        let mut tests: Vec<TestIdentifier> = Vec::new();
        for (suite, prefixes, case) in specs {
            let test = TestIdentifier::new(format!(
                "Suite{suite}.{}case{case}",
                PRE_TEST_PREFIX.repeat(prefixes)
            ));
            if !tests.contains(&test) {
                tests.push(test);
            }
        }
        tests
    })
}
