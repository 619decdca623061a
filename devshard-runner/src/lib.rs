// Copyright (c) The devshard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core scheduling logic for devshard.
//!
//! devshard distributes the tests in a gtest-style test binary across a pool of devices. This crate
//! takes the flat list of tests the binary reports and decides how to run them:
//!
//! 1. [`grouping`] merges each test with its `PRE_` prerequisites into a [`RunUnit`](grouping::RunUnit).
//! 2. [`partition`] keeps the units belonging to this machine's external CI shard.
//! 3. [`batching`] packs units into batches and deals them out to devices.
//! 4. After an attempt, [`retry`] expands failed tests into the units to run again.
//!
//! [`planner::TestPlanner`] runs the whole pipeline. Nothing here launches processes or talks to
//! devices.

pub mod batching;
pub mod config;
pub mod errors;
pub mod grouping;
pub mod partition;
pub mod planner;
pub mod retry;
pub mod test_id;
