// Copyright (c) The devshard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Resolution of gtest-style filter expressions used by devshard.
//!
//! A filter expression is what a user would pass to `--gtest_filter`: a `:`-separated list of
//! test names, optionally followed by a `-` and a list of exclusions. Several expressions may be
//! active at once (for example one from a CI config and one from the command line), in which case
//! a test must be selected by all of them.
//!
//! This crate answers a narrow question: can the exact set of selected tests be known without
//! asking the test binary to list them? If so, [`resolve_filters`] returns that set. Otherwise it
//! returns [`FilterResolution::Unresolved`], and the caller is expected to fall back to listing
//! tests on the device.

mod expression;
mod resolve;

pub use expression::{FilterExpression, FilterTerm};
pub use resolve::{FilterResolution, UnresolvedReason, resolve_expressions, resolve_filters};
