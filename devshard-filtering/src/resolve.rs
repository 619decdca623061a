// Copyright (c) The devshard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::FilterExpression;
use std::{collections::BTreeSet, fmt};
use tracing::debug;

/// The outcome of resolving a set of filter expressions.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FilterResolution {
    /// The filters select exactly these terms.
    ///
    /// Terms are kept verbatim: most are exact test names, but a term may also be a suite-scoped
    /// wildcard such as `Suite.*` that the caller matches against test names later.
    Resolved(BTreeSet<String>),

    /// The selected tests can't be determined without listing the tests in the binary.
    Unresolved(UnresolvedReason),
}

impl FilterResolution {
    /// Returns true if the filters were resolved to an exact set of terms.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// Returns the resolved terms, or `None` if the filters could not be resolved.
    pub fn resolved(&self) -> Option<&BTreeSet<String>> {
        match self {
            Self::Resolved(terms) => Some(terms),
            Self::Unresolved(_) => None,
        }
    }

    /// Consumes self, returning the resolved terms if any.
    pub fn into_resolved(self) -> Option<BTreeSet<String>> {
        match self {
            Self::Resolved(terms) => Some(terms),
            Self::Unresolved(_) => None,
        }
    }
}

/// The reason a set of filter expressions could not be resolved.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum UnresolvedReason {
    /// No filter expressions were given, so every test is selected.
    NoFilters,

    /// A filter expression was empty, which gtest treats as selecting every test.
    EmptyExpression,

    /// A filter expression excludes tests with `-`.
    Negative,

    /// A wildcard that isn't a single trailing `*` scoped by a `.`.
    InvalidWildcard,

    /// The expressions have no term in common.
    EmptyIntersection,
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoFilters => write!(f, "no filter expressions were specified"),
            Self::EmptyExpression => write!(f, "a filter expression is empty"),
            Self::Negative => write!(f, "a filter expression contains negative patterns"),
            Self::InvalidWildcard => write!(f, "a filter expression has an unscoped wildcard"),
            Self::EmptyIntersection => write!(f, "the filter expressions have no terms in common"),
        }
    }
}

/// Resolves raw filter strings into the exact set of terms they select.
///
/// Each string is a gtest-style filter expression. Terms within an expression are OR-ed, and
/// expressions are AND-ed with each other, so the result is the intersection of the per-expression
/// term sets.
pub fn resolve_filters<S: AsRef<str>>(filters: &[S]) -> FilterResolution {
    let exprs: Vec<_> = filters
        .iter()
        .map(|filter| FilterExpression::new(filter.as_ref()))
        .collect();
    resolve_expressions(&exprs)
}

/// Resolves parsed filter expressions into the exact set of terms they select.
///
/// See [`resolve_filters`].
pub fn resolve_expressions(exprs: &[FilterExpression]) -> FilterResolution {
    if exprs.is_empty() {
        return FilterResolution::Unresolved(UnresolvedReason::NoFilters);
    }

    let mut term_sets = Vec::with_capacity(exprs.len());
    for expr in exprs {
        match expr.positive_terms() {
            Ok(terms) => {
                term_sets.push(terms.iter().map(|term| term.as_str()).collect::<BTreeSet<_>>());
            }
            Err(reason) => {
                debug!("filter expression `{expr}` can't be resolved locally: {reason}");
                return FilterResolution::Unresolved(reason);
            }
        }
    }

    let mut term_sets = term_sets.into_iter();
    let first = term_sets.next().unwrap_or_default();
    let selected = term_sets.fold(first, |acc, terms| acc.intersection(&terms).copied().collect());

    if selected.is_empty() {
        debug!(
            "{} filter expressions have no terms in common, deferring to the test binary",
            exprs.len(),
        );
        return FilterResolution::Unresolved(UnresolvedReason::EmptyIntersection);
    }

    FilterResolution::Resolved(selected.into_iter().map(str::to_owned).collect())
}
