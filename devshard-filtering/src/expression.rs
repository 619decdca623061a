// Copyright (c) The devshard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::UnresolvedReason;
use std::fmt;

/// A single gtest-style filter expression.
///
/// The expression is kept verbatim; [`positive_terms`](Self::positive_terms) classifies its terms.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct FilterExpression {
    raw: String,
}

impl FilterExpression {
    /// Creates a new `FilterExpression` from its raw text.
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// Returns the raw text of this expression.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns true if this expression excludes tests.
    ///
    /// gtest treats everything after the first `-` as a list of negative patterns, so an
    /// expression starting with `-` is purely an exclusion list, and `A.b-A.c` selects `A.b`
    /// minus `A.c`.
    pub fn has_negative_patterns(&self) -> bool {
        self.raw.contains('-')
    }

    /// Splits this expression into its positive terms.
    ///
    /// Returns an error if the set of tests selected by this expression can't be determined
    /// without knowing every test in the binary.
    pub fn positive_terms(&self) -> Result<Vec<FilterTerm<'_>>, UnresolvedReason> {
        if self.raw.is_empty() {
            return Err(UnresolvedReason::EmptyExpression);
        }
        if self.has_negative_patterns() {
            return Err(UnresolvedReason::Negative);
        }
        // Only one trailing wildcard per expression can be carried through as an opaque pattern.
        if self.raw.matches('*').count() > 1 {
            return Err(UnresolvedReason::InvalidWildcard);
        }

        let terms = self
            .raw
            .split(':')
            .filter(|term| !term.is_empty())
            .map(FilterTerm::parse)
            .collect::<Result<Vec<_>, _>>()?;
        if terms.is_empty() {
            return Err(UnresolvedReason::EmptyExpression);
        }
        Ok(terms)
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for FilterExpression {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for FilterExpression {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

/// A positive term within a [`FilterExpression`].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum FilterTerm<'a> {
    /// A test name that must match exactly, e.g. `Suite.case`.
    Exact(&'a str),

    /// A term ending in a single `*`, with a `.` before it, e.g. `Suite.*`.
    ///
    /// The `.` proves the pattern is scoped to a suite (or a family of cases), so it is kept
    /// verbatim and matched against test names later instead of being expanded now.
    Prefix(&'a str),
}

impl<'a> FilterTerm<'a> {
    /// Classifies a single `:`-separated term.
    pub fn parse(term: &'a str) -> Result<Self, UnresolvedReason> {
        // `?` is also a gtest wildcard, and is never resolvable locally.
        if term.contains('?') {
            return Err(UnresolvedReason::InvalidWildcard);
        }
        match term.strip_suffix('*') {
            Some(scope) if !scope.contains('*') && scope.contains('.') => Ok(Self::Prefix(term)),
            Some(_) => Err(UnresolvedReason::InvalidWildcard),
            None if term.contains('*') => Err(UnresolvedReason::InvalidWildcard),
            None => Ok(Self::Exact(term)),
        }
    }

    /// Returns the term verbatim, including any trailing `*`.
    pub fn as_str(&self) -> &'a str {
        match self {
            Self::Exact(term) | Self::Prefix(term) => term,
        }
    }

    /// Returns true if this term is a wildcard pattern.
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Prefix(_))
    }

    /// Returns true if `test_name` is selected by this term.
    pub fn matches(&self, test_name: &str) -> bool {
        match self {
            Self::Exact(term) => *term == test_name,
            Self::Prefix(term) => {
                let scope = term.strip_suffix('*').unwrap_or(term);
                test_name.starts_with(scope)
            }
        }
    }
}
