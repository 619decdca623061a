// Copyright (c) The devshard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by devshard.
//!
//! Filters that can't be resolved, incomplete `PRE_` chains and failed tests missing from the test
//! list are ordinary outcomes and are not represented here.

use camino::Utf8PathBuf;
use config::ConfigError;
use thiserror::Error;

/// An error that occurred while parsing the planner config.
#[derive(Debug, Error)]
#[error(
    "failed to parse devshard config at `{}`",
    .config_file.as_deref().map_or("<inline>", |path| path.as_str())
)]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Option<Utf8PathBuf>,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: Option<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self { config_file, kind }
    }

    /// Returns the config file that failed to parse, or `None` if the config was provided inline.
    pub fn config_file(&self) -> Option<&camino::Utf8Path> {
        self.config_file.as_deref()
    }

    /// Returns the kind of error that occurred.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing the planner config.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),
}

/// An invalid partitioning configuration.
///
/// Returned instead of clamping, so a misconfigured run never silently schedules nothing.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum PartitionConfigError {
    /// No devices are available to run tests on.
    #[error("device count must be at least 1")]
    ZeroDevices,

    /// The maximum number of tests per batch is zero.
    #[error("batch limit must be at least 1")]
    ZeroBatchLimit,

    /// The total number of external shards is zero.
    #[error("total shards must be at least 1")]
    ZeroTotalShards,

    /// The external shard index is not less than the total number of shards.
    #[error("shard index {index} must be less than total shards {total}")]
    ShardIndexOutOfRange {
        /// The shard index.
        index: u64,

        /// The total number of shards.
        total: u64,
    },

    /// Only one of the shard index and the total number of shards is configured.
    #[error("sharding config sets `{present}` but not `{missing}`")]
    IncompleteSharding {
        /// The key that is set.
        present: &'static str,

        /// The key that is missing.
        missing: &'static str,
    },

    /// A shard environment variable is missing or invalid.
    #[error("invalid value for environment variable {var}: {message}")]
    ShardEnv {
        /// The environment variable.
        var: &'static str,

        /// A description of the problem.
        message: String,
    },

    /// A shard specification string could not be parsed.
    #[error("invalid shard `{input}`: {message}")]
    InvalidShardFormat {
        /// The input string.
        input: String,

        /// A description of the problem.
        message: String,
    },
}
