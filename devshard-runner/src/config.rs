// Copyright (c) The devshard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Planner configuration.
//!
//! Configuration is read from TOML and layered on top of a default config embedded in this crate.
//! Values are validated when the planner is built, not when the config is parsed, so that every
//! invalid combination is reported the same way.

use crate::{
    errors::{ConfigParseError, ConfigParseErrorKind, PartitionConfigError},
    partition::ExternalShard,
    test_id::TestIdentifier,
};
use camino::Utf8Path;
use config::{Config, ConfigBuilder, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::str::FromStr;
use tracing::debug;

/// Configuration for planning a test run.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct PlannerConfig {
    batching: BatchingConfig,
    #[serde(default)]
    sharding: ShardingConfig,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
struct BatchingConfig {
    batch_limit: usize,
    #[serde(default)]
    isolate: Vec<TestIdentifier>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
struct ShardingConfig {
    index: Option<u64>,
    total: Option<u64>,
}

impl PlannerConfig {
    /// The default config, embedded in this crate.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads a config file, layering it on top of the default config.
    pub fn from_file(config_file: &Utf8Path) -> Result<Self, ConfigParseError> {
        debug!("reading devshard config from `{config_file}`");
        let builder = Self::make_default_config()
            .add_source(File::new(config_file.as_str(), FileFormat::Toml).required(true));
        Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(Some(config_file.to_owned()), kind))
    }

    /// Parses a TOML string, layering it on top of the default config.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigParseError> {
        let builder =
            Self::make_default_config().add_source(File::from_str(toml, FileFormat::Toml));
        Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(None, kind))
    }

    /// Overrides the external shard with `GTEST_SHARD_INDEX` and `GTEST_TOTAL_SHARDS`, if set.
    pub fn with_env_sharding(self) -> Result<Self, PartitionConfigError> {
        Ok(self.with_external_shard_opt(ExternalShard::from_env()?))
    }

    /// Sets the external shard this machine runs.
    pub fn with_external_shard(self, shard: ExternalShard) -> Self {
        self.with_external_shard_opt(Some(shard))
    }

    fn with_external_shard_opt(mut self, shard: Option<ExternalShard>) -> Self {
        if let Some(shard) = shard {
            debug!("using external shard {shard}");
            self.sharding = ShardingConfig {
                index: Some(shard.index()),
                total: Some(shard.total()),
            };
        }
        self
    }

    /// Returns the maximum number of tests per batch.
    pub fn batch_limit(&self) -> usize {
        self.batching.batch_limit
    }

    /// Returns the tests that run in batches of their own.
    pub fn isolated_tests(&self) -> &[TestIdentifier] {
        &self.batching.isolate
    }

    /// Returns the external shard this machine runs.
    ///
    /// If no shard is configured, every test is in the shard. Returns an error if the configured
    /// shard is invalid, or if only one of `index` and `total` is set.
    pub fn external_shard(&self) -> Result<ExternalShard, PartitionConfigError> {
        match (self.sharding.index, self.sharding.total) {
            (None, None) => Ok(ExternalShard::all()),
            (Some(index), Some(total)) => ExternalShard::new(index, total),
            (Some(_), None) => Err(PartitionConfigError::IncompleteSharding {
                present: "index",
                missing: "total",
            }),
            (None, Some(_)) => Err(PartitionConfigError::IncompleteSharding {
                present: "total",
                missing: "index",
            }),
        }
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<Self, ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|err| ConfigParseErrorKind::BuildError(Box::new(err)))?;

        serde_path_to_error::deserialize(config)
            .map_err(|err| ConfigParseErrorKind::DeserializeError(Box::new(err)))
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            batching: BatchingConfig {
                batch_limit: 256,
                isolate: Vec::new(),
            },
            sharding: ShardingConfig::default(),
        }
    }
}

impl FromStr for PlannerConfig {
    type Err = ConfigParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_toml(s)
    }
}
