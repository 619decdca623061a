// Copyright (c) The devshard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Support for partitioning test runs across several machines.
//!
//! A CI system may run the same test suite on `n` independent machines, telling each one which
//! shard it is through `GTEST_SHARD_INDEX` and `GTEST_TOTAL_SHARDS`. Each machine keeps only the
//! run units that hash into its shard. Partitioning happens before tests are batched onto the
//! devices attached to a machine (see [`batching`](crate::batching)).

use crate::{errors::PartitionConfigError, grouping::RunUnit, test_id::RunKey};
use std::{env, fmt, str::FromStr};
use tracing::debug;
use xxhash_rust::xxh64::xxh64;

/// The environment variable holding the 0-based index of this shard.
pub const SHARD_INDEX_ENV: &str = "GTEST_SHARD_INDEX";

/// The environment variable holding the total number of shards.
pub const TOTAL_SHARDS_ENV: &str = "GTEST_TOTAL_SHARDS";

/// One shard out of a set of externally scheduled shards.
///
/// Assignment is stateless: a run unit belongs to shard `xxh64(key) % total`, where `key` is the
/// unit's [`RunKey`]. Adding or removing unrelated tests never moves a unit to a different shard,
/// and all tests in a `PRE_` chain land on the same shard.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ExternalShard {
    index: u64,
    total: u64,
}

impl ExternalShard {
    /// Creates a new shard, counting up from 0.
    ///
    /// Returns an error if `total` is 0 or `index` is not less than `total`.
    pub fn new(index: u64, total: u64) -> Result<Self, PartitionConfigError> {
        if total == 0 {
            return Err(PartitionConfigError::ZeroTotalShards);
        }
        if index >= total {
            return Err(PartitionConfigError::ShardIndexOutOfRange { index, total });
        }
        Ok(Self { index, total })
    }

    /// The shard that contains every test.
    pub fn all() -> Self {
        Self { index: 0, total: 1 }
    }

    /// Reads the shard from `GTEST_SHARD_INDEX` and `GTEST_TOTAL_SHARDS`.
    ///
    /// Returns `Ok(None)` if neither variable is set. Setting only one of them is an error.
    pub fn from_env() -> Result<Option<Self>, PartitionConfigError> {
        Self::from_env_values(
            env::var(SHARD_INDEX_ENV).ok(),
            env::var(TOTAL_SHARDS_ENV).ok(),
        )
    }

    pub(crate) fn from_env_values(
        index: Option<String>,
        total: Option<String>,
    ) -> Result<Option<Self>, PartitionConfigError> {
        match (index, total) {
            (None, None) => Ok(None),
            (Some(index), Some(total)) => {
                let index = parse_env(SHARD_INDEX_ENV, &index)?;
                let total = parse_env(TOTAL_SHARDS_ENV, &total)?;
                Self::new(index, total).map(Some)
            }
            (Some(_), None) => Err(PartitionConfigError::ShardEnv {
                var: TOTAL_SHARDS_ENV,
                message: format!("must be set along with {SHARD_INDEX_ENV}"),
            }),
            (None, Some(_)) => Err(PartitionConfigError::ShardEnv {
                var: SHARD_INDEX_ENV,
                message: format!("must be set along with {TOTAL_SHARDS_ENV}"),
            }),
        }
    }

    /// Returns the 0-based index of this shard.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Returns the total number of shards.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Returns true if the run unit with this key belongs to this shard.
    pub fn contains(&self, key: &RunKey) -> bool {
        // NOTE: changing the hash function reshuffles every CI shard, so keep it fixed.
        xxh64(key.as_str().as_bytes(), 0) % self.total == self.index
    }

    /// Returns the run units that belong to this shard, in their original order.
    pub fn apply(&self, units: &[RunUnit]) -> Vec<RunUnit> {
        if self.total == 1 {
            return units.to_vec();
        }
        let selected: Vec<_> = units
            .iter()
            .filter(|unit| self.contains(unit.key()))
            .cloned()
            .collect();
        debug!(
            "external shard {self} selected {} of {} run units",
            selected.len(),
            units.len(),
        );
        selected
    }
}

impl Default for ExternalShard {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Display for ExternalShard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.index, self.total)
    }
}

impl FromStr for ExternalShard {
    type Err = PartitionConfigError;

    /// Parses a shard in the format `<index>/<total>`, e.g. `0/4`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (index_str, total_str) =
            s.split_once('/')
                .ok_or_else(|| PartitionConfigError::InvalidShardFormat {
                    input: s.to_owned(),
                    message: "expected the format <index>/<total>".to_owned(),
                })?;

        let index: u64 = index_str.parse().map_err(|err| {
            PartitionConfigError::InvalidShardFormat {
                input: s.to_owned(),
                message: format!("failed to parse index '{index_str}' as u64: {err}"),
            }
        })?;
        let total: u64 = total_str.parse().map_err(|err| {
            PartitionConfigError::InvalidShardFormat {
                input: s.to_owned(),
                message: format!("failed to parse total '{total_str}' as u64: {err}"),
            }
        })?;

        Self::new(index, total)
    }
}

fn parse_env(var: &'static str, value: &str) -> Result<u64, PartitionConfigError> {
    value
        .trim()
        .parse()
        .map_err(|err| PartitionConfigError::ShardEnv {
            var,
            message: format!("failed to parse '{value}' as u64: {err}"),
        })
}
