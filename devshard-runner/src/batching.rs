// Copyright (c) The devshard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batching tests onto the devices attached to this machine.
//!
//! Each batch is run by a single invocation of the test binary on one device. Batches are filled
//! with consecutive run units up to a maximum number of tests, then dealt out to devices
//! round-robin.

use crate::{errors::PartitionConfigError, grouping::RunUnit, test_id::TestIdentifier};
use std::{collections::HashSet, mem};
use tracing::{debug, warn};

/// A group of tests run by a single invocation of the test binary.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Batch {
    tests: Vec<TestIdentifier>,
    isolated: bool,
}

impl Batch {
    /// Returns the tests in this batch, in run order.
    pub fn tests(&self) -> &[TestIdentifier] {
        &self.tests
    }

    /// Returns the number of tests in this batch.
    pub fn len(&self) -> usize {
        self.tests.len()
    }

    /// Returns true if this batch has no tests.
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// Returns true if this batch was created to run a suspect test on its own.
    pub fn is_isolated(&self) -> bool {
        self.isolated
    }
}

/// Batches assigned to each device.
///
/// Created by [`DeviceBatcher::batch`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeviceShards {
    batches: Vec<Batch>,
    device_count: usize,
}

impl DeviceShards {
    /// Returns every batch in creation order.
    ///
    /// Batch `k` is assigned to device `k % device_count`.
    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    /// Returns the number of devices batches were distributed over.
    pub fn device_count(&self) -> usize {
        self.device_count
    }

    /// Iterates over the batches assigned to the device at `index`.
    ///
    /// Yields nothing if `index` is out of range.
    pub fn device(&self, index: usize) -> impl Iterator<Item = &Batch> + '_ {
        let skip = if index < self.device_count {
            index
        } else {
            self.batches.len()
        };
        self.batches.iter().skip(skip).step_by(self.device_count)
    }

    /// Returns the batches for every device, indexed by device.
    pub fn devices(&self) -> Vec<Vec<&Batch>> {
        (0..self.device_count)
            .map(|index| self.device(index).collect())
            .collect()
    }

    /// Returns the total number of tests across all batches.
    pub fn test_count(&self) -> usize {
        self.batches.iter().map(Batch::len).sum()
    }

    /// Returns true if there are no batches.
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

/// Splits run units into batches and assigns them to devices.
#[derive(Clone, Debug)]
pub struct DeviceBatcher {
    device_count: usize,
    batch_limit: usize,
    isolated: HashSet<TestIdentifier>,
}

impl DeviceBatcher {
    /// Creates a new batcher for `device_count` devices with at most `batch_limit` tests per batch.
    ///
    /// Returns an error if either value is 0.
    pub fn new(device_count: usize, batch_limit: usize) -> Result<Self, PartitionConfigError> {
        if device_count == 0 {
            return Err(PartitionConfigError::ZeroDevices);
        }
        if batch_limit == 0 {
            return Err(PartitionConfigError::ZeroBatchLimit);
        }
        Ok(Self {
            device_count,
            batch_limit,
            isolated: HashSet::new(),
        })
    }

    /// Marks tests that are suspected of crashing the test binary.
    ///
    /// A crash ends the whole invocation, so the run unit containing such a test gets a batch of
    /// its own and can't prevent unrelated tests from running.
    pub fn with_isolated<I>(mut self, tests: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<TestIdentifier>,
    {
        self.isolated.extend(tests.into_iter().map(Into::into));
        self
    }

    /// Returns the number of devices.
    pub fn device_count(&self) -> usize {
        self.device_count
    }

    /// Returns the maximum number of tests per batch.
    pub fn batch_limit(&self) -> usize {
        self.batch_limit
    }

    /// Batches `units` and assigns the batches to devices.
    ///
    /// Isolated units come first, one per batch. The remaining units are packed in order into
    /// batches of at most `batch_limit` tests. A unit is never split across batches: a unit with
    /// more than `batch_limit` tests forms one oversized batch, since its tests must run in the
    /// same invocation.
    pub fn batch(&self, units: &[RunUnit]) -> DeviceShards {
        let (isolated, packed): (Vec<_>, Vec<_>) = units
            .iter()
            .partition(|unit| unit.iter().any(|test| self.isolated.contains(test)));

        let mut batches: Vec<_> = isolated
            .into_iter()
            .map(|unit| Batch {
                tests: unit.tests().to_vec(),
                isolated: true,
            })
            .collect();

        let mut current = Vec::new();
        for unit in packed {
            if !current.is_empty() && current.len() + unit.len() > self.batch_limit {
                batches.push(Batch {
                    tests: mem::take(&mut current),
                    isolated: false,
                });
            }
            if unit.len() > self.batch_limit {
                warn!(
                    "`{}` has {} chained tests, more than the batch limit of {}; \
                     running them in a single batch",
                    unit.key(),
                    unit.len(),
                    self.batch_limit,
                );
            }
            current.extend(unit.iter().cloned());
        }
        if !current.is_empty() {
            batches.push(Batch {
                tests: current,
                isolated: false,
            });
        }

        debug!(
            "created {} batches for {} devices (batch limit {})",
            batches.len(),
            self.device_count,
            self.batch_limit,
        );

        DeviceShards {
            batches,
            device_count: self.device_count,
        }
    }
}
