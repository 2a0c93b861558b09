// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Sketch configuration and per-level capacity rules.

use crate::error::Error;

/// Default value of parameter k, the capacity of the top level.
pub const DEFAULT_K: u32 = 2048;
/// Default factor by which each level below the top shrinks.
pub const DEFAULT_SHRINKING_FACTOR: f64 = 0.64;
/// Default maximum number of histogram buckets.
pub const DEFAULT_MAX_BINS: u32 = 100;
/// No level capacity ever drops below this, so a compaction always has a pair to work on.
pub const MIN_LEVEL_CAPACITY: usize = 2;

/// Configuration of a [`KllSketch`](super::KllSketch).
///
/// Configurations are plain values passed at construction, so sketches with
/// different settings coexist without sharing state.
///
/// # Examples
///
/// ```
/// # use kllsketch::kll::SketchConfig;
/// let config = SketchConfig::new(200, 0.64, 20).unwrap();
/// assert_eq!(config.level_capacity(0, 1), 200);
/// assert_eq!(config.level_capacity(0, 2), 128);
/// assert!(SketchConfig::new(0, 0.64, 20).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SketchConfig {
    k: u32,
    shrinking_factor: f64,
    max_bins: u32,
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            shrinking_factor: DEFAULT_SHRINKING_FACTOR,
            max_bins: DEFAULT_MAX_BINS,
        }
    }
}

impl SketchConfig {
    /// Creates a validated configuration.
    ///
    /// Fails with [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind::ConfigInvalid)
    /// if `k` or `max_bins` is zero, or `shrinking_factor` is not in (0, 1).
    pub fn new(k: u32, shrinking_factor: f64, max_bins: u32) -> Result<Self, Error> {
        let config = Self {
            k,
            shrinking_factor,
            max_bins,
        };
        config.validate()?;
        Ok(config)
    }

    /// Returns a copy with a different histogram bucket limit.
    pub fn with_max_bins(self, max_bins: u32) -> Result<Self, Error> {
        Self::new(self.k, self.shrinking_factor, max_bins)
    }

    /// Checks every parameter against its domain.
    pub fn validate(&self) -> Result<(), Error> {
        if self.k == 0 {
            return Err(Error::config_invalid("k must be positive").with_context("k", self.k));
        }
        // Written this way so NaN fails too.
        if !(self.shrinking_factor > 0.0 && self.shrinking_factor < 1.0) {
            return Err(Error::config_invalid("shrinking factor must be in (0, 1)")
                .with_context("shrinking_factor", self.shrinking_factor));
        }
        if self.max_bins == 0 {
            return Err(Error::config_invalid("max bins must be positive")
                .with_context("max_bins", self.max_bins));
        }
        Ok(())
    }

    /// Returns parameter k.
    pub fn k(&self) -> u32 {
        self.k
    }

    /// Returns the shrinking factor c.
    pub fn shrinking_factor(&self) -> f64 {
        self.shrinking_factor
    }

    /// Returns the maximum number of histogram buckets.
    pub fn max_bins(&self) -> u32 {
        self.max_bins
    }

    /// Capacity of level `height` in a sketch with `num_levels` levels.
    ///
    /// The top level holds k items; each level below holds c times as many as
    /// the one above it, floored, but never fewer than [`MIN_LEVEL_CAPACITY`].
    ///
    /// Capacity is indexed by depth below the top, not by height above level 0.
    /// Level 0 is the largest only while the sketch has a single level; after
    /// that the heaviest level keeps the largest buffer. Fixing capacities from
    /// the bottom up would starve the heaviest levels down to the minimum, and
    /// rank error would then grow with the stream instead of staying O(1/k).
    ///
    /// ```
    /// # use kllsketch::kll::SketchConfig;
    /// let config = SketchConfig::new(2048, 0.64, 100).unwrap();
    /// assert_eq!(config.level_capacity(0, 1), 2048);
    /// assert_eq!(config.level_capacities(3), vec![838, 1310, 2048]);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `height >= num_levels`.
    pub fn level_capacity(&self, height: usize, num_levels: usize) -> usize {
        assert!(height < num_levels, "height must be < num_levels");
        let depth = (num_levels - height - 1) as i32;
        let cap = (self.k as f64 * self.shrinking_factor.powi(depth)).floor() as usize;
        cap.max(MIN_LEVEL_CAPACITY)
    }

    /// Capacities of all levels of a sketch with `num_levels` levels, bottom first.
    pub fn level_capacities(&self, num_levels: usize) -> Vec<usize> {
        (0..num_levels)
            .map(|height| self.level_capacity(height, num_levels))
            .collect()
    }

    /// Returns true if sketches with these configurations can be merged.
    ///
    /// The bucket limit only bounds query output and is not compared.
    pub fn is_compatible(&self, other: &SketchConfig) -> bool {
        self.k == other.k && self.shrinking_factor.to_bits() == other.shrinking_factor.to_bits()
    }
}
