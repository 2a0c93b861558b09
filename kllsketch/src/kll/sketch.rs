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

use super::compactor::Level;
use super::compactor::restore_capacity;
use super::compactor::total_weight;
use super::config::SketchConfig;
use super::histogram::Bucket;
use super::histogram::equal_width_buckets;
use super::summary::Summary;
use crate::common::RandomSource;
use crate::common::XorShift64;
use crate::error::Error;

/// KLL sketch for estimating ranks, quantiles and histograms of `f64` streams.
///
/// See the [kll module level documentation](crate::kll) for more.
#[derive(Debug, Clone)]
pub struct KllSketch<R = XorShift64> {
    pub(super) config: SketchConfig,
    pub(super) n: u64,
    pub(super) levels: Vec<Level>,
    pub(super) capacities: Vec<usize>,
    pub(super) capacities_dirty: bool,
    pub(super) min_value: Option<f64>,
    pub(super) max_value: Option<f64>,
    pub(super) rng: R,
}

impl Default for KllSketch<XorShift64> {
    fn default() -> Self {
        Self::make(SketchConfig::default(), XorShift64::default())
    }
}

impl KllSketch<XorShift64> {
    /// Creates an empty sketch with an entropy-seeded random source.
    ///
    /// # Examples
    ///
    /// ```
    /// # use kllsketch::kll::{KllSketch, SketchConfig};
    /// let sketch = KllSketch::new(SketchConfig::default()).unwrap();
    /// assert_eq!(sketch.k(), 2048);
    /// assert!(sketch.is_empty());
    /// ```
    pub fn new(config: SketchConfig) -> Result<Self, Error> {
        Self::with_random(config, XorShift64::default())
    }

    /// Creates an empty sketch from raw parameters.
    pub fn with_params(k: u32, shrinking_factor: f64, max_bins: u32) -> Result<Self, Error> {
        Self::new(SketchConfig::new(k, shrinking_factor, max_bins)?)
    }
}

impl<R: RandomSource> KllSketch<R> {
    /// Creates an empty sketch drawing compaction parity from `rng`.
    ///
    /// Seed the source to make compactions reproducible.
    pub fn with_random(config: SketchConfig, rng: R) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self::make(config, rng))
    }

    pub(super) fn make(config: SketchConfig, rng: R) -> Self {
        let levels = vec![Level::with_capacity(config.k() as usize)];
        let capacities = config.level_capacities(1);
        Self {
            config,
            n: 0,
            levels,
            capacities,
            capacities_dirty: false,
            min_value: None,
            max_value: None,
            rng,
        }
    }

    /// Returns the configuration this sketch was built with.
    pub fn config(&self) -> &SketchConfig {
        &self.config
    }

    /// Returns parameter k.
    pub fn k(&self) -> u32 {
        self.config.k()
    }

    /// Returns the number of values inserted.
    pub fn n(&self) -> u64 {
        self.n
    }

    /// Returns true if the sketch has not seen any data.
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Returns the number of levels.
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Returns the number of retained items.
    pub fn num_retained(&self) -> usize {
        self.levels.iter().map(Level::len).sum()
    }

    /// Returns the number of retained items per level, bottom first.
    pub fn level_sizes(&self) -> Vec<usize> {
        self.levels.iter().map(Level::len).collect()
    }

    /// Returns the capacity of every level at the current number of levels.
    pub fn level_capacities(&self) -> Vec<usize> {
        self.config.level_capacities(self.levels.len())
    }

    /// Returns the summed implied weight of all retained items.
    ///
    /// Always equal to [`n`](Self::n).
    pub fn total_weight(&self) -> u64 {
        total_weight(&self.levels)
    }

    /// Returns true once compaction has started discarding detail.
    pub fn is_estimation_mode(&self) -> bool {
        self.levels.len() > 1
    }

    /// Returns the smallest value seen.
    pub fn min_value(&self) -> Option<f64> {
        self.min_value
    }

    /// Returns the largest value seen.
    pub fn max_value(&self) -> Option<f64> {
        self.max_value
    }

    /// Inserts a value.
    ///
    /// NaN is ignored and not counted.
    pub fn insert(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        // Fold -0.0 into 0.0 so ordering agrees with numeric equality.
        let value = if value == 0.0 { 0.0 } else { value };
        self.update_min_max(value, value);
        self.n += 1;
        self.levels[0].push(value);
        if self.levels[0].len() > self.capacities[0] || self.capacities_dirty {
            self.compact();
        }
    }

    /// Returns the fraction of inserted weight at or below `value`.
    pub fn rank(&self, value: f64) -> Result<f64, Error> {
        if value.is_nan() {
            return Err(Error::invalid_argument("rank of NaN is undefined"));
        }
        Ok(self.non_empty_summary("rank")?.rank(value))
    }

    /// Returns the smallest retained value whose rank is at least `rank`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use kllsketch::kll::KllSketch;
    /// let mut sketch = KllSketch::default();
    /// for v in 1..=10 {
    ///     sketch.insert(v as f64);
    /// }
    /// assert_eq!(sketch.quantile(0.5).unwrap(), 5.0);
    /// ```
    pub fn quantile(&self, rank: f64) -> Result<f64, Error> {
        if !(0.0..=1.0).contains(&rank) {
            return Err(Error::invalid_argument("rank must be in [0.0, 1.0]")
                .with_context("rank", rank));
        }
        Ok(self.non_empty_summary("quantile")?.quantile(rank))
    }

    /// Returns the approximate CDF at strictly increasing split points.
    pub fn cdf(&self, split_points: &[f64]) -> Result<Vec<f64>, Error> {
        check_split_points(split_points)?;
        Ok(self.non_empty_summary("cdf")?.cdf(split_points))
    }

    /// Returns the approximate PMF between strictly increasing split points.
    pub fn pmf(&self, split_points: &[f64]) -> Result<Vec<f64>, Error> {
        check_split_points(split_points)?;
        Ok(self.non_empty_summary("pmf")?.pmf(split_points))
    }

    /// Returns `num_buckets` equal-width buckets spanning the observed range.
    ///
    /// Fails with `BucketLimitExceeded` above the configured maximum.
    ///
    /// Infinite values are valid inserts, but an infinite observed range has no
    /// equal-width split: if the minimum or maximum is infinite this fails with
    /// `InvalidArgument`. Use [`histogram_with_bounds`](Self::histogram_with_bounds)
    /// with finite bounds instead, which counts infinities in the end buckets.
    pub fn histogram(&self, num_buckets: usize) -> Result<Vec<Bucket>, Error> {
        match (self.min_value, self.max_value) {
            (Some(lower), Some(upper)) if !(lower.is_finite() && upper.is_finite()) => {
                Err(Error::invalid_argument(
                    "observed range is infinite, supply finite bounds",
                )
                .with_context("min", lower)
                .with_context("max", upper))
            }
            (Some(lower), Some(upper)) => self.histogram_with_bounds(num_buckets, lower, upper),
            _ => Err(Error::empty_sketch("histogram")),
        }
    }

    /// Returns `num_buckets` equal-width buckets spanning `[lower, upper]`.
    ///
    /// Retained values outside the bounds are counted in the first or last bucket.
    pub fn histogram_with_bounds(
        &self,
        num_buckets: usize,
        lower: f64,
        upper: f64,
    ) -> Result<Vec<Bucket>, Error> {
        if num_buckets == 0 {
            return Err(Error::invalid_argument("at least one bucket is required"));
        }
        if num_buckets > self.config.max_bins() as usize {
            return Err(Error::bucket_limit_exceeded(
                num_buckets,
                self.config.max_bins(),
            ));
        }
        if !(lower.is_finite() && upper.is_finite() && lower <= upper) {
            return Err(Error::invalid_argument("bounds must be finite with lower <= upper")
                .with_context("lower", lower)
                .with_context("upper", upper));
        }
        if self.is_empty() {
            return Err(Error::empty_sketch("histogram"));
        }
        Ok(equal_width_buckets(
            self.weighted_items(),
            num_buckets,
            lower,
            upper,
        ))
    }

    /// Returns the sorted summary of all retained items.
    pub fn summary(&self) -> Summary {
        Summary::from_levels(&self.levels)
    }

    /// Iterates retained `(value, weight)` pairs level by level.
    pub fn weighted_items(&self) -> impl Iterator<Item = (f64, u64)> + '_ {
        self.levels.iter().enumerate().flat_map(|(height, level)| {
            let weight = 1u64 << height;
            level.items().iter().map(move |&value| (value, weight))
        })
    }

    /// Returns the approximate single-sided normalized rank error for k.
    pub fn normalized_rank_error(&self) -> f64 {
        normalized_rank_error(self.config.k())
    }

    pub(super) fn compact(&mut self) {
        restore_capacity(
            &mut self.levels,
            &mut self.capacities,
            &mut self.capacities_dirty,
            &self.config,
            &mut self.rng,
        );
        assert_eq!(
            self.total_weight(),
            self.n,
            "retained weight must equal items inserted"
        );
    }

    pub(super) fn update_min_max(&mut self, min: f64, max: f64) {
        self.min_value = Some(self.min_value.map_or(min, |current| current.min(min)));
        self.max_value = Some(self.max_value.map_or(max, |current| current.max(max)));
    }

    fn non_empty_summary(&self, operation: &'static str) -> Result<Summary, Error> {
        if self.is_empty() {
            return Err(Error::empty_sketch(operation));
        }
        Ok(self.summary())
    }
}

fn normalized_rank_error(k: u32) -> f64 {
    2.296 / (k as f64).powf(0.9723)
}

fn check_split_points(split_points: &[f64]) -> Result<(), Error> {
    if split_points.iter().any(|p| p.is_nan()) {
        return Err(Error::invalid_argument(
            "split_points must not contain NaN values",
        ));
    }
    if split_points.windows(2).any(|w| w[0] >= w[1]) {
        return Err(Error::invalid_argument(
            "split_points must be unique and monotonically increasing",
        ));
    }
    Ok(())
}
