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

use tracing::debug;

use super::compactor::Level;
use super::sketch::KllSketch;
use crate::common::RandomSource;
use crate::error::Error;

impl<R: RandomSource> KllSketch<R> {
    /// Merges another sketch into this one.
    ///
    /// Corresponding levels are concatenated and then compacted bottom-up, so
    /// the result carries exactly the combined weight of both inputs.
    ///
    /// Fails with `IncompatibleConfig` if k or the shrinking factor differ;
    /// sketches are never rescaled to fit. The bucket limit of `self` is kept.
    ///
    /// # Examples
    ///
    /// ```
    /// # use kllsketch::kll::KllSketch;
    /// let mut a = KllSketch::default();
    /// let mut b = KllSketch::default();
    /// a.insert(1.0);
    /// b.insert(2.0);
    /// a.merge(&b).unwrap();
    /// assert_eq!(a.n(), 2);
    /// assert_eq!(a.max_value(), Some(2.0));
    /// ```
    pub fn merge<S>(&mut self, other: &KllSketch<S>) -> Result<(), Error> {
        if !self.config.is_compatible(&other.config) {
            return Err(Error::incompatible_config(
                (self.config.k(), self.config.shrinking_factor()),
                (other.config.k(), other.config.shrinking_factor()),
            ));
        }
        if other.n == 0 {
            return Ok(());
        }

        let levels_before = self.levels.len();
        if self.n == 0 {
            // Take the levels whole, parity state included.
            self.levels = other.levels.clone();
            self.capacities_dirty = true;
        } else {
            let k = self.config.k() as usize;
            if self.levels.len() < other.levels.len() {
                self.levels
                    .resize_with(other.levels.len(), || Level::with_capacity(k));
                self.capacities_dirty = true;
            }
            for (level, incoming) in self.levels.iter_mut().zip(&other.levels) {
                level.absorb(incoming);
            }
        }
        if let (Some(min), Some(max)) = (other.min_value, other.max_value) {
            self.update_min_max(min, max);
        }
        self.n += other.n;
        self.compact();

        debug!(
            incoming = other.n,
            n = self.n,
            levels_before,
            levels_after = self.levels.len(),
            retained = self.num_retained(),
            "merged sketch"
        );
        Ok(())
    }
}

impl<R: RandomSource + Clone> KllSketch<R> {
    /// Returns a new sketch equivalent to having ingested the inputs of both.
    ///
    /// The result draws randomness from a copy of `a`'s source.
    pub fn merged<S>(a: &KllSketch<R>, b: &KllSketch<S>) -> Result<KllSketch<R>, Error> {
        let mut result = a.clone();
        result.merge(b)?;
        Ok(result)
    }
}
