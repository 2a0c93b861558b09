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

/// Retained items of a sketch merged into one ordered sequence of
/// `(value, cumulative weight)` pairs.
///
/// A summary is derived from the sketch on demand and answers every
/// read-only query; it is never kept in sync with later inserts.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    entries: Vec<SummaryEntry>,
    total_weight: u64,
}

/// One retained value with the cumulative weight of everything up to and including it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryEntry {
    /// The retained value.
    pub value: f64,
    /// Weight of this entry and all entries before it.
    pub cumulative_weight: u64,
}

impl Summary {
    pub(crate) fn from_levels(levels: &[Level]) -> Self {
        let num_retained = levels.iter().map(Level::len).sum();
        let mut weighted: Vec<(f64, u64)> = Vec::with_capacity(num_retained);
        for (height, level) in levels.iter().enumerate() {
            let weight = 1u64 << height;
            weighted.extend(level.items().iter().map(|&value| (value, weight)));
        }
        weighted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        let mut total_weight = 0u64;
        let entries = weighted
            .into_iter()
            .map(|(value, weight)| {
                total_weight += weight;
                SummaryEntry {
                    value,
                    cumulative_weight: total_weight,
                }
            })
            .collect();
        Self {
            entries,
            total_weight,
        }
    }

    /// Total weight of all entries.
    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    /// Returns true if the summary has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries in ascending value order.
    pub fn entries(&self) -> &[SummaryEntry] {
        &self.entries
    }

    /// Iterates `(value, weight)` pairs in ascending value order.
    pub fn weighted_values(&self) -> impl Iterator<Item = (f64, u64)> + '_ {
        let mut previous = 0u64;
        self.entries.iter().map(move |entry| {
            let weight = entry.cumulative_weight - previous;
            previous = entry.cumulative_weight;
            (entry.value, weight)
        })
    }

    /// Fraction of weight at or below `value`.
    pub fn rank(&self, value: f64) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        let idx = self.entries.partition_point(|entry| entry.value <= value);
        if idx == 0 {
            return 0.0;
        }
        self.entries[idx - 1].cumulative_weight as f64 / self.total_weight as f64
    }

    /// Smallest value whose cumulative weight fraction reaches `rank`.
    ///
    /// # Panics
    ///
    /// Panics if the summary is empty.
    pub fn quantile(&self, rank: f64) -> f64 {
        assert!(!self.entries.is_empty(), "quantile of an empty summary");
        // Compare fractions exactly as `rank` computes them so the two agree.
        let total = self.total_weight as f64;
        let idx = self
            .entries
            .partition_point(|entry| (entry.cumulative_weight as f64 / total) < rank);
        self.entries[idx.min(self.entries.len() - 1)].value
    }

    /// Ranks at each split point, followed by 1.0.
    pub fn cdf(&self, split_points: &[f64]) -> Vec<f64> {
        let mut ranks: Vec<f64> = split_points.iter().map(|&p| self.rank(p)).collect();
        ranks.push(1.0);
        ranks
    }

    /// Weight fractions between consecutive split points; the last entry
    /// covers everything above the final split point.
    pub fn pmf(&self, split_points: &[f64]) -> Vec<f64> {
        let mut buckets = self.cdf(split_points);
        for i in (1..buckets.len()).rev() {
            buckets[i] -= buckets[i - 1];
        }
        buckets
    }
}
