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

//! Leveled buffers and the randomized half-compaction that bounds them.

use tracing::debug;
use tracing::trace;

use super::config::SketchConfig;
use crate::common::RandomSource;

// Large k values grow their buffers on demand instead of up front.
const MAX_PREALLOCATED_ITEMS: usize = 4096;

/// One level of the sketch. Every item here stands for `2^height` observations.
#[derive(Debug, Clone)]
pub(crate) struct Level {
    items: Vec<f64>,
    sorted: bool,
    compactions: u64,
    last_offset: u8,
}

impl Level {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity.min(MAX_PREALLOCATED_ITEMS) + 1),
            sorted: true,
            compactions: 0,
            last_offset: 0,
        }
    }

    pub fn restore(items: Vec<f64>, compactions: u64, last_offset: u8) -> Self {
        let mut level = Self {
            items,
            sorted: false,
            compactions,
            last_offset: last_offset & 1,
        };
        level.sort();
        level
    }

    pub fn items(&self) -> &[f64] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    pub fn compactions(&self) -> u64 {
        self.compactions
    }

    pub fn last_offset(&self) -> u8 {
        self.last_offset
    }

    pub fn push(&mut self, item: f64) {
        self.items.push(item);
        self.sorted = self.items.len() <= 1;
    }

    /// Appends another level's items, keeping sortedness when both sides are sorted.
    pub fn absorb(&mut self, other: &Level) {
        if other.items.is_empty() {
            return;
        }
        if self.sorted && other.sorted {
            let left = std::mem::take(&mut self.items);
            self.items = merge_sorted(left, other.items.clone());
        } else {
            self.items.extend_from_slice(&other.items);
            self.sorted = false;
        }
    }

    fn absorb_sorted(&mut self, promoted: Vec<f64>) {
        if self.sorted {
            let left = std::mem::take(&mut self.items);
            self.items = merge_sorted(left, promoted);
        } else {
            self.items.extend(promoted);
        }
    }

    fn sort(&mut self) {
        if !self.sorted {
            self.items.sort_unstable_by(f64::total_cmp);
            self.sorted = true;
        }
    }

    /// Odd compactions flip the previous parity, even ones draw a fresh bit.
    fn next_offset<R: RandomSource>(&mut self, rng: &mut R) -> usize {
        let offset = if self.compactions % 2 == 1 {
            1 - self.last_offset
        } else {
            rng.next_bool() as u8
        };
        self.compactions += 1;
        self.last_offset = offset;
        offset as usize
    }

    /// Halves the level. An odd item out (the smallest) stays behind; of the
    /// remaining sorted pairs, one item each is returned for promotion.
    fn compact<R: RandomSource>(&mut self, rng: &mut R) -> (Vec<f64>, usize) {
        self.sort();
        let offset = self.next_offset(rng);
        let items = std::mem::take(&mut self.items);
        let pairs = if items.len() % 2 == 1 {
            self.items.push(items[0]);
            &items[1..]
        } else {
            &items[..]
        };
        let promoted: Vec<f64> = pairs.iter().skip(offset).step_by(2).copied().collect();
        debug_assert_eq!(promoted.len() * 2, pairs.len());
        (promoted, offset)
    }
}

/// Restores the capacity invariant on every level, compacting bottom-up.
///
/// Capacities depend on the number of levels, so whenever a compaction grows
/// the sketch the capacities are recomputed and the scan restarts from the
/// bottom. Each compaction strictly reduces the retained item count, so this
/// terminates.
pub(crate) fn restore_capacity<R: RandomSource>(
    levels: &mut Vec<Level>,
    capacities: &mut Vec<usize>,
    capacities_dirty: &mut bool,
    config: &SketchConfig,
    rng: &mut R,
) {
    loop {
        if *capacities_dirty || capacities.len() != levels.len() {
            *capacities = config.level_capacities(levels.len());
            *capacities_dirty = false;
        }

        let Some(height) = (0..levels.len()).find(|&h| levels[h].len() > capacities[h]) else {
            break;
        };

        if height + 1 == levels.len() {
            levels.push(Level::with_capacity(config.k() as usize));
            *capacities_dirty = true;
            debug!(
                num_levels = levels.len(),
                k = config.k(),
                "sketch grew a level"
            );
        }

        let before = levels[height].len();
        let (promoted, offset) = levels[height].compact(rng);
        trace!(
            height,
            before,
            promoted = promoted.len(),
            offset,
            "compacted level"
        );
        levels[height + 1].absorb_sorted(promoted);
    }

    for (height, level) in levels.iter().enumerate() {
        assert!(
            level.len() <= capacities[height],
            "level {height} holds {} items, capacity is {}",
            level.len(),
            capacities[height]
        );
    }
}

/// Sum of implied weights across levels.
pub(crate) fn total_weight(levels: &[Level]) -> u64 {
    levels
        .iter()
        .enumerate()
        .map(|(height, level)| (level.len() as u64) << height)
        .sum()
}

pub(crate) fn merge_sorted(left: Vec<f64>, right: Vec<f64>) -> Vec<f64> {
    if left.is_empty() {
        return right;
    }
    if right.is_empty() {
        return left;
    }
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left_iter = left.into_iter().peekable();
    let mut right_iter = right.into_iter().peekable();

    while let (Some(l), Some(r)) = (left_iter.peek(), right_iter.peek()) {
        if l <= r {
            merged.extend(left_iter.next());
        } else {
            merged.extend(right_iter.next());
        }
    }
    merged.extend(left_iter);
    merged.extend(right_iter);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::XorShift64;

    /// Always answers the same bit, so parity choices are predictable.
    struct Fixed(bool);

    impl RandomSource for Fixed {
        fn next_u64(&mut self) -> u64 {
            if self.0 { u64::MAX } else { 0 }
        }
    }

    fn level_of(items: &[f64]) -> Level {
        let mut level = Level::with_capacity(items.len());
        for &item in items {
            level.push(item);
        }
        level
    }

    #[test]
    fn test_compact_even_level_promotes_half() {
        let mut level = level_of(&[4.0, 1.0, 3.0, 2.0]);
        let (promoted, offset) = level.compact(&mut Fixed(false));
        assert_eq!(offset, 0);
        assert_eq!(promoted, vec![1.0, 3.0]);
        assert!(level.items().is_empty());
    }

    #[test]
    fn test_compact_odd_level_keeps_smallest() {
        let mut level = level_of(&[5.0, 0.0, 9.0]);
        let (promoted, offset) = level.compact(&mut Fixed(true));
        assert_eq!(offset, 1);
        assert_eq!(promoted, vec![9.0]);
        assert_eq!(level.items(), &[0.0]);
    }

    #[test]
    fn test_parity_alternates_between_compactions() {
        let mut level = level_of(&[1.0, 2.0]);
        let (_, first) = level.compact(&mut Fixed(true));
        level.push(3.0);
        level.push(4.0);
        let (promoted, second) = level.compact(&mut Fixed(true));
        assert_eq!((first, second), (1, 0));
        assert_eq!(promoted, vec![3.0]);
        assert_eq!(level.compactions(), 2);
    }

    #[test]
    fn test_restore_capacity_conserves_weight() {
        let config = SketchConfig::new(8, 0.5, 10).unwrap();
        let mut rng = XorShift64::seeded(3);
        let mut levels = vec![Level::with_capacity(8)];
        let mut capacities = Vec::new();
        let mut dirty = true;
        for i in 0..1000 {
            levels[0].push(i as f64);
            restore_capacity(&mut levels, &mut capacities, &mut dirty, &config, &mut rng);
            assert_eq!(total_weight(&levels), i as u64 + 1);
        }
        assert_eq!(capacities, config.level_capacities(levels.len()));
        for level in &levels[1..] {
            assert!(level.items().windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn test_merge_sorted_interleaves() {
        let merged = merge_sorted(vec![1.0, 4.0, 6.0], vec![2.0, 3.0, 7.0]);
        assert_eq!(merged, vec![1.0, 2.0, 3.0, 4.0, 6.0, 7.0]);
        assert_eq!(merge_sorted(vec![], vec![1.0]), vec![1.0]);
    }
}
