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

//! Equal-width bucket distributions derived from retained weighted items.

/// One bucket of an equal-width histogram.
///
/// `count` is the summed weight of retained items in the bucket, an estimate
/// of how many observations fell in `[lower, upper)` (the last bucket is closed).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bucket {
    /// Inclusive lower bound.
    pub lower: f64,
    /// Exclusive upper bound, inclusive for the last bucket.
    pub upper: f64,
    /// Approximate number of observations in the bucket.
    pub count: f64,
}

impl Bucket {
    /// Width of the bucket.
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Spreads `weighted` over `num_buckets` equal-width buckets spanning `[lower, upper]`.
///
/// Values outside the range are clamped into the first or last bucket so the
/// total count always equals the total weight.
pub(crate) fn equal_width_buckets(
    weighted: impl IntoIterator<Item = (f64, u64)>,
    num_buckets: usize,
    lower: f64,
    upper: f64,
) -> Vec<Bucket> {
    debug_assert!(num_buckets > 0);
    debug_assert!(lower <= upper);

    let mut buckets: Vec<Bucket> = (0..num_buckets)
        .map(|i| Bucket {
            lower: boundary(i, num_buckets, lower, upper),
            upper: boundary(i + 1, num_buckets, lower, upper),
            count: 0.0,
        })
        .collect();

    for (value, weight) in weighted {
        let idx = bucket_index(value, &buckets, lower, upper);
        buckets[idx].count += weight as f64;
    }
    buckets
}

fn boundary(i: usize, num_buckets: usize, lower: f64, upper: f64) -> f64 {
    if i == num_buckets {
        return upper;
    }
    let span = upper - lower;
    if span.is_finite() {
        lower + span * i as f64 / num_buckets as f64
    } else {
        // The span of two finite values can overflow; interpolate instead.
        let t = i as f64 / num_buckets as f64;
        lower * (1.0 - t) + upper * t
    }
}

/// Position of `value` within `[lower, upper)` as a fraction of the range.
fn fraction_of_range(value: f64, lower: f64, upper: f64) -> f64 {
    let span = upper - lower;
    if span.is_finite() {
        (value - lower) / span
    } else {
        (value * 0.5 - lower * 0.5) / (upper * 0.5 - lower * 0.5)
    }
}

fn bucket_index(value: f64, buckets: &[Bucket], lower: f64, upper: f64) -> usize {
    let last = buckets.len() - 1;
    if value >= upper {
        return last;
    }
    if value <= lower {
        return 0;
    }
    let scaled = fraction_of_range(value, lower, upper) * buckets.len() as f64;
    let mut idx = (scaled as usize).min(last);
    // The scaled guess can land off a boundary; settle against the stored bounds.
    while idx > 0 && value < buckets[idx].lower {
        idx -= 1;
    }
    while idx < last && value >= buckets[idx].upper {
        idx += 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(buckets: &[Bucket]) -> Vec<f64> {
        buckets.iter().map(|b| b.count).collect()
    }

    #[test]
    fn test_boundary_values_go_to_upper_neighbor() {
        let weighted = [(0.0, 1), (6.0, 1), (12.0, 1)];
        let buckets = equal_width_buckets(weighted, 2, 0.0, 12.0);
        assert_eq!(buckets[0].upper, 6.0);
        assert_eq!(buckets[1].lower, 6.0);
        assert_eq!(counts(&buckets), vec![1.0, 2.0]);
    }

    #[test]
    fn test_every_interior_boundary_settles_consistently() {
        let n = 100;
        let probe = equal_width_buckets(std::iter::empty(), n, 0.0, 12.0);
        for (i, bucket) in probe.iter().enumerate() {
            let buckets = equal_width_buckets([(bucket.lower, 1)], n, 0.0, 12.0);
            assert_eq!(buckets[i].count, 1.0, "boundary {i}");
        }
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let buckets = equal_width_buckets([(-5.0, 2), (50.0, 4)], 4, 0.0, 10.0);
        assert_eq!(counts(&buckets), vec![2.0, 0.0, 0.0, 4.0]);
    }

    #[test]
    fn test_range_wider_than_f64_max() {
        let weighted = [(-1e308, 1), (0.0, 1), (7e307, 1), (1e308, 1)];
        let buckets = equal_width_buckets(weighted, 4, -1e308, 1e308);
        assert!(buckets.iter().all(|b| b.lower.is_finite() && b.upper.is_finite()));
        assert_eq!(buckets[0].lower, -1e308);
        assert_eq!(buckets[3].upper, 1e308);
        for pair in buckets.windows(2) {
            assert_eq!(pair[0].upper, pair[1].lower);
            assert!(pair[0].lower < pair[0].upper);
        }
        assert_eq!(buckets[2].lower, 0.0);
        assert_eq!(counts(&buckets), vec![1.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_infinite_values_clamp_to_end_buckets() {
        let weighted = [(f64::NEG_INFINITY, 1), (1.0, 1), (f64::INFINITY, 3)];
        let buckets = equal_width_buckets(weighted, 2, 0.0, 2.0);
        assert_eq!(counts(&buckets), vec![1.0, 4.0]);
    }

    #[test]
    fn test_degenerate_range_collects_in_last_bucket() {
        let buckets = equal_width_buckets([(3.0, 1), (3.0, 2)], 3, 3.0, 3.0);
        assert_eq!(counts(&buckets), vec![0.0, 0.0, 3.0]);
        assert!(buckets.iter().all(|b| b.width() == 0.0));
    }
}
