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

use googletest::assert_that;
use googletest::prelude::contains_substring;
use kllsketch::common::XorShift64;
use kllsketch::error::ErrorKind;
use kllsketch::kll::KLL_FAMILY_ID;
use kllsketch::kll::KllSketch;
use kllsketch::kll::SERIAL_VERSION;
use kllsketch::kll::SketchConfig;

fn seeded(k: u32, seed: u64) -> KllSketch {
    let config = SketchConfig::new(k, 0.64, 50).unwrap();
    KllSketch::with_random(config, XorShift64::seeded(seed)).unwrap()
}

fn assert_same_content(actual: &KllSketch, expected: &KllSketch) {
    assert_eq!(actual.config(), expected.config());
    assert_eq!(actual.n(), expected.n());
    assert_eq!(actual.level_sizes(), expected.level_sizes());
    assert_eq!(actual.min_value(), expected.min_value());
    assert_eq!(actual.max_value(), expected.max_value());
    assert_eq!(actual.summary(), expected.summary());
}

#[test]
fn test_empty_round_trip() {
    let sketch = seeded(200, 1);
    let bytes = sketch.serialize();
    assert_eq!(bytes.len(), 20);
    assert_eq!(bytes[0], SERIAL_VERSION);
    assert_eq!(bytes[1], KLL_FAMILY_ID);

    let restored = KllSketch::deserialize(&bytes).unwrap();
    assert!(restored.is_empty());
    assert_eq!(restored.config(), sketch.config());
    assert_eq!(restored.config().max_bins(), 50);
}

#[test]
fn test_single_item_round_trip() {
    let mut sketch = seeded(200, 1);
    sketch.insert(42.5);
    let bytes = sketch.serialize();
    assert_eq!(bytes.len(), sketch.serialized_size());

    let restored = KllSketch::deserialize(&bytes).unwrap();
    assert_same_content(&restored, &sketch);
    assert_eq!(restored.quantile(0.3).unwrap(), 42.5);
}

#[test]
fn test_estimation_mode_round_trip() {
    let mut sketch = seeded(32, 9);
    for i in 0..20_000 {
        sketch.insert(((i * 101) % 20_011) as f64 * 0.25);
    }
    assert!(sketch.is_estimation_mode());
    let bytes = sketch.serialize();
    assert_eq!(bytes.len(), sketch.serialized_size());

    let restored = KllSketch::deserialize(&bytes).unwrap();
    assert_same_content(&restored, &sketch);
    for q in [0.0, 0.1, 0.5, 0.9, 1.0] {
        assert_eq!(restored.quantile(q).unwrap(), sketch.quantile(q).unwrap());
    }
    assert_eq!(restored.histogram(50).unwrap(), sketch.histogram(50).unwrap());
}

#[test]
fn test_restored_sketch_keeps_compacting_identically() {
    let mut sketch = seeded(16, 4);
    for i in 0..1_000 {
        sketch.insert(i as f64);
    }
    let bytes = sketch.serialize();
    let mut a = KllSketch::deserialize_with_random(&bytes, XorShift64::seeded(77)).unwrap();
    let mut b = KllSketch::deserialize_with_random(&bytes, XorShift64::seeded(77)).unwrap();
    for i in 1_000..3_000 {
        a.insert(i as f64);
        b.insert(i as f64);
    }
    assert_eq!(a.serialize(), b.serialize());
    assert_eq!(a.total_weight(), 3_000);
}

#[test]
fn test_deserialized_partials_merge() {
    let mut left = seeded(64, 1);
    let mut right = seeded(64, 2);
    for i in 0..4_000 {
        left.insert(i as f64);
        right.insert((i + 4_000) as f64);
    }
    let mut merged = KllSketch::deserialize(&left.serialize()).unwrap();
    merged
        .merge(&KllSketch::deserialize(&right.serialize()).unwrap())
        .unwrap();
    assert_eq!(merged.n(), 8_000);
    assert_eq!(merged.max_value(), Some(7_999.0));
}

#[test]
fn test_truncated_input_is_rejected() {
    let mut sketch = seeded(16, 3);
    for i in 0..500 {
        sketch.insert(i as f64);
    }
    let bytes = sketch.serialize();
    for len in [0, 3, 19, 30, bytes.len() - 1] {
        let err = KllSketch::deserialize(&bytes[..len]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData, "len {len}");
    }
}

#[test]
fn test_wrong_family_is_rejected() {
    let mut bytes = seeded(16, 3).serialize();
    bytes[1] = 7;
    let err = KllSketch::deserialize(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData);
    assert_that!(err.message(), contains_substring("invalid family id"));
}

#[test]
fn test_wrong_version_is_rejected() {
    let mut bytes = seeded(16, 3).serialize();
    bytes[0] = 9;
    let err = KllSketch::deserialize(&bytes).unwrap_err();
    assert_that!(err.message(), contains_substring("invalid serial version"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut bytes = seeded(16, 3).serialize();
    bytes[4..8].copy_from_slice(&0u32.to_le_bytes());
    let err = KllSketch::deserialize(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData);
    assert_that!(err.message(), contains_substring("invalid sketch configuration"));
}

#[test]
fn test_weight_mismatch_is_rejected() {
    let mut sketch = seeded(16, 3);
    for i in 0..10 {
        sketch.insert(i as f64);
    }
    let mut bytes = sketch.serialize();
    // n lives right after the preamble.
    bytes[20..28].copy_from_slice(&11u64.to_le_bytes());
    let err = KllSketch::deserialize(&bytes).unwrap_err();
    assert_that!(err.message(), contains_substring("does not match n"));
}

#[test]
fn test_item_outside_extrema_is_rejected() {
    let mut sketch = seeded(16, 3);
    for i in 0..10 {
        sketch.insert(i as f64);
    }
    let mut bytes = sketch.serialize();
    let last = bytes.len() - 8;
    bytes[last..].copy_from_slice(&f64::NAN.to_le_bytes());
    let err = KllSketch::deserialize(&bytes).unwrap_err();
    assert_that!(err.message(), contains_substring("outside"));
}

#[test]
fn test_level_over_capacity_is_rejected() {
    let mut sketch = seeded(16, 3);
    for i in 0..10 {
        sketch.insert(i as f64);
    }
    let mut bytes = sketch.serialize();
    // The first level header starts at offset 44.
    bytes[44..48].copy_from_slice(&17u32.to_le_bytes());
    let err = KllSketch::deserialize(&bytes).unwrap_err();
    assert_that!(err.message(), contains_substring("capacity is 16"));
}
