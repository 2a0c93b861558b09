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

//! Binary summary format for KLL sketches.
//!
//! All fields are little-endian. The preamble is always present:
//!
//! | offset | size | field              |
//! |--------|------|--------------------|
//! | 0      | 1    | serial version     |
//! | 1      | 1    | family id          |
//! | 2      | 1    | flags              |
//! | 3      | 1    | number of levels   |
//! | 4      | 4    | k                  |
//! | 8      | 8    | shrinking factor   |
//! | 16     | 4    | max bins           |
//!
//! Non-empty sketches follow with n (u64), min and max (f64), one header per
//! level (item count u32, compactions u64, last parity u8) and finally every
//! retained item as f64, bottom level first.

use tracing::debug;

use super::compactor::Level;
use super::config::SketchConfig;
use super::sketch::KllSketch;
use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::common::RandomSource;
use crate::common::XorShift64;
use crate::error::Error;

/// Family ID for KLL sketches.
pub const KLL_FAMILY_ID: u8 = 15;
/// Current serialization version.
pub const SERIAL_VERSION: u8 = 1;

/// Flag indicating the sketch is empty.
pub const FLAG_EMPTY: u8 = 1 << 0;
/// Flag indicating level zero is sorted.
pub const FLAG_LEVEL_ZERO_SORTED: u8 = 1 << 1;

/// Size of the preamble, which is the whole encoding of an empty sketch.
pub const PREAMBLE_SIZE_BYTES: usize = 20;
/// Offset of the first level header in a non-empty sketch.
pub const DATA_START: usize = PREAMBLE_SIZE_BYTES + 24;
/// Size of one level header.
pub const LEVEL_HEADER_BYTES: usize = 13;
/// More levels than this cannot be reached with a u64 item count.
pub const MAX_NUM_LEVELS: usize = 64;

impl<R: RandomSource> KllSketch<R> {
    /// Serializes the sketch to bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let size = self.serialized_size();
        let mut bytes = SketchBytes::with_capacity(size);

        let is_empty = self.is_empty();
        let flags = (if is_empty { FLAG_EMPTY } else { 0 })
            | (if self.levels[0].is_sorted() {
                FLAG_LEVEL_ZERO_SORTED
            } else {
                0
            });

        bytes.write_u8(SERIAL_VERSION);
        bytes.write_u8(KLL_FAMILY_ID);
        bytes.write_u8(flags);
        bytes.write_u8(self.levels.len() as u8);
        bytes.write_u32_le(self.config.k());
        bytes.write_f64_le(self.config.shrinking_factor());
        bytes.write_u32_le(self.config.max_bins());

        if is_empty {
            return bytes.into_bytes();
        }

        bytes.write_u64_le(self.n);
        bytes.write_f64_le(self.min_value.unwrap_or(f64::NAN));
        bytes.write_f64_le(self.max_value.unwrap_or(f64::NAN));

        for level in &self.levels {
            bytes.write_u32_le(level.len() as u32);
            bytes.write_u64_le(level.compactions());
            bytes.write_u8(level.last_offset());
        }
        for level in &self.levels {
            for &item in level.items() {
                bytes.write_f64_le(item);
            }
        }

        debug_assert_eq!(bytes.len(), size);
        bytes.into_bytes()
    }

    /// Returns the exact length of [`serialize`](Self::serialize)'s output.
    pub fn serialized_size(&self) -> usize {
        if self.is_empty() {
            return PREAMBLE_SIZE_BYTES;
        }
        DATA_START + self.levels.len() * LEVEL_HEADER_BYTES + self.num_retained() * 8
    }

    /// Deserializes a sketch, drawing future compaction parity from `rng`.
    pub fn deserialize_with_random(bytes: &[u8], rng: R) -> Result<Self, Error> {
        decode(bytes, rng).inspect_err(|err| {
            debug!(error = %err, len = bytes.len(), "rejected serialized sketch");
        })
    }
}

impl KllSketch<XorShift64> {
    /// Deserializes a sketch from bytes.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        Self::deserialize_with_random(bytes, XorShift64::default())
    }
}

fn decode<R: RandomSource>(bytes: &[u8], rng: R) -> Result<KllSketch<R>, Error> {
    fn make_error(tag: &'static str) -> impl FnOnce(std::io::Error) -> Error {
        move |err| Error::insufficient_data(tag).set_source(err)
    }

    let mut cursor = SketchSlice::new(bytes);

    let serial_version = cursor.read_u8().map_err(make_error("serial_version"))?;
    let family_id = cursor.read_u8().map_err(make_error("family_id"))?;
    let flags = cursor.read_u8().map_err(make_error("flags"))?;
    let num_levels = cursor.read_u8().map_err(make_error("num_levels"))? as usize;
    let k = cursor.read_u32_le().map_err(make_error("k"))?;
    let shrinking_factor = cursor.read_f64_le().map_err(make_error("shrinking_factor"))?;
    let max_bins = cursor.read_u32_le().map_err(make_error("max_bins"))?;

    if family_id != KLL_FAMILY_ID {
        return Err(Error::invalid_family(KLL_FAMILY_ID, family_id, "KLL"));
    }
    if serial_version != SERIAL_VERSION {
        return Err(Error::deserial(format!(
            "invalid serial version: {serial_version}"
        )));
    }
    let config = SketchConfig::new(k, shrinking_factor, max_bins)
        .map_err(|err| Error::deserial("invalid sketch configuration").set_source(err))?;

    if (flags & FLAG_EMPTY) != 0 {
        return Ok(KllSketch::make(config, rng));
    }
    if num_levels == 0 || num_levels > MAX_NUM_LEVELS {
        return Err(Error::deserial(format!(
            "num_levels must be in [1, {MAX_NUM_LEVELS}], got {num_levels}"
        )));
    }

    let n = cursor.read_u64_le().map_err(make_error("n"))?;
    let min_value = cursor.read_f64_le().map_err(make_error("min"))?;
    let max_value = cursor.read_f64_le().map_err(make_error("max"))?;
    if n == 0 {
        return Err(Error::deserial("non-empty sketch must have n > 0"));
    }
    if !(min_value <= max_value) {
        return Err(Error::deserial(format!(
            "min must not exceed max, got [{min_value}, {max_value}]"
        )));
    }

    let capacities = config.level_capacities(num_levels);
    let mut headers = Vec::with_capacity(num_levels);
    for capacity in &capacities {
        let len = cursor.read_u32_le().map_err(make_error("level_len"))? as usize;
        let compactions = cursor.read_u64_le().map_err(make_error("compactions"))?;
        let last_offset = cursor.read_u8().map_err(make_error("last_offset"))?;
        if len > *capacity {
            return Err(Error::deserial(format!(
                "level holds {len} items, capacity is {capacity}"
            )));
        }
        headers.push((len, compactions, last_offset));
    }

    let retained: usize = headers.iter().map(|(len, _, _)| len).sum();
    if cursor.remaining() < retained * 8 {
        return Err(Error::insufficient_data("items"));
    }

    let mut levels = Vec::with_capacity(num_levels);
    let mut weight = 0u64;
    for (height, (len, compactions, last_offset)) in headers.into_iter().enumerate() {
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            let item = cursor.read_f64_le().map_err(make_error("item"))?;
            if !(min_value <= item && item <= max_value) {
                return Err(Error::deserial(format!(
                    "item {item} outside [{min_value}, {max_value}]"
                )));
            }
            items.push(item);
        }
        weight = weight.saturating_add((len as u64) << height);
        levels.push(Level::restore(items, compactions, last_offset));
    }
    if weight != n {
        return Err(Error::deserial(format!(
            "retained weight {weight} does not match n {n}"
        )));
    }

    let mut sketch = KllSketch::make(config, rng);
    sketch.n = n;
    sketch.levels = levels;
    sketch.capacities = capacities;
    sketch.min_value = Some(min_value);
    sketch.max_value = Some(max_value);
    Ok(sketch)
}
