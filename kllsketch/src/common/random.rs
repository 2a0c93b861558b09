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

//! Seedable random sources driving compaction parity.
//!
//! Sketches never reach for ambient randomness: every sketch owns a
//! [`RandomSource`] so tests can replay the exact sequence of compactions.

use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;

/// Random number source for sketches.
pub trait RandomSource {
    /// Returns the next random 64-bit value.
    fn next_u64(&mut self) -> u64;

    /// Returns a random boolean value.
    fn next_bool(&mut self) -> bool {
        (self.next_u64() >> 63) != 0
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn next_u64(&mut self) -> u64 {
        (**self).next_u64()
    }
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn next_u64(&mut self) -> u64 {
        (**self).next_u64()
    }
}

/// Xorshift-based random generator for sketch operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// Creates a new generator using the provided seed.
    ///
    /// The seed is scrambled with a SplitMix64 step, so nearby seeds still
    /// produce unrelated sequences. Equal seeds always produce equal sequences.
    pub fn seeded(seed: u64) -> Self {
        let state = splitmix64(seed);
        let state = if state == 0 { GOLDEN_GAMMA } else { state };
        Self { state }
    }
}

impl Default for XorShift64 {
    /// Seeds from the process-wide hasher keys, which std draws from OS entropy.
    fn default() -> Self {
        let seed = RandomState::new().hash_one(std::process::id());
        Self::seeded(seed)
    }
}

impl RandomSource for XorShift64 {
    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

const GOLDEN_GAMMA: u64 = 0x9e37_79b9_7f4a_7c15;

fn splitmix64(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(GOLDEN_GAMMA);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = XorShift64::seeded(42);
        let mut b = XorShift64::seeded(42);
        for _ in 0..64 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn test_zero_seed_is_usable() {
        let mut rng = XorShift64::seeded(0);
        let first = rng.next_u64();
        assert_ne!(first, 0);
        assert_ne!(first, rng.next_u64());
    }

    #[test]
    fn test_next_bool_produces_both_values() {
        let mut rng = XorShift64::seeded(7);
        let ones = (0..1000).filter(|_| rng.next_bool()).count();
        assert!((300..700).contains(&ones), "got {ones} ones out of 1000");
    }

    #[test]
    fn test_borrowed_source_advances_owner() {
        fn draw<R: RandomSource>(mut rng: R) -> u64 {
            rng.next_u64()
        }

        let mut owner = XorShift64::seeded(9);
        let mut reference = owner;
        assert_eq!(draw(&mut owner), reference.next_u64());
        assert_eq!(owner, reference);

        let boxed: Box<dyn RandomSource> = Box::new(owner);
        assert_eq!(draw(boxed), reference.next_u64());
    }
}
