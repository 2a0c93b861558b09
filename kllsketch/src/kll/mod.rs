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

//! KLL sketch for estimating ranks, quantiles and value distributions.
//!
//! KLL is a compact, streaming quantiles sketch. Values enter level 0; when a
//! level outgrows its capacity it is sorted and halved, and the surviving
//! half moves one level up where every item counts twice as much. The top
//! level holds k items and each level below holds a factor c fewer, so the
//! sketch retains `O(k log(n/k))` items while keeping rank error `O(1/k)`.
//!
//! Sketches built independently, e.g. one per data partition, merge into a
//! sketch equivalent to one built over the union of their inputs, and
//! serialize to a compact binary summary for transport between stages.
//!
//! # Usage
//!
//! ```rust
//! # use kllsketch::kll::{KllSketch, SketchConfig};
//! let mut sketch = KllSketch::new(SketchConfig::new(2, 0.64, 2).unwrap()).unwrap();
//! for v in [0.0, 0.0, 5.0, 10.0, 12.0] {
//!     sketch.insert(v);
//! }
//! let buckets = sketch.histogram(2).unwrap();
//! assert_eq!(buckets[0].count, 3.0);
//! assert_eq!(buckets[1].count, 2.0);
//! ```
//!
//! # Concurrency
//!
//! A sketch has no interior mutability: [`KllSketch::insert`] and
//! [`KllSketch::merge`] take `&mut self` and every query takes `&self`.
//! Share one across threads behind a `RwLock`, or build one sketch per
//! thread and merge them afterwards.

mod compactor;
mod config;
mod histogram;
mod merge;
mod serialization;
mod sketch;
mod summary;

pub use self::config::DEFAULT_K;
pub use self::config::DEFAULT_MAX_BINS;
pub use self::config::DEFAULT_SHRINKING_FACTOR;
pub use self::config::MIN_LEVEL_CAPACITY;
pub use self::config::SketchConfig;
pub use self::histogram::Bucket;
pub use self::serialization::KLL_FAMILY_ID;
pub use self::serialization::SERIAL_VERSION;
pub use self::sketch::KllSketch;
pub use self::summary::Summary;
pub use self::summary::SummaryEntry;
