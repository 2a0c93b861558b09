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

//! Profiles a small in-memory column the way a data-quality check would:
//! feed every value into a sketch, then read back a bucketed distribution.
//!
//! Run with `RUST_LOG=kllsketch=trace` to watch compactions.

use kllsketch::kll::Bucket;
use kllsketch::kll::KllSketch;
use kllsketch::kll::SketchConfig;
use tracing_subscriber::EnvFilter;

const COLUMN: [f64; 5] = [0.0, 0.0, 5.0, 10.0, 12.0];

fn print_buckets(title: &str, buckets: &[Bucket]) {
    println!("{title}");
    for bucket in buckets.iter().filter(|b| b.count > 0.0) {
        println!(
            "  [{:>6.2}, {:>6.2}) -> {}",
            bucket.lower, bucket.upper, bucket.count
        );
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut sketch = KllSketch::new(SketchConfig::default())?;
    for v in COLUMN {
        sketch.insert(v);
    }
    print_buckets(
        "Default configuration, 100 buckets (non-empty shown):",
        &sketch.histogram(100)?,
    );

    let mut tiny = KllSketch::new(SketchConfig::new(2, 0.64, 2)?)?;
    for v in COLUMN {
        tiny.insert(v);
    }
    print_buckets("\nk = 2, two buckets:", &tiny.histogram(2)?);
    println!(
        "  retained {} of {} values across {} levels",
        tiny.num_retained(),
        tiny.n(),
        tiny.num_levels()
    );

    println!("\nMedian: {}", sketch.quantile(0.5)?);
    println!("Rank of 5.0: {}", sketch.rank(5.0)?);

    match tiny.histogram(3) {
        Ok(_) => println!("\nUnexpectedly allowed three buckets"),
        Err(err) => println!("\nAsking for three buckets: {err}"),
    }
    Ok(())
}
