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

//! Builds one sketch per partition on separate threads, ships each as bytes
//! to a coordinator and merges them there.

use std::thread;

use kllsketch::kll::KllSketch;
use kllsketch::kll::SketchConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

const PARTITIONS: u64 = 8;
const ROWS_PER_PARTITION: u64 = 250_000;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = SketchConfig::new(200, 0.64, 20)?;

    let payloads: Vec<Vec<u8>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..PARTITIONS)
            .map(|p| {
                scope.spawn(move || -> anyhow::Result<Vec<u8>> {
                    let mut sketch = KllSketch::new(config)?;
                    for row in 0..ROWS_PER_PARTITION {
                        // A skewed column: squares of a uniform sequence.
                        let x = (row * PARTITIONS + p) as f64
                            / (PARTITIONS * ROWS_PER_PARTITION) as f64;
                        sketch.insert(x * x * 100.0);
                    }
                    info!(
                        partition = p,
                        retained = sketch.num_retained(),
                        "partition sketched"
                    );
                    Ok(sketch.serialize())
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| {
                h.join()
                    .map_err(|_| anyhow::anyhow!("partition thread panicked"))?
            })
            .collect::<anyhow::Result<Vec<_>>>()
    })?;

    let mut total = KllSketch::new(config)?;
    for bytes in &payloads {
        total.merge(&KllSketch::deserialize(bytes)?)?;
    }
    info!(
        n = total.n(),
        retained = total.num_retained(),
        bytes = total.serialized_size(),
        "partitions merged"
    );

    for q in [0.1, 0.25, 0.5, 0.75, 0.9] {
        // Exact answer for x^2 * 100 with x uniform on [0, 1).
        let expected = q * q * 100.0;
        let estimate = total.quantile(q)?;
        println!("q={q:<4} estimate={estimate:>8.3} exact={expected:>8.3}");
    }
    for bucket in total.histogram(10)? {
        println!(
            "[{:>6.2}, {:>6.2}) {:>9}",
            bucket.lower, bucket.upper, bucket.count
        );
    }
    Ok(())
}
