//! Records a set of simulated request latencies and prints both reporting styles.
//!
//! Demonstrates how the scale adapts to the range of observed values and how a delta
//! window only reveals a time step once it has fully elapsed.

use std::time::Duration;

use base2_histogram::{ExponentialHistogram, ManualClock, TimeUnit};

const STEP: Duration = Duration::from_secs(10);

fn main() {
    let cumulative = ExponentialHistogram::builder()
        .max_scale(10)
        .max_buckets(16)
        .time_unit(TimeUnit::Milliseconds)
        .build_cumulative()
        .unwrap();

    let clock = ManualClock::new();
    let delta = ExponentialHistogram::builder()
        .max_scale(10)
        .max_buckets(16)
        .time_unit(TimeUnit::Milliseconds)
        .clock(clock.clone())
        .step(STEP)
        .build_delta()
        .unwrap();

    for step in 1..=3_u64 {
        for request in 0..50_u64 {
            // Latencies between roughly 1 ms and 100 ms, slower in later steps.
            let latency = Duration::from_micros(800 + request * request * 40 * step);

            cumulative.record_duration(latency);
            delta.record_duration(latency);
        }

        println!(
            "After step {step}: cumulative scale {}, delta window scale {}",
            cumulative.scale(),
            delta.scale()
        );

        println!(
            "Delta window before the step elapses: {} observations visible",
            delta.latest_snapshot().count()
        );

        clock.advance(STEP);

        println!("Delta window for step {step}:");
        println!("{}", delta.latest_snapshot());
    }

    if let Some(unit) = cumulative.time_unit() {
        println!("Cumulative histogram (in {unit}):");
    }
    println!("{}", cumulative.take_snapshot());
}
