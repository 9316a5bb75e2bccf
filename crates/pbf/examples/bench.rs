//! Quick benchmark for profiling the PBF step
//!
//! Run with: cargo run --release --example bench -p pbf
//! Profile with: cargo flamegraph --example bench -p pbf

use pbf::{FrameTimer, SimParams, Simulation, WorkQueue};
use std::time::Instant;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    const WARMUP: usize = 50;
    const FRAMES: usize = 300;

    env_logger::init();

    let params = SimParams::default();
    let budget_ms = params.dt * 1000.0;

    println!(
        "Setting up {}x{} particles, H = {}",
        params.particles_per_axis,
        params.particles_per_axis,
        params.smoothing_radius()
    );

    let max_workers = num_cpus::get().saturating_sub(1).max(1);
    for workers in [1, 2, max_workers] {
        let mut queue = WorkQueue::with_workers(workers)?;
        let mut sim = Simulation::new(params.clone())?;

        for _ in 0..WARMUP {
            sim.step(&mut queue)?;
        }

        let mut timer = FrameTimer::new();
        let start = Instant::now();
        for frame in 0..FRAMES {
            timer.time(|| sim.step(&mut queue))?;
            if frame % 60 == 0 {
                println!("  [{} workers] Frame {}: {:.2}ms (avg)", workers, frame, timer.average_ms());
            }
        }

        let elapsed = start.elapsed();
        let avg_frame_ms = elapsed.as_secs_f64() * 1000.0 / FRAMES as f64;

        println!("\n=== {} workers ===", workers);
        println!("Total time: {:.2?}", elapsed);
        println!("Avg step time: {:.2}ms", avg_frame_ms);
        if avg_frame_ms > budget_ms as f64 {
            println!("Over the {:.1}ms step budget\n", budget_ms);
        } else {
            println!("Within the {:.1}ms step budget\n", budget_ms);
        }
    }

    Ok(())
}
