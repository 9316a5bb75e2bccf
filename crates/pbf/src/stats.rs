//! Frame timing and per-frame metrics.

use std::path::Path;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::simulation::Simulation;

/// Weight of the newest sample in the frame time average.
const EMA_WEIGHT: f32 = 0.05;

/// Exponential moving average of a repeated measurement, in milliseconds.
#[derive(Clone, Debug, Default)]
pub struct FrameTimer {
    average_ms: Option<f32>,
    last_ms: f32,
}

impl FrameTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` and folds its wall time into the average.
    pub fn time<R>(&mut self, f: impl FnOnce() -> R) -> R {
        let start = Instant::now();
        let result = f();
        self.record(start.elapsed());
        result
    }

    pub fn record(&mut self, elapsed: Duration) {
        let ms = elapsed.as_secs_f32() * 1000.0;
        self.last_ms = ms;
        self.average_ms = Some(match self.average_ms {
            Some(avg) => ms * EMA_WEIGHT + avg * (1.0 - EMA_WEIGHT),
            None => ms,
        });
    }

    /// Smoothed time in milliseconds (0 before the first sample).
    pub fn average_ms(&self) -> f32 {
        self.average_ms.unwrap_or(0.0)
    }

    pub fn last_ms(&self) -> f32 {
        self.last_ms
    }
}

/// Snapshot of simulation health after a step.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SimStats {
    pub frame: u64,
    pub time: f32,
    pub particle_count: usize,
    pub mean_density: f32,
    pub max_density: f32,
    /// Largest neighbour list, the particle itself included.
    pub max_neighbors: usize,
    pub mean_speed: f32,
    pub max_speed: f32,
    /// Smoothed step time.
    pub frame_ms: f32,
}

impl SimStats {
    pub fn collect(sim: &Simulation, timer: &FrameTimer) -> Self {
        let count = sim.particle_count();
        let mut stats = Self {
            frame: sim.frame(),
            time: sim.time(),
            particle_count: count,
            frame_ms: timer.average_ms(),
            ..Default::default()
        };
        if count == 0 {
            return stats;
        }

        let densities = sim.densities();
        stats.mean_density = densities.iter().sum::<f32>() / count as f32;
        stats.max_density = densities.iter().copied().fold(0.0, f32::max);

        let mut speed_sum = 0.0;
        for p in sim.particles().iter() {
            let speed = p.velocity.length();
            speed_sum += speed;
            stats.max_speed = stats.max_speed.max(speed);
            stats.max_neighbors = stats.max_neighbors.max(p.neighbor_count());
        }
        stats.mean_speed = speed_sum / count as f32;
        stats
    }

    pub fn save_json(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
