//! Headless PBF runner
//!
//! Steps the simulation for a fixed number of frames without a window and
//! reports timing and fluid health.
//!
//! Usage:
//!   cargo run --release -p headless -- [--frames N] [--threads N]
//!       [--params params.json] [--save-params out.json]
//!       [--pull X,Y] [--wave] [--metrics metrics.json]
//!       [--field field.pgm] [--field-res N]
//!
//! Set RUST_LOG=info (or debug) for progress output.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use glam::Vec2;
use pbf::{FrameTimer, ScalarField, SimParams, SimStats, Simulation, WorkQueue};

const LOG_INTERVAL: u64 = 60;

#[derive(Debug, Default, PartialEq)]
struct Options {
    frames: u64,
    threads: Option<usize>,
    params: Option<PathBuf>,
    save_params: Option<PathBuf>,
    pull: Option<Vec2>,
    wave: bool,
    metrics: Option<PathBuf>,
    field: Option<PathBuf>,
    field_res: usize,
}

impl Options {
    fn parse(args: &[String]) -> Result<Self> {
        let mut options = Options {
            frames: 600,
            field_res: 256,
            ..Default::default()
        };

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            let mut value = || {
                iter.next()
                    .ok_or_else(|| anyhow!("{} expects a value", arg))
            };
            match arg.as_str() {
                "--frames" => options.frames = value()?.parse().context("--frames")?,
                "--threads" => options.threads = Some(value()?.parse().context("--threads")?),
                "--params" => options.params = Some(value()?.into()),
                "--save-params" => options.save_params = Some(value()?.into()),
                "--pull" => options.pull = Some(parse_point(value()?)?),
                "--wave" => options.wave = true,
                "--metrics" => options.metrics = Some(value()?.into()),
                "--field" => options.field = Some(value()?.into()),
                "--field-res" => options.field_res = value()?.parse().context("--field-res")?,
                other => bail!("unknown argument: {}", other),
            }
        }
        Ok(options)
    }
}

fn parse_point(text: &str) -> Result<Vec2> {
    let (x, y) = text
        .split_once(',')
        .ok_or_else(|| anyhow!("expected X,Y but got {:?}", text))?;
    Ok(Vec2::new(x.trim().parse()?, y.trim().parse()?))
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = Options::parse(&args)?;

    let params = match &options.params {
        Some(path) => SimParams::load_json(path)
            .map_err(|e| anyhow!("{}", e))
            .with_context(|| format!("loading parameters from {}", path.display()))?,
        None => SimParams::default(),
    };
    if let Some(path) = &options.save_params {
        params
            .save_json(path)
            .map_err(|e| anyhow!("{}", e))
            .with_context(|| format!("writing parameters to {}", path.display()))?;
    }

    let mut queue = match options.threads {
        Some(n) => WorkQueue::with_workers(n),
        None => WorkQueue::new(),
    }
    .context("spawning worker threads")?;

    let mut sim = Simulation::new(params)?;
    if let Some(point) = options.pull {
        sim.set_pull(point, true);
    }
    sim.set_wave(options.wave);

    log::info!(
        "Running {} frames with {} particles on {} workers",
        options.frames,
        sim.particle_count(),
        queue.worker_count()
    );

    let mut timer = FrameTimer::new();
    let mut history = Vec::new();
    for _ in 0..options.frames {
        timer
            .time(|| sim.step(&mut queue))
            .with_context(|| format!("frame {}", sim.frame()))?;

        if sim.frame() % LOG_INTERVAL == 0 {
            let stats = SimStats::collect(&sim, &timer);
            log::info!(
                "Frame {}: {:.2}ms, mean density {:.1}, max neighbours {}",
                stats.frame,
                stats.frame_ms,
                stats.mean_density,
                stats.max_neighbors
            );
            history.push(stats);
        }
    }

    let summary = SimStats::collect(&sim, &timer);
    log::info!(
        "Done: {} frames, {:.2}ms per step, max density {:.1}, max speed {:.2}",
        summary.frame,
        summary.frame_ms,
        summary.max_density,
        summary.max_speed
    );
    history.push(summary);

    if let Some(path) = &options.metrics {
        let json = serde_json::to_string_pretty(&history)?;
        std::fs::write(path, json).with_context(|| format!("writing metrics to {}", path.display()))?;
        log::info!("Metrics written to {}", path.display());
    }

    if let Some(path) = &options.field {
        let p = sim.params();
        let mut field = ScalarField::new(options.field_res, options.field_res, p.world_width, p.world_height);
        field.evaluate(&sim, &mut queue);
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut out = BufWriter::new(file);
        field.write_pgm(&mut out)?;
        out.flush()?;
        log::info!("Field written to {}", path.display());
    }

    Ok(())
}
