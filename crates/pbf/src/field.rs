//! Metaball scalar field sampled on a regular lattice.
//!
//! Each lattice point sums `r² / d²` over the particles in the 3x3 grid
//! cells around it. The result feeds isosurface extraction, which lives
//! outside this crate. Evaluation is split into row bands on the work queue.

use std::io::{self, Write};

use glam::Vec2;

use crate::grid::HashGrid;
use crate::particle::Particle;
use crate::physics::FIELD_TILE_ROWS;
use crate::simulation::Simulation;
use crate::work_queue::{Job, WorkQueue};

pub struct ScalarField {
    samples_x: usize,
    samples_y: usize,
    world_size: Vec2,
    values: Vec<f32>,
}

impl ScalarField {
    /// A lattice of `(samples_x + 1) x (samples_y + 1)` points spanning the
    /// world box, corners included.
    pub fn new(samples_x: usize, samples_y: usize, world_width: f32, world_height: f32) -> Self {
        let samples_x = samples_x.max(1);
        let samples_y = samples_y.max(1);
        Self {
            samples_x,
            samples_y,
            world_size: Vec2::new(world_width, world_height),
            values: vec![0.0; (samples_x + 1) * (samples_y + 1)],
        }
    }

    pub fn samples_x(&self) -> usize {
        self.samples_x
    }

    pub fn samples_y(&self) -> usize {
        self.samples_y
    }

    /// Row-major values, `samples_x + 1` per row.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn value(&self, x: usize, y: usize) -> f32 {
        self.values[x + y * (self.samples_x + 1)]
    }

    /// World position of lattice point `(x, y)`.
    pub fn point(&self, x: usize, y: usize) -> Vec2 {
        let spacing = self.world_size / Vec2::new(self.samples_x as f32, self.samples_y as f32);
        -0.5 * self.world_size + Vec2::new(x as f32, y as f32) * spacing
    }

    /// Resamples the field from the particles and grid of the last step.
    pub fn evaluate(&mut self, sim: &Simulation, queue: &mut WorkQueue) {
        let row_len = self.samples_x + 1;
        let spacing = self.world_size / Vec2::new(self.samples_x as f32, self.samples_y as f32);
        let shared = BandInput {
            grid: sim.grid(),
            particles: &sim.particles().list,
            origin: -0.5 * self.world_size,
            spacing,
            radius_sq: sim.params().particle_radius * sim.params().particle_radius,
        };

        queue.run_batch(|batch| {
            for (band, values) in self.values.chunks_mut(row_len * FIELD_TILE_ROWS).enumerate() {
                batch.submit(FieldBand {
                    input: shared,
                    first_row: band * FIELD_TILE_ROWS,
                    row_len,
                    values,
                });
            }
        });
    }

    /// Writes the field as an ASCII greyscale PGM, scaling values by 255.
    pub fn write_pgm<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(out, "P2")?;
        writeln!(out, "{} {}", self.samples_x + 1, self.samples_y + 1)?;
        writeln!(out, "255")?;
        for value in &self.values {
            writeln!(out, "{}", (value * 255.0).clamp(0.0, 255.0) as u8)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy)]
struct BandInput<'a> {
    grid: &'a HashGrid,
    particles: &'a [Particle],
    origin: Vec2,
    spacing: Vec2,
    radius_sq: f32,
}

impl BandInput<'_> {
    fn sample(&self, point: Vec2) -> f32 {
        let grid = self.grid;
        let rel = (point - grid.origin()) / grid.cell_size();
        let (cx, cy) = (rel.x.floor() as i32, rel.y.floor() as i32);
        let mut value = 0.0;

        for dy in -1..=1 {
            for dx in -1..=1 {
                let (x, y) = (cx + dx, cy + dy);
                if !grid.is_within_bounds(x, y) {
                    continue;
                }
                let cell = grid.cell_index(x as usize, y as usize);
                for j in grid.cell_run(cell, self.particles) {
                    let d2 = (self.particles[j].position - point).length_squared();
                    if d2 > 0.0 {
                        value += self.radius_sq / d2;
                    }
                }
            }
        }
        value
    }
}

struct FieldBand<'a> {
    input: BandInput<'a>,
    first_row: usize,
    row_len: usize,
    values: &'a mut [f32],
}

impl Job for FieldBand<'_> {
    fn run(self: Box<Self>) {
        for (k, value) in self.values.iter_mut().enumerate() {
            let x = k % self.row_len;
            let y = self.first_row + k / self.row_len;
            let point = self.input.origin + Vec2::new(x as f32, y as f32) * self.input.spacing;
            *value = self.input.sample(point);
        }
    }
}
