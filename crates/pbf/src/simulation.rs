//! Position Based Fluids solver.
//!
//! One step runs seven phases in order: predict, grid rebuild, neighbour
//! search, density/λ (parallel over particle tiles), position correction,
//! velocity reconstruction and boundary collision. Only the density/λ phase
//! touches the work queue.

use std::ops::Range;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::SimError;
use crate::grid::HashGrid;
use crate::kernels::Kernels;
use crate::neighbors;
use crate::params::SimParams;
use crate::particle::{NeighborList, Particle, Particles};
use crate::work_queue::{Job, WorkQueue};

/// Contiguous, disjoint index ranges of at most `tile` elements covering
/// `0..count`.
pub fn tile_ranges(count: usize, tile: usize) -> impl Iterator<Item = Range<usize>> {
    let tile = tile.max(1);
    (0..count).step_by(tile).map(move |start| start..(start + tile).min(count))
}

/// Constants the density/λ pass needs, copied into every tile job.
#[derive(Clone, Copy, Debug)]
struct ConstraintParams {
    kernels: Kernels,
    mass: f32,
    inv_rest_density: f32,
    relaxation: f32,
}

impl ConstraintParams {
    /// Density and λ of particle `i` from its neighbour list.
    #[inline]
    fn density_and_lambda(&self, particles: &[Particle], i: usize) -> (f32, f32) {
        let pi = particles[i].position;
        let mut density = 0.0;
        let mut grad_sq_sum = 0.0;
        let mut grad_i = Vec2::ZERO;

        for j in particles[i].neighbors.iter() {
            let r = pi - particles[j].position;
            density += self.mass * self.kernels.poly6(r.length_squared());

            if i == j {
                continue;
            }
            let grad = self.kernels.spiky_gradient(r) * self.inv_rest_density;
            grad_sq_sum += grad.length_squared();
            grad_i += grad;
        }

        let constraint = density * self.inv_rest_density - 1.0;
        let lambda = -constraint / (grad_sq_sum + grad_i.length_squared() + self.relaxation);
        (density, lambda)
    }
}

/// Density/λ work item for one tile of particles.
///
/// Reads every particle, writes only its own slice of the output arrays.
struct LambdaTile<'a> {
    particles: &'a [Particle],
    range: Range<usize>,
    densities: &'a mut [f32],
    lambdas: &'a mut [f32],
    constraint: ConstraintParams,
}

impl Job for LambdaTile<'_> {
    fn run(self: Box<Self>) {
        let LambdaTile {
            particles,
            range,
            densities,
            lambdas,
            constraint,
        } = *self;
        for ((i, density), lambda) in range.zip(densities.iter_mut()).zip(lambdas.iter_mut()) {
            (*density, *lambda) = constraint.density_and_lambda(particles, i);
        }
    }
}

pub struct Simulation {
    params: SimParams,
    kernels: Kernels,
    /// Sorted by grid cell after every step.
    particles: Particles,

    // --- Auxiliary State (Structure of Arrays) ---
    // Indexed like particles.list; rewritten every step.
    densities: Vec<f32>,
    lambdas: Vec<f32>,

    // --- Solver Buffers ---
    deltas: Vec<Vec2>,

    grid: HashGrid,

    // External input
    pull_point: Vec2,
    pulling: bool,
    wave_enabled: bool,
    wave_elapsed: f32,

    time: f32,
    frame: u64,
}

impl Simulation {
    /// Block of `particles_per_axis²` particles centred on the origin.
    pub fn new(params: SimParams) -> Result<Self, SimError> {
        params.validate()?;

        let n = params.particles_per_axis;
        let spacing = params.spawn_spacing;
        let half = spacing * n as f32 * 0.5;
        let jitter = params.initial_velocity_jitter;
        let mut rng = ChaCha8Rng::seed_from_u64(params.seed);

        let mut particles = Particles::new();
        for i in 0..n * n {
            let position = Vec2::new((i % n) as f32 * spacing - half, (i / n) as f32 * spacing - half);
            let velocity = if jitter > 0.0 {
                Vec2::new(rng.gen::<f32>() - 0.5, rng.gen::<f32>() - 0.5) * jitter
            } else {
                Vec2::ZERO
            };
            particles.spawn(position, velocity);
        }

        Ok(Self::with_particles(params, particles))
    }

    /// Particles at rest at the given positions.
    pub fn from_positions(
        params: SimParams,
        positions: impl IntoIterator<Item = Vec2>,
    ) -> Result<Self, SimError> {
        params.validate()?;
        let mut particles = Particles::new();
        for position in positions {
            particles.spawn(position, Vec2::ZERO);
        }
        Ok(Self::with_particles(params, particles))
    }

    fn with_particles(params: SimParams, mut particles: Particles) -> Self {
        for p in particles.iter_mut() {
            p.neighbors = NeighborList::with_capacity(params.max_neighbors);
        }
        let count = particles.len();
        log::debug!(
            "Simulation with {} particles, H = {}",
            count,
            params.smoothing_radius()
        );

        Self {
            kernels: Kernels::from_params(&params),
            grid: HashGrid::from_params(&params),
            particles,
            densities: vec![0.0; count],
            lambdas: vec![0.0; count],
            deltas: vec![Vec2::ZERO; count],
            pull_point: Vec2::ZERO,
            pulling: false,
            wave_enabled: false,
            wave_elapsed: 0.0,
            time: 0.0,
            frame: 0,
            params,
        }
    }

    /// Advances the simulation by one fixed time step.
    ///
    /// A neighbour overflow leaves the frame half-finished; the simulation
    /// should not be stepped again afterwards.
    pub fn step(&mut self, queue: &mut WorkQueue) -> Result<(), SimError> {
        let dt = self.params.dt;
        debug_assert!(dt > 0.0, "Time step must be positive");

        // 1. Prediction
        self.predict(dt);

        // 2. Grid
        self.grid.rebuild(&mut self.particles);

        // 3. Neighbours
        if let Err(err) = neighbors::find_neighbors(&self.grid, &mut self.particles, self.kernels.h()) {
            log::error!("Frame {}: {}", self.frame, err);
            return Err(err);
        }

        // 4. Density and λ (parallel)
        self.compute_lambdas(queue);

        // 5. Position correction
        self.apply_position_correction();

        // 6. Velocity from the position change
        let inv_dt = 1.0 / dt;
        for p in self.particles.iter_mut() {
            p.velocity = (p.position - p.prev_position) * inv_dt;
        }

        // 7. Walls
        self.resolve_boundaries();

        self.time += dt;
        self.frame += 1;
        Ok(())
    }

    fn predict(&mut self, dt: f32) {
        let gravity = self.params.gravity;
        let pull = self.pulling.then_some((self.pull_point, self.params.pull_gain));
        let wave = self.wave_band();
        let wave_impulse = self.params.wave_accel * dt;

        for p in self.particles.iter_mut() {
            p.prev_position = p.position;
            p.velocity += gravity * dt;
            if let Some((target, gain)) = pull {
                p.velocity += (target - p.position) * gain * dt;
            }
            if let Some(band) = &wave {
                if band.contains(&p.position.x) {
                    p.velocity.x += wave_impulse;
                }
            }
            p.position += p.velocity * dt;
        }

        if self.wave_enabled {
            self.wave_elapsed += dt;
        }
    }

    /// Current horizontal extent of the wave band, if the wave is running.
    ///
    /// The band enters at the left wall and leaves past the right wall, then
    /// starts over.
    pub fn wave_band(&self) -> Option<Range<f32>> {
        if !self.wave_enabled {
            return None;
        }
        let world = self.params.world_width;
        let width = self.params.wave_width_ratio * world;
        let travel = (self.wave_elapsed * self.params.wave_speed) % (world + width);
        let left = -0.5 * world - width + travel;
        Some(left..left + width)
    }

    fn compute_lambdas(&mut self, queue: &mut WorkQueue) {
        let count = self.particles.len();
        self.densities.resize(count, 0.0);
        self.lambdas.resize(count, 0.0);

        let tile = self.params.tile_size;
        let constraint = ConstraintParams {
            kernels: self.kernels,
            mass: self.params.particle_mass,
            inv_rest_density: 1.0 / self.params.rest_density,
            relaxation: self.params.relaxation,
        };
        let particles = &self.particles.list[..];
        let densities = &mut self.densities;
        let lambdas = &mut self.lambdas;

        queue.run_batch(|batch| {
            let outputs = densities.chunks_mut(tile).zip(lambdas.chunks_mut(tile));
            for (range, (densities, lambdas)) in tile_ranges(count, tile).zip(outputs) {
                batch.submit(LambdaTile {
                    particles,
                    range,
                    densities,
                    lambdas,
                    constraint,
                });
            }
        });
    }

    /// Single Jacobi pass: every correction is computed from the same
    /// positions, then applied. An in-place sweep would let particle `j` see
    /// the already corrected `i`; here the result does not depend on particle
    /// order, and velocity and walls follow as separate phases.
    fn apply_position_correction(&mut self) {
        let inv_rest_density = 1.0 / self.params.rest_density;
        let list = &self.particles.list;
        self.deltas.resize(list.len(), Vec2::ZERO);

        for (i, delta) in self.deltas.iter_mut().enumerate() {
            let pi = list[i].position;
            let lambda_i = self.lambdas[i];
            let mut sum = Vec2::ZERO;

            for j in list[i].neighbors.iter() {
                if i == j {
                    continue;
                }
                let r = pi - list[j].position;
                let grad = self.kernels.spiky_gradient(r);
                if grad == Vec2::ZERO {
                    continue;
                }
                let s_corr = self.kernels.tensile_correction(r.length_squared());
                sum += (lambda_i + self.lambdas[j] + s_corr) * grad;
            }

            *delta = sum * inv_rest_density;
        }

        for (p, delta) in self.particles.iter_mut().zip(&self.deltas) {
            p.position += *delta;
        }
    }

    fn resolve_boundaries(&mut self) {
        let r = self.params.particle_radius;
        let max = Vec2::new(self.params.world_width, self.params.world_height) * 0.5 - r;
        let min = -max;
        let elasticity = self.params.elasticity;

        for p in self.particles.iter_mut() {
            if p.position.x < min.x {
                p.position.x = min.x;
                p.velocity.x = -p.velocity.x * elasticity;
            } else if p.position.x > max.x {
                p.position.x = max.x;
                p.velocity.x = -p.velocity.x * elasticity;
            }

            if p.position.y < min.y {
                p.position.y = min.y;
                p.velocity.y = -p.velocity.y * elasticity;
            } else if p.position.y > max.y {
                p.position.y = max.y;
                p.velocity.y = -p.velocity.y * elasticity;
            }
        }
    }

    /// Sets the pull target (world coordinates) and whether it is active.
    pub fn set_pull(&mut self, point: Vec2, active: bool) {
        self.pull_point = point;
        self.pulling = active;
    }

    /// Starts or stops the travelling wave. Restarting sends a fresh band in
    /// from the left wall.
    pub fn set_wave(&mut self, enabled: bool) {
        if enabled && !self.wave_enabled {
            self.wave_elapsed = 0.0;
        }
        self.wave_enabled = enabled;
    }

    pub fn is_pulling(&self) -> bool {
        self.pulling
    }

    pub fn pull_point(&self) -> Vec2 {
        self.pull_point
    }

    pub fn wave_enabled(&self) -> bool {
        self.wave_enabled
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn kernels(&self) -> &Kernels {
        &self.kernels
    }

    pub fn particles(&self) -> &Particles {
        &self.particles
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    pub fn grid(&self) -> &HashGrid {
        &self.grid
    }

    pub fn density(&self, i: usize) -> f32 {
        self.densities[i]
    }

    pub fn lambda(&self, i: usize) -> f32 {
        self.lambdas[i]
    }

    pub fn densities(&self) -> &[f32] {
        &self.densities
    }

    pub fn lambdas(&self) -> &[f32] {
        &self.lambdas
    }

    /// Simulated seconds since creation.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero_gravity() -> SimParams {
        SimParams {
            gravity: Vec2::ZERO,
            ..Default::default()
        }
    }

    // ========================================================================
    // Tiling
    // ========================================================================

    #[test]
    fn test_tile_ranges_cover() {
        let ranges: Vec<_> = tile_ranges(130, 64).collect();
        assert_eq!(ranges, vec![0..64, 64..128, 128..130]);
        assert_eq!(tile_ranges(0, 64).count(), 0);
        assert_eq!(tile_ranges(64, 64).collect::<Vec<_>>(), vec![0..64]);
    }

    // ========================================================================
    // Spawning
    // ========================================================================

    #[test]
    fn test_new_spawns_block() {
        let params = SimParams {
            particles_per_axis: 10,
            ..Default::default()
        };
        let sim = Simulation::new(params).unwrap();
        assert_eq!(sim.particle_count(), 100);
        let max = sim.particles().positions().fold(Vec2::splat(f32::MIN), Vec2::max);
        let min = sim.particles().positions().fold(Vec2::splat(f32::MAX), Vec2::min);
        assert!((min.x + max.x + sim.params().spawn_spacing).abs() < 1e-5, "Block should be centred");
        assert!(sim.particles().iter().all(|p| p.velocity == Vec2::ZERO));
    }

    #[test]
    fn test_jitter_is_seeded() {
        let params = SimParams {
            particles_per_axis: 8,
            initial_velocity_jitter: 4.0,
            seed: 7,
            ..Default::default()
        };
        let a = Simulation::new(params.clone()).unwrap();
        let b = Simulation::new(params).unwrap();
        let va: Vec<Vec2> = a.particles().iter().map(|p| p.velocity).collect();
        let vb: Vec<Vec2> = b.particles().iter().map(|p| p.velocity).collect();
        assert_eq!(va, vb);
        assert!(va.iter().any(|v| *v != Vec2::ZERO));
        assert!(va.iter().all(|v| v.x.abs() <= 2.0 && v.y.abs() <= 2.0));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = SimParams {
            rest_density: -1.0,
            ..Default::default()
        };
        assert!(matches!(Simulation::new(params), Err(SimError::InvalidParams(_))));
    }

    // ========================================================================
    // Phases
    // ========================================================================

    #[test]
    fn test_gravity_free_fall() {
        let params = SimParams::default();
        let mut sim = Simulation::from_positions(params.clone(), [Vec2::ZERO]).unwrap();
        let mut queue = WorkQueue::with_workers(1).unwrap();
        sim.step(&mut queue).unwrap();

        let p = &sim.particles().list[0];
        let expected_v = params.gravity * params.dt;
        assert!((p.velocity - expected_v).length() < 1e-5, "v = {:?}", p.velocity);
        assert!((p.position - expected_v * params.dt).length() < 1e-7);
        assert_eq!(sim.frame(), 1);
        assert!((sim.time() - params.dt).abs() < 1e-9);
    }

    #[test]
    fn test_pull_accelerates_towards_point() {
        let mut sim = Simulation::from_positions(zero_gravity(), [Vec2::ZERO]).unwrap();
        let mut queue = WorkQueue::with_workers(1).unwrap();
        sim.set_pull(Vec2::new(1.0, 0.0), true);
        sim.step(&mut queue).unwrap();
        let v = sim.particles().list[0].velocity;
        assert!(v.x > 0.0, "Pull should move the particle towards the target");
        assert!(v.y.abs() < 1e-6);

        sim.set_pull(Vec2::new(1.0, 0.0), false);
        let before = sim.particles().list[0].velocity;
        sim.step(&mut queue).unwrap();
        assert!((sim.particles().list[0].velocity - before).length() < 1e-5);
    }

    #[test]
    fn test_wave_band_moves_right() {
        let mut sim = Simulation::from_positions(zero_gravity(), [Vec2::ZERO]).unwrap();
        let mut queue = WorkQueue::with_workers(1).unwrap();
        assert!(sim.wave_band().is_none());

        sim.set_wave(true);
        let start = sim.wave_band().unwrap();
        let width = sim.params().wave_width_ratio * sim.params().world_width;
        assert!((start.end - start.start - width).abs() < 1e-5);
        assert!(start.end <= -0.5 * sim.params().world_width + 1e-5);

        for _ in 0..10 {
            sim.step(&mut queue).unwrap();
        }
        let later = sim.wave_band().unwrap();
        assert!(later.start > start.start);
    }

    #[test]
    fn test_wave_pushes_particles_inside_band() {
        let params = zero_gravity();
        let world = params.world_width;
        // Particle at the left wall, where the band enters first.
        let x = -0.5 * world + params.particle_radius * 2.0;
        let mut sim = Simulation::from_positions(params, [Vec2::new(x, 0.0)]).unwrap();
        let mut queue = WorkQueue::with_workers(1).unwrap();
        sim.set_wave(true);
        for _ in 0..20 {
            sim.step(&mut queue).unwrap();
        }
        assert!(sim.particles().list[0].velocity.x > 0.0);
    }

    #[test]
    fn test_boundary_bounce_is_inelastic() {
        let params = zero_gravity();
        let wall = 0.5 * params.world_width - params.particle_radius;
        let mut sim = Simulation::from_positions(params.clone(), [Vec2::new(wall - 0.001, 0.0)]).unwrap();
        sim.particles.list[0].velocity = Vec2::new(5.0, 0.0);
        let mut queue = WorkQueue::with_workers(1).unwrap();
        sim.step(&mut queue).unwrap();

        let p = &sim.particles().list[0];
        assert_eq!(p.position.x, wall);
        assert!(p.velocity.x < 0.0, "Velocity should be reflected");
        // Velocity is reconstructed before the wall clamp, so the full 5.0 is reflected.
        let expected = -5.0 * params.elasticity;
        assert!((p.velocity.x - expected).abs() < 1e-3, "v = {}", p.velocity.x);
    }

    #[test]
    fn test_single_particle_density() {
        let mut sim = Simulation::from_positions(zero_gravity(), [Vec2::new(0.3, -0.2)]).unwrap();
        let mut queue = WorkQueue::with_workers(1).unwrap();
        sim.step(&mut queue).unwrap();

        let expected = sim.kernels().poly6(0.0) * sim.params().particle_mass;
        assert_eq!(sim.density(0), expected);
        assert!(sim.lambda(0).is_finite());
        assert_eq!(sim.particles().list[0].neighbor_count(), 1);
    }

    #[test]
    fn test_single_particle_lambda() {
        let mut sim = Simulation::from_positions(zero_gravity(), [Vec2::new(0.3, -0.2)]).unwrap();
        let mut queue = WorkQueue::with_workers(1).unwrap();
        sim.step(&mut queue).unwrap();

        // No other neighbours, so the gradient terms vanish and ε is the whole denominator.
        let p = sim.params();
        let density = sim.kernels().poly6(0.0) * p.particle_mass;
        let expected = -(density / p.rest_density - 1.0) / p.relaxation;
        assert!(
            (sim.lambda(0) - expected).abs() <= expected.abs() * 1e-5,
            "λ = {}, expected {}",
            sim.lambda(0),
            expected
        );
    }

    #[test]
    fn test_lambda_for_triangle_by_hand() {
        let h = SimParams::default().smoothing_radius();
        let kernels = Kernels::from_params(&SimParams::default());
        let constraint = ConstraintParams {
            kernels,
            mass: 1.0,
            inv_rest_density: 1.0 / 1000.0,
            relaxation: 1.0,
        };

        let positions = [Vec2::ZERO, Vec2::new(0.3 * h, 0.0), Vec2::new(0.0, 0.4 * h)];
        let mut particles: Vec<Particle> = positions.iter().map(|&p| Particle::new(p, Vec2::ZERO)).collect();
        for (i, p) in particles.iter_mut().enumerate() {
            for j in 0..positions.len() {
                p.neighbors.try_push(i, j).unwrap();
            }
        }

        let (density, lambda) = constraint.density_and_lambda(&particles, 0);

        let r1 = positions[0] - positions[1];
        let r2 = positions[0] - positions[2];
        let expected_density =
            kernels.poly6(0.0) + kernels.poly6(r1.length_squared()) + kernels.poly6(r2.length_squared());
        let g1 = kernels.spiky_gradient(r1) / 1000.0;
        let g2 = kernels.spiky_gradient(r2) / 1000.0;
        let grad_sq_sum = g1.length_squared() + g2.length_squared();
        let grad_i_sq = (g1 + g2).length_squared();
        let expected = -(expected_density / 1000.0 - 1.0) / (grad_sq_sum + grad_i_sq + 1.0);

        assert!((density - expected_density).abs() <= expected_density * 1e-5);
        assert!(
            (lambda - expected).abs() <= expected.abs() * 1e-4,
            "λ = {}, expected {}",
            lambda,
            expected
        );

        // |Σ∇W|² is a large share of the denominator here.
        let without_sum = -(expected_density / 1000.0 - 1.0) / (grad_sq_sum + 1.0);
        assert!((lambda - without_sum).abs() > expected.abs() * 0.05);
    }

    /// Simulation with the grid and neighbour lists built for the current positions.
    fn with_neighbors(params: SimParams, positions: &[Vec2]) -> Simulation {
        let mut sim = Simulation::from_positions(params, positions.iter().copied()).unwrap();
        sim.grid.rebuild(&mut sim.particles);
        neighbors::find_neighbors(&sim.grid, &mut sim.particles, sim.kernels.h()).unwrap();
        sim
    }

    #[test]
    fn test_pair_correction_by_hand() {
        let h = SimParams::default().smoothing_radius();
        let positions = [Vec2::ZERO, Vec2::new(0.4 * h, 0.1 * h)];
        let lambdas = [-2.0, -0.5];

        let correct = |tensile_k: f32| {
            let params = SimParams {
                tensile_k,
                ..zero_gravity()
            };
            let mut sim = with_neighbors(params, &positions);
            sim.lambdas = lambdas.to_vec();
            let before: Vec<Vec2> = sim.particles.positions().collect();
            sim.apply_position_correction();

            for i in 0..2 {
                let j = 1 - i;
                let r = before[i] - before[j];
                let s_corr = sim.kernels.tensile_correction(r.length_squared());
                let expected =
                    (lambdas[i] + lambdas[j] + s_corr) * sim.kernels.spiky_gradient(r) / sim.params.rest_density;
                let delta = sim.deltas[i];
                assert!(
                    (delta - expected).length() <= expected.length() * 1e-5,
                    "k = {}: Δp[{}] = {:?}, expected {:?}",
                    tensile_k,
                    i,
                    delta,
                    expected
                );
                assert_eq!(sim.particles.list[i].position, before[i] + delta);
            }
            // Same λ sum and scorr on both sides, opposite gradients.
            assert!((sim.deltas[0] + sim.deltas[1]).length() <= sim.deltas[0].length() * 1e-5);
            sim.deltas[0]
        };

        let plain = correct(0.0);
        let tensile = correct(0.5);
        assert!(
            (tensile - plain).length() > plain.length() * 0.01,
            "Tensile term should change the correction: {:?} vs {:?}",
            plain,
            tensile
        );
    }

    #[test]
    fn test_coincident_particles_stay_finite() {
        let p = Vec2::new(0.1, 0.1);
        let mut sim = Simulation::from_positions(zero_gravity(), [p, p]).unwrap();
        let mut queue = WorkQueue::with_workers(1).unwrap();
        sim.step(&mut queue).unwrap();

        let w0 = sim.kernels().poly6(0.0);
        for i in 0..2 {
            assert_eq!(sim.density(i), 2.0 * w0, "Zero separation still counts towards density");
            assert!(sim.lambda(i).is_finite());
            assert!(sim.particles().list[i].position.is_finite());
        }
    }

    #[test]
    fn test_neighbor_overflow_surfaces() {
        let params = SimParams {
            max_neighbors: 2,
            gravity: Vec2::ZERO,
            ..Default::default()
        };
        let positions = [Vec2::ZERO, Vec2::new(0.01, 0.0), Vec2::new(0.0, 0.01)];
        let mut sim = Simulation::from_positions(params, positions).unwrap();
        let mut queue = WorkQueue::with_workers(1).unwrap();
        let err = sim.step(&mut queue).unwrap_err();
        assert!(matches!(err, SimError::NeighborOverflow { capacity: 2, .. }));
    }

    #[test]
    fn test_compressed_pair_pushes_apart() {
        let h = SimParams::default().smoothing_radius();
        let a = Vec2::new(-0.05 * h, 0.0);
        let b = Vec2::new(0.05 * h, 0.0);
        let params = SimParams {
            // Dense enough that the pair is over rest density.
            rest_density: 100.0,
            ..zero_gravity()
        };
        let mut sim = Simulation::from_positions(params, [a, b]).unwrap();
        let mut queue = WorkQueue::with_workers(1).unwrap();
        sim.step(&mut queue).unwrap();

        assert!(sim.lambda(0) < 0.0, "Over-dense particles get negative λ");
        let list = &sim.particles().list;
        let gap = (list[0].position - list[1].position).length();
        assert!(gap > 0.1 * h, "Pair should separate, gap = {}", gap);
    }
}
