//! Physics and scheduling constants for the PBF simulation.
//!
//! These are the compile-time defaults. `SimParams::default()` copies them
//! verbatim, so anything that needs to vary at runtime goes through
//! [`SimParams`](crate::SimParams) instead of redefining a constant.

use glam::Vec2;

/// Upper bound on threads touching the work queue, producer included.
pub const MAX_THREAD_COUNT: usize = 64;

/// Particle radius in world units.
///
/// Used by:
/// - Boundary collision (particles are kept `radius` away from the walls)
/// - Smoothing radius (`H = PARTICLE_RADIUS * H_SCALE`)
/// - Field sampling (metaball radius)
pub const PARTICLE_RADIUS: f32 = 0.0125;

/// Smoothing radius as a multiple of the particle radius.
pub const H_SCALE: f32 = 16.0;

/// Kernel support radius. Also the spatial grid cell size.
pub const H: f32 = PARTICLE_RADIUS * H_SCALE;

pub const PARTICLE_MASS: f32 = 1.0;

/// Particles along each side of the initial block (N² particles total).
pub const PARTICLES_PER_AXIS: usize = 90;

/// Distance between neighbouring particles in the initial block.
pub const SPAWN_SPACING: f32 = PARTICLE_RADIUS * 4.0;

/// Fixed simulation time step in seconds.
pub const DT: f32 = 0.008;

pub const WORLD_WIDTH: f32 = 10.0;
pub const WORLD_HEIGHT: f32 = 10.0;

pub const GRAVITY: Vec2 = Vec2::new(0.0, -9.81);

/// Target density of the constraint `ρ/ρ0 - 1 = 0`.
pub const REST_DENSITY: f32 = 1000.0;

/// Constraint force mixing term added to the λ denominator.
///
/// Keeps λ finite for isolated particles. Larger values soften the fluid.
pub const RELAXATION: f32 = 300.0;

/// Capacity of a particle's neighbour list. Exceeding it is fatal.
pub const MAX_NEIGHBORS: usize = 128;

/// Particles per work item in the parallel density/λ pass.
pub const TILE_SIZE: usize = 64;

/// Fraction of the wall-normal velocity kept after a boundary hit.
pub const ELASTICITY: f32 = 0.1;

/// Spring gain applied towards the pull point while pulling is active.
pub const PULL_GAIN: f32 = 10.0;

/// Wave band width as a fraction of the world width.
pub const WAVE_WIDTH_RATIO: f32 = 0.125;

/// Horizontal speed of the wave band in world units per second.
pub const WAVE_SPEED: f32 = 2.5;

/// Horizontal acceleration applied to particles inside the wave band.
pub const WAVE_ACCEL: f32 = 20.0;

/// Tensile instability correction strength (`k` in `-k (W(r)/W(Δq))^n`).
pub const TENSILE_K: f32 = 1.0e-4;

/// Reference distance `Δq` for the tensile correction, as a fraction of H.
pub const TENSILE_DQ_RATIO: f32 = 0.3;

/// Exponent `n` of the tensile correction.
pub const TENSILE_EXPONENT: i32 = 4;

/// Lattice rows per work item when sampling the scalar field.
pub const FIELD_TILE_ROWS: usize = 32;
