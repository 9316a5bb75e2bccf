//! 2D Position Based Fluids
//!
//! A real-time PBF particle simulation: a uniform hash grid for neighbour
//! queries, a single-iteration density constraint solver with tensile
//! correction, and a persistent worker pool that runs the density/λ pass in
//! parallel over fixed particle tiles.
//!
//! # Example
//!
//! ```
//! use pbf::{SimParams, Simulation, WorkQueue};
//! use glam::Vec2;
//!
//! let mut queue = WorkQueue::new().unwrap();
//! let params = SimParams {
//!     particles_per_axis: 16,
//!     ..Default::default()
//! };
//! let mut sim = Simulation::new(params).unwrap();
//!
//! // Drag the fluid towards the upper right corner
//! sim.set_pull(Vec2::new(2.0, 2.0), true);
//! for _ in 0..10 {
//!     sim.step(&mut queue).unwrap();
//! }
//! assert_eq!(sim.particle_count(), 256);
//! ```

pub mod error;
pub mod field;
pub mod grid;
pub mod kernels;
pub mod neighbors;
pub mod params;
pub mod particle;
pub mod physics;
pub mod render;
pub mod serde_utils;
pub mod simulation;
pub mod stats;
pub mod work_queue;

pub use error::SimError;
pub use field::ScalarField;
pub use glam::Vec2;
pub use grid::HashGrid;
pub use kernels::Kernels;
pub use params::SimParams;
pub use particle::{NeighborList, Particle, Particles};
pub use render::ParticleVertex;
pub use simulation::{tile_ranges, Simulation};
pub use stats::{FrameTimer, SimStats};
pub use work_queue::{Batch, Job, WorkQueue};
