//! Plain-data exports for an external renderer.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::simulation::Simulation;

/// GPU-ready particle vertex.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ParticleVertex {
    pub position: [f32; 2],
    pub velocity: [f32; 2],
}

impl Simulation {
    /// Current particles as vertices, in particle order.
    pub fn vertices(&self) -> Vec<ParticleVertex> {
        self.particles()
            .iter()
            .map(|p| ParticleVertex {
                position: p.position.to_array(),
                velocity: p.velocity.to_array(),
            })
            .collect()
    }
}

/// Raw bytes for a vertex buffer upload.
pub fn as_bytes(vertices: &[ParticleVertex]) -> &[u8] {
    bytemuck::cast_slice(vertices)
}

/// Maps a window-space point (origin top-left, y down) to world coordinates
/// for a world box centred on the origin.
pub fn screen_to_world(screen: Vec2, screen_size: Vec2, world_size: Vec2) -> Vec2 {
    (screen / screen_size - 0.5) * Vec2::new(world_size.x, -world_size.y)
}
