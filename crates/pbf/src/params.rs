//! Runtime simulation parameters.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::physics;

/// Simulation parameters.
///
/// Defaults mirror [`crate::physics`]. Missing fields in a JSON file fall
/// back to those defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Particle radius (world units).
    pub particle_radius: f32,
    /// Smoothing radius as a multiple of the particle radius.
    pub h_scale: f32,
    pub particle_mass: f32,
    /// Side of the initial particle block (N² particles).
    pub particles_per_axis: usize,
    /// Lattice spacing of the initial block.
    pub spawn_spacing: f32,
    /// Fixed time step (s).
    pub dt: f32,
    pub world_width: f32,
    pub world_height: f32,
    /// Gravity (world units/s^2).
    #[serde(with = "crate::serde_utils::vec2")]
    pub gravity: Vec2,
    pub rest_density: f32,
    /// λ denominator relaxation (ε).
    pub relaxation: f32,
    pub max_neighbors: usize,
    /// Particles per work item in the density/λ pass.
    pub tile_size: usize,
    /// Velocity kept after a wall hit (0-1).
    pub elasticity: f32,
    pub pull_gain: f32,
    pub wave_width_ratio: f32,
    pub wave_speed: f32,
    pub wave_accel: f32,
    pub tensile_k: f32,
    pub tensile_dq_ratio: f32,
    pub tensile_exponent: i32,
    /// Amplitude of the random initial velocity (0 spawns at rest).
    pub initial_velocity_jitter: f32,
    /// Seed for the initial velocity jitter.
    pub seed: u64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            particle_radius: physics::PARTICLE_RADIUS,
            h_scale: physics::H_SCALE,
            particle_mass: physics::PARTICLE_MASS,
            particles_per_axis: physics::PARTICLES_PER_AXIS,
            spawn_spacing: physics::SPAWN_SPACING,
            dt: physics::DT,
            world_width: physics::WORLD_WIDTH,
            world_height: physics::WORLD_HEIGHT,
            gravity: physics::GRAVITY,
            rest_density: physics::REST_DENSITY,
            relaxation: physics::RELAXATION,
            max_neighbors: physics::MAX_NEIGHBORS,
            tile_size: physics::TILE_SIZE,
            elasticity: physics::ELASTICITY,
            pull_gain: physics::PULL_GAIN,
            wave_width_ratio: physics::WAVE_WIDTH_RATIO,
            wave_speed: physics::WAVE_SPEED,
            wave_accel: physics::WAVE_ACCEL,
            tensile_k: physics::TENSILE_K,
            tensile_dq_ratio: physics::TENSILE_DQ_RATIO,
            tensile_exponent: physics::TENSILE_EXPONENT,
            initial_velocity_jitter: 0.0,
            seed: 0,
        }
    }
}

impl SimParams {
    /// Kernel support radius H. Also the grid cell size.
    pub fn smoothing_radius(&self) -> f32 {
        self.particle_radius * self.h_scale
    }

    /// Number of particles spawned by [`Simulation::new`](crate::Simulation::new).
    pub fn particle_count(&self) -> usize {
        self.particles_per_axis * self.particles_per_axis
    }

    pub fn validate(&self) -> Result<(), SimError> {
        let positive = [
            ("particle_radius", self.particle_radius),
            ("h_scale", self.h_scale),
            ("particle_mass", self.particle_mass),
            ("dt", self.dt),
            ("world_width", self.world_width),
            ("world_height", self.world_height),
            ("rest_density", self.rest_density),
            ("relaxation", self.relaxation),
            ("tensile_dq_ratio", self.tensile_dq_ratio),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(SimError::InvalidParams(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        if self.max_neighbors == 0 {
            return Err(SimError::InvalidParams("max_neighbors must be non-zero".into()));
        }
        if self.particles_per_axis == 0 {
            return Err(SimError::InvalidParams("particles_per_axis must be non-zero".into()));
        }
        if self.tile_size == 0 {
            return Err(SimError::InvalidParams("tile_size must be non-zero".into()));
        }
        if self.tensile_dq_ratio >= 1.0 {
            return Err(SimError::InvalidParams(format!(
                "tensile_dq_ratio must be below 1, got {}",
                self.tensile_dq_ratio
            )));
        }
        if 2.0 * self.particle_radius >= self.world_width.min(self.world_height) {
            return Err(SimError::InvalidParams(
                "particles do not fit inside the world".into(),
            ));
        }
        if !self.gravity.is_finite() {
            return Err(SimError::InvalidParams("gravity must be finite".into()));
        }
        Ok(())
    }

    pub fn save_json(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let params: Self = serde_json::from_str(&content)?;
        params.validate()?;
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let params = SimParams::default();
        assert_eq!(params.smoothing_radius(), physics::H);
        assert_eq!(params.particle_count(), 8100);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let params: SimParams =
            serde_json::from_str(r#"{ "gravity": [0.0, 0.0], "particles_per_axis": 4 }"#)
                .unwrap();
        assert_eq!(params.gravity, Vec2::ZERO);
        assert_eq!(params.particles_per_axis, 4);
        assert_eq!(params.dt, physics::DT, "Unspecified fields should keep defaults");
    }

    #[test]
    fn test_json_file_round_trip() {
        let path = std::env::temp_dir().join(format!("pbf_params_{}.json", std::process::id()));
        let params = SimParams {
            tile_size: 17,
            seed: 42,
            ..Default::default()
        };
        params.save_json(&path).unwrap();
        let loaded = SimParams::load_json(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, params);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero_dt = SimParams { dt: 0.0, ..Default::default() };
        assert!(matches!(zero_dt.validate(), Err(SimError::InvalidParams(_))));

        let zero_tile = SimParams { tile_size: 0, ..Default::default() };
        assert!(zero_tile.validate().is_err());

        let nan_relax = SimParams { relaxation: f32::NAN, ..Default::default() };
        assert!(nan_relax.validate().is_err());
    }
}
