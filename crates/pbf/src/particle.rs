//! Fluid particles for the PBF solver
//!
//! Density and λ live next to the particle array in the simulation
//! (structure of arrays), so the parallel pass can hand out disjoint
//! mutable slices while every worker reads the particles themselves.

use glam::Vec2;

use crate::error::SimError;
use crate::physics::MAX_NEIGHBORS;

/// Bounded list of neighbour indices into the cell-sorted particle array.
///
/// Pushing past the capacity fails with [`SimError::NeighborOverflow`]
/// instead of truncating.
#[derive(Clone, Debug, PartialEq)]
pub struct NeighborList {
    indices: Vec<u32>,
    capacity: usize,
}

impl Default for NeighborList {
    fn default() -> Self {
        Self::with_capacity(MAX_NEIGHBORS)
    }
}

impl NeighborList {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { indices: Vec::new(), capacity }
    }

    /// Appends `index`, or reports overflow for `owner` if the list is full.
    #[inline]
    pub fn try_push(&mut self, owner: usize, index: usize) -> Result<(), SimError> {
        if self.indices.len() >= self.capacity {
            return Err(SimError::NeighborOverflow {
                particle: owner,
                capacity: self.capacity,
            });
        }
        if self.indices.capacity() == 0 {
            self.indices.reserve_exact(self.capacity);
        }
        self.indices.push(index as u32);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.indices.clear();
    }

    #[inline]
    pub fn as_slice(&self) -> &[u32] {
        &self.indices
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().map(|&i| i as usize)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&(index as u32))
    }
}

/// A single fluid particle.
#[derive(Clone, Debug, Default)]
pub struct Particle {
    /// Position at the start of the current step.
    pub prev_position: Vec2,
    pub position: Vec2,
    pub velocity: Vec2,
    /// Linear grid cell, valid after the last grid rebuild.
    pub cell: u32,
    /// Neighbours found in the last step (includes the particle itself).
    pub neighbors: NeighborList,
}

impl Particle {
    pub fn new(position: Vec2, velocity: Vec2) -> Self {
        Self {
            prev_position: position,
            position,
            velocity,
            cell: 0,
            neighbors: NeighborList::default(),
        }
    }

    pub fn neighbor_count(&self) -> usize {
        self.neighbors.len()
    }
}

/// Collection of particles, kept sorted by cell after each grid rebuild.
#[derive(Clone, Debug, Default)]
pub struct Particles {
    pub list: Vec<Particle>,
}

impl Particles {
    pub fn new() -> Self {
        Self { list: Vec::new() }
    }

    pub fn spawn(&mut self, position: Vec2, velocity: Vec2) {
        self.list.push(Particle::new(position, velocity));
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.list.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Particle> {
        self.list.iter_mut()
    }

    pub fn positions(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.list.iter().map(|p| p.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighbor_list_overflow() {
        let mut list = NeighborList::with_capacity(3);
        for i in 0..3 {
            list.try_push(7, i).unwrap();
        }
        assert_eq!(list.len(), 3);

        let err = list.try_push(7, 3).unwrap_err();
        assert_eq!(err, SimError::NeighborOverflow { particle: 7, capacity: 3 });
        assert_eq!(list.len(), 3, "Failed push must not modify the list");
    }

    #[test]
    fn test_neighbor_list_clear_keeps_capacity() {
        let mut list = NeighborList::with_capacity(2);
        list.try_push(0, 5).unwrap();
        list.try_push(0, 9).unwrap();
        assert!(list.contains(9));
        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.capacity(), 2);
        list.try_push(0, 1).unwrap();
        assert_eq!(list.as_slice(), &[1]);
    }

    #[test]
    fn test_particle_new_sets_previous_position() {
        let p = Particle::new(Vec2::new(1.0, 2.0), Vec2::new(0.5, 0.0));
        assert_eq!(p.prev_position, p.position);
        assert_eq!(p.neighbor_count(), 0);
        assert_eq!(p.neighbors.capacity(), MAX_NEIGHBORS);
    }

    #[test]
    fn test_particles_spawn() {
        let mut particles = Particles::new();
        particles.spawn(Vec2::ZERO, Vec2::ZERO);
        particles.spawn(Vec2::ONE, Vec2::ZERO);
        assert_eq!(particles.len(), 2);
        assert_eq!(particles.positions().collect::<Vec<_>>(), vec![Vec2::ZERO, Vec2::ONE]);
    }
}
