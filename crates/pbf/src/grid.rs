//! Uniform spatial hash grid over the simulation box.
//!
//! Cells are `H` wide, so every particle within the kernel support of a
//! point lies in the 3x3 block of cells around it. The particle array is
//! kept sorted by cell; `cell_start` maps each cell to the first particle of
//! its run, or [`EMPTY`].

use std::ops::Range;

use glam::Vec2;

use crate::params::SimParams;
use crate::particle::{Particle, Particles};

/// Sentinel in the cell-start table for cells with no particles.
pub const EMPTY: u32 = u32::MAX;

#[derive(Clone, Debug)]
pub struct HashGrid {
    origin: Vec2,
    cell_size: f32,
    width: usize,
    height: usize,
    cell_count: usize,
    cell_start: Vec<u32>,
    counts: Vec<u32>,
    // Counting sort buffers, reused every frame.
    cursor: Vec<u32>,
    scratch: Vec<Particle>,
}

impl HashGrid {
    /// Grid covering `[origin, origin + extent]` with square cells.
    pub fn new(origin: Vec2, extent: Vec2, cell_size: f32) -> Self {
        let width = (extent.x / cell_size).ceil().max(1.0) as usize;
        let height = (extent.y / cell_size).ceil().max(1.0) as usize;
        let cell_count = width * height;
        log::debug!(
            "Hash grid {}x{} ({} cells, cell size {})",
            width,
            height,
            cell_count,
            cell_size
        );

        Self {
            origin,
            cell_size,
            width,
            height,
            cell_count,
            cell_start: vec![EMPTY; cell_count],
            counts: vec![0; cell_count],
            cursor: vec![0; cell_count],
            scratch: Vec::new(),
        }
    }

    /// Grid over the world box centred on the origin, with cell size H.
    pub fn from_params(params: &SimParams) -> Self {
        let extent = Vec2::new(params.world_width, params.world_height);
        Self::new(-0.5 * extent, extent, params.smoothing_radius())
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cell_count(&self) -> usize {
        self.cell_count
    }

    /// Cell coordinates containing `position`, clamped to the grid.
    #[inline]
    pub fn cell_coords_of(&self, position: Vec2) -> (usize, usize) {
        let rel = (position - self.origin) / self.cell_size;
        // `as` saturates and maps NaN to 0, so the clamp covers every input.
        let x = (rel.x.floor() as i64).clamp(0, self.width as i64 - 1) as usize;
        let y = (rel.y.floor() as i64).clamp(0, self.height as i64 - 1) as usize;
        (x, y)
    }

    /// Linear index of the cell containing `position`. Never fails: positions
    /// outside the world map to the nearest boundary cell.
    #[inline]
    pub fn cell_index_of(&self, position: Vec2) -> usize {
        let (x, y) = self.cell_coords_of(position);
        self.cell_index(x, y)
    }

    #[inline]
    pub fn cell_index(&self, x: usize, y: usize) -> usize {
        x + y * self.width
    }

    #[inline]
    pub fn is_within_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && (x as usize) < self.width && y >= 0 && (y as usize) < self.height
    }

    /// The 3x3 block of cell coordinates centred on `(cx, cy)`.
    ///
    /// Coordinates are not bounds checked; callers filter with
    /// [`is_within_bounds`](Self::is_within_bounds).
    pub fn neighborhood(cx: usize, cy: usize) -> impl Iterator<Item = (i32, i32)> {
        let (cx, cy) = (cx as i32, cy as i32);
        (-1..=1).flat_map(move |dy| (-1..=1).map(move |dx| (cx + dx, cy + dy)))
    }

    /// Reassigns every particle to its cell, sorts the array by cell and
    /// rebuilds the cell-start table.
    ///
    /// Counting sort over the cells. Stable, so particles inside a cell keep
    /// their relative order.
    pub fn rebuild(&mut self, particles: &mut Particles) {
        let n = particles.len();
        self.counts.fill(0);

        for i in 0..n {
            let cell = self.cell_index_of(particles.list[i].position);
            particles.list[i].cell = cell as u32;
            self.counts[cell] += 1;
        }

        let mut offset = 0u32;
        for cell in 0..self.cell_count {
            let count = self.counts[cell];
            self.cursor[cell] = offset;
            self.cell_start[cell] = if count > 0 { offset } else { EMPTY };
            offset += count;
        }

        self.scratch.resize_with(n, Particle::default);
        for i in 0..n {
            let cell = particles.list[i].cell as usize;
            let dest = self.cursor[cell] as usize;
            self.cursor[cell] += 1;
            self.scratch[dest] = std::mem::take(&mut particles.list[i]);
        }
        std::mem::swap(&mut particles.list, &mut self.scratch);
    }

    /// First particle of `cell` in the sorted array, if any.
    #[inline]
    pub fn cell_start(&self, cell: usize) -> Option<usize> {
        match self.cell_start[cell] {
            EMPTY => None,
            start => Some(start as usize),
        }
    }

    /// Range of the sorted particle array belonging to `cell`.
    ///
    /// Walks from the cell start until the cell index changes.
    #[inline]
    pub fn cell_run(&self, cell: usize, particles: &[Particle]) -> Range<usize> {
        let Some(start) = self.cell_start(cell) else {
            return 0..0;
        };
        let mut end = start;
        while end < particles.len() && particles[end].cell as usize == cell {
            end += 1;
        }
        start..end
    }

    /// Particles per cell from the last rebuild.
    pub fn cell_counts(&self) -> &[u32] {
        &self.counts
    }
}
