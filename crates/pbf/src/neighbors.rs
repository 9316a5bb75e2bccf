//! Fixed-radius neighbour search over the cell-sorted particle array.

use crate::error::SimError;
use crate::grid::HashGrid;
use crate::particle::Particles;

/// Fills every particle's neighbour list with the indices of particles
/// closer than `radius`, the particle itself included.
///
/// `grid` must have been rebuilt from `particles` and nothing may have moved
/// since. Runs serially. Stops at the first particle whose list overflows.
pub fn find_neighbors(grid: &HashGrid, particles: &mut Particles, radius: f32) -> Result<(), SimError> {
    let r2 = radius * radius;
    let list = &mut particles.list;

    for i in 0..list.len() {
        let position = list[i].position;
        let (cx, cy) = grid.cell_coords_of(position);

        // Take the list out so the scan can borrow the array immutably.
        let mut neighbors = std::mem::take(&mut list[i].neighbors);
        neighbors.clear();

        let mut result = Ok(());
        'cells: for (x, y) in HashGrid::neighborhood(cx, cy) {
            if !grid.is_within_bounds(x, y) {
                continue;
            }
            let cell = grid.cell_index(x as usize, y as usize);
            for j in grid.cell_run(cell, list) {
                if (list[j].position - position).length_squared() < r2 {
                    if let Err(err) = neighbors.try_push(i, j) {
                        result = Err(err);
                        break 'cells;
                    }
                }
            }
        }

        list[i].neighbors = neighbors;
        result?;
    }

    Ok(())
}
