//! Spatial indexing for efficient neighbor search.
//!
//! A uniform grid of cubic cells keyed by integer coordinates. With the
//! cell size set to the cutoff radius, all neighbors of a point within the
//! cutoff lie in its own cell or one of the 26 adjacent cells, so a range
//! query inspects a constant number of cells instead of every atom.

use std::collections::HashMap;

/// Grid-based spatial index for 3D point queries.
#[derive(Debug)]
pub struct SpatialGrid {
    /// Inverse cell size for fast coordinate-to-cell conversion.
    inv_cell_size: f64,
    /// Map from cell coordinates to atom indices.
    cells: HashMap<(i32, i32, i32), Vec<usize>>,
}

impl SpatialGrid {
    /// Builds a grid over `positions` with the given cell size (typically
    /// the upper cutoff radius).
    ///
    /// # Panics
    ///
    /// Panics if `cell_size <= 0.0`.
    pub fn from_positions(positions: &[[f64; 3]], cell_size: f64) -> Self {
        assert!(cell_size > 0.0, "cell size must be positive");
        let mut grid = Self {
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::new(),
        };
        for (idx, pos) in positions.iter().enumerate() {
            let cell = grid.cell_coords(*pos);
            grid.cells.entry(cell).or_default().push(idx);
        }
        grid
    }

    fn cell_coords(&self, pos: [f64; 3]) -> (i32, i32, i32) {
        (
            (pos[0] * self.inv_cell_size).floor() as i32,
            (pos[1] * self.inv_cell_size).floor() as i32,
            (pos[2] * self.inv_cell_size).floor() as i32,
        )
    }

    /// Finds all atoms within `cutoff` of `query`, with their distances.
    ///
    /// Results are unordered; the query point itself is included when it is
    /// one of the indexed positions (callers filter self-pairs).
    pub fn within_radius(
        &self,
        query: [f64; 3],
        positions: &[[f64; 3]],
        cutoff: f64,
    ) -> Vec<(usize, f64)> {
        let cutoff_sq = cutoff * cutoff;
        let (cx, cy, cz) = self.cell_coords(query);

        let mut hits = Vec::new();
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(indices) = self.cells.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    for &idx in indices {
                        let pos = positions[idx];
                        let dist_sq = (pos[0] - query[0]).powi(2)
                            + (pos[1] - query[1]).powi(2)
                            + (pos[2] - query[2]).powi(2);
                        if dist_sq <= cutoff_sq {
                            hits.push((idx, dist_sq.sqrt()));
                        }
                    }
                }
            }
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indices(mut hits: Vec<(usize, f64)>) -> Vec<usize> {
        hits.sort_by_key(|&(idx, _)| idx);
        hits.into_iter().map(|(idx, _)| idx).collect()
    }

    #[test]
    fn empty_grid_returns_nothing() {
        let positions: Vec<[f64; 3]> = vec![];
        let grid = SpatialGrid::from_positions(&positions, 2.0);
        assert!(grid.within_radius([0.0, 0.0, 0.0], &positions, 2.0).is_empty());
    }

    #[test]
    fn finds_atom_in_range_with_distance() {
        let positions = vec![[1.0, 0.0, 0.0]];
        let grid = SpatialGrid::from_positions(&positions, 2.0);

        let hits = grid.within_radius([0.0, 0.0, 0.0], &positions, 2.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, 0);
        assert!((hits[0].1 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn excludes_atom_out_of_range() {
        let positions = vec![[3.0, 0.0, 0.0]];
        let grid = SpatialGrid::from_positions(&positions, 2.0);
        assert!(grid.within_radius([0.0, 0.0, 0.0], &positions, 2.0).is_empty());
    }

    #[test]
    fn mixed_atoms_filtered_by_radius() {
        let positions = vec![
            [1.0, 0.0, 0.0],
            [0.0, 1.5, 0.0],
            [5.0, 0.0, 0.0],
            [0.0, 0.0, 1.9],
            [0.0, 0.0, 2.1],
        ];
        let grid = SpatialGrid::from_positions(&positions, 2.0);

        let hits = grid.within_radius([0.0, 0.0, 0.0], &positions, 2.0);
        assert_eq!(indices(hits), vec![0, 1, 3]);
    }

    #[test]
    fn cell_boundary_handling() {
        let positions = vec![[1.99, 0.0, 0.0], [2.01, 0.0, 0.0]];
        let grid = SpatialGrid::from_positions(&positions, 2.0);

        let hits = grid.within_radius([0.0, 0.0, 0.0], &positions, 2.0);
        assert_eq!(indices(hits), vec![0]);

        let hits = grid.within_radius([4.0, 0.0, 0.0], &positions, 2.0);
        assert_eq!(indices(hits), vec![1]);
    }

    #[test]
    fn negative_coordinates_are_indexed() {
        let positions = vec![[-1.0, -1.0, -1.0], [-5.0, 0.0, 0.0]];
        let grid = SpatialGrid::from_positions(&positions, 2.0);

        let hits = grid.within_radius([-1.5, -1.5, -1.5], &positions, 2.0);
        assert_eq!(indices(hits), vec![0]);
    }
}
