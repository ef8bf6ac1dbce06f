use anyhow::Result;
use immuno_common::Vec2;

/// Upper bound on the number of cells a grid may allocate.
pub const MAX_GRID_CELLS: usize = 1 << 22;

/// Uniform binning of particle positions used to enumerate close pairs
/// without scanning every pair.
///
/// Built with a counting sort: count particles per cell, prefix-sum the counts
/// into start offsets, then scatter particle indices into `cell_particle_indices`.
#[derive(Debug)]
pub struct SpatialGrid {
    cell_size: f32,
    inv_cell_size: f32,
    dim_x: u32,
    dim_y: u32,
    /// Grid cell index for each particle
    particle_cells: Vec<u32>,
    /// Number of particles in each grid cell
    cell_counts: Vec<u32>,
    /// Start index in cell_particle_indices for each grid cell (prefix sum)
    cell_starts: Vec<u32>,
    /// Particle indices sorted by grid cell
    cell_particle_indices: Vec<u32>,
}

impl SpatialGrid {
    /// Fails for non-finite extents or when the cell count would exceed
    /// [`MAX_GRID_CELLS`].
    pub fn new(width: f32, height: f32, cell_size: f32) -> Result<Self> {
        if !(width.is_finite() && height.is_finite() && cell_size.is_finite()) {
            anyhow::bail!(
                "grid extent must be finite (got {}x{}, cell size {}).",
                width,
                height,
                cell_size
            );
        }
        let cell_size = cell_size.max(1e-3);
        let inv_cell_size = 1.0 / cell_size;
        let dim_x = ((width * inv_cell_size).ceil() as u32).max(1);
        let dim_y = ((height * inv_cell_size).ceil() as u32).max(1);
        let num_cells = (dim_x as usize)
            .checked_mul(dim_y as usize)
            .filter(|&n| n <= MAX_GRID_CELLS)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "grid of {}x{} cells exceeds the limit of {} cells.",
                    dim_x,
                    dim_y,
                    MAX_GRID_CELLS
                )
            })?;
        Ok(SpatialGrid {
            cell_size,
            inv_cell_size,
            dim_x,
            dim_y,
            particle_cells: Vec::new(),
            cell_counts: vec![0; num_cells],
            cell_starts: vec![0; num_cells],
            cell_particle_indices: Vec::new(),
        })
    }

    /// Cell coordinates of a position, clamped into the grid. Positions slightly
    /// outside the arena land in the border cells.
    #[inline(always)]
    fn cell_coords(&self, pos: Vec2) -> (u32, u32) {
        // Negative values saturate to 0 in the float-to-int cast.
        let gx = ((pos.x * self.inv_cell_size).floor() as u32).min(self.dim_x - 1);
        let gy = ((pos.y * self.inv_cell_size).floor() as u32).min(self.dim_y - 1);
        (gx, gy)
    }

    /// Rebuilds the binning for the given positions.
    pub fn rebuild(&mut self, positions: &[Vec2]) {
        let n = positions.len();

        // Phase 1: assign cells.
        let cells: Vec<u32> = positions
            .iter()
            .map(|&pos| {
                let (gx, gy) = self.cell_coords(pos);
                gy * self.dim_x + gx
            })
            .collect();
        self.particle_cells = cells;

        // Phase 2: count.
        self.cell_counts.iter_mut().for_each(|c| *c = 0);
        for &cell in &self.particle_cells {
            self.cell_counts[cell as usize] += 1;
        }

        // Phase 3: prefix sum.
        let mut total = 0;
        for (start, &count) in self.cell_starts.iter_mut().zip(self.cell_counts.iter()) {
            *start = total;
            total += count;
        }
        debug_assert_eq!(total as usize, n);

        // Phase 4: scatter, preserving particle order inside each cell.
        self.cell_particle_indices.clear();
        self.cell_particle_indices.resize(n, 0);
        let mut write_offsets = self.cell_starts.clone();
        for (particle_idx, &cell) in self.particle_cells.iter().enumerate() {
            let slot = &mut write_offsets[cell as usize];
            self.cell_particle_indices[*slot as usize] = particle_idx as u32;
            *slot += 1;
        }
    }

    /// Calls `f(i, j)` once for every unordered pair `i < j` whose distance is
    /// below `radius`. `radius` must not exceed the cell size.
    pub fn for_each_pair_within<F>(&self, positions: &[Vec2], radius: f32, mut f: F)
    where
        F: FnMut(usize, usize),
    {
        debug_assert!(radius <= self.cell_size + 1e-4);
        let radius_sq = radius * radius;

        for (i, &pos) in positions.iter().enumerate() {
            let (cx, cy) = self.cell_coords(pos);
            let x_range = cx.saturating_sub(1)..=(cx + 1).min(self.dim_x - 1);
            for gy in cy.saturating_sub(1)..=(cy + 1).min(self.dim_y - 1) {
                for gx in x_range.clone() {
                    let cell = (gy * self.dim_x + gx) as usize;
                    let start = self.cell_starts[cell] as usize;
                    let end = start + self.cell_counts[cell] as usize;
                    for &j in &self.cell_particle_indices[start..end] {
                        let j = j as usize;
                        if j <= i {
                            continue;
                        }
                        if pos.distance_squared(positions[j]) < radius_sq {
                            f(i, j);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    fn brute_force_pairs(positions: &[Vec2], radius: f32) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for i in 0..positions.len() {
            for j in (i + 1)..positions.len() {
                if positions[i].distance_squared(positions[j]) < radius * radius {
                    pairs.push((i, j));
                }
            }
        }
        pairs
    }

    #[test]
    fn pairs_match_quadratic_scan() {
        let mut rng = StdRng::seed_from_u64(99);
        // Include a few points just outside the arena to exercise clamping.
        let positions: Vec<Vec2> = (0..300)
            .map(|_| Vec2::new(rng.random_range(-20.0..420.0), rng.random_range(-20.0..320.0)))
            .collect();
        let radius = 32.4;
        let mut grid = SpatialGrid::new(400.0, 300.0, radius).unwrap();
        grid.rebuild(&positions);

        let mut found = Vec::new();
        grid.for_each_pair_within(&positions, radius, |i, j| found.push((i, j)));
        found.sort_unstable();

        assert_eq!(found, brute_force_pairs(&positions, radius));
    }

    #[test]
    fn rebuild_handles_shrinking_population() {
        let mut grid = SpatialGrid::new(100.0, 100.0, 10.0).unwrap();
        grid.rebuild(&[Vec2::new(5.0, 5.0), Vec2::new(7.0, 5.0), Vec2::new(90.0, 90.0)]);
        grid.rebuild(&[Vec2::new(5.0, 5.0), Vec2::new(7.0, 5.0)]);
        let mut count = 0;
        grid.for_each_pair_within(&[Vec2::new(5.0, 5.0), Vec2::new(7.0, 5.0)], 10.0, |_, _| {
            count += 1
        });
        assert_eq!(count, 1);
    }

    #[test]
    fn oversized_or_non_finite_extent_is_an_error() {
        assert!(SpatialGrid::new(5e6, 5e6, 32.4).is_err());
        assert!(SpatialGrid::new(f32::MAX, f32::MAX, 1.0).is_err());
        assert!(SpatialGrid::new(f32::NAN, 600.0, 32.4).is_err());
        assert!(SpatialGrid::new(1000.0, f32::INFINITY, 32.4).is_err());
        assert!(SpatialGrid::new(1000.0, 600.0, 32.4).is_ok());
    }
}
