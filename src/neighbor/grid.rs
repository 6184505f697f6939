use crate::{
    simbox::SimBox,
    utils::{indices, Axis},
};

/// Uniform cell grid over the whole box, used to bucket atoms so that pair
/// search only visits adjacent cells.
///
/// Cells are at least as large as the requested reach along every axis, so
/// any pair within reach lies in the same or an adjacent cell (with cell
/// adjacency wrapping on periodic axes).
#[derive(Clone, Debug)]
pub struct CellGrid {
    cell_size: [f64; 3],
    dims: [usize; 3],
    periodic: [bool; 3],
}
impl CellGrid {
    pub fn new(simbox: &SimBox, reach: f64) -> Self {
        assert!(reach > 0.0, "Cell reach should be positive, found {}", reach);
        let mut dims = [0usize; 3];
        let mut cell_size = [0.0; 3];
        for axis in Axis::ALL {
            let i = axis.index();
            let edge = simbox.edge(axis);
            dims[i] = ((edge / reach).floor() as usize).max(1);
            cell_size[i] = edge / dims[i] as f64;
        }
        Self {
            cell_size,
            dims,
            periodic: simbox.periodic_flags(),
        }
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }
    pub fn num_cells(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    /// The cell holding a canonical position. Coordinates on the closing
    /// box edge are clamped into the last cell.
    pub fn cell_of(&self, pos: &[f64; 3]) -> usize {
        let mut idx = [0usize; 3];
        for i in 0..3 {
            let c = (pos[i] / self.cell_size[i]).floor();
            idx[i] = (c.max(0.0) as usize).min(self.dims[i] - 1);
        }
        indices::linear_index(idx, self.dims)
    }

    /// Distinct cells adjacent to `cell` (including itself), wrapping on
    /// periodic axes and clipping at non-periodic walls. Sorted and
    /// deduplicated so small grids never yield a cell twice.
    pub fn adjacent_cells(&self, cell: usize) -> Vec<usize> {
        let idx = indices::multi_index(cell, self.dims);
        let mut cells = Vec::with_capacity(27);
        for dx in -1i64..=1 {
            for dy in -1i64..=1 {
                for dz in -1i64..=1 {
                    if let Some(c) = self.offset(idx, [dx, dy, dz]) {
                        cells.push(c);
                    }
                }
            }
        }
        cells.sort_unstable();
        cells.dedup();
        cells
    }

    fn offset(&self, idx: [usize; 3], d: [i64; 3]) -> Option<usize> {
        let mut out = [0usize; 3];
        for i in 0..3 {
            let n = self.dims[i] as i64;
            let raw = idx[i] as i64 + d[i];
            out[i] = if self.periodic[i] {
                raw.rem_euclid(n) as usize
            } else if (0..n).contains(&raw) {
                raw as usize
            } else {
                return None;
            };
        }
        Some(indices::linear_index(out, self.dims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(edge: f64, reach: f64, periodic: bool) -> CellGrid {
        let simbox = SimBox::new([edge; 3], [periodic; 3], [1, 1, 1]).unwrap();
        CellGrid::new(&simbox, reach)
    }

    #[test]
    fn cells_are_no_smaller_than_the_reach() {
        let g = grid(52.6, 8.8, true);
        assert_eq!(g.dims(), [5, 5, 5]);
        assert!(g.cell_size.iter().all(|&s| s >= 8.8));
    }

    #[test]
    fn adjacency_wraps_and_dedups() {
        // 5 cells per axis: full 27-cell stencil
        assert_eq!(grid(50.0, 10.0, true).adjacent_cells(0).len(), 27);
        // 2 cells per axis: +1 and -1 alias, 8 distinct cells
        assert_eq!(grid(20.0, 10.0, true).adjacent_cells(0).len(), 8);
        // 1 cell per axis: everything aliases to the cell itself
        assert_eq!(grid(10.0, 10.0, true).adjacent_cells(0).len(), 1);
        // corner of a non-periodic box only sees 8 cells
        assert_eq!(grid(50.0, 10.0, false).adjacent_cells(0).len(), 8);
    }

    #[test]
    fn edge_coordinates_land_in_the_last_cell() {
        let g = grid(50.0, 10.0, true);
        assert_eq!(g.cell_of(&[50.0 - 1e-12, 0.0, 0.0]), g.cell_of(&[49.0, 0.0, 0.0]));
    }
}
