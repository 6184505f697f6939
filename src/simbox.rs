use crate::{
    error::Error,
    region::Rect,
    utils::{indices, Axis, Direction},
};

/// Boundary condition along one axis.
///
/// Periodic axes wrap coordinates into the canonical range; fixed axes
/// treat an escaping position as a fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Boundary {
    Periodic,
    Fixed,
}
impl Boundary {
    pub fn is_periodic(self) -> bool {
        self == Boundary::Periodic
    }
}

/// The periodic simulation box and its decomposition into subdomains.
///
/// The box is anchored at the origin. Canonical coordinates lie in
/// `[0, edge)` on periodic axes and `[0, edge]` on fixed axes. The grid
/// partitions the box into one axis-aligned subdomain per worker.
#[derive(Clone, Debug)]
pub struct SimBox {
    rect: Rect,
    boundaries: [Boundary; 3],
    grid: [usize; 3],
}
impl SimBox {
    pub fn new(edges: [f64; 3], periodic: [bool; 3], grid: [usize; 3]) -> Result<Self, Error> {
        if edges.iter().any(|&e| !e.is_finite() || e <= 0.0) {
            return Err(Error::InvalidBox(format!(
                "edges {:?} should all be positive",
                edges
            )));
        }
        if grid.iter().any(|&n| n == 0) {
            return Err(Error::InvalidBox(format!(
                "subdomain grid {:?} should have positive extents",
                grid
            )));
        }
        let boundaries = periodic.map(|p| {
            if p {
                Boundary::Periodic
            } else {
                Boundary::Fixed
            }
        });
        Ok(Self {
            rect: Rect::new([0.0; 3], edges),
            boundaries,
            grid,
        })
    }

    pub fn rect(&self) -> &Rect {
        &self.rect
    }
    pub fn edge(&self, axis: Axis) -> f64 {
        self.rect.length(axis)
    }
    pub fn edges(&self) -> [f64; 3] {
        self.rect.lengths()
    }
    pub fn is_periodic(&self, axis: Axis) -> bool {
        self.boundaries[axis.index()].is_periodic()
    }
    pub fn periodic_flags(&self) -> [bool; 3] {
        self.boundaries.map(|b| b.is_periodic())
    }
    pub fn grid(&self) -> [usize; 3] {
        self.grid
    }
    pub fn num_subdomains(&self) -> usize {
        self.grid[0] * self.grid[1] * self.grid[2]
    }

    /// Map a position into the canonical coordinate range.
    ///
    /// Periodic axes wrap into `[0, edge)`; a coordinate outside a fixed
    /// axis is an `OutOfBounds` fault.
    pub fn wrap(&self, pos: [f64; 3]) -> Result<[f64; 3], Error> {
        let mut wrapped = pos;
        for axis in Axis::ALL {
            let i = axis.index();
            let edge = self.edge(axis);
            if self.is_periodic(axis) {
                wrapped[i] = wrapped[i].rem_euclid(edge);
                // rem_euclid can land exactly on `edge` when the operand
                // is a tiny negative number
                if wrapped[i] >= edge {
                    wrapped[i] = 0.0;
                }
            } else if wrapped[i] < 0.0 || wrapped[i] > edge {
                return Err(Error::OutOfBounds {
                    axis,
                    coord: wrapped[i],
                });
            }
        }
        debug_assert!(self.rect.contains(&wrapped));
        Ok(wrapped)
    }

    /// Minimum-image separation: on periodic axes, the shortest of the
    /// direct and wrapped displacements.
    pub fn min_image(&self, mut dr: [f64; 3]) -> [f64; 3] {
        for axis in Axis::ALL {
            if self.is_periodic(axis) {
                let i = axis.index();
                let edge = self.edge(axis);
                dr[i] -= edge * (dr[i] / edge).round();
            }
        }
        dr
    }

    pub fn subdomain_extent(&self, axis: Axis) -> f64 {
        self.edge(axis) / self.grid[axis.index()] as f64
    }

    /// The worker that owns a canonical position, by integer division of
    /// the coordinates by the subdomain extents.
    pub fn owner_of(&self, pos: &[f64; 3]) -> usize {
        let mut idx = [0usize; 3];
        for axis in Axis::ALL {
            let i = axis.index();
            let cell = (pos[i] / self.subdomain_extent(axis)).floor();
            idx[i] = (cell.max(0.0) as usize).min(self.grid[i] - 1);
        }
        indices::linear_index(idx, self.grid)
    }

    /// The region owned by the subdomain at a 3D grid index.
    pub fn subdomain_rect(&self, idx: [usize; 3]) -> Rect {
        let mut lo = [0.0; 3];
        let mut hi = [0.0; 3];
        for axis in Axis::ALL {
            let i = axis.index();
            let extent = self.subdomain_extent(axis);
            lo[i] = extent * idx[i] as f64;
            hi[i] = if idx[i] + 1 == self.grid[i] {
                // close the last slab on the exact box edge
                self.edge(axis)
            } else {
                extent * (idx[i] + 1) as f64
            };
        }
        Rect::new(lo, hi)
    }

    /// Grid index of the adjacent subdomain in a face direction, wrapping
    /// on periodic axes. `None` when the face is a non-periodic box wall.
    pub fn neighbor_of(&self, idx: [usize; 3], direction: Direction) -> Option<[usize; 3]> {
        let a = direction.axis().index();
        let n = self.grid[a];
        let at_wall = if direction.is_lo() {
            idx[a] == 0
        } else {
            idx[a] + 1 == n
        };
        if at_wall && !self.is_periodic(direction.axis()) {
            return None;
        }
        let mut neighbor = idx;
        neighbor[a] = if direction.is_lo() {
            (idx[a] + n - 1) % n
        } else {
            (idx[a] + 1) % n
        };
        Some(neighbor)
    }

    /// Reject decompositions that would make halo exchange unsound.
    pub fn validate_decomposition(&self, cutoff: f64, nworkers: usize) -> Result<(), Error> {
        if self.num_subdomains() != nworkers {
            return Err(Error::GridMismatch {
                grid: self.grid,
                nworkers,
            });
        }
        for axis in Axis::ALL {
            let extent = self.subdomain_extent(axis);
            if self.grid[axis.index()] > 1 && extent < cutoff {
                return Err(Error::SubdomainTooSmall {
                    axis,
                    extent,
                    cutoff,
                });
            }
        }
        Ok(())
    }
}
