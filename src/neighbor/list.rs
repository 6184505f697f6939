use tracing::debug;

use super::CellGrid;
use crate::{atoms::Atoms, simbox::SimBox};

/// Cutoff-radius pair list built with the cell-list method.
///
/// Pairs are enumerated once each: owned pairs by ascending index, and
/// owned-halo pairs only on the worker whose owned atom has the smaller
/// global id, so a pair shared between two workers is computed exactly
/// once. Halo-halo pairs are never listed. The list stays valid until some
/// atom has moved more than half the skin since the build.
pub struct NeighborList {
    cutoff: f64,
    skin: f64,
    pairs: Vec<[usize; 2]>,
    built: bool,
    positions_at_build: Vec<[f64; 3]>,
}
impl NeighborList {
    pub fn new(cutoff: f64, skin: f64) -> Self {
        assert!(cutoff > 0.0, "Cutoff should be positive, found {}", cutoff);
        assert!(skin > 0.0, "Skin should be positive, found {}", skin);
        Self {
            cutoff,
            skin,
            pairs: Vec::new(),
            built: false,
            positions_at_build: Vec::new(),
        }
    }

    pub fn pairs(&self) -> &[[usize; 2]] {
        &self.pairs
    }
    pub fn is_built(&self) -> bool {
        self.built
    }
    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }
    pub fn skin(&self) -> f64 {
        self.skin
    }
    /// The list includes every pair up to cutoff + skin.
    pub fn reach(&self) -> f64 {
        self.cutoff + self.skin
    }
    pub fn invalidate(&mut self) {
        self.built = false;
        self.pairs.clear();
        self.positions_at_build.clear();
    }

    /// Rebuild the pair list over the owned and halo atoms.
    pub fn build(&mut self, atoms: &Atoms, simbox: &SimBox) {
        let nlocal = atoms.nlocal();
        let reach2 = self.reach() * self.reach();
        let grid = CellGrid::new(simbox, self.reach());

        let mut cells: Vec<Vec<usize>> = vec![Vec::new(); grid.num_cells()];
        for (i, pos) in atoms.positions.iter().enumerate() {
            cells[grid.cell_of(pos)].push(i);
        }

        // keep an owned-owned pair once by index order; keep an owned-halo
        // pair only when the owned atom has the smaller global id
        let wanted = |i: usize, j: usize| -> bool {
            match (i < nlocal, j < nlocal) {
                (true, true) => true,
                (true, false) => atoms.ids[i] < atoms.ids[j],
                (false, true) => atoms.ids[j] < atoms.ids[i],
                (false, false) => false,
            }
        };

        self.pairs.clear();
        for (c, members) in cells.iter().enumerate() {
            if members.is_empty() {
                continue;
            }
            for c2 in grid.adjacent_cells(c) {
                if c2 < c {
                    continue;
                }
                for (n, &i) in members.iter().enumerate() {
                    let others = &cells[c2];
                    let start = if c2 == c { n + 1 } else { 0 };
                    for &j in &others[start..] {
                        if !wanted(i, j) {
                            continue;
                        }
                        let pi = atoms.positions[i];
                        let pj = atoms.positions[j];
                        let dr =
                            simbox.min_image([pi[0] - pj[0], pi[1] - pj[1], pi[2] - pj[2]]);
                        if dr[0] * dr[0] + dr[1] * dr[1] + dr[2] * dr[2] <= reach2 {
                            self.pairs.push([i, j]);
                        }
                    }
                }
            }
        }

        self.positions_at_build = atoms.positions[..nlocal].to_vec();
        self.built = true;
        debug!(
            pairs = self.pairs.len(),
            atoms = atoms.num_atoms(),
            "rebuilt neighbor list"
        );
    }

    /// True once any owned atom has moved more than half the skin since the
    /// last build. Evaluating forces past this point would miss pairs, so
    /// the engine must force a rebuild.
    pub fn atoms_moved_too_far(&self, atoms: &Atoms, simbox: &SimBox) -> bool {
        let half_skin2 = (0.5 * self.skin) * (0.5 * self.skin);
        self.positions_at_build
            .iter()
            .zip(atoms.positions.iter())
            .any(|(old, new)| {
                let dr = simbox.min_image([new[0] - old[0], new[1] - old[1], new[2] - old[2]]);
                dr[0] * dr[0] + dr[1] * dr[1] + dr[2] * dr[2] > half_skin2
            })
    }
}
