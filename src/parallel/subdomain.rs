use std::{
    collections::{HashMap, VecDeque},
    sync::mpsc,
};

use tracing::debug;

use super::{Exchange, MainMsg, NeighborLinks, Phase, Worker, WorkerMsg};
use crate::{
    atoms::Atoms,
    error::Error,
    potential::PairPotential,
    region::Rect,
    simbox::SimBox,
    utils::{indices, Axis, Direction},
};

/// The spatial region one worker owns, plus its exchange channels.
///
/// All inter-worker traffic runs through here in staged, phase-tagged
/// rounds: one axis at a time, send to both faces, then receive from both
/// faces. Blocking receives are the barriers; an atom is only dropped from
/// its old owner after its transfer has been packaged, so no worker ever
/// observes a partially migrated atom.
pub struct Subdomain {
    rect: Rect,
    index: usize,
    links: NeighborLinks,
    rx: Option<mpsc::Receiver<Exchange>>,
    pending: VecDeque<Exchange>,
    /// Local indices sent as halo through each face, fixed between rebuilds.
    send_lists: [Vec<usize>; 6],
    /// Per face, the local index backing each received halo entry. An atom
    /// can arrive through two faces of a two-wide grid; only its first
    /// (primary) entry owns a ghost copy, so its force is returned along
    /// exactly one route.
    ghost_maps: [Vec<(usize, bool)>; 6],
}
impl Subdomain {
    /// Single-worker layout: the subdomain is the whole box and every
    /// periodic interaction is handled by minimum-image distances.
    pub fn serial(simbox: &SimBox) -> Self {
        Self {
            rect: simbox.rect().clone(),
            index: 0,
            links: NeighborLinks::new(),
            rx: None,
            pending: VecDeque::new(),
            send_lists: Default::default(),
            ghost_maps: Default::default(),
        }
    }

    /// Claim this worker's region and wire up exchange channels with every
    /// adjacent worker, routed through the manager. Deterministic setup
    /// order on every worker keeps the routing race-free.
    pub fn connect<P: PairPotential>(
        simbox: &SimBox,
        index: usize,
        worker: &Worker<P>,
    ) -> Result<Self, Error> {
        let grid_idx = indices::multi_index(index, simbox.grid());
        let (tx, rx) = mpsc::channel();

        let mut expected = 0;
        for direction in Direction::ALL {
            match simbox.neighbor_of(grid_idx, direction) {
                // an axis spanned by a single subdomain wraps onto itself;
                // minimum-image distances cover it without a halo
                Some(neighbor) if neighbor != grid_idx => {
                    let to = indices::linear_index(neighbor, simbox.grid());
                    worker.send(WorkerMsg::Link {
                        to,
                        from: direction.opposite(),
                        sender: tx.clone(),
                    })?;
                    expected += 1;
                }
                _ => {}
            }
        }

        let mut links = NeighborLinks::new();
        for _ in 0..expected {
            match worker.recv()? {
                MainMsg::Link { from, sender } => links.set(from, sender),
                _ => return Err(Error::Disconnected),
            }
        }
        debug!(worker = index, links = links.count(), "connected subdomain");

        Ok(Self {
            rect: simbox.subdomain_rect(grid_idx),
            index,
            links,
            rx: Some(rx),
            pending: VecDeque::new(),
            send_lists: Default::default(),
            ghost_maps: Default::default(),
        })
    }

    pub fn rect(&self) -> &Rect {
        &self.rect
    }
    pub fn index(&self) -> usize {
        self.index
    }

    fn send(&self, direction: Direction, message: Exchange) -> Result<(), Error> {
        match self.links.get(direction) {
            Some(sender) => sender.send(message).map_err(|_| Error::Disconnected),
            None => Ok(()),
        }
    }

    /// Receive the next message of the wanted phase, stashing any message
    /// from a neighbor that is already a round ahead.
    fn recv_phase(&mut self, phase: Phase) -> Result<Exchange, Error> {
        if let Some(at) = self.pending.iter().position(|m| m.phase == phase) {
            return Ok(self.pending.remove(at).expect("position is in range"));
        }
        let rx = self.rx.as_ref().ok_or(Error::Disconnected)?;
        loop {
            let message = rx.recv().map_err(|_| Error::Disconnected)?;
            if message.phase == phase {
                return Ok(message);
            }
            self.pending.push_back(message);
        }
    }

    /// Hand every owned atom that left this region to its new owner,
    /// staged axis by axis so diagonal moves arrive through two hops.
    /// Ghost copies must already have been dropped.
    pub fn migrate(&mut self, atoms: &mut Atoms, simbox: &SimBox) -> Result<(), Error> {
        debug_assert_eq!(atoms.num_ghosts(), 0, "ghosts present during migration");
        for axis in Axis::ALL {
            let i = axis.index();
            let lo = self.rect.lo()[i];
            let hi = self.rect.hi()[i];
            let [lo_dir, hi_dir] = axis.directions();
            let edge = simbox.edge(axis);
            let center = 0.5 * (lo + hi);
            let half = 0.5 * (hi - lo);

            let mut outgoing: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
            for n in 0..atoms.nlocal() {
                // offset from the slab center, minimum-imaged so an atom
                // that wrapped across the box routes the short way round
                let mut dx = atoms.positions[n][i] - center;
                if simbox.is_periodic(axis) {
                    dx -= edge * (dx / edge).round();
                }
                // a coordinate on a closed box wall stays owned; wrapping
                // already rejected anything truly outside
                if dx < -half && self.links.get(lo_dir).is_some() {
                    outgoing[0].push(n);
                } else if dx >= half && self.links.get(hi_dir).is_some() {
                    outgoing[1].push(n);
                }
            }

            for (k, direction) in [lo_dir, hi_dir].into_iter().enumerate() {
                if self.links.get(direction).is_none() {
                    debug_assert!(outgoing[k].is_empty());
                    continue;
                }
                let mut message = Exchange::new(Phase::Migrate(axis), direction.opposite());
                for &n in &outgoing[k] {
                    message.ids.push(atoms.ids[n]);
                    message.species.push(atoms.species[n]);
                    message.positions.push(atoms.positions[n]);
                    message.velocities.push(atoms.velocities[n]);
                }
                self.send(direction, message)?;
            }

            // commit: emigrants are packaged, drop them from the owned set
            let mut emigrants: Vec<usize> = outgoing[0]
                .iter()
                .chain(outgoing[1].iter())
                .copied()
                .collect();
            emigrants.sort_unstable();
            atoms.remove_owned(&emigrants);

            for direction in [lo_dir, hi_dir] {
                if self.links.get(direction).is_none() {
                    continue;
                }
                let message = self.recv_phase(Phase::Migrate(axis))?;
                for n in 0..message.ids.len() {
                    atoms.add_owned(
                        message.ids[n],
                        message.species[n],
                        message.positions[n],
                        message.velocities[n],
                    )?;
                }
            }
        }
        debug_assert!(
            (0..atoms.nlocal()).all(|n| self.owns_with_walls(&atoms.positions[n])),
            "an atom survived migration outside its subdomain"
        );
        Ok(())
    }

    // half-open ownership, except closed against non-periodic walls where
    // the box edge itself is a legal coordinate
    fn owns_with_walls(&self, pos: &[f64; 3]) -> bool {
        if self.rect.owns(pos) {
            return true;
        }
        Axis::ALL.iter().all(|axis| {
            let i = axis.index();
            let hi_open = self.links.get(axis.direction(false)).is_some();
            pos[i] >= self.rect.lo()[i]
                && (pos[i] < self.rect.hi()[i] || (!hi_open && pos[i] == self.rect.hi()[i]))
        })
    }

    /// Rebuild the halo: gather fresh ghost copies of every neighbor atom
    /// within `reach` of this region's faces. Later axes forward ghosts
    /// received on earlier axes, which populates the edge and corner halo.
    pub fn refresh_halo_full(&mut self, atoms: &mut Atoms, reach: f64) -> Result<(), Error> {
        debug_assert_eq!(atoms.num_ghosts(), 0, "halo rebuilt twice");
        self.send_lists = Default::default();
        self.ghost_maps = Default::default();

        // a two-wide grid delivers the same atom through both faces; track
        // ids so the second arrival aliases the first copy instead of
        // duplicating the pair under the minimum-image convention
        let mut index_of: HashMap<usize, usize> = atoms
            .ids
            .iter()
            .enumerate()
            .map(|(n, &id)| (id, n))
            .collect();

        for axis in Axis::ALL {
            let i = axis.index();
            let lo = self.rect.lo()[i];
            let hi = self.rect.hi()[i];

            for direction in axis.directions() {
                if self.links.get(direction).is_none() {
                    continue;
                }
                let list: Vec<usize> = (0..atoms.num_atoms())
                    .filter(|&n| {
                        let x = atoms.positions[n][i];
                        if direction.is_lo() {
                            x < lo + reach
                        } else {
                            x >= hi - reach
                        }
                    })
                    .collect();
                let mut message = Exchange::new(Phase::Halo(axis), direction.opposite());
                for &n in &list {
                    message.ids.push(atoms.ids[n]);
                    message.species.push(atoms.species[n]);
                    message.positions.push(atoms.positions[n]);
                }
                self.send_lists[direction.index()] = list;
                self.send(direction, message)?;
            }

            for direction in axis.directions() {
                if self.links.get(direction).is_none() {
                    continue;
                }
                let message = self.recv_phase(Phase::Halo(axis))?;
                let mut map = Vec::with_capacity(message.ids.len());
                for n in 0..message.ids.len() {
                    match index_of.get(&message.ids[n]) {
                        Some(&existing) => map.push((existing, false)),
                        None => {
                            let idx = atoms.num_atoms();
                            atoms.add_ghost(
                                message.ids[n],
                                message.species[n],
                                message.positions[n],
                            );
                            index_of.insert(message.ids[n], idx);
                            map.push((idx, true));
                        }
                    }
                }
                self.ghost_maps[message.from.index()] = map;
            }
        }
        Ok(())
    }

    /// Update ghost positions in place between rebuilds. Send lists and
    /// ghost blocks are aligned positionally, so no id lookups are needed.
    pub fn refresh_halo_positions(&mut self, atoms: &mut Atoms) -> Result<(), Error> {
        for axis in Axis::ALL {
            for direction in axis.directions() {
                if self.links.get(direction).is_none() {
                    continue;
                }
                let mut message = Exchange::new(Phase::HaloPositions(axis), direction.opposite());
                for &n in &self.send_lists[direction.index()] {
                    message.positions.push(atoms.positions[n]);
                }
                self.send(direction, message)?;
            }
            for direction in axis.directions() {
                if self.links.get(direction).is_none() {
                    continue;
                }
                let message = self.recv_phase(Phase::HaloPositions(axis))?;
                let map = &self.ghost_maps[message.from.index()];
                debug_assert_eq!(map.len(), message.positions.len());
                for (k, pos) in message.positions.iter().enumerate() {
                    atoms.positions[map[k].0] = *pos;
                }
            }
        }
        Ok(())
    }

    /// Return the forces accumulated on ghost copies to their owners,
    /// in reverse axis order so relayed contributions unwind through the
    /// same hops that built the halo.
    pub fn return_forces(&mut self, atoms: &mut Atoms) -> Result<(), Error> {
        for axis in [Axis::Z, Axis::Y, Axis::X] {
            for direction in axis.directions() {
                if self.links.get(direction).is_none() {
                    continue;
                }
                let mut message = Exchange::new(Phase::Forces(axis), direction.opposite());
                // an aliased entry shares its copy with another face, which
                // returns the accumulated force; send zeros here
                for &(idx, primary) in &self.ghost_maps[direction.index()] {
                    message
                        .forces
                        .push(if primary { atoms.forces[idx] } else { [0.0; 3] });
                }
                self.send(direction, message)?;
            }
            for direction in axis.directions() {
                if self.links.get(direction).is_none() {
                    continue;
                }
                let message = self.recv_phase(Phase::Forces(axis))?;
                let list = &self.send_lists[message.from.index()];
                debug_assert_eq!(list.len(), message.forces.len());
                for (k, f) in message.forces.iter().enumerate() {
                    atoms.add_force(list[k], *f);
                }
            }
        }
        Ok(())
    }
}
