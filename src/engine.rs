use std::{
    path::{Path, PathBuf},
    time::Instant,
};

use tracing::{debug, info, warn};

use crate::{
    atoms::Atoms,
    checkpoint::Checkpoint,
    clock::Clock,
    error::Error,
    integrate::{temperature_from_kinetic, Berendsen, VelocityVerlet},
    lattice::Lattice,
    neighbor::{NeighborList, UpdateSettings},
    parallel::{CheckpointMeta, CheckpointPart, MainMsg, Subdomain, Worker, WorkerMsg},
    potential::PairPotential,
    scheduler::{Event, EventScheduler, TimerHandle},
    simbox::SimBox,
    species::Species,
};

/// Handler invoked synchronously for every scheduler firing.
///
/// Handlers read the engine through its observable queries and feed intents
/// back through `request_checkpoint` and `request_stop`; intents take
/// effect at the single post-dispatch point of the step.
pub type EventHandler<P> = fn(&mut Engine<P>, Event);

/// Integration mode of the step loop.
#[derive(Clone, Copy, Debug)]
pub enum Mode {
    /// Constant-energy stepping.
    Free,
    /// Velocities relaxed toward a target temperature each step.
    Equilibrate(Berendsen),
}

/// One worker's view of the simulation, and the driver of its step loop.
///
/// Every worker holds an engine over its own subdomain; a serial engine is
/// simply one with no attached worker. Configuration, stepping, and
/// collective queries are called identically on every worker, which keeps
/// the lockstep protocol deterministic.
pub struct Engine<P: PairPotential> {
    simbox: Option<SimBox>,
    subdomain: Option<Subdomain>,
    atoms: Atoms,
    potential: Option<P>,
    neighbor: Option<NeighborList>,
    skin: f64,
    update: UpdateSettings,
    scheduler: EventScheduler,
    clock: Clock,
    mode: Mode,
    handler: Option<EventHandler<P>>,
    worker: Option<Worker<P>>,
    pending_checkpoints: Vec<PathBuf>,
    stop_requested: bool,
    next_atom_id: usize,
    local_pe: f64,
    wall_start: Instant,
}

impl<P: PairPotential> Engine<P> {
    pub fn new() -> Self {
        Self {
            simbox: None,
            subdomain: None,
            atoms: Atoms::new(),
            potential: None,
            neighbor: None,
            skin: 0.3,
            update: UpdateSettings::default(),
            scheduler: EventScheduler::new(),
            clock: Clock::new(),
            mode: Mode::Free,
            handler: None,
            worker: None,
            pending_checkpoints: Vec::new(),
            stop_requested: false,
            next_atom_id: 0,
            local_pe: 0.0,
            wall_start: Instant::now(),
        }
    }

    pub(crate) fn attach_worker(&mut self, worker: Worker<P>) {
        self.worker = Some(worker);
    }

    pub fn nworkers(&self) -> usize {
        self.worker.as_ref().map_or(1, Worker::count)
    }
    pub fn worker_index(&self) -> usize {
        self.worker.as_ref().map_or(0, Worker::index)
    }
    /// True on the first worker; gate console output on this.
    pub fn is_root(&self) -> bool {
        self.worker_index() == 0
    }

    // Setup

    /// Configure the box and claim this worker's subdomain. The grid shape
    /// must match the worker count.
    pub fn set_box(&mut self, simbox: SimBox) -> Result<(), Error> {
        if self.simbox.is_some() {
            return Err(Error::InvalidBox("the box is already configured".into()));
        }
        if simbox.num_subdomains() != self.nworkers() {
            return Err(Error::GridMismatch {
                grid: simbox.grid(),
                nworkers: self.nworkers(),
            });
        }
        let subdomain = match &self.worker {
            Some(worker) => Subdomain::connect(&simbox, worker.index(), worker)?,
            None => Subdomain::serial(&simbox),
        };
        self.subdomain = Some(subdomain);
        self.simbox = Some(simbox);
        Ok(())
    }

    pub fn set_species(&mut self, table: Vec<Species>) -> Result<(), Error> {
        if table.is_empty() {
            return Err(Error::InvalidSpecies {
                name: String::new(),
                reason: "the species table is empty".into(),
            });
        }
        self.atoms.set_species_table(table);
        Ok(())
    }

    /// Install a fully parameterized potential; coefficients are validated
    /// here rather than on the first step.
    pub fn set_potential(&mut self, potential: P) -> Result<(), Error> {
        potential.validate()?;
        if potential.num_species() != self.atoms.num_species() {
            return Err(Error::SpeciesCountMismatch {
                potential: potential.num_species(),
                table: self.atoms.num_species(),
            });
        }
        self.neighbor = None;
        self.potential = Some(potential);
        Ok(())
    }

    pub fn set_neighbor(&mut self, skin: f64, update: UpdateSettings) {
        assert!(skin > 0.0, "Skin should be positive, found {}", skin);
        self.skin = skin;
        self.update = update;
        self.neighbor = None;
    }

    /// Fill a block of lattice cells with atoms of one species. Each worker
    /// generates the same deterministic site list and keeps the sites its
    /// subdomain owns.
    pub fn create_lattice<L: Lattice>(
        &mut self,
        lattice: &L,
        origin: [f64; 3],
        cells: [usize; 3],
        species: usize,
    ) -> Result<(), Error> {
        let simbox = self.simbox.as_ref().ok_or(Error::NotConfigured("box"))?;
        let subdomain = self.subdomain.as_ref().ok_or(Error::NotConfigured("box"))?;
        if species >= self.atoms.num_species() {
            return Err(Error::UnknownSpecies(species));
        }

        self.atoms.clear_ghosts();
        let sites = lattice.site_coords(origin, cells);
        let base = self.next_atom_id;
        let mut kept = 0;
        for (offset, site) in sites.iter().enumerate() {
            let pos = simbox.wrap(*site)?;
            if simbox.owner_of(&pos) == subdomain.index() {
                self.atoms
                    .add_owned(base + offset, species, pos, [0.0; 3])?;
                kept += 1;
            }
        }
        self.next_atom_id = base + sites.len();
        if let Some(neighbor) = &mut self.neighbor {
            neighbor.invalidate();
        }
        debug!(
            sites = sites.len(),
            owned = kept,
            worker = subdomain.index(),
            "generated lattice atoms"
        );
        Ok(())
    }

    /// Seed Maxwell-Boltzmann velocities at a target temperature and remove
    /// the global center-of-mass drift. Collective.
    pub fn seed_velocities(&mut self, temperature: f64, seed: u64) -> Result<(), Error> {
        // decorrelate the per-worker streams
        let worker_seed = seed.wrapping_add(
            (self.worker_index() as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15),
        );
        self.atoms.seed_velocities(temperature, worker_seed);

        let (p, m) = self.atoms.momentum();
        let sums = self.reduce(vec![p[0], p[1], p[2], m])?;
        if sums[3] > 0.0 {
            self.atoms
                .shift_velocities([-sums[0] / sums[3], -sums[1] / sums[3], -sums[2] / sums[3]]);
        }
        Ok(())
    }

    // Timers and events

    pub fn make_timer(&mut self, start: f64, period: f64, stop: f64) -> Result<TimerHandle, Error> {
        self.scheduler.make_timer(start, period, stop)
    }
    pub fn remove_timer(&mut self, handle: TimerHandle) {
        self.scheduler.remove(handle);
    }
    pub fn set_event_handler(&mut self, handler: EventHandler<P>) {
        self.handler = Some(handler);
    }

    /// Queue a checkpoint intent, applied at the post-dispatch point.
    pub fn request_checkpoint(&mut self, path: impl Into<PathBuf>) {
        self.pending_checkpoints.push(path.into());
    }
    /// Queue a stop intent, observed once per step after dispatch.
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    // Observables

    pub fn time(&self) -> f64 {
        self.clock.time()
    }
    pub fn step_index(&self) -> usize {
        self.clock.step()
    }
    /// Wall-clock seconds since this engine was created.
    pub fn wall_time(&self) -> f64 {
        self.wall_start.elapsed().as_secs_f64()
    }
    pub fn atoms(&self) -> &Atoms {
        &self.atoms
    }

    /// Total number of atoms across all workers. Collective.
    pub fn num_atoms(&self) -> Result<usize, Error> {
        Ok(self.reduce(vec![self.atoms.nlocal() as f64])?[0].round() as usize)
    }
    /// Kinetic energy over all workers. Collective.
    pub fn kinetic_energy(&self) -> Result<f64, Error> {
        Ok(self.reduce(vec![self.atoms.kinetic_energy()])?[0])
    }
    /// Potential energy as of the last force evaluation. Collective.
    pub fn potential_energy(&self) -> Result<f64, Error> {
        Ok(self.reduce(vec![self.local_pe])?[0])
    }
    /// Kinetic plus potential energy. Collective.
    pub fn total_energy(&self) -> Result<f64, Error> {
        let sums = self.reduce(vec![self.atoms.kinetic_energy(), self.local_pe])?;
        Ok(sums[0] + sums[1])
    }
    /// Instantaneous temperature from equipartition. Collective.
    pub fn temperature(&self) -> Result<f64, Error> {
        let sums = self.reduce(vec![
            self.atoms.kinetic_energy(),
            self.atoms.nlocal() as f64,
        ])?;
        Ok(temperature_from_kinetic(sums[0], sums[1].round() as usize))
    }

    /// Element-wise global sum, served by the manager. Doubles as a
    /// barrier: no worker proceeds until every contribution is in.
    fn reduce(&self, values: Vec<f64>) -> Result<Vec<f64>, Error> {
        match &self.worker {
            None => Ok(values),
            Some(worker) => {
                worker.send(WorkerMsg::Reduce(values))?;
                match worker.recv()? {
                    MainMsg::Reduced(sums) => Ok(sums),
                    _ => Err(Error::Disconnected),
                }
            }
        }
    }

    // Checkpointing

    /// Write the full simulation state to a binary checkpoint. Collective:
    /// the manager gathers every worker's owned atoms into one file.
    pub fn save_checkpoint(&self, path: &Path) -> Result<(), Error> {
        let simbox = self.simbox.as_ref().ok_or(Error::NotConfigured("box"))?;
        let mut order: Vec<usize> = (0..self.atoms.nlocal()).collect();
        order.sort_unstable_by_key(|&i| self.atoms.ids[i]);

        match &self.worker {
            None => {
                let checkpoint = Checkpoint {
                    edges: simbox.edges(),
                    periodic: simbox.periodic_flags(),
                    species: self.atoms.species_table().to_vec(),
                    atom_species: order.iter().map(|&i| self.atoms.species[i]).collect(),
                    positions: order.iter().map(|&i| self.atoms.positions[i]).collect(),
                    velocities: order.iter().map(|&i| self.atoms.velocities[i]).collect(),
                    time: self.clock.time(),
                    step: self.clock.step(),
                };
                checkpoint.save(path)
            }
            Some(worker) => {
                let meta = self.is_root().then(|| CheckpointMeta {
                    edges: simbox.edges(),
                    periodic: simbox.periodic_flags(),
                    species_table: self.atoms.species_table().to_vec(),
                    time: self.clock.time(),
                    step: self.clock.step(),
                });
                worker.send(WorkerMsg::Checkpoint(Box::new(CheckpointPart {
                    path: path.to_path_buf(),
                    ids: order.iter().map(|&i| self.atoms.ids[i]).collect(),
                    species: order.iter().map(|&i| self.atoms.species[i]).collect(),
                    positions: order.iter().map(|&i| self.atoms.positions[i]).collect(),
                    velocities: order.iter().map(|&i| self.atoms.velocities[i]).collect(),
                    meta,
                })))?;
                match worker.recv()? {
                    MainMsg::CheckpointSaved(Ok(())) => Ok(()),
                    MainMsg::CheckpointSaved(Err(reason)) => Err(Error::CheckpointIo(reason)),
                    _ => Err(Error::Disconnected),
                }
            }
        }
    }

    /// Restore state from a checkpoint. The box must already be configured
    /// and match the file; each worker keeps the atoms its subdomain owns.
    pub fn load_checkpoint(&mut self, path: &Path) -> Result<(), Error> {
        let checkpoint = Checkpoint::load(path)?;
        let (edges, periodic, index) = {
            let simbox = self.simbox.as_ref().ok_or(Error::NotConfigured("box"))?;
            let subdomain = self.subdomain.as_ref().ok_or(Error::NotConfigured("box"))?;
            (simbox.edges(), simbox.periodic_flags(), subdomain.index())
        };
        if checkpoint.edges != edges || checkpoint.periodic != periodic {
            return Err(Error::InvalidBox(format!(
                "checkpoint box {:?} does not match the configured box {:?}",
                checkpoint.edges, edges,
            )));
        }

        self.atoms = Atoms::new();
        self.atoms.set_species_table(checkpoint.species.clone());
        for i in 0..checkpoint.num_atoms() {
            let simbox = self.simbox.as_ref().expect("checked above");
            let pos = simbox.wrap(checkpoint.positions[i])?;
            if simbox.owner_of(&pos) == index {
                self.atoms
                    .add_owned(i, checkpoint.atom_species[i], pos, checkpoint.velocities[i])?;
            }
        }
        self.next_atom_id = checkpoint.num_atoms();
        self.clock.restore(checkpoint.time, checkpoint.step);
        self.local_pe = 0.0;
        if let Some(neighbor) = &mut self.neighbor {
            neighbor.invalidate();
        }
        Ok(())
    }

    // Running

    /// Drive the system toward a target temperature for a bounded duration,
    /// then revert to free stepping.
    pub fn equilibrate(
        &mut self,
        duration: f64,
        dt: f64,
        tau: f64,
        target: f64,
    ) -> Result<(), Error> {
        self.mode = Mode::Equilibrate(Berendsen::new(target, tau)?);
        info!(duration, dt, tau, target, "equilibrating");
        let result = self.advance_for(duration, dt);
        self.mode = Mode::Free;
        result
    }

    /// Free (constant-energy) stepping for a fixed duration.
    pub fn run(&mut self, duration: f64, dt: f64) -> Result<(), Error> {
        info!(duration, dt, "running");
        self.advance_for(duration, dt)
    }

    fn advance_for(&mut self, duration: f64, dt: f64) -> Result<(), Error> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(Error::InvalidRun(format!(
                "duration {} should be positive",
                duration
            )));
        }
        if !dt.is_finite() || dt <= 0.0 {
            return Err(Error::InvalidRun(format!(
                "timestep {} should be positive",
                dt
            )));
        }
        self.pre_check()?;
        self.clock.set_dt(dt);
        self.stop_requested = false;

        // bootstrap pass so the first half-kick sees valid forces
        if !self.neighbor.as_ref().expect("created in pre_check").is_built() {
            self.wrap_owned()?;
            self.remap()?;
            self.force_pass()?;
        }

        let nsteps = ((duration / dt).round() as usize).max(1);
        for _ in 0..nsteps {
            self.step()?;
            if self.stop_requested {
                info!(step = self.clock.step(), "stop requested");
                break;
            }
        }
        Ok(())
    }

    /// Validate the full configuration before the first step.
    fn pre_check(&mut self) -> Result<(), Error> {
        let simbox = self
            .simbox
            .as_ref()
            .ok_or(Error::NotConfigured("simulation box"))?;
        if self.atoms.num_species() == 0 {
            return Err(Error::NotConfigured("species table"));
        }
        let potential = self
            .potential
            .as_ref()
            .ok_or(Error::NotConfigured("pair potential"))?;
        potential.validate()?;

        let cutoff = potential.cutoff();
        let reach = cutoff + self.skin;
        simbox.validate_decomposition(reach, self.nworkers())?;
        // axes spanned by a single subdomain rely on minimum-image
        // distances instead of a halo
        for axis in crate::utils::Axis::ALL {
            if simbox.grid()[axis.index()] == 1
                && simbox.is_periodic(axis)
                && simbox.edge(axis) < 2.0 * reach
            {
                warn!(
                    ?axis,
                    edge = simbox.edge(axis),
                    reach,
                    "box edge below twice the interaction reach; minimum-image \
                     distances may miss second images"
                );
            }
        }

        let stale = match &self.neighbor {
            None => true,
            Some(neighbor) => neighbor.cutoff() != cutoff || neighbor.skin() != self.skin,
        };
        if stale {
            self.neighbor = Some(NeighborList::new(cutoff, self.skin));
        }

        if self.reduce(vec![self.atoms.nlocal() as f64])?[0] < 0.5 {
            return Err(Error::NoAtoms);
        }
        Ok(())
    }

    /// One velocity-Verlet step with migration, halo refresh, dispatch and
    /// intent application. Cancellation is observed only at the end, so a
    /// stop never interrupts mid-step.
    fn step(&mut self) -> Result<(), Error> {
        let dt = self.clock.dt();
        VelocityVerlet::half_kick(&mut self.atoms, dt);
        VelocityVerlet::drift(&mut self.atoms, dt);
        self.wrap_owned()?;

        if self.rebuild_due()? {
            self.remap()?;
        } else {
            let Engine {
                atoms, subdomain, ..
            } = self;
            subdomain
                .as_mut()
                .expect("configured in set_box")
                .refresh_halo_positions(atoms)?;
        }

        self.force_pass()?;
        VelocityVerlet::half_kick(&mut self.atoms, dt);

        if let Mode::Equilibrate(thermostat) = self.mode {
            let current = self.temperature()?;
            let factor = thermostat.rescale_factor(dt, current);
            self.atoms.scale_velocities(factor);
        }

        self.clock.advance();
        let firings = self.scheduler.advance(self.clock.time());
        if let Some(handler) = self.handler {
            for firing in firings {
                handler(self, Event::TimerFired { timer: firing.timer });
            }
        }
        self.apply_intents()
    }

    /// Whether the neighbor list must be rebuilt this step. With `check`
    /// set the half-skin staleness test runs every step, since evaluating
    /// forces on a stale list is a correctness bug rather than a slowdown;
    /// without it the cadence schedule decides. The staleness vote is
    /// global so every worker migrates and rebuilds in the same step.
    fn rebuild_due(&mut self) -> Result<bool, Error> {
        let local = {
            let neighbor = self.neighbor.as_ref().expect("created in pre_check");
            if !neighbor.is_built() {
                return Ok(true);
            }
            if !self.update.check {
                return Ok(self.update.cadence_due(self.clock.step()));
            }
            let simbox = self.simbox.as_ref().expect("configured in set_box");
            neighbor.atoms_moved_too_far(&self.atoms, simbox)
        };
        if self.nworkers() == 1 {
            return Ok(local);
        }
        Ok(self.reduce(vec![local as u8 as f64])?[0] > 0.5)
    }

    /// Migrate atoms to their owners, rebuild the halo, and rebuild the
    /// neighbor list.
    fn remap(&mut self) -> Result<(), Error> {
        let step = self.clock.step();
        {
            let Engine {
                atoms,
                subdomain,
                simbox,
                neighbor,
                ..
            } = self;
            let simbox = simbox.as_ref().expect("configured in set_box");
            let subdomain = subdomain.as_mut().expect("configured in set_box");
            let neighbor = neighbor.as_mut().expect("created in pre_check");
            atoms.clear_ghosts();
            subdomain.migrate(atoms, simbox)?;
            subdomain.refresh_halo_full(atoms, neighbor.reach())?;
            neighbor.build(atoms, simbox);
        }
        self.update.mark_built(step);
        Ok(())
    }

    /// Zero accumulators, evaluate the potential over the pair list, and
    /// return halo forces to their owners.
    fn force_pass(&mut self) -> Result<(), Error> {
        let Engine {
            atoms,
            subdomain,
            simbox,
            neighbor,
            potential,
            local_pe,
            ..
        } = self;
        let simbox = simbox.as_ref().expect("configured in set_box");
        let subdomain = subdomain.as_mut().expect("configured in set_box");
        let neighbor = neighbor.as_ref().expect("created in pre_check");
        let potential = potential.as_ref().expect("checked in pre_check");

        atoms.zero_forces();
        *local_pe = potential.evaluate(atoms, neighbor.pairs(), simbox)?;
        subdomain.return_forces(atoms)?;
        Ok(())
    }

    fn wrap_owned(&mut self) -> Result<(), Error> {
        let Engine { atoms, simbox, .. } = self;
        let simbox = simbox.as_ref().expect("configured in set_box");
        for i in 0..atoms.nlocal() {
            atoms.positions[i] = simbox.wrap(atoms.positions[i])?;
        }
        Ok(())
    }

    /// The post-dispatch point: apply queued intents. A failed checkpoint
    /// write is recoverable and only logged; numeric faults propagate.
    fn apply_intents(&mut self) -> Result<(), Error> {
        let paths = std::mem::take(&mut self.pending_checkpoints);
        for path in paths {
            match self.save_checkpoint(&path) {
                Ok(()) => {}
                Err(e @ (Error::CheckpointIo(_) | Error::Io(_))) => {
                    warn!(path = %path.display(), error = %e, "checkpoint request failed");
                }
                Err(other) => return Err(other),
            }
        }
        Ok(())
    }
}
