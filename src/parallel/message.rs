use std::{path::PathBuf, sync::mpsc};

use crate::{
    engine::Engine,
    error::Error,
    potential::PairPotential,
    species::Species,
    utils::{Axis, Direction},
};

/// Tag for one staged exchange round.
///
/// Receives are matched against the expected phase, so a neighbor that has
/// already raced ahead to a later round cannot have its message consumed
/// out of turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Migrate(Axis),
    Halo(Axis),
    HaloPositions(Axis),
    Forces(Axis),
}

/// Payload exchanged between adjacent workers.
///
/// Unused columns stay empty: halo refreshes carry positions only, force
/// returns carry forces only.
#[derive(Debug)]
pub struct Exchange {
    pub phase: Phase,
    /// The face of the receiver that points back at the sender.
    pub from: Direction,
    pub ids: Vec<usize>,
    pub species: Vec<usize>,
    pub positions: Vec<[f64; 3]>,
    pub velocities: Vec<[f64; 3]>,
    pub forces: Vec<[f64; 3]>,
}
impl Exchange {
    pub fn new(phase: Phase, from: Direction) -> Self {
        Self {
            phase,
            from,
            ids: Vec::new(),
            species: Vec::new(),
            positions: Vec::new(),
            velocities: Vec::new(),
            forces: Vec::new(),
        }
    }
}

/// One worker's slice of a checkpoint, gathered by the manager.
#[derive(Debug)]
pub struct CheckpointPart {
    pub path: PathBuf,
    pub ids: Vec<usize>,
    pub species: Vec<usize>,
    pub positions: Vec<[f64; 3]>,
    pub velocities: Vec<[f64; 3]>,
    /// Box and clock metadata, supplied by the first worker only.
    pub meta: Option<CheckpointMeta>,
}

#[derive(Debug)]
pub struct CheckpointMeta {
    pub edges: [f64; 3],
    pub periodic: [bool; 3],
    pub species_table: Vec<Species>,
    pub time: f64,
    pub step: usize,
}

/// Worker-to-manager messages.
pub enum WorkerMsg {
    /// Route an exchange channel to another worker.
    Link {
        to: usize,
        from: Direction,
        sender: mpsc::Sender<Exchange>,
    },
    /// Contribute to a global element-wise sum; the manager answers every
    /// worker with `MainMsg::Reduced` once all contributions are in.
    Reduce(Vec<f64>),
    /// Contribute owned atoms to a checkpoint file.
    Checkpoint(Box<CheckpointPart>),
    Complete,
    Failed(Error),
}

/// Manager-to-worker messages.
pub enum MainMsg<P: PairPotential> {
    Setup { index: usize, count: usize },
    Run(fn(&mut Engine<P>) -> Result<(), Error>),
    Link {
        from: Direction,
        sender: mpsc::Sender<Exchange>,
    },
    Reduced(Vec<f64>),
    CheckpointSaved(Result<(), String>),
}
