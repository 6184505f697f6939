use thiserror::Error;

use crate::utils::Axis;

/// Engine error taxonomy.
///
/// Configuration errors are surfaced eagerly at setup, before any step
/// runs. Numeric faults abort the step loop: a corrupted trajectory cannot
/// be replayed, so there is no retry path. Checkpoint i/o failures are
/// recoverable and leave the run in a consistent state.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid box: {0}")]
    InvalidBox(String),

    #[error("subdomain grid {grid:?} does not match {nworkers} worker(s)")]
    GridMismatch { grid: [usize; 3], nworkers: usize },

    #[error("subdomain extent {extent} on axis {axis:?} is smaller than the cutoff {cutoff}")]
    SubdomainTooSmall { axis: Axis, extent: f64, cutoff: f64 },

    #[error("invalid species {name:?}: {reason}")]
    InvalidSpecies { name: String, reason: String },

    #[error("unknown species id {0}")]
    UnknownSpecies(usize),

    #[error("no pair coefficients for species pair ({i}, {j})")]
    MissingPairCoeff { i: usize, j: usize },

    #[error("potential covers {potential} species but the table has {table}")]
    SpeciesCountMismatch { potential: usize, table: usize },

    #[error("invalid run request: {0}")]
    InvalidRun(String),

    #[error("invalid timer: {0}")]
    InvalidTimer(String),

    #[error("invalid thermostat: {0}")]
    InvalidThermostat(String),

    #[error("engine is not fully configured: {0}")]
    NotConfigured(&'static str),

    #[error("no atoms in the system")]
    NoAtoms,

    #[error("atoms {i} and {j} are at zero separation")]
    DegenerateSeparation { i: usize, j: usize },

    #[error("non-finite {0}")]
    NonFinite(&'static str),

    #[error("a position left the box on non-periodic axis {axis:?} at coordinate {coord}")]
    OutOfBounds { axis: Axis, coord: f64 },

    #[error("checkpoint i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("checkpoint write failed: {0}")]
    CheckpointIo(String),

    #[error("incompatible checkpoint: found format version {found}, expected {expected}")]
    IncompatibleCheckpoint { found: u32, expected: u32 },

    #[error("a worker or the manager disconnected")]
    Disconnected,
}
