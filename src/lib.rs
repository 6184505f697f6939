pub mod atoms;
pub mod checkpoint;
pub mod clock;
pub mod engine;
pub mod error;
pub mod integrate;
pub mod lattice;
pub mod neighbor;
pub mod parallel;
pub mod potential;
pub mod prelude;
pub mod region;
pub mod runtime;
pub mod scheduler;
pub mod simbox;
pub mod species;
pub mod units;
pub mod utils;

pub use atoms::Atoms;
pub use checkpoint::Checkpoint;
pub use clock::Clock;
pub use engine::{Engine, EventHandler, Mode};
pub use error::Error;
pub use integrate::{Berendsen, VelocityVerlet};
pub use lattice::{Fcc, Lattice};
pub use neighbor::{NeighborList, UpdateSettings};
pub use potential::{LennardJones, PairPotential};
pub use region::Rect;
pub use runtime::Runtime;
pub use scheduler::{Event, EventScheduler, TimerHandle};
pub use simbox::{Boundary, SimBox};
pub use species::Species;
