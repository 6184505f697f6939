pub use crate::{
    Atoms, Engine, Error, Event, Fcc, Lattice, LennardJones, Runtime, SimBox, Species,
    UpdateSettings,
};
