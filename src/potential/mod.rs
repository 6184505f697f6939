mod lj;

pub use lj::{LennardJones, PairCoeff};

use crate::{atoms::Atoms, error::Error, simbox::SimBox};

/// A pairwise interatomic potential.
///
/// `evaluate` is the force pass: it accumulates forces into both atoms of
/// every pair with opposite signs and returns the potential energy summed
/// over the pass. The caller zeroes the accumulators beforehand.
pub trait PairPotential {
    /// The largest pair cutoff, which bounds halo and neighbor reach.
    fn cutoff(&self) -> f64;

    fn num_species(&self) -> usize;

    /// Check that every species pair has coefficients.
    fn validate(&self) -> Result<(), Error>;

    fn evaluate(
        &self,
        atoms: &mut Atoms,
        pairs: &[[usize; 2]],
        simbox: &SimBox,
    ) -> Result<f64, Error>;
}
