use super::PairPotential;
use crate::{atoms::Atoms, error::Error, simbox::SimBox};

/// Coefficients for one species pair.
#[derive(Clone, Copy, Debug)]
pub struct PairCoeff {
    sigma: f64,
    epsilon: f64,
    rcut: f64,
    sigma6: f64,
    rcut2: f64,
}
impl PairCoeff {
    fn new(sigma: f64, epsilon: f64, rcut: f64) -> Self {
        let sigma2 = sigma * sigma;
        Self {
            sigma,
            epsilon,
            rcut,
            sigma6: sigma2 * sigma2 * sigma2,
            rcut2: rcut * rcut,
        }
    }
    pub fn sigma(&self) -> f64 {
        self.sigma
    }
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }
    pub fn rcut(&self) -> f64 {
        self.rcut
    }
}

/// Lennard-Jones 12-6 potential, hard-truncated at the pair cutoff.
///
/// U(r) = 4 eps ((sig/r)^12 - (sig/r)^6)
/// F(r) = 24 eps / r^2 (2 (sig/r)^12 - (sig/r)^6) r_ij
///
/// No energy shift is applied at the cutoff.
pub struct LennardJones {
    num_species: usize,
    coeffs: Vec<Option<PairCoeff>>,
}
impl LennardJones {
    pub fn new(num_species: usize) -> Self {
        Self {
            num_species,
            coeffs: vec![None; num_species * num_species],
        }
    }

    /// Set coefficients for a species pair. Storage is symmetric: setting
    /// (i, j) also sets (j, i).
    pub fn set_coeff(
        &mut self,
        i: usize,
        j: usize,
        sigma: f64,
        epsilon: f64,
        rcut: f64,
    ) -> Result<(), Error> {
        if i >= self.num_species {
            return Err(Error::UnknownSpecies(i));
        }
        if j >= self.num_species {
            return Err(Error::UnknownSpecies(j));
        }
        assert!(
            sigma > 0.0 && epsilon > 0.0 && rcut > 0.0,
            "Pair coefficients should be positive, found sigma {} epsilon {} rcut {}",
            sigma,
            epsilon,
            rcut,
        );
        let coeff = PairCoeff::new(sigma, epsilon, rcut);
        self.coeffs[i * self.num_species + j] = Some(coeff);
        self.coeffs[j * self.num_species + i] = Some(coeff);
        Ok(())
    }

    pub fn coeff(&self, i: usize, j: usize) -> Option<&PairCoeff> {
        self.coeffs[i * self.num_species + j].as_ref()
    }
}

impl PairPotential for LennardJones {
    fn cutoff(&self) -> f64 {
        self.coeffs
            .iter()
            .flatten()
            .map(|c| c.rcut)
            .fold(0.0, f64::max)
    }
    fn num_species(&self) -> usize {
        self.num_species
    }
    fn validate(&self) -> Result<(), Error> {
        for i in 0..self.num_species {
            for j in i..self.num_species {
                if self.coeffs[i * self.num_species + j].is_none() {
                    return Err(Error::MissingPairCoeff { i, j });
                }
            }
        }
        Ok(())
    }

    fn evaluate(
        &self,
        atoms: &mut Atoms,
        pairs: &[[usize; 2]],
        simbox: &SimBox,
    ) -> Result<f64, Error> {
        let mut energy = 0.0;
        for &[i, j] in pairs {
            let coeff = self.coeffs[atoms.species[i] * self.num_species + atoms.species[j]]
                .expect("pair coefficients are validated before the first step");

            let pi = atoms.positions[i];
            let pj = atoms.positions[j];
            let dr = simbox.min_image([pi[0] - pj[0], pi[1] - pj[1], pi[2] - pj[2]]);
            let r2 = dr[0] * dr[0] + dr[1] * dr[1] + dr[2] * dr[2];

            if r2 > coeff.rcut2 {
                continue;
            }
            if r2 == 0.0 {
                return Err(Error::DegenerateSeparation {
                    i: atoms.ids[i],
                    j: atoms.ids[j],
                });
            }

            let sr6 = coeff.sigma6 / (r2 * r2 * r2);
            let f_over_r2 = 24.0 * coeff.epsilon * (2.0 * sr6 * sr6 - sr6) / r2;
            atoms.add_force(i, [dr[0] * f_over_r2, dr[1] * f_over_r2, dr[2] * f_over_r2]);
            atoms.add_force(
                j,
                [-dr[0] * f_over_r2, -dr[1] * f_over_r2, -dr[2] * f_over_r2],
            );
            energy += 4.0 * coeff.epsilon * (sr6 * sr6 - sr6);
        }
        if !energy.is_finite() {
            return Err(Error::NonFinite("potential energy"));
        }
        Ok(energy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::species::Species;
    use approx::assert_relative_eq;

    fn two_atoms(separation: f64) -> (Atoms, SimBox) {
        let mut atoms = Atoms::new();
        atoms.set_species_table(vec![Species::new("Ar", 39.948).unwrap()]);
        atoms
            .add_owned(0, 0, [10.0, 10.0, 10.0], [0.0; 3])
            .unwrap();
        atoms
            .add_owned(1, 0, [10.0 + separation, 10.0, 10.0], [0.0; 3])
            .unwrap();
        let simbox = SimBox::new([40.0; 3], [true; 3], [1, 1, 1]).unwrap();
        (atoms, simbox)
    }

    fn lj() -> LennardJones {
        let mut lj = LennardJones::new(1);
        lj.set_coeff(0, 0, 1.0, 1.0, 3.0).unwrap();
        lj
    }

    #[test]
    fn validate_reports_missing_pairs() {
        let lj = LennardJones::new(2);
        assert!(matches!(
            lj.validate(),
            Err(Error::MissingPairCoeff { i: 0, j: 0 })
        ));
        assert!(self::lj().validate().is_ok());
    }

    #[test]
    fn energy_is_zero_at_sigma_and_minimal_at_the_well() {
        let (mut atoms, simbox) = two_atoms(1.0);
        let e = lj().evaluate(&mut atoms, &[[0, 1]], &simbox).unwrap();
        assert_relative_eq!(e, 0.0, epsilon = 1e-12);

        // the well bottom sits at r = 2^(1/6) sigma with U = -eps and F = 0
        let (mut atoms, simbox) = two_atoms(2f64.powf(1.0 / 6.0));
        atoms.zero_forces();
        let e = lj().evaluate(&mut atoms, &[[0, 1]], &simbox).unwrap();
        assert_relative_eq!(e, -1.0, epsilon = 1e-12);
        assert!(atoms.forces[0][0].abs() < 1e-12);
    }

    #[test]
    fn forces_obey_newtons_third_law() {
        let (mut atoms, simbox) = two_atoms(0.9);
        let _ = lj().evaluate(&mut atoms, &[[0, 1]], &simbox).unwrap();
        // repulsive below sigma: atom 0 pushed toward -x
        assert!(atoms.forces[0][0] < 0.0);
        assert_relative_eq!(atoms.forces[0][0], -atoms.forces[1][0], epsilon = 1e-12);

        let (mut atoms, simbox) = two_atoms(1.5);
        let _ = lj().evaluate(&mut atoms, &[[0, 1]], &simbox).unwrap();
        // attractive beyond the well
        assert!(atoms.forces[0][0] > 0.0);
    }

    #[test]
    fn pairs_beyond_the_cutoff_are_hard_truncated() {
        let (mut atoms, simbox) = two_atoms(3.1);
        let e = lj().evaluate(&mut atoms, &[[0, 1]], &simbox).unwrap();
        assert_eq!(e, 0.0);
        assert_eq!(atoms.forces[0], [0.0; 3]);
    }

    #[test]
    fn separation_wraps_through_the_periodic_boundary() {
        let mut atoms = Atoms::new();
        atoms.set_species_table(vec![Species::new("Ar", 39.948).unwrap()]);
        atoms.add_owned(0, 0, [0.2, 5.0, 5.0], [0.0; 3]).unwrap();
        atoms.add_owned(1, 0, [39.5, 5.0, 5.0], [0.0; 3]).unwrap();
        let simbox = SimBox::new([40.0; 3], [true; 3], [1, 1, 1]).unwrap();
        // direct separation 39.3, wrapped separation 0.7
        let e = lj().evaluate(&mut atoms, &[[0, 1]], &simbox).unwrap();
        assert!(e > 0.0);
    }

    #[test]
    fn zero_separation_is_a_fault() {
        let (mut atoms, _) = two_atoms(1.0);
        atoms.positions[1] = atoms.positions[0];
        let simbox = SimBox::new([40.0; 3], [true; 3], [1, 1, 1]).unwrap();
        assert!(matches!(
            lj().evaluate(&mut atoms, &[[0, 1]], &simbox),
            Err(Error::DegenerateSeparation { i: 0, j: 1 })
        ));
    }
}
