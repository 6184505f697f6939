use rand::{rngs::StdRng, SeedableRng};
use rand_distr::Distribution;

use crate::{error::Error, species::Species, units};

/// Structure-of-arrays atom store for one worker.
///
/// The first `nlocal` entries are the atoms this worker owns; entries past
/// `nlocal` are read-only halo copies of atoms owned by adjacent workers.
/// Global ids are stable across migration; array indices are not.
#[derive(Debug, Default)]
pub struct Atoms {
    pub ids: Vec<usize>,
    pub species: Vec<usize>,
    pub positions: Vec<[f64; 3]>,
    pub velocities: Vec<[f64; 3]>,
    pub forces: Vec<[f64; 3]>,
    nlocal: usize,
    species_table: Vec<Species>,
}
impl Atoms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_atoms(&self) -> usize {
        self.ids.len()
    }
    pub fn nlocal(&self) -> usize {
        self.nlocal
    }
    pub fn num_ghosts(&self) -> usize {
        self.ids.len() - self.nlocal
    }
    pub fn species_table(&self) -> &[Species] {
        &self.species_table
    }
    pub fn num_species(&self) -> usize {
        self.species_table.len()
    }
    pub fn mass(&self, idx: usize) -> f64 {
        self.species_table[self.species[idx]].mass()
    }

    pub(crate) fn set_species_table(&mut self, table: Vec<Species>) {
        self.species_table = table;
    }

    /// Add an owned atom. Ghosts must have been dropped first so the owned
    /// prefix stays contiguous.
    pub fn add_owned(
        &mut self,
        id: usize,
        species: usize,
        position: [f64; 3],
        velocity: [f64; 3],
    ) -> Result<(), Error> {
        if species >= self.species_table.len() {
            return Err(Error::UnknownSpecies(species));
        }
        debug_assert_eq!(self.ids.len(), self.nlocal, "ghosts present");
        self.ids.push(id);
        self.species.push(species);
        self.positions.push(position);
        self.velocities.push(velocity);
        self.forces.push([0.0; 3]);
        self.nlocal += 1;
        Ok(())
    }

    /// Append a halo copy after the owned prefix.
    pub fn add_ghost(&mut self, id: usize, species: usize, position: [f64; 3]) {
        self.ids.push(id);
        self.species.push(species);
        self.positions.push(position);
        self.velocities.push([0.0; 3]);
        self.forces.push([0.0; 3]);
    }

    /// Drop every halo copy, keeping the owned prefix.
    pub fn clear_ghosts(&mut self) {
        self.ids.truncate(self.nlocal);
        self.species.truncate(self.nlocal);
        self.positions.truncate(self.nlocal);
        self.velocities.truncate(self.nlocal);
        self.forces.truncate(self.nlocal);
    }

    /// Remove owned atoms by index, e.g. after they migrated away.
    /// Indices must refer to owned atoms and there must be no ghosts.
    pub fn remove_owned(&mut self, idxs: &[usize]) {
        debug_assert_eq!(self.ids.len(), self.nlocal, "ghosts present");
        debug_assert!(idxs.iter().all(|&i| i < self.nlocal));
        fn filter<T: Copy>(idxs: &[usize], vec: &mut Vec<T>) {
            let mut keep = (0..vec.len()).map(|i| !idxs.contains(&i));
            vec.retain(|_| keep.next().unwrap());
        }
        filter(idxs, &mut self.ids);
        filter(idxs, &mut self.species);
        filter(idxs, &mut self.positions);
        filter(idxs, &mut self.velocities);
        filter(idxs, &mut self.forces);
        self.nlocal -= idxs.len();
    }

    pub fn increment_position(&mut self, i: usize, dr: [f64; 3]) {
        self.positions[i][0] += dr[0];
        self.positions[i][1] += dr[1];
        self.positions[i][2] += dr[2];
    }
    pub fn increment_velocity(&mut self, i: usize, dv: [f64; 3]) {
        self.velocities[i][0] += dv[0];
        self.velocities[i][1] += dv[1];
        self.velocities[i][2] += dv[2];
    }
    pub fn add_force(&mut self, i: usize, df: [f64; 3]) {
        self.forces[i][0] += df[0];
        self.forces[i][1] += df[1];
        self.forces[i][2] += df[2];
    }
    pub fn zero_forces(&mut self) {
        for f in &mut self.forces {
            *f = [0.0; 3];
        }
    }
    pub fn scale_velocities(&mut self, factor: f64) {
        for v in self.velocities.iter_mut().take(self.nlocal) {
            v[0] *= factor;
            v[1] *= factor;
            v[2] *= factor;
        }
    }

    /// Kinetic energy of the owned atoms.
    pub fn kinetic_energy(&self) -> f64 {
        (0..self.nlocal)
            .map(|i| {
                let v = self.velocities[i];
                0.5 * self.mass(i) * (v[0] * v[0] + v[1] * v[1] + v[2] * v[2])
            })
            .sum()
    }

    /// Momentum of the owned atoms and their total mass, for center-of-mass
    /// drift removal.
    pub fn momentum(&self) -> ([f64; 3], f64) {
        let mut p = [0.0; 3];
        let mut m_total = 0.0;
        for i in 0..self.nlocal {
            let m = self.mass(i);
            m_total += m;
            p[0] += m * self.velocities[i][0];
            p[1] += m * self.velocities[i][1];
            p[2] += m * self.velocities[i][2];
        }
        (p, m_total)
    }

    pub fn shift_velocities(&mut self, dv: [f64; 3]) {
        for v in self.velocities.iter_mut().take(self.nlocal) {
            v[0] += dv[0];
            v[1] += dv[1];
            v[2] += dv[2];
        }
    }

    /// Draw owned velocities from the Maxwell-Boltzmann distribution at the
    /// given temperature. Deterministic for a given seed.
    pub fn seed_velocities(&mut self, temperature: f64, seed: u64) {
        assert!(
            temperature.is_finite() && temperature > 0.0,
            "Temperature should be positive, found {}",
            temperature,
        );
        let mut rng = StdRng::seed_from_u64(seed);
        for i in 0..self.nlocal {
            let sigma = (units::BOLTZMANN * temperature / self.mass(i)).sqrt();
            let dist = rand_distr::Normal::new(0.0, sigma).expect("Invalid temperature");
            self.velocities[i] = [
                dist.sample(&mut rng),
                dist.sample(&mut rng),
                dist.sample(&mut rng),
            ];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argon_table() -> Vec<Species> {
        vec![Species::new("Ar", 39.948).unwrap()]
    }

    fn filled(n: usize) -> Atoms {
        let mut atoms = Atoms::new();
        atoms.set_species_table(argon_table());
        for i in 0..n {
            atoms
                .add_owned(i, 0, [i as f64, 0.0, 0.0], [0.0; 3])
                .unwrap();
        }
        atoms
    }

    #[test]
    fn owned_prefix_and_ghosts() {
        let mut atoms = filled(3);
        atoms.add_ghost(7, 0, [9.0, 0.0, 0.0]);
        assert_eq!(atoms.nlocal(), 3);
        assert_eq!(atoms.num_atoms(), 4);
        assert_eq!(atoms.num_ghosts(), 1);
        atoms.clear_ghosts();
        assert_eq!(atoms.num_atoms(), 3);
    }

    #[test]
    fn unknown_species_is_rejected() {
        let mut atoms = Atoms::new();
        atoms.set_species_table(argon_table());
        assert!(matches!(
            atoms.add_owned(0, 1, [0.0; 3], [0.0; 3]),
            Err(Error::UnknownSpecies(1))
        ));
    }

    #[test]
    fn remove_owned_keeps_order() {
        let mut atoms = filled(4);
        atoms.remove_owned(&[1, 3]);
        assert_eq!(atoms.ids, vec![0, 2]);
        assert_eq!(atoms.nlocal(), 2);
    }

    #[test]
    fn seeded_velocities_match_the_target_temperature() {
        let mut atoms = filled(4000);
        atoms.seed_velocities(100.0, 12345);
        let ke = atoms.kinetic_energy();
        let t = 2.0 * ke / (3.0 * 4000.0 * units::BOLTZMANN);
        assert!((t - 100.0).abs() < 10.0, "temperature {}", t);
    }

    #[test]
    fn com_removal_zeroes_momentum() {
        let mut atoms = filled(100);
        atoms.seed_velocities(50.0, 9);
        let (p, m) = atoms.momentum();
        atoms.shift_velocities([-p[0] / m, -p[1] / m, -p[2] / m]);
        let (p, _) = atoms.momentum();
        assert!(p.iter().all(|&c| c.abs() < 1e-9), "{:?}", p);
    }
}
