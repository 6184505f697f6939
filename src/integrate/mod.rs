mod thermostat;
mod verlet;

pub use thermostat::Berendsen;
pub use verlet::VelocityVerlet;

use crate::units;

/// Instantaneous temperature from the equipartition relation,
/// T = 2 KE / (dof kB), with three degrees of freedom per atom.
pub fn temperature_from_kinetic(kinetic: f64, natoms: usize) -> f64 {
    if natoms == 0 {
        return 0.0;
    }
    2.0 * kinetic / (3.0 * natoms as f64 * units::BOLTZMANN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn equipartition_round_trip() {
        // KE chosen so T = 100 K for 10 atoms
        let ke = 1.5 * 10.0 * units::BOLTZMANN * 100.0;
        assert_relative_eq!(temperature_from_kinetic(ke, 10), 100.0, epsilon = 1e-12);
        assert_eq!(temperature_from_kinetic(1.0, 0), 0.0);
    }
}
