use crate::atoms::Atoms;

/// Velocity-Verlet integrator.
///
/// One step is a half-step velocity kick with the current forces, a full
/// position drift, a force re-evaluation, and a second half-step kick. The
/// engine interleaves wrapping, migration and halo refresh between the
/// drift and the force pass.
pub struct VelocityVerlet;

impl VelocityVerlet {
    /// Advance owned velocities by half a step using the current forces.
    pub fn half_kick(atoms: &mut Atoms, dt: f64) {
        let half_dt = 0.5 * dt;
        for i in 0..atoms.nlocal() {
            let inv_mass = 1.0 / atoms.mass(i);
            let f = atoms.forces[i];
            atoms.increment_velocity(
                i,
                [
                    half_dt * f[0] * inv_mass,
                    half_dt * f[1] * inv_mass,
                    half_dt * f[2] * inv_mass,
                ],
            );
        }
    }

    /// Advance owned positions by a full step using the current velocities.
    pub fn drift(atoms: &mut Atoms, dt: f64) {
        for i in 0..atoms.nlocal() {
            let v = atoms.velocities[i];
            atoms.increment_position(i, [dt * v[0], dt * v[1], dt * v[2]]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::species::Species;
    use approx::assert_relative_eq;

    #[test]
    fn constant_force_matches_the_analytic_trajectory() {
        let mut atoms = Atoms::new();
        atoms.set_species_table(vec![Species::new("m2", 2.0).unwrap()]);
        atoms.add_owned(0, 0, [0.0; 3], [1.0, 0.0, 0.0]).unwrap();
        atoms.forces[0] = [4.0, 0.0, 0.0];

        let dt = 0.1;
        // one full velocity-Verlet step under a constant force
        VelocityVerlet::half_kick(&mut atoms, dt);
        VelocityVerlet::drift(&mut atoms, dt);
        VelocityVerlet::half_kick(&mut atoms, dt);

        // x = v0 t + a t^2 / 2, v = v0 + a t, with a = 2
        assert_relative_eq!(atoms.positions[0][0], 0.11, epsilon = 1e-12);
        assert_relative_eq!(atoms.velocities[0][0], 1.2, epsilon = 1e-12);
    }
}
