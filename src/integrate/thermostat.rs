use crate::error::Error;

/// Berendsen velocity-rescaling thermostat.
///
/// Each thermostatted step multiplies every velocity by
/// `sqrt(1 + (dt/tau)(target/current - 1))`, relaxing the kinetic
/// temperature toward the target with time constant `tau`.
#[derive(Clone, Copy, Debug)]
pub struct Berendsen {
    target: f64,
    tau: f64,
}
impl Berendsen {
    pub fn new(target: f64, tau: f64) -> Result<Self, Error> {
        if !target.is_finite() || target <= 0.0 {
            return Err(Error::InvalidThermostat(format!(
                "target temperature {} should be positive",
                target
            )));
        }
        if !tau.is_finite() || tau <= 0.0 {
            return Err(Error::InvalidThermostat(format!(
                "coupling time constant {} should be positive",
                tau
            )));
        }
        Ok(Self { target, tau })
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn rescale_factor(&self, dt: f64, current: f64) -> f64 {
        if current <= 0.0 {
            // a system at rest carries no kinetic scale to rescale
            return 1.0;
        }
        (1.0 + dt / self.tau * (self.target / current - 1.0))
            .max(0.0)
            .sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rescaling_moves_toward_the_target() {
        let b = Berendsen::new(100.0, 0.02).unwrap();
        // too cold: speed up
        assert!(b.rescale_factor(2e-3, 50.0) > 1.0);
        // too hot: slow down
        assert!(b.rescale_factor(2e-3, 200.0) < 1.0);
        // on target: unity
        assert_relative_eq!(b.rescale_factor(2e-3, 100.0), 1.0, epsilon = 1e-12);
        // at rest: no-op instead of a division blow-up
        assert_eq!(b.rescale_factor(2e-3, 0.0), 1.0);
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(Berendsen::new(0.0, 0.02).is_err());
        assert!(Berendsen::new(100.0, -1.0).is_err());
    }
}
