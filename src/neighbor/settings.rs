/// Cadence settings for neighbor-list rebuilds.
///
/// With `check` set the engine rebuilds exactly when some atom has moved
/// more than half the skin since the last build, the point where the list
/// could start missing pairs; that test runs every step and overrides the
/// cadence. Without it, rebuilds follow the schedule: every `every` steps,
/// at least `delay` steps after the previous one.
#[derive(Clone, Copy, Debug)]
pub struct UpdateSettings {
    pub every: usize,
    pub delay: usize,
    pub check: bool,
    last_build_step: usize,
}
impl UpdateSettings {
    pub fn new(every: usize, delay: usize, check: bool) -> Self {
        assert!(every > 0, "Update cadence should be positive");
        Self {
            every,
            delay,
            check,
            last_build_step: 0,
        }
    }

    /// Whether the cadence allows a rebuild at this step.
    pub fn cadence_due(&self, step: usize) -> bool {
        step % self.every == 0 && step - self.last_build_step >= self.delay
    }

    pub fn mark_built(&mut self, step: usize) {
        self.last_build_step = step;
    }
}
impl Default for UpdateSettings {
    fn default() -> Self {
        Self::new(1, 0, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cadence_respects_every_and_delay() {
        let mut s = UpdateSettings::new(5, 12, true);
        s.mark_built(0);
        assert!(!s.cadence_due(5));
        assert!(!s.cadence_due(11));
        assert!(!s.cadence_due(12)); // delay passed but not a multiple of every
        assert!(s.cadence_due(15));
    }
}
