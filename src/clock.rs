/// The simulation clock, owned by the engine and advanced once per step.
#[derive(Clone, Copy, Debug, Default)]
pub struct Clock {
    time: f64,
    step: usize,
    dt: f64,
}
impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn time(&self) -> f64 {
        self.time
    }
    pub fn step(&self) -> usize {
        self.step
    }
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Fix the step size for the duration of a run or equilibrate call.
    pub fn set_dt(&mut self, dt: f64) {
        assert!(
            dt.is_finite() && dt > 0.0,
            "Timestep should be positive, found {}",
            dt,
        );
        self.dt = dt;
    }

    pub fn advance(&mut self) {
        self.step += 1;
        self.time += self.dt;
    }

    /// Reset to a checkpointed time and step.
    pub fn restore(&mut self, time: f64, step: usize) {
        self.time = time;
        self.step = step;
    }
}
