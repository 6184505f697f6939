use crate::error::Error;

/// Opaque identity of a timer, stable for the life of the scheduler.
///
/// Handles index in creation order, which is also the tie-break order for
/// coincident firings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(usize);
impl TimerHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Event payloads delivered to the registered handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    TimerFired { timer: TimerHandle },
}

/// A single firing reported by `EventScheduler::advance`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Firing {
    pub time: f64,
    pub timer: TimerHandle,
}

#[derive(Clone, Debug)]
struct Timer {
    start: f64,
    period: f64,
    stop: f64, // negative = unbounded
    fire_count: u64,
    removed: bool,
}
impl Timer {
    /// Fire times are start + n * period, so repeated firing accumulates no
    /// floating-point drift.
    fn next_fire_time(&self) -> f64 {
        self.start + self.fire_count as f64 * self.period
    }
}

/// The set of periodic timers driving callback dispatch.
///
/// `advance` is called once per step with the new simulation time and
/// reports every period that elapsed, each as its own firing, ordered by
/// nondecreasing fire time with creation order breaking ties. A timer past
/// its stop time goes inert but keeps its slot until removed explicitly.
#[derive(Clone, Debug, Default)]
pub struct EventScheduler {
    timers: Vec<Timer>,
}
impl EventScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn make_timer(&mut self, start: f64, period: f64, stop: f64) -> Result<TimerHandle, Error> {
        if !start.is_finite() || start < 0.0 {
            return Err(Error::InvalidTimer(format!(
                "start time {} should be nonnegative",
                start
            )));
        }
        if !period.is_finite() || period <= 0.0 {
            return Err(Error::InvalidTimer(format!(
                "period {} should be positive",
                period
            )));
        }
        if stop.is_nan() {
            return Err(Error::InvalidTimer("stop time is NaN".into()));
        }
        let handle = TimerHandle(self.timers.len());
        self.timers.push(Timer {
            start,
            period,
            stop,
            fire_count: 0,
            removed: false,
        });
        Ok(handle)
    }

    pub fn remove(&mut self, handle: TimerHandle) {
        if let Some(timer) = self.timers.get_mut(handle.0) {
            timer.removed = true;
        }
    }

    pub fn num_timers(&self) -> usize {
        self.timers.iter().filter(|t| !t.removed).count()
    }

    /// How many times a timer has fired so far.
    pub fn fire_count(&self, handle: TimerHandle) -> u64 {
        self.timers[handle.0].fire_count
    }

    /// Collect every firing due at or before `now`.
    pub fn advance(&mut self, now: f64) -> Vec<Firing> {
        let mut firings = Vec::new();
        for (idx, timer) in self.timers.iter_mut().enumerate() {
            if timer.removed {
                continue;
            }
            loop {
                let next = timer.next_fire_time();
                if next > now {
                    break;
                }
                if timer.stop >= 0.0 && next > timer.stop {
                    break;
                }
                firings.push(Firing {
                    time: next,
                    timer: TimerHandle(idx),
                });
                timer.fire_count += 1;
            }
        }
        // fire times that agree to rounding error count as coincident, so
        // the creation-order tie-break is not defeated by ulp noise
        firings.sort_by(|a, b| {
            let tol = 4.0 * f64::EPSILON * a.time.abs().max(b.time.abs()).max(1.0);
            if (a.time - b.time).abs() <= tol {
                a.timer.0.cmp(&b.timer.0)
            } else {
                a.time.partial_cmp(&b.time).expect("fire times are finite")
            }
        });
        firings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_firing_before_start() {
        let mut s = EventScheduler::new();
        let t = s.make_timer(1.0, 0.5, -1.0).unwrap();
        assert!(s.advance(0.99).is_empty());
        let firings = s.advance(1.0);
        assert_eq!(firings, vec![Firing { time: 1.0, timer: t }]);
    }

    #[test]
    fn coarse_steps_report_every_elapsed_period() {
        let mut s = EventScheduler::new();
        let t = s.make_timer(0.0, 0.1, -1.0).unwrap();
        s.advance(0.0);
        let firings = s.advance(0.35);
        let times: Vec<f64> = firings.iter().map(|f| f.time).collect();
        assert_eq!(times, vec![0.1, 0.2, 0.30000000000000004]);
        assert_eq!(s.fire_count(t), 4);
    }

    #[test]
    fn coincident_firings_follow_creation_order() {
        // periods 0.05 and 0.04 meet at their least common multiple 0.20
        let mut s = EventScheduler::new();
        let first = s.make_timer(0.0, 0.05, -1.0).unwrap();
        let second = s.make_timer(0.0, 0.04, -1.0).unwrap();

        let dt = 2e-3;
        let mut coincident = None;
        for step in 1..=100 {
            let now = step as f64 * dt;
            let firings = s.advance(now);
            let together: Vec<&Firing> = firings
                .iter()
                .filter(|f| (f.time - 0.20).abs() < 1e-9)
                .collect();
            if together.len() == 2 {
                coincident = Some((together[0].timer, together[1].timer, step));
            }
        }
        let (a, b, step) = coincident.expect("both timers fire at t = 0.20");
        assert_eq!(a, first);
        assert_eq!(b, second);
        assert_eq!(step, 100);
    }

    #[test]
    fn stop_time_makes_a_timer_inert_but_keeps_it() {
        let mut s = EventScheduler::new();
        let t = s.make_timer(0.0, 0.1, 0.25).unwrap();
        s.advance(0.0);
        assert_eq!(s.advance(1.0).len(), 2); // 0.1 and 0.2 only
        assert_eq!(s.advance(2.0).len(), 0);
        assert_eq!(s.num_timers(), 1);
        s.remove(t);
        assert_eq!(s.num_timers(), 0);
        assert!(s.advance(3.0).is_empty());
    }

    #[test]
    fn firings_are_time_ordered_across_timers() {
        let mut s = EventScheduler::new();
        let slow = s.make_timer(0.0, 0.3, -1.0).unwrap();
        let fast = s.make_timer(0.0, 0.1, -1.0).unwrap();
        s.advance(0.0);
        let firings = s.advance(0.6);
        let order: Vec<(usize, bool)> = firings
            .iter()
            .map(|f| (f.timer.index(), f.timer == slow))
            .collect();
        // 0.1 0.2 0.3 0.3 0.4 0.5 0.6 0.6, slow first on ties
        assert_eq!(firings.len(), 8);
        assert!(firings.windows(2).all(|w| w[0].time <= w[1].time));
        assert_eq!(order[2], (slow.index(), true));
        assert_eq!(order[3], (fast.index(), false));
    }

    #[test]
    fn rejects_bad_timers() {
        let mut s = EventScheduler::new();
        assert!(s.make_timer(0.0, 0.0, -1.0).is_err());
        assert!(s.make_timer(-1.0, 0.1, -1.0).is_err());
        assert!(s.make_timer(0.0, 0.1, f64::NAN).is_err());
    }
}
