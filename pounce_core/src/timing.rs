//! Loop period measurement with EWMA smoothing.

use std::time::Instant;

/// Smoothing: 99% previous estimate, 1% new sample per iteration.
const DT_DECAY: f64 = 0.99;

/// Readings produced by one loop iteration boundary.
#[derive(Debug, Clone, Copy)]
pub struct LoopTick {
    /// Seconds since the run epoch.
    pub elapsed_s: f64,
    /// Instantaneous period: seconds since the previous tick.
    pub dt_s: f64,
    /// EWMA-filtered period.
    pub dt_filtered_s: f64,
}

/// Tracks the run epoch and the filtered iteration period.
///
/// The filter warms up from 0.0 rather than seeding with the first sample,
/// so early readings under-report the true period. Diagnostics only; never
/// used for control decisions.
#[derive(Debug, Clone, Copy)]
pub struct LoopTiming {
    epoch: Instant,
    last: Instant,
    dt_filtered_s: f64,
}

impl LoopTiming {
    pub fn start(now: Instant) -> Self {
        Self {
            epoch: now,
            last: now,
            dt_filtered_s: 0.0,
        }
    }

    /// Record one iteration boundary at `now`.
    pub fn tick(&mut self, now: Instant) -> LoopTick {
        let elapsed_s = now.saturating_duration_since(self.epoch).as_secs_f64();
        let dt_s = now.saturating_duration_since(self.last).as_secs_f64();
        self.dt_filtered_s = DT_DECAY * self.dt_filtered_s + (1.0 - DT_DECAY) * dt_s;
        self.last = now;
        LoopTick {
            elapsed_s,
            dt_s,
            dt_filtered_s: self.dt_filtered_s,
        }
    }

    pub fn dt_filtered_s(&self) -> f64 {
        self.dt_filtered_s
    }

    pub fn epoch(&self) -> Instant {
        self.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn elapsed_is_measured_from_the_epoch() {
        let t0 = Instant::now();
        let mut timing = LoopTiming::start(t0);

        let tick = timing.tick(t0 + Duration::from_millis(250));
        assert!((tick.elapsed_s - 0.25).abs() < 1e-9);
        assert!((tick.dt_s - 0.25).abs() < 1e-9);

        let tick = timing.tick(t0 + Duration::from_millis(300));
        assert!((tick.elapsed_s - 0.30).abs() < 1e-9);
        assert!((tick.dt_s - 0.05).abs() < 1e-9);
    }

    #[test]
    fn filtered_period_converges_geometrically() {
        let dt = 0.0025;
        let t0 = Instant::now();
        let mut timing = LoopTiming::start(t0);

        // With a constant true dt, the error against dt shrinks by exactly
        // the decay factor each tick: |filtered - dt| = 0.99^n * dt.
        let mut now = t0;
        for n in 1..=2000u32 {
            now += Duration::from_secs_f64(dt);
            let tick = timing.tick(now);
            let expected_err = DT_DECAY.powi(n as i32) * dt;
            let actual_err = (tick.dt_filtered_s - dt).abs();
            assert!(
                actual_err <= expected_err + 1e-12,
                "tick {n}: error {actual_err} above bound {expected_err}"
            );
        }
        assert!((timing.dt_filtered_s() - dt).abs() < dt * 1e-8);
    }

    #[test]
    fn first_tick_warms_up_from_zero() {
        let t0 = Instant::now();
        let mut timing = LoopTiming::start(t0);
        let tick = timing.tick(t0 + Duration::from_millis(10));
        // One sample in: 1% of the observed dt.
        assert!((tick.dt_filtered_s - 0.0001).abs() < 1e-9);
    }
}
