//! Fixed-rate sampling clock for the periodic control tasks.
//!
//! Tracks elapsed time between ticks against a monotonic clock and flags
//! ticks whose delta exceeds the overrun tolerance. The clock never blocks
//! inside [`SampleClock::tick`]; pacing is a separate call so that callers
//! driven by a blocking hardware read can skip it entirely.

use std::time::{Duration, Instant};

/// Default overrun tolerance as a multiple of the target period.
///
/// A tick is flagged as an overrun when its measured delta exceeds
/// `DEFAULT_OVERRUN_FACTOR / target_hz`. The threshold scales with the
/// configured rate rather than being a fixed cutoff, so reconfiguring the
/// loop frequency keeps the tolerance meaningful.
pub const DEFAULT_OVERRUN_FACTOR: f64 = 1.5;

/// Result of a single clock tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tick {
    /// Elapsed time since the previous tick, within tolerance.
    Nominal(f64),
    /// Elapsed time exceeded the overrun threshold. The caller must skip
    /// the control update for this tick and force outputs to the safe
    /// default (zero) instead of running control with a stale delta.
    Overrun(f64),
}

impl Tick {
    /// Elapsed seconds regardless of classification.
    pub fn dt(&self) -> f64 {
        match *self {
            Tick::Nominal(dt) | Tick::Overrun(dt) => dt,
        }
    }

    /// True if this tick missed its deadline.
    pub fn is_overrun(&self) -> bool {
        matches!(self, Tick::Overrun(_))
    }
}

/// Monotonic sampling clock for a fixed-rate periodic task.
///
/// Constructed once per task and ticked every loop iteration. The reference
/// instant is seeded at construction so the first delta is a small valid
/// value rather than time-since-epoch.
#[derive(Debug)]
pub struct SampleClock {
    last: Instant,
    deadline: Instant,
    period: Duration,
    overrun_threshold: f64,
}

impl SampleClock {
    /// Create a clock for the given target frequency with the default
    /// overrun tolerance.
    pub fn new(target_hz: f64) -> Self {
        Self::with_overrun_factor(target_hz, DEFAULT_OVERRUN_FACTOR)
    }

    /// Create a clock with an explicit overrun factor `k`; the overrun
    /// threshold is `k / target_hz` seconds.
    pub fn with_overrun_factor(target_hz: f64, k: f64) -> Self {
        let period = Duration::from_secs_f64(1.0 / target_hz);
        let now = Instant::now();
        Self {
            last: now,
            deadline: now + period,
            period,
            overrun_threshold: k / target_hz,
        }
    }

    /// Nominal period between ticks in seconds.
    pub fn target_period(&self) -> f64 {
        self.period.as_secs_f64()
    }

    /// Delta above which a tick is classified as an overrun, in seconds.
    pub fn overrun_threshold(&self) -> f64 {
        self.overrun_threshold
    }

    /// Measure the elapsed time since the previous tick and advance the
    /// reference instant. Never blocks and never returns a negative delta.
    pub fn tick(&mut self) -> Tick {
        let now = Instant::now();
        let dt = now.duration_since(self.last).as_secs_f64();
        self.last = now;
        if dt > self.overrun_threshold {
            Tick::Overrun(dt)
        } else {
            Tick::Nominal(dt)
        }
    }

    /// Sleep until the next tick deadline. This is the only blocking call
    /// in a loop iteration. If the deadline has already passed (the loop
    /// overran), the deadline is re-anchored to one period from now so a
    /// single long stall does not produce a burst of catch-up ticks.
    pub fn wait_for_next_tick(&mut self) {
        let now = Instant::now();
        if self.deadline > now {
            std::thread::sleep(self.deadline - now);
            self.deadline += self.period;
        } else {
            self.deadline = now + self.period;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_is_small() {
        let mut clock = SampleClock::new(100.0);
        let tick = clock.tick();
        // Seeded at construction: the first delta is near zero, not epoch.
        assert!(tick.dt() < 0.1);
        assert!(!tick.is_overrun());
    }

    #[test]
    fn tick_delta_is_nonnegative_and_roughly_elapsed() {
        let mut clock = SampleClock::new(100.0);
        clock.tick();
        std::thread::sleep(Duration::from_millis(5));
        let dt = clock.tick().dt();
        assert!(dt >= 0.0);
        assert!(dt >= 0.004);
    }

    #[test]
    fn slow_tick_is_flagged_as_overrun() {
        let mut clock = SampleClock::new(100.0);
        clock.tick();
        // 100 Hz with k = 1.5 gives a 15 ms threshold.
        std::thread::sleep(Duration::from_millis(30));
        let tick = clock.tick();
        assert!(tick.is_overrun());
        assert!(tick.dt() > clock.overrun_threshold());
    }

    #[test]
    fn threshold_scales_with_frequency() {
        let fast = SampleClock::new(400.0);
        let slow = SampleClock::new(100.0);
        assert!(fast.overrun_threshold() < slow.overrun_threshold());
        assert!((slow.overrun_threshold() - 0.015).abs() < 1e-12);
    }

    #[test]
    fn explicit_factor_overrides_default() {
        let clock = SampleClock::with_overrun_factor(200.0, 4.0);
        assert!((clock.overrun_threshold() - 0.02).abs() < 1e-12);
    }

    #[test]
    fn pacing_keeps_loop_near_target_rate() {
        let mut clock = SampleClock::new(100.0);
        clock.tick();
        for _ in 0..10 {
            clock.wait_for_next_tick();
            let tick = clock.tick();
            assert!(!tick.is_overrun(), "paced tick overran: {:?}", tick);
        }
    }
}
