//! Fixed-period loop pacing.

use log::{debug, warn};

use crate::poll::Timekeeper;

/// Outcome of one pacing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaceOutcome {
    /// The cycle finished early and the pacer slept the remainder.
    Slept {
        /// Sleep duration in milliseconds.
        slept_ms: u32,
    },

    /// The cycle overran the period; no sleep, the next cycle starts
    /// immediately.
    Overrun {
        /// Measured cycle duration in milliseconds.
        duration_ms: u32,
    },
}

/// Pads each acquisition cycle to a fixed period. Work shorter than the
/// period is topped up with sleep; an overrunning cycle is logged and the
/// loop continues at whatever cadence the overrun permits, it never catches
/// up or drops cycles.
pub struct Pacer {
    period_ms: u32,
    cycle_start_ms: u32,
}

impl Pacer {
    /// Create a pacer; the first cycle is measured from `now`.
    ///
    /// # Arguments
    /// * `period_ms` - The target cycle period in milliseconds.
    /// * `now_ms` - The current uptime.
    ///
    /// # Returns
    /// * `Pacer` - The pacer.
    pub fn new(period_ms: u32, now_ms: u32) -> Self {
        Self {
            period_ms,
            cycle_start_ms: now_ms,
        }
    }

    /// Finish the current cycle: sleep the remainder of the period, or log a
    /// warning if the cycle overran it. The next cycle is measured from the
    /// moment this call returns.
    ///
    /// # Arguments
    /// * `timekeeper` - The clock and delay provider.
    ///
    /// # Returns
    /// * `PaceOutcome` - What the pacer did.
    pub fn pace(&mut self, timekeeper: &dyn Timekeeper) -> PaceOutcome {
        let duration_ms = timekeeper.uptime_ms().wrapping_sub(self.cycle_start_ms);
        debug!("Loop duration: {} ms", duration_ms);

        let outcome = if duration_ms < self.period_ms {
            let slept_ms = self.period_ms - duration_ms;
            debug!("Sleeping for {} ms", slept_ms);
            timekeeper.sleep_ms(slept_ms);
            PaceOutcome::Slept { slept_ms }
        } else {
            warn!("Loop duration too long: {} ms", duration_ms);
            PaceOutcome::Overrun { duration_ms }
        };

        self.cycle_start_ms = timekeeper.uptime_ms();
        outcome
    }
}

/// Tests.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockClock;

    #[test]
    fn short_cycle_sleeps_the_remainder() {
        let clock = MockClock::new();
        let mut pacer = Pacer::new(5000, clock.uptime_ms());

        clock.advance_ms(1200);
        assert_eq!(pacer.pace(&clock), PaceOutcome::Slept { slept_ms: 3800 });
        assert_eq!(clock.uptime_ms(), 5000);
    }

    #[test]
    fn overrun_does_not_sleep() {
        let clock = MockClock::new();
        let mut pacer = Pacer::new(5000, clock.uptime_ms());

        clock.advance_ms(6100);
        assert_eq!(
            pacer.pace(&clock),
            PaceOutcome::Overrun { duration_ms: 6100 }
        );

        // The next cycle starts immediately.
        assert_eq!(clock.uptime_ms(), 6100);
    }

    #[test]
    fn exact_period_counts_as_overrun() {
        let clock = MockClock::new();
        let mut pacer = Pacer::new(5000, clock.uptime_ms());

        clock.advance_ms(5000);
        assert_eq!(
            pacer.pace(&clock),
            PaceOutcome::Overrun { duration_ms: 5000 }
        );
    }

    #[test]
    fn sleep_time_is_not_charged_to_the_next_cycle() {
        let clock = MockClock::new();
        let mut pacer = Pacer::new(5000, clock.uptime_ms());

        clock.advance_ms(1000);
        pacer.pace(&clock);

        // Next cycle does 2000 ms of work; the previous sleep must not count.
        clock.advance_ms(2000);
        assert_eq!(pacer.pace(&clock), PaceOutcome::Slept { slept_ms: 3000 });
    }
}
