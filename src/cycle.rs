//! Generic debounced down/up repetition counter
//!
//! A repetition is a confirmed DOWN phase followed by a confirmed UP phase.
//! Each phase must hold continuously for the dwell time; interruptions reset
//! the pending candidate with no partial credit. A cooldown separates counted
//! repetitions.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RepTiming;

/// Cycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Up,
    Down,
}

/// Two-state repetition counter
#[derive(Debug, Clone)]
pub struct CycleCounter {
    phase: Phase,
    reps: u32,
    last_rep_ms: Option<i64>,
    down_since: Option<i64>,
    up_since: Option<i64>,
}

impl Default for CycleCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleCounter {
    pub fn new() -> Self {
        Self {
            phase: Phase::Up,
            reps: 0,
            last_rep_ms: None,
            down_since: None,
            up_since: None,
        }
    }

    /// Zero the count and clear all phase state
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn current_reps(&self) -> u32 {
        self.reps
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Advance the counter by one observation.
    ///
    /// Returns the repetition count and whether a repetition was confirmed on
    /// this call.
    pub fn process(&mut self, is_down: bool, is_up: bool, now: i64, timing: &RepTiming) -> (u32, bool) {
        match self.phase {
            Phase::Up => {
                self.up_since = None;
                if !is_down {
                    self.down_since = None;
                    return (self.reps, false);
                }
                let since = *self.down_since.get_or_insert(now);
                if elapsed(since, now) >= timing.stable_ms {
                    debug!(at_ms = now, "cycle entered down phase");
                    self.phase = Phase::Down;
                    self.down_since = None;
                }
                (self.reps, false)
            }
            Phase::Down => {
                self.down_since = None;
                if !is_up {
                    self.up_since = None;
                    return (self.reps, false);
                }
                let since = *self.up_since.get_or_insert(now);
                let dwell_done = elapsed(since, now) >= timing.stable_ms;
                let cooled_down = self
                    .last_rep_ms
                    .map_or(true, |last| elapsed(last, now) >= timing.min_rep_interval_ms);
                if dwell_done && cooled_down {
                    self.reps += 1;
                    self.phase = Phase::Up;
                    self.up_since = None;
                    self.last_rep_ms = Some(now);
                    debug!(at_ms = now, reps = self.reps, "repetition counted");
                    return (self.reps, true);
                }
                (self.reps, false)
            }
        }
    }
}

/// Time between two timestamps; a clock that went backwards yields zero
pub(crate) fn elapsed(since: i64, now: i64) -> i64 {
    now.saturating_sub(since).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing(stable_ms: i64, min_rep_interval_ms: i64) -> RepTiming {
        RepTiming {
            stable_ms,
            min_rep_interval_ms,
        }
    }

    #[test]
    fn test_down_then_up_counts_one_rep() {
        let t = timing(50, 100);
        let mut counter = CycleCounter::new();

        assert_eq!(counter.process(true, false, 0, &t), (0, false));
        assert_eq!(counter.phase(), Phase::Up);
        assert_eq!(counter.process(true, false, 60, &t), (0, false));
        assert_eq!(counter.phase(), Phase::Down);

        assert_eq!(counter.process(false, true, 120, &t), (0, false));
        assert_eq!(counter.process(false, true, 180, &t), (1, true));
        assert_eq!(counter.phase(), Phase::Up);
        assert_eq!(counter.current_reps(), 1);

        // The event is reported on the confirming call only
        assert_eq!(counter.process(false, true, 240, &t), (1, false));
    }

    #[test]
    fn test_only_up_never_counts() {
        let t = timing(50, 100);
        let mut counter = CycleCounter::new();
        for i in 0..100 {
            let (reps, event) = counter.process(false, true, i * 30, &t);
            assert_eq!(reps, 0);
            assert!(!event);
        }
    }

    #[test]
    fn test_interrupted_down_gets_no_partial_credit() {
        let t = timing(50, 100);
        let mut counter = CycleCounter::new();
        counter.process(true, false, 0, &t);
        counter.process(true, false, 40, &t);
        counter.process(false, false, 45, &t);
        counter.process(true, false, 60, &t);
        counter.process(true, false, 100, &t);
        assert_eq!(counter.phase(), Phase::Up);
        counter.process(true, false, 110, &t);
        assert_eq!(counter.phase(), Phase::Down);
    }

    #[test]
    fn test_interrupted_up_resets_candidate() {
        let t = timing(50, 100);
        let mut counter = CycleCounter::new();
        counter.process(true, false, 0, &t);
        counter.process(true, false, 50, &t);
        counter.process(false, true, 100, &t);
        counter.process(false, false, 140, &t);
        assert_eq!(counter.process(false, true, 150, &t), (0, false));
        assert_eq!(counter.process(false, true, 190, &t), (0, false));
        assert_eq!(counter.process(false, true, 200, &t), (1, true));
    }

    #[test]
    fn test_cooldown_limits_rep_rate() {
        let t = timing(10, 500);
        let mut counter = CycleCounter::new();

        counter.process(true, false, 0, &t);
        counter.process(true, false, 10, &t);
        counter.process(false, true, 20, &t);
        assert_eq!(counter.process(false, true, 30, &t), (1, true));

        // A second full cycle well inside the cooldown
        counter.process(true, false, 40, &t);
        counter.process(true, false, 50, &t);
        counter.process(false, true, 60, &t);
        assert_eq!(counter.process(false, true, 70, &t), (1, false));
        assert_eq!(counter.process(false, true, 300, &t), (1, false));

        // Still holding up once the cooldown has elapsed
        assert_eq!(counter.process(false, true, 530, &t), (2, true));
    }

    #[test]
    fn test_count_is_monotonic_under_noise() {
        let t = timing(20, 60);
        let mut counter = CycleCounter::new();
        let mut last = 0;
        let mut events = 0;
        for i in 0..2000_i64 {
            let is_down = (i / 3) % 4 == 0;
            let is_up = (i / 5) % 3 == 1;
            let (reps, event) = counter.process(is_down, is_up, i * 7, &t);
            assert!(reps >= last);
            if event {
                events += 1;
                assert_eq!(reps, last + 1);
            } else {
                assert_eq!(reps, last);
            }
            last = reps;
        }
        assert_eq!(events, counter.current_reps());
    }

    #[test]
    fn test_reset_clears_everything() {
        let t = timing(0, 0);
        let mut counter = CycleCounter::new();
        counter.process(true, false, 0, &t);
        counter.process(false, true, 1, &t);
        assert_eq!(counter.current_reps(), 1);
        counter.process(true, false, 2, &t);
        assert_eq!(counter.phase(), Phase::Down);

        counter.reset();
        assert_eq!(counter.current_reps(), 0);
        assert_eq!(counter.phase(), Phase::Up);
    }
}
