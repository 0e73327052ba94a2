//! Frame pacing.

use std::time::{Duration, Instant};

/// Holds the loop to a fixed frame budget.
///
/// An iteration that finishes early sleeps for the rest of the budget; one
/// that overruns does not sleep at all.
#[derive(Debug, Clone, Copy)]
pub struct FramePacer {
    budget: Duration,
}

/// Timing of one paced iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Work time before any sleep.
    pub elapsed: Duration,
    pub slept: Duration,
}

impl Pacing {
    pub fn overran(&self, budget: Duration) -> bool {
        self.elapsed > budget
    }
}

impl FramePacer {
    pub fn new(budget: Duration) -> Self {
        Self { budget }
    }

    pub fn from_fps(fps: u32) -> Self {
        Self::new(Duration::from_secs(1) / fps.max(1))
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Time left in the budget for an iteration that has run `elapsed`.
    pub fn remaining(&self, elapsed: Duration) -> Duration {
        self.budget.saturating_sub(elapsed)
    }

    /// Sleeps out the rest of the budget for an iteration begun at `started`.
    pub fn pace(&self, started: Instant) -> Pacing {
        let elapsed = started.elapsed();
        let remaining = self.remaining(elapsed);
        if !remaining.is_zero() {
            std::thread::sleep(remaining);
        }
        Pacing {
            elapsed,
            slept: remaining,
        }
    }
}
