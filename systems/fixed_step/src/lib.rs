#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Fixed-step scheduling for the Tilerunner simulation loop.
//!
//! Rendering frames arrive with variable wall-clock durations; physics runs
//! at a constant cadence. [`FixedStep`] accumulates frame time and drains it
//! in whole sub-steps, carrying the remainder to the next frame, so the
//! physics update frequency is independent of the rendering frame rate and
//! no sub-step is ever partially applied.

use std::time::Duration;

/// Canonical sub-step duration, one sixtieth of a second.
pub const DEFAULT_STEP: Duration = Duration::from_nanos(16_666_667);

/// Accumulates wall-clock time and converts it into fixed physics sub-steps.
#[derive(Clone, Copy, Debug)]
pub struct FixedStep {
    step: Duration,
    accumulator: Duration,
    max_steps_per_frame: Option<u32>,
}

impl FixedStep {
    /// Creates a scheduler with the provided sub-step duration.
    #[must_use]
    pub const fn new(step: Duration) -> Self {
        Self {
            step,
            accumulator: Duration::ZERO,
            max_steps_per_frame: None,
        }
    }

    /// Limits how many sub-steps a single [`advance`](Self::advance) call may
    /// yield. Accumulated time beyond the cap is discarded, trading perfect
    /// catch-up for a bounded amount of work after a long stall.
    #[must_use]
    pub const fn with_max_steps_per_frame(mut self, cap: u32) -> Self {
        self.max_steps_per_frame = Some(cap);
        self
    }

    /// Fixed duration of one sub-step.
    #[must_use]
    pub const fn step(&self) -> Duration {
        self.step
    }

    /// Feeds the elapsed frame time and returns how many whole sub-steps to
    /// execute. The remainder below one sub-step stays in the accumulator.
    pub fn advance(&mut self, frame_dt: Duration) -> u32 {
        if self.step.is_zero() {
            return 0;
        }

        self.accumulator = self.accumulator.saturating_add(frame_dt);

        let mut steps = 0_u32;
        while self.accumulator >= self.step {
            self.accumulator -= self.step;
            steps = steps.saturating_add(1);
        }

        if let Some(cap) = self.max_steps_per_frame {
            if steps > cap {
                // Excess time is dropped, not deferred; deferring it would
                // only queue up the same overload for the next frame.
                steps = cap;
                self.accumulator = Duration::ZERO;
            }
        }

        steps
    }

    /// Time currently carried toward the next sub-step.
    #[must_use]
    pub const fn remainder(&self) -> Duration {
        self.accumulator
    }
}

impl Default for FixedStep {
    fn default() -> Self {
        Self::new(DEFAULT_STEP)
    }
}
