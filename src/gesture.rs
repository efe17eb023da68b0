//! Press-and-hold recognizer.
//!
//! Pure state machine: the caller feeds it timestamps from whatever tick
//! source it owns (see `reveal::screen`). Nothing in here spawns timers.

use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GestureState {
    pub is_pressing: bool,
    #[serde(skip)]
    pub started_at: Option<Instant>,
    pub elapsed_ms: u64,
    /// Fraction of the threshold held so far, clamped to `[0, 1]`
    pub progress: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureEvent {
    /// Fired once per press, on the first tick at or past the threshold
    ThresholdReached { elapsed_ms: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressOutcome {
    /// Released at or after the threshold
    Completed { elapsed_ms: u64 },
    /// Released or cancelled early; nothing should advance
    TooShort { elapsed_ms: u64 },
    /// There was no press to end
    Idle,
}

#[derive(Debug, Clone)]
pub struct GestureTimer {
    threshold: Duration,
    state: GestureState,
    threshold_fired: bool,
}

impl GestureTimer {
    /// Create an idle timer that completes after `threshold`
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            state: GestureState::default(),
            threshold_fired: false,
        }
    }

    /// How long a press must be held
    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Snapshot for drawing a progress indicator
    pub fn state(&self) -> &GestureState {
        &self.state
    }

    /// True between `start` and `end`/`cancel`
    pub fn is_pressing(&self) -> bool {
        self.state.is_pressing
    }

    /// Begin a press. Returns false (and changes nothing) if already pressing.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.state.is_pressing {
            return false;
        }

        self.state = GestureState {
            is_pressing: true,
            started_at: Some(now),
            elapsed_ms: 0,
            progress: 0.0,
        };
        self.threshold_fired = false;
        true
    }

    /// Recompute elapsed time and progress
    pub fn tick(&mut self, now: Instant) -> Option<GestureEvent> {
        let started_at = self.state.started_at.filter(|_| self.state.is_pressing)?;

        let elapsed = now.saturating_duration_since(started_at);
        self.state.elapsed_ms = elapsed.as_millis() as u64;
        self.state.progress = self.progress_for(elapsed);

        if !self.threshold_fired && self.held_long_enough(elapsed) {
            self.threshold_fired = true;
            return Some(GestureEvent::ThresholdReached {
                elapsed_ms: self.state.elapsed_ms,
            });
        }
        None
    }

    /// Release the press and reset to the zero state
    pub fn end(&mut self, now: Instant) -> PressOutcome {
        let Some(started_at) = self.state.started_at.filter(|_| self.state.is_pressing) else {
            return PressOutcome::Idle;
        };

        let elapsed = now.saturating_duration_since(started_at);
        let elapsed_ms = elapsed.as_millis() as u64;
        self.reset();

        if self.held_long_enough(elapsed) {
            PressOutcome::Completed { elapsed_ms }
        } else {
            PressOutcome::TooShort { elapsed_ms }
        }
    }

    /// Abort the press (pointer left the control, screen torn down)
    pub fn cancel(&mut self) -> PressOutcome {
        if !self.state.is_pressing {
            return PressOutcome::Idle;
        }
        let elapsed_ms = self.state.elapsed_ms;
        self.reset();
        PressOutcome::TooShort { elapsed_ms }
    }

    fn reset(&mut self) {
        self.state = GestureState::default();
        self.threshold_fired = false;
    }

    fn held_long_enough(&self, elapsed: Duration) -> bool {
        elapsed >= self.threshold
    }

    fn progress_for(&self, elapsed: Duration) -> f64 {
        if self.threshold.is_zero() {
            return 1.0;
        }
        (elapsed.as_secs_f64() / self.threshold.as_secs_f64()).min(1.0)
    }
}
