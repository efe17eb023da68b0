//! Per-player reveal sequencing.
//!
//! `VIEWING(i)` is `current_player == i < player_count`; `ALL_REVEALED` is
//! `current_player == player_count`. The sequencer is gated by a
//! press-and-hold gesture and only ever mutates the session through
//! [`advance`] and [`show_content`].

pub mod screen;

use crate::gesture::{GestureEvent, GestureTimer, PressOutcome};
use crate::types::*;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

pub use screen::{RevealScreen, ScreenInput, ScreenUpdate};

/// Identifies the pointer (finger, mouse, key) holding the reveal control
pub type PointerId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum RevealPhase {
    Viewing { player: PlayerIndex },
    AllRevealed,
}

/// What the player holding the device gets to see
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum RevealPayload {
    Word { word: String },
    Liar,
    Spy { word: String },
}

impl RevealPayload {
    /// Plain text for terminals and logs
    pub fn text(&self) -> String {
        match self {
            RevealPayload::Word { word } => word.clone(),
            RevealPayload::Liar => LIAR_TEXT.to_string(),
            RevealPayload::Spy { word } => format!("{} ({})", SPY_TEXT, word),
        }
    }
}

/// Where the reveal stands for this session
pub fn phase(state: &SessionState) -> RevealPhase {
    if state.all_revealed() {
        RevealPhase::AllRevealed
    } else {
        RevealPhase::Viewing {
            player: state.current_player,
        }
    }
}

/// Computed from the assignment every time, never cached per player
pub fn payload_for(state: &SessionState, player: PlayerIndex) -> RevealPayload {
    match state.role_of(player) {
        Role::Liar => RevealPayload::Liar,
        Role::Spy => RevealPayload::Spy {
            word: state.word.clone(),
        },
        Role::Regular => RevealPayload::Word {
            word: state.word.clone(),
        },
    }
}

/// Mark the current player's content as visible. Returns true if it changed.
pub fn show_content(state: &mut SessionState) -> bool {
    if state.stage != Stage::Reveal || state.all_revealed() || state.is_word_revealed {
        return false;
    }
    state.is_word_revealed = true;
    true
}

/// Finish the current player's turn. No-op once everybody has seen their content.
pub fn advance(state: &mut SessionState) -> bool {
    if state.stage != Stage::Reveal || state.all_revealed() {
        return false;
    }

    let finished = state.current_player;
    state.revealed_players.push(finished);
    state.current_player += 1;
    state.is_word_revealed = false;

    tracing::debug!(
        "Player {} finished reveal ({}/{})",
        finished,
        state.current_player,
        state.player_count
    );
    true
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealEvent {
    PressStarted {
        player: PlayerIndex,
    },
    ContentShown {
        player: PlayerIndex,
        payload: RevealPayload,
    },
    /// Released or cancelled before the threshold; content hidden again
    PressAborted {
        player: PlayerIndex,
        elapsed_ms: u64,
    },
    Advanced {
        player: PlayerIndex,
        next: RevealPhase,
    },
}

/// Gesture-gated driver for one device. Only one pointer may hold the control.
#[derive(Debug, Clone)]
pub struct RevealSequencer {
    gesture: GestureTimer,
    active_pointer: Option<PointerId>,
}

impl RevealSequencer {
    /// Sequencer whose presses must last at least `threshold`
    pub fn new(threshold: Duration) -> Self {
        Self {
            gesture: GestureTimer::new(threshold),
            active_pointer: None,
        }
    }

    /// Current press, for progress display
    pub fn gesture(&self) -> &GestureTimer {
        &self.gesture
    }

    /// Pointer holding the control, if any
    pub fn active_pointer(&self) -> Option<PointerId> {
        self.active_pointer
    }

    /// Begin a press for the current player. Ignored when another pointer
    /// holds the control or the reveal is over.
    pub fn press_start(
        &mut self,
        state: &SessionState,
        pointer: PointerId,
        now: Instant,
    ) -> Option<RevealEvent> {
        if self.active_pointer.is_some() {
            return None;
        }
        let RevealPhase::Viewing { player } = phase(state) else {
            return None;
        };
        if state.stage != Stage::Reveal || !self.gesture.start(now) {
            return None;
        }

        self.active_pointer = Some(pointer);
        Some(RevealEvent::PressStarted { player })
    }

    /// Advance the press clock; shows the content once the threshold is reached
    pub fn tick(&mut self, state: &mut SessionState, now: Instant) -> Option<RevealEvent> {
        let GestureEvent::ThresholdReached { .. } = self.gesture.tick(now)?;
        let RevealPhase::Viewing { player } = phase(state) else {
            return None;
        };

        show_content(state).then(|| RevealEvent::ContentShown {
            player,
            payload: payload_for(state, player),
        })
    }

    /// Release by the holding pointer. Advances only if held long enough.
    pub fn press_end(
        &mut self,
        state: &mut SessionState,
        pointer: PointerId,
        now: Instant,
    ) -> Option<RevealEvent> {
        if self.active_pointer != Some(pointer) {
            return None;
        }
        self.active_pointer = None;

        let outcome = self.gesture.end(now);
        self.settle(state, outcome)
    }

    /// Pointer left the control; treated as an early release
    pub fn press_cancel(
        &mut self,
        state: &mut SessionState,
        pointer: PointerId,
    ) -> Option<RevealEvent> {
        if self.active_pointer != Some(pointer) {
            return None;
        }
        self.teardown(state)
    }

    /// Drop any partial press; the session keeps its last completed advance
    pub fn teardown(&mut self, state: &mut SessionState) -> Option<RevealEvent> {
        self.active_pointer = None;
        let outcome = self.gesture.cancel();
        self.settle(state, outcome)
    }

    fn settle(&mut self, state: &mut SessionState, outcome: PressOutcome) -> Option<RevealEvent> {
        let RevealPhase::Viewing { player } = phase(state) else {
            return None;
        };

        match outcome {
            PressOutcome::Idle => None,
            PressOutcome::TooShort { elapsed_ms } => {
                state.is_word_revealed = false;
                Some(RevealEvent::PressAborted { player, elapsed_ms })
            }
            PressOutcome::Completed { .. } => advance(state).then(|| RevealEvent::Advanced {
                player,
                next: phase(state),
            }),
        }
    }
}
