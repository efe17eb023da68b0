//! Async driver for the reveal screen.
//!
//! One task per screen: it owns the sequencer and a tick interval that only
//! exists while a press is held. Ending, cancelling or tearing down drops the
//! interval, so no tick ever lands after the screen is gone.

use super::{PointerId, RevealEvent, RevealSequencer};
use crate::store::Store;
use crate::types::{PlayerIndex, SessionState};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenInput {
    PressStart { pointer: PointerId },
    PressEnd { pointer: PointerId },
    /// Pointer left the control
    Cancel { pointer: PointerId },
    /// Navigating away from the screen
    Teardown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScreenUpdate {
    Progress {
        player: PlayerIndex,
        elapsed_ms: u64,
        progress: f64,
    },
    Event(RevealEvent),
}

pub struct RevealScreen {
    inputs: mpsc::Sender<ScreenInput>,
    updates: mpsc::UnboundedReceiver<ScreenUpdate>,
    task: JoinHandle<()>,
}

impl RevealScreen {
    /// Mount the screen on a session store
    pub fn spawn(
        session: Store<Option<SessionState>>,
        threshold: Duration,
        tick_interval: Duration,
    ) -> Self {
        let (input_tx, input_rx) = mpsc::channel(32);
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(run(
            session,
            RevealSequencer::new(threshold),
            tick_interval,
            input_rx,
            update_tx,
        ));

        Self {
            inputs: input_tx,
            updates: update_rx,
            task,
        }
    }

    /// Returns false once the screen has shut down
    pub async fn send(&self, input: ScreenInput) -> bool {
        self.inputs.send(input).await.is_ok()
    }

    pub async fn next_update(&mut self) -> Option<ScreenUpdate> {
        self.updates.recv().await
    }

    /// Drain updates that are already queued
    pub fn pending_updates(&mut self) -> Vec<ScreenUpdate> {
        let mut updates = Vec::new();
        while let Ok(update) = self.updates.try_recv() {
            updates.push(update);
        }
        updates
    }

    /// Tear down and wait for the driver task to finish
    pub async fn close(&mut self) {
        let _ = self.inputs.send(ScreenInput::Teardown).await;
        if let Err(e) = (&mut self.task).await {
            if !e.is_cancelled() {
                tracing::error!("Reveal screen task failed: {}", e);
            }
        }
    }
}

impl Drop for RevealScreen {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Apply `f` to the live session, notifying subscribers only on real changes
fn dispatch(
    session: &Store<Option<SessionState>>,
    f: impl FnOnce(&mut SessionState) -> Option<RevealEvent>,
) -> Option<RevealEvent> {
    let mut event = None;
    session.update(|slot| {
        let Some(state) = slot.as_mut() else {
            return false;
        };
        let before = (state.current_player, state.is_word_revealed);
        event = f(state);
        before != (state.current_player, state.is_word_revealed)
    });
    event
}

async fn run(
    session: Store<Option<SessionState>>,
    mut sequencer: RevealSequencer,
    tick_interval: Duration,
    mut inputs: mpsc::Receiver<ScreenInput>,
    updates: mpsc::UnboundedSender<ScreenUpdate>,
) {
    let mut ticker: Option<Interval> = None;
    // Send errors only mean nobody is watching the screen anymore
    let emit = |update: ScreenUpdate| {
        let _ = updates.send(update);
    };

    loop {
        tokio::select! {
            input = inputs.recv() => {
                let now = Instant::now();
                let event = match input {
                    Some(ScreenInput::PressStart { pointer }) => {
                        let Some(state) = session.get() else {
                            continue;
                        };
                        let event = sequencer.press_start(&state, pointer, now);
                        if event.is_some() {
                            let mut interval = tokio::time::interval(tick_interval);
                            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                            ticker = Some(interval);
                        }
                        event
                    }
                    Some(ScreenInput::PressEnd { pointer }) => {
                        let event = dispatch(&session, |state| sequencer.press_end(state, pointer, now));
                        if sequencer.active_pointer().is_none() {
                            ticker = None;
                        }
                        event
                    }
                    Some(ScreenInput::Cancel { pointer }) => {
                        let event = dispatch(&session, |state| sequencer.press_cancel(state, pointer));
                        if sequencer.active_pointer().is_none() {
                            ticker = None;
                        }
                        event
                    }
                    Some(ScreenInput::Teardown) | None => {
                        ticker = None;
                        if let Some(event) = dispatch(&session, |state| sequencer.teardown(state)) {
                            emit(ScreenUpdate::Event(event));
                        }
                        tracing::debug!("Reveal screen torn down");
                        break;
                    }
                };

                if let Some(event) = event {
                    tracing::trace!("Reveal event: {:?}", event);
                    emit(ScreenUpdate::Event(event));
                }
            }
            _ = next_tick(&mut ticker) => {
                let now = Instant::now();
                let event = dispatch(&session, |state| sequencer.tick(state, now));

                // Once the content is up the progress bar has nothing left to show
                let gesture = sequencer.gesture().state();
                if gesture.is_pressing {
                    if let Some(state) = session.get().filter(|s| !s.is_word_revealed) {
                        emit(ScreenUpdate::Progress {
                            player: state.current_player,
                            elapsed_ms: gesture.elapsed_ms,
                            progress: gesture.progress,
                        });
                    }
                }
                if let Some(event) = event {
                    emit(ScreenUpdate::Event(event));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reveal::tests::session;
    use crate::reveal::{RevealPayload, RevealPhase};

    const THRESHOLD: Duration = Duration::from_millis(1000);
    const TICK: Duration = Duration::from_millis(16);

    fn events(updates: Vec<ScreenUpdate>) -> Vec<RevealEvent> {
        updates
            .into_iter()
            .filter_map(|u| match u {
                ScreenUpdate::Event(e) => Some(e),
                ScreenUpdate::Progress { .. } => None,
            })
            .collect()
    }

    async fn settle() {
        // Let the driver task drain its queue without advancing the clock
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_press_below_threshold_does_not_advance() {
        let store = Store::new(Some(session("Sushi", 3, 1)));
        let mut screen = RevealScreen::spawn(store.clone(), THRESHOLD, TICK);

        screen.send(ScreenInput::PressStart { pointer: 1 }).await;
        settle().await;
        tokio::time::sleep(THRESHOLD - Duration::from_millis(1)).await;
        screen.send(ScreenInput::PressEnd { pointer: 1 }).await;
        settle().await;

        let state = store.get().unwrap();
        assert_eq!(state.current_player, 0);
        assert!(!state.is_word_revealed);
        assert!(events(screen.pending_updates())
            .iter()
            .any(|e| matches!(e, RevealEvent::PressAborted { player: 0, .. })));
        screen.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_press_at_threshold_advances() {
        let store = Store::new(Some(session("Sushi", 3, 1)));
        let mut screen = RevealScreen::spawn(store.clone(), THRESHOLD, TICK);

        screen.send(ScreenInput::PressStart { pointer: 1 }).await;
        settle().await;
        tokio::time::sleep(THRESHOLD).await;
        settle().await;
        screen.send(ScreenInput::PressEnd { pointer: 1 }).await;
        settle().await;

        let state = store.get().unwrap();
        assert_eq!(state.current_player, 1);
        assert_eq!(state.revealed_players, vec![0]);

        let events = events(screen.pending_updates());
        assert!(events.contains(&RevealEvent::Advanced {
            player: 0,
            next: RevealPhase::Viewing { player: 1 }
        }));
        screen.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_updates_while_holding() {
        let store = Store::new(Some(session("Sushi", 3, 1)));
        let mut screen = RevealScreen::spawn(store.clone(), THRESHOLD, TICK);

        screen.send(ScreenInput::PressStart { pointer: 1 }).await;
        settle().await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        settle().await;

        let progress: Vec<f64> = screen
            .pending_updates()
            .into_iter()
            .filter_map(|u| match u {
                ScreenUpdate::Progress { progress, .. } => Some(progress),
                ScreenUpdate::Event(_) => None,
            })
            .collect();
        assert!(!progress.is_empty());
        assert!(progress.iter().all(|p| (0.0..=1.0).contains(p)));
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        screen.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_progress_while_content_is_shown() {
        let store = Store::new(Some(session("Sushi", 3, 1)));
        let mut screen = RevealScreen::spawn(store.clone(), THRESHOLD, TICK);

        screen.send(ScreenInput::PressStart { pointer: 1 }).await;
        settle().await;
        tokio::time::sleep(Duration::from_millis(1100)).await;
        settle().await;

        let updates = screen.pending_updates();
        let shown_at = updates
            .iter()
            .position(|u| matches!(u, ScreenUpdate::Event(RevealEvent::ContentShown { .. })))
            .expect("content was never shown");
        assert!(shown_at > 0);
        assert!(updates[shown_at + 1..]
            .iter()
            .all(|u| !matches!(u, ScreenUpdate::Progress { .. })));

        screen.send(ScreenInput::PressEnd { pointer: 1 }).await;
        settle().await;
        assert_eq!(store.get().unwrap().current_player, 1);
        screen.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_mid_press_keeps_session() {
        let store = Store::new(Some(session("Sushi", 3, 1)));
        let mut screen = RevealScreen::spawn(store.clone(), THRESHOLD, TICK);

        screen.send(ScreenInput::PressStart { pointer: 1 }).await;
        settle().await;
        tokio::time::sleep(Duration::from_millis(1500)).await;
        settle().await;
        assert!(store.get().unwrap().is_word_revealed);
        assert!(events(screen.pending_updates()).contains(&RevealEvent::ContentShown {
            player: 0,
            payload: RevealPayload::Word {
                word: "Sushi".to_string()
            }
        }));

        screen.close().await;
        let state = store.get().unwrap();
        assert_eq!(state.current_player, 0);
        assert!(!state.is_word_revealed);

        // Nothing ticks after teardown
        screen.pending_updates();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(screen
            .pending_updates()
            .iter()
            .all(|u| !matches!(u, ScreenUpdate::Progress { .. })));
        assert!(!screen.send(ScreenInput::PressStart { pointer: 1 }).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_ticks_between_presses() {
        let store = Store::new(Some(session("Sushi", 3, 1)));
        let mut screen = RevealScreen::spawn(store.clone(), THRESHOLD, TICK);

        screen.send(ScreenInput::PressStart { pointer: 1 }).await;
        settle().await;
        screen.send(ScreenInput::Cancel { pointer: 1 }).await;
        settle().await;
        screen.pending_updates();

        tokio::time::sleep(Duration::from_millis(200)).await;
        settle().await;
        assert!(screen.pending_updates().is_empty());
        screen.close().await;
    }
}
