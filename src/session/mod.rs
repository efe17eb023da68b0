//! Session lifecycle: new game vs. replay, and the hand-off to discussion.

mod discussion;

use crate::assign::{assign, AssignError, RandomSource, RngSource};
use crate::catalog::{Catalog, CatalogError};
use crate::config::GameSetup;
use crate::store::Store;
use crate::types::*;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

pub use discussion::{Discussion, GuessOutcome, Verdict, VoteTally};

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No words available for theme {0}")]
    NoWordsAvailable(ThemeId),

    #[error("Failed to load words: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Role assignment failed: {0}")]
    Assign(#[from] AssignError),

    #[error("Game start was abandoned by returning to the lobby")]
    Abandoned,

    #[error("No session to replay")]
    NoActiveSession,

    #[error("Reveal phase not finished ({revealed}/{player_count} players)")]
    RevealIncomplete {
        revealed: usize,
        player_count: usize,
    },

    #[error("Player {player} is not at this table of {player_count}")]
    InvalidPlayer {
        player: PlayerIndex,
        player_count: usize,
    },

    #[error("'{0}' is not one of the guess options")]
    InvalidGuess(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    /// Reveal phase (re)entered with this state
    Started(SessionState),
    /// Duplicate new-game request; nothing was reassigned
    Unchanged(Option<SessionState>),
}

impl StartOutcome {
    pub fn state(&self) -> Option<&SessionState> {
        match self {
            StartOutcome::Started(state) => Some(state),
            StartOutcome::Unchanged(state) => state.as_ref(),
        }
    }
}

/// Owns the live session and decides when roles get assigned
pub struct SessionController {
    catalog: Arc<dyn Catalog>,
    session: Store<Option<SessionState>>,
    loading: Store<bool>,
    word_pool: RwLock<Vec<String>>,
    /// Set while assigning and for the rest of the session; cleared only on error or lobby
    initialized: AtomicBool,
    /// Bumped by every return to the lobby; in-flight starts from an older
    /// generation must not publish
    generation: AtomicU64,
    rng: Mutex<Box<dyn RandomSource>>,
}

/// Releases the initialization flag and the loading indicator when a new
/// game start fails or is dropped before it finishes
struct StartGuard<'a> {
    controller: &'a SessionController,
    generation: u64,
    armed: bool,
}

impl StartGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        // A newer generation owns the flag now
        if self.armed && self.controller.is_current(self.generation) {
            self.controller.loading.set(false);
            self.controller.initialized.store(false, Ordering::SeqCst);
        }
    }
}

impl SessionController {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self::with_random(catalog, Box::new(RngSource::from_entropy()))
    }

    pub fn with_random(catalog: Arc<dyn Catalog>, rng: Box<dyn RandomSource>) -> Self {
        Self {
            catalog,
            session: Store::new(None),
            loading: Store::new(false),
            word_pool: RwLock::new(Vec::new()),
            initialized: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            rng: Mutex::new(rng),
        }
    }

    /// Store the reveal screen and the discussion screen read from
    pub fn session_store(&self) -> Store<Option<SessionState>> {
        self.session.clone()
    }

    /// Snapshot of the live session, if any
    pub fn session(&self) -> Option<SessionState> {
        self.session.get()
    }

    /// True while a new game's word pool is being fetched
    pub fn loading(&self) -> Store<bool> {
        self.loading.clone()
    }

    /// `Assign` while no session exists
    pub fn stage(&self) -> Stage {
        self.session
            .get()
            .map(|s| s.stage)
            .unwrap_or(Stage::Assign)
    }

    /// Words of the theme the current session was drawn from
    pub async fn word_pool(&self) -> Vec<String> {
        self.word_pool.read().await.clone()
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Enter the reveal phase, either with a fresh assignment or replaying the current one
    pub async fn start(&self, mode: SessionMode, setup: &GameSetup) -> SessionResult<StartOutcome> {
        match mode {
            SessionMode::NewGame { theme_id } => self.new_game(theme_id, setup).await,
            SessionMode::Replay => self.replay(),
        }
    }

    async fn new_game(&self, theme_id: ThemeId, setup: &GameSetup) -> SessionResult<StartOutcome> {
        if self
            .initialized
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Ignoring duplicate new game request");
            return Ok(StartOutcome::Unchanged(self.session.get()));
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let guard = StartGuard {
            controller: self,
            generation,
            armed: true,
        };

        match self.assign_new(theme_id, setup, generation).await {
            Ok(state) => {
                guard.disarm();
                Ok(StartOutcome::Started(state))
            }
            Err(e) => {
                // Leave room for a retry
                drop(guard);
                tracing::warn!("Failed to start game for theme {}: {}", theme_id, e);
                Err(e)
            }
        }
    }

    async fn assign_new(
        &self,
        theme_id: ThemeId,
        setup: &GameSetup,
        generation: u64,
    ) -> SessionResult<SessionState> {
        self.loading.set(true);
        let fetched = self.catalog.fetch_words_for_theme(theme_id).await;
        if !self.is_current(generation) {
            return Err(SessionError::Abandoned);
        }
        self.loading.set(false);

        let words = fetched?;
        if words.is_empty() {
            return Err(SessionError::NoWordsAvailable(theme_id));
        }

        let assignment = {
            let mut rng = self.rng.lock().await;
            assign(setup, &words, &mut **rng)?
        };

        let state = SessionState {
            session_id: ulid::Ulid::new().to_string(),
            mode: SessionMode::NewGame { theme_id },
            word: assignment.word,
            liar_index: assignment.liar_index,
            spy_indices: assignment.spy_indices,
            player_count: setup.player_count,
            current_player: 0,
            revealed_players: Vec::new(),
            is_word_revealed: false,
            stage: Stage::Reveal,
        };

        let mut word_pool = self.word_pool.write().await;
        let mut published = false;
        self.session.update(|slot| {
            if !self.is_current(generation) {
                return false;
            }
            *slot = Some(state.clone());
            published = true;
            true
        });
        if !published {
            return Err(SessionError::Abandoned);
        }
        *word_pool = words;
        drop(word_pool);

        tracing::info!(
            "Started session {} with {} players from theme {}",
            state.session_id,
            state.player_count,
            theme_id
        );
        Ok(state)
    }

    /// Same word and roles, reveal phase from the first player
    fn replay(&self) -> SessionResult<StartOutcome> {
        let mut replayed = None;
        self.session.update(|slot| {
            let Some(state) = slot.as_mut() else {
                return false;
            };
            state.mode = SessionMode::Replay;
            state.current_player = 0;
            state.revealed_players.clear();
            state.is_word_revealed = false;
            state.stage = Stage::Reveal;
            replayed = Some(state.clone());
            true
        });

        let state = replayed.ok_or(SessionError::NoActiveSession)?;
        tracing::info!("Replaying reveal for session {}", state.session_id);
        Ok(StartOutcome::Started(state))
    }

    /// Leave the finished reveal phase for discussion
    pub async fn begin_discussion(&self) -> SessionResult<Discussion> {
        let mut result = Err(SessionError::NoActiveSession);
        self.session.update(|slot| {
            let Some(state) = slot.as_mut() else {
                return false;
            };
            if !state.all_revealed() {
                result = Err(SessionError::RevealIncomplete {
                    revealed: state.revealed_players.len(),
                    player_count: state.player_count,
                });
                return false;
            }

            let changed = state.stage != Stage::Discuss;
            state.stage = Stage::Discuss;
            result = Ok(state.clone());
            changed
        });

        let state = result?;
        Ok(Discussion {
            word: state.word,
            liar_index: state.liar_index,
            spy_indices: state.spy_indices,
            player_count: state.player_count,
            candidates: self.word_pool.read().await.clone(),
        })
    }

    /// Drop the session; the next new game assigns from scratch
    pub async fn return_to_lobby(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.loading.set(false);
        self.session.set(None);
        self.word_pool.write().await.clear();
        self.initialized.store(false, Ordering::SeqCst);
        tracing::info!("Returned to lobby");
    }
}
