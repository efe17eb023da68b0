//! Game configuration loaded from environment variables.

use std::time::Duration;

/// Errors for configuration that can never produce a playable game
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("At least 2 players are required, got {0}")]
    TooFewPlayers(usize),

    #[error("Spy count {spy_count} must be smaller than player count minus one ({player_count} players)")]
    TooManySpies { spy_count: usize, player_count: usize },

    #[error("Reveal threshold must be greater than zero")]
    ZeroThreshold,
}

#[derive(Debug, Clone)]
pub struct GameConfig {
    /// How long a press must be held before content is shown
    pub reveal_threshold: Duration,
    /// When false, player 0 is never the liar
    pub allow_first_player_liar: bool,
    /// 0 disables spy mode
    pub spy_count: usize,
    /// Period of the progress tick while a press is held
    pub tick_interval: Duration,
    /// Period of the background theme/word sync
    pub sync_interval: Duration,
    /// Base URL of the theme/word service; in-memory catalog when unset
    pub catalog_url: Option<String>,
    /// JSON file used to seed the in-memory catalog
    pub catalog_file: Option<String>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            reveal_threshold: Duration::from_millis(1000),
            allow_first_player_liar: false,
            spy_count: 0,
            tick_interval: Duration::from_millis(16),
            sync_interval: Duration::from_secs(30),
            catalog_url: None,
            catalog_file: None,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

impl GameConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            reveal_threshold: std::env::var("REVEAL_THRESHOLD_MS")
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.reveal_threshold),
            allow_first_player_liar: std::env::var("ALLOW_FIRST_PLAYER_LIAR")
                .map(|v| v == "1" || v.to_lowercase() == "true")
                .unwrap_or(defaults.allow_first_player_liar),
            spy_count: std::env::var("SPY_COUNT")
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.spy_count),
            tick_interval: std::env::var("TICK_INTERVAL_MS")
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .filter(|ms: &u64| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.tick_interval),
            sync_interval: std::env::var("SYNC_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.sync_interval),
            catalog_url: non_empty_var("CATALOG_URL"),
            catalog_file: non_empty_var("CATALOG_FILE"),
        }
    }

    /// Validate this configuration for a concrete table size
    pub fn setup(&self, player_count: usize) -> Result<GameSetup, ConfigError> {
        if self.reveal_threshold.is_zero() {
            return Err(ConfigError::ZeroThreshold);
        }
        if player_count < 2 {
            return Err(ConfigError::TooFewPlayers(player_count));
        }
        if self.spy_count > 0 && self.spy_count >= player_count - 1 {
            return Err(ConfigError::TooManySpies {
                spy_count: self.spy_count,
                player_count,
            });
        }

        Ok(GameSetup {
            player_count,
            allow_first_player_liar: self.allow_first_player_liar,
            spy_count: self.spy_count,
        })
    }
}

/// A validated table: player count plus assignment policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameSetup {
    pub player_count: usize,
    pub allow_first_player_liar: bool,
    pub spy_count: usize,
}
