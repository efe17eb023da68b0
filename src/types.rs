use serde::{Deserialize, Serialize};

/// Opaque ID types
pub type SessionId = String;
pub type EntityId = i64;
pub type ThemeId = EntityId;
pub type WordId = EntityId;
pub type PlayerIndex = usize;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Regular,
    Liar,
    Spy,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerSlot {
    /// Seat order around the device, starting at 0
    pub index: PlayerIndex,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Assign,
    Reveal,
    Discuss,
}

/// How a session was (re)entered
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum SessionMode {
    /// Fresh assignment from the words of a theme
    NewGame { theme_id: ThemeId },
    /// Same assignment, reveal phase from the top
    Replay,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionState {
    /// ULID, stable across replays
    pub session_id: SessionId,
    pub mode: SessionMode,
    /// The secret word everyone except the liar gets to see
    pub word: String,
    pub liar_index: PlayerIndex,
    /// Legacy spy mode; empty when disabled
    pub spy_indices: Vec<PlayerIndex>,
    pub player_count: usize,
    /// Equals `player_count` once everybody has seen their content
    pub current_player: PlayerIndex,
    /// Always `0..current_player`
    pub revealed_players: Vec<PlayerIndex>,
    /// True while the current player's content is on screen
    pub is_word_revealed: bool,
    pub stage: Stage,
}

impl SessionState {
    /// Role of the player at `index`; the liar wins over a spy listing
    pub fn role_of(&self, index: PlayerIndex) -> Role {
        if index == self.liar_index {
            Role::Liar
        } else if self.spy_indices.contains(&index) {
            Role::Spy
        } else {
            Role::Regular
        }
    }

    /// One slot per player, in seat order
    pub fn player_slots(&self) -> Vec<PlayerSlot> {
        (0..self.player_count)
            .map(|index| PlayerSlot {
                index,
                role: self.role_of(index),
            })
            .collect()
    }

    /// True once every player has finished their turn
    pub fn all_revealed(&self) -> bool {
        self.current_player >= self.player_count
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Theme {
    pub id: ThemeId,
    /// Display name shown in the theme picker
    pub name: String,
    #[serde(rename = "type", default = "default_theme_type")]
    pub theme_type: String,
    /// Created optimistically, not yet echoed by a fetch
    #[serde(default, skip_serializing)]
    pub local_only: bool,
}

fn default_theme_type() -> String {
    "words".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Word {
    pub id: WordId,
    /// Theme this word belongs to
    pub theme_id: ThemeId,
    pub word: String,
    #[serde(default, skip_serializing)]
    pub local_only: bool,
}

/// Payload for creating a theme through the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTheme {
    pub name: String,
    #[serde(rename = "type")]
    pub theme_type: String,
}

/// Payload for creating a word through the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWord {
    pub theme_id: ThemeId,
    pub word: String,
}

/// Text shown to the liar instead of the secret word
pub const LIAR_TEXT: &str = "You are the liar!";

/// Text shown to a spy next to the secret word
pub const SPY_TEXT: &str = "You are the spy!";
