//! Discussion stage: votes, accusation and the liar's last guess.

use super::{SessionError, SessionResult};
use crate::types::*;
use serde::Serialize;
use std::collections::BTreeMap;

/// Everything the discussion screen needs, frozen at the end of the reveal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discussion {
    pub word: String,
    pub liar_index: PlayerIndex,
    pub spy_indices: Vec<PlayerIndex>,
    pub player_count: usize,
    /// The whole word pool, offered to the liar as guess options
    pub candidates: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum VoteTally {
    NoVotes,
    Leader {
        player: PlayerIndex,
        votes: u32,
    },
    Tie {
        players: Vec<PlayerIndex>,
        votes: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum Verdict {
    /// The table found the liar, who still gets a guess at the word
    LiarCaught { liar: PlayerIndex },
    WrongPlayer { accused: PlayerIndex, role: Role },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuessOutcome {
    LiarWins,
    LiarLoses,
}

fn normalize(word: &str) -> String {
    word.trim().to_lowercase()
}

impl Discussion {
    /// Words the liar picks from for the final guess
    pub fn guess_options(&self) -> &[String] {
        &self.candidates
    }

    fn check_player(&self, player: PlayerIndex) -> SessionResult<()> {
        if player >= self.player_count {
            return Err(SessionError::InvalidPlayer {
                player,
                player_count: self.player_count,
            });
        }
        Ok(())
    }

    /// Count one accusation per voter
    pub fn tally_votes(&self, votes: &[PlayerIndex]) -> SessionResult<VoteTally> {
        let mut counts: BTreeMap<PlayerIndex, u32> = BTreeMap::new();
        for &accused in votes {
            self.check_player(accused)?;
            *counts.entry(accused).or_insert(0) += 1;
        }

        let Some(max) = counts.values().copied().max() else {
            return Ok(VoteTally::NoVotes);
        };
        let leaders: Vec<PlayerIndex> = counts
            .iter()
            .filter(|(_, count)| **count == max)
            .map(|(&player, _)| player)
            .collect();

        Ok(match leaders.as_slice() {
            [player] => VoteTally::Leader {
                player: *player,
                votes: max,
            },
            _ => VoteTally::Tie {
                players: leaders,
                votes: max,
            },
        })
    }

    /// Reveal the role of the player the table settled on
    pub fn accuse(&self, accused: PlayerIndex) -> SessionResult<Verdict> {
        self.check_player(accused)?;

        Ok(if accused == self.liar_index {
            Verdict::LiarCaught {
                liar: self.liar_index,
            }
        } else {
            let role = if self.spy_indices.contains(&accused) {
                Role::Spy
            } else {
                Role::Regular
            };
            Verdict::WrongPlayer { accused, role }
        })
    }

    /// The liar names one of the candidate words; hitting the secret word wins
    pub fn liar_guess(&self, guess: &str) -> SessionResult<GuessOutcome> {
        let guess = normalize(guess);
        if !self.candidates.iter().any(|c| normalize(c) == guess) {
            return Err(SessionError::InvalidGuess(guess));
        }

        Ok(if guess == normalize(&self.word) {
            GuessOutcome::LiarWins
        } else {
            GuessOutcome::LiarLoses
        })
    }
}
