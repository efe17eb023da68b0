//! Role assignment: picks the secret word, the liar and (legacy mode) the spies.

use crate::config::GameSetup;
use crate::types::PlayerIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub type AssignResult<T> = Result<T, AssignError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssignError {
    #[error("No words available to pick from")]
    EmptyWordPool,

    #[error("At least 2 players are required, got {0}")]
    TooFewPlayers(usize),

    /// Rejection sampling only terminates when at least one regular player remains
    #[error("Spy count {spy_count} must be smaller than {player_count} players minus one")]
    TooManySpies { spy_count: usize, player_count: usize },
}

/// Source of uniform indices, injectable so tests can script exact draws
pub trait RandomSource: Send {
    /// Uniform index in `[0, upper)`; `upper` is always > 0
    fn index_below(&mut self, upper: usize) -> usize;
}

/// Adapter for any `rand` generator
#[derive(Debug, Clone)]
pub struct RngSource<R>(pub R);

impl RngSource<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self(StdRng::from_os_rng())
    }
}

impl<R: Rng + Send> RandomSource for RngSource<R> {
    fn index_below(&mut self, upper: usize) -> usize {
        self.0.random_range(0..upper)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub word: String,
    pub liar_index: PlayerIndex,
    pub spy_indices: Vec<PlayerIndex>,
}

/// Pick a word and the hidden roles for a validated table
pub fn assign(
    setup: &GameSetup,
    word_pool: &[String],
    rng: &mut dyn RandomSource,
) -> AssignResult<Assignment> {
    let player_count = setup.player_count;

    if word_pool.is_empty() {
        return Err(AssignError::EmptyWordPool);
    }
    if player_count < 2 {
        return Err(AssignError::TooFewPlayers(player_count));
    }
    if setup.spy_count > 0 && setup.spy_count >= player_count - 1 {
        return Err(AssignError::TooManySpies {
            spy_count: setup.spy_count,
            player_count,
        });
    }

    let word = word_pool[rng.index_below(word_pool.len())].clone();

    // Player 0 holds the device first and is never the liar unless allowed
    let liar_index = if setup.allow_first_player_liar {
        rng.index_below(player_count)
    } else {
        1 + rng.index_below(player_count - 1)
    };

    let mut spy_indices = Vec::with_capacity(setup.spy_count);
    while spy_indices.len() < setup.spy_count {
        let candidate = rng.index_below(player_count);
        if candidate == liar_index || spy_indices.contains(&candidate) {
            continue;
        }
        spy_indices.push(candidate);
    }

    tracing::debug!(
        "Assigned roles for {} players ({} spies)",
        player_count,
        spy_indices.len()
    );

    Ok(Assignment {
        word,
        liar_index,
        spy_indices,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::{HashSet, VecDeque};

    /// Replays a fixed list of draws, each reduced modulo the requested bound
    pub(crate) struct ScriptedSource(pub VecDeque<usize>);

    impl ScriptedSource {
        pub(crate) fn new(draws: &[usize]) -> Self {
            Self(draws.iter().copied().collect())
        }
    }

    impl RandomSource for ScriptedSource {
        fn index_below(&mut self, upper: usize) -> usize {
            self.0.pop_front().expect("script exhausted") % upper
        }
    }

    fn setup(player_count: usize, allow_first_player_liar: bool, spy_count: usize) -> GameSetup {
        GameSetup {
            player_count,
            allow_first_player_liar,
            spy_count,
        }
    }

    fn pool(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_empty_pool_is_an_error() {
        let mut rng = RngSource::seeded(1);
        let result = assign(&setup(4, false, 0), &[], &mut rng);
        assert_eq!(result, Err(AssignError::EmptyWordPool));
    }

    #[test]
    fn test_too_few_players_is_an_error() {
        let mut rng = RngSource::seeded(1);
        let result = assign(&setup(1, true, 0), &pool(&["Pizza"]), &mut rng);
        assert_eq!(result, Err(AssignError::TooFewPlayers(1)));
    }

    #[test]
    fn test_too_many_spies_is_an_error() {
        let mut rng = RngSource::seeded(1);
        let result = assign(&setup(4, false, 3), &pool(&["Pizza"]), &mut rng);
        assert_eq!(
            result,
            Err(AssignError::TooManySpies {
                spy_count: 3,
                player_count: 4
            })
        );
    }

    #[test]
    fn test_first_player_never_liar_when_disallowed() {
        let mut rng = RngSource::seeded(42);
        let words = pool(&["Pizza", "Sushi"]);
        for player_count in 2..=8 {
            for _ in 0..1_500 {
                let assignment = assign(&setup(player_count, false, 0), &words, &mut rng).unwrap();
                assert_ne!(assignment.liar_index, 0);
                assert!(assignment.liar_index < player_count);
            }
        }
    }

    #[test]
    fn test_liar_never_zero_over_many_trials() {
        let mut rng = RngSource::seeded(7);
        let words = pool(&["Pizza", "Sushi", "Tacos"]);
        for _ in 0..10_000 {
            let assignment = assign(&setup(2, false, 0), &words, &mut rng).unwrap();
            assert_eq!(assignment.liar_index, 1);
        }
    }

    #[test]
    fn test_first_player_can_be_liar_when_allowed() {
        let mut rng = RngSource::seeded(3);
        let words = pool(&["Pizza"]);
        let saw_zero = (0..1_000)
            .map(|_| assign(&setup(3, true, 0), &words, &mut rng).unwrap())
            .any(|a| a.liar_index == 0);
        assert!(saw_zero);
    }

    #[test]
    fn test_spies_are_distinct_and_never_the_liar() {
        let mut rng = RngSource::seeded(11);
        let words = pool(&["Pizza", "Sushi"]);
        for player_count in 3..=9 {
            for spy_count in 0..player_count - 1 {
                for _ in 0..200 {
                    let a = assign(&setup(player_count, true, spy_count), &words, &mut rng)
                        .unwrap();
                    assert_eq!(a.spy_indices.len(), spy_count);
                    let unique: HashSet<_> = a.spy_indices.iter().collect();
                    assert_eq!(unique.len(), spy_count);
                    assert!(!a.spy_indices.contains(&a.liar_index));
                    assert!(a.spy_indices.iter().all(|&i| i < player_count));
                }
            }
        }
    }

    #[test]
    fn test_scripted_draws_are_exact() {
        // word index 1, liar 1 + 2, spies: 3 rejected (liar), then 0
        let mut rng = ScriptedSource::new(&[1, 2, 3, 0]);
        let a = assign(&setup(5, false, 1), &pool(&["Pizza", "Sushi"]), &mut rng).unwrap();
        assert_eq!(a.word, "Sushi");
        assert_eq!(a.liar_index, 3);
        assert_eq!(a.spy_indices, vec![0]);
    }

    #[test]
    fn test_seeded_source_is_deterministic() {
        let words = pool(&["Pizza", "Sushi", "Tacos", "Ramen"]);
        let a = assign(&setup(6, false, 2), &words, &mut RngSource::seeded(99)).unwrap();
        let b = assign(&setup(6, false, 2), &words, &mut RngSource::seeded(99)).unwrap();
        assert_eq!(a, b);
    }
}
