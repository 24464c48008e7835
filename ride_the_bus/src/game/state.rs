use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{
    constants::NUM_ROUNDS,
    entities::{Card, Deck, Guess, PlayerId, RoundKind},
    errors::GameError,
};

/// One ride of the bus. The card for the round being guessed is held face
/// down in `shared` and only leaves the engine once that round resolves.
#[derive(Clone, Debug, Default)]
pub struct Game {
    pub round: u8,
    pub started: bool,
    pub finished: bool,
    pub(crate) shared: Vec<Card>,
    pub guesses: BTreeMap<PlayerId, Vec<Guess>>,
    pub active_players: BTreeSet<PlayerId>,
    pub pending_tap_out: BTreeSet<PlayerId>,
    pub drink_now: BTreeMap<PlayerId, u32>,
    pub give_out_remaining: BTreeMap<PlayerId, u32>,
    pub distribution_active: bool,
    pub distribution_deadline: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub(crate) deck: Deck,
}

impl Game {
    /// Players are locking in guesses for `round`.
    pub fn is_guessing(&self) -> bool {
        self.started && !self.finished && !self.distribution_active && (1..=NUM_ROUNDS).contains(&self.round)
    }

    pub fn round_kind(&self) -> Option<RoundKind> {
        RoundKind::from_round(self.round)
    }

    /// Cards everyone is allowed to see: all dealt cards except the one
    /// for a round that's still being guessed.
    pub fn revealed_cards(&self) -> &[Card] {
        let hidden = usize::from(self.is_guessing());
        &self.shared[..self.shared.len().saturating_sub(hidden)]
    }

    pub fn has_guessed(&self, player_id: &PlayerId) -> bool {
        self.guesses
            .get(player_id)
            .is_some_and(|g| g.len() >= usize::from(self.round))
    }

    pub fn all_active_guessed(&self) -> bool {
        self.active_players.iter().all(|id| self.has_guessed(id))
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            round: self.round,
            started: self.started,
            finished: self.finished,
            shared: self.revealed_cards().to_vec(),
            guesses: self.guesses.clone(),
            active_players: self.active_players.clone(),
            pending_tap_out: self.pending_tap_out.clone(),
            drink_now_by_player: self.drink_now.clone(),
            give_out_remaining_by_player: self.give_out_remaining.clone(),
            distribution_active: self.distribution_active,
            distribution_deadline: self.distribution_deadline,
            deadline: self.deadline,
        }
    }

    /// Structural checks run after every mutation before it is committed.
    pub fn check_invariants(&self) -> Result<(), GameError> {
        let violation = |msg: String| Err(GameError::InvariantViolation(msg));

        if self.round > NUM_ROUNDS {
            return violation(format!("round {} out of range", self.round));
        }
        if self.started {
            if self.shared.len() != usize::from(self.round) {
                return violation(format!(
                    "{} cards dealt in round {}",
                    self.shared.len(),
                    self.round
                ));
            }
        } else if self.round != 0 || !self.shared.is_empty() || self.finished || self.distribution_active {
            return violation("game state left over while not started".to_string());
        }
        for (player_id, guesses) in &self.guesses {
            if guesses.len() > usize::from(self.round) {
                return violation(format!(
                    "{player_id} has {} guesses in round {}",
                    guesses.len(),
                    self.round
                ));
            }
        }
        if self.is_guessing() {
            for player_id in &self.active_players {
                let made = self.guesses.get(player_id).map_or(0, Vec::len);
                if made + 1 < usize::from(self.round) {
                    return violation(format!("{player_id} is active but skipped a round"));
                }
            }
        }
        if !self.pending_tap_out.is_subset(&self.active_players) {
            return violation("tap-out pending for an inactive player".to_string());
        }
        if self.finished && self.distribution_active {
            return violation("finished while distributing".to_string());
        }
        if self.distribution_active && self.distribution_deadline.is_none() {
            return violation("distribution without a deadline".to_string());
        }
        Ok(())
    }
}

/// Wire form of a [`Game`]. `shared` holds revealed cards only.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub round: u8,
    pub started: bool,
    pub finished: bool,
    pub shared: Vec<Card>,
    pub guesses: BTreeMap<PlayerId, Vec<Guess>>,
    pub active_players: BTreeSet<PlayerId>,
    pub pending_tap_out: BTreeSet<PlayerId>,
    pub drink_now_by_player: BTreeMap<PlayerId, u32>,
    pub give_out_remaining_by_player: BTreeMap<PlayerId, u32>,
    pub distribution_active: bool,
    pub distribution_deadline: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
}
