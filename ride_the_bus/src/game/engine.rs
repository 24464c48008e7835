//! The ride state machine.
//!
//! Every operation takes the current time explicitly and either applies in
//! full or returns an error. Callers that need all-or-nothing semantics across
//! a failed invariant check work on a clone and commit it afterwards.

use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, info};
use std::collections::BTreeMap;

use super::{
    constants::{
        DEFAULT_DISTRIBUTION_DURATION_SECS, DEFAULT_ROUND_DURATION_SECS, DEFAULT_STAKES,
        MAX_NAME_LENGTH, NUM_ROUNDS,
    },
    entities::{Card, Deck, Guess, Player, PlayerId, sanitize_name},
    errors::GameError,
    rules,
    session::{Session, SessionStatus},
    state::Game,
};

/// Timing and stakes the engine plays by.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GameSettings {
    pub round_duration: TimeDelta,
    pub distribution_duration: TimeDelta,
    pub stakes: [u32; NUM_ROUNDS as usize],
    pub max_name_length: usize,
}

impl GameSettings {
    pub fn stake(&self, round: u8) -> u32 {
        usize::from(round)
            .checked_sub(1)
            .and_then(|idx| self.stakes.get(idx))
            .copied()
            .unwrap_or(0)
    }
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            round_duration: TimeDelta::seconds(DEFAULT_ROUND_DURATION_SECS as i64),
            distribution_duration: TimeDelta::seconds(DEFAULT_DISTRIBUTION_DURATION_SECS as i64),
            stakes: DEFAULT_STAKES,
            max_name_length: MAX_NAME_LENGTH,
        }
    }
}

/// What happened when a round was turned over.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RoundSummary {
    pub round: u8,
    pub card: Card,
    pub correct: Vec<PlayerId>,
    pub eliminated: Vec<PlayerId>,
    pub tapped_out: Vec<PlayerId>,
}

/// A timer that fired and what it did.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Expired {
    Round(RoundSummary),
    Distribution { forfeited: u32 },
}

impl Game {
    /// The next instant at which [`Session::handle_deadline`] has work to do.
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        if self.distribution_active {
            self.distribution_deadline
        } else if self.is_guessing() {
            self.deadline
        } else {
            None
        }
    }

    fn deal(&mut self) -> Result<(), GameError> {
        let card = self
            .deck
            .deal_card()
            .ok_or_else(|| GameError::InvariantViolation("deck exhausted".to_string()))?;
        self.shared.push(card);
        self.round += 1;
        Ok(())
    }

    fn finish(&mut self) -> u32 {
        let forfeited = self.give_out_remaining.values().sum();
        self.give_out_remaining.clear();
        self.distribution_active = false;
        self.distribution_deadline = None;
        self.deadline = None;
        self.finished = true;
        forfeited
    }
}

impl Session {
    fn ensure_open(&self) -> Result<(), GameError> {
        if self.is_shutting_down() {
            return Err(GameError::LobbyClosing);
        }
        Ok(())
    }

    fn ensure_host(&self, requester: &PlayerId) -> Result<(), GameError> {
        if !self.is_host(requester) {
            return Err(GameError::NotHost);
        }
        Ok(())
    }

    /// Adds a player, or hands back the existing identity when `resume` names
    /// a player already in the lobby under the same name.
    pub fn join(
        &mut self,
        name: &str,
        resume: Option<&PlayerId>,
        settings: &GameSettings,
    ) -> Result<PlayerId, GameError> {
        self.ensure_open()?;
        let name = sanitize_name(name, settings.max_name_length);
        if name.is_empty() {
            return Err(GameError::NameRequired);
        }
        if let Some(id) = resume {
            self.verify_identity(id, &name, settings.max_name_length)?;
            debug!("{}: {name} rejoined as {id}", self.code);
            return Ok(id.clone());
        }

        let player = Player::new(PlayerId::player(), name);
        let id = player.id.clone();
        info!("{}: {} joined as {id}", self.code, player.name);
        self.players.push(player);
        Ok(id)
    }

    /// Checks a resume token against the current registry. `name` is cut
    /// to the same length a join would have stored.
    pub fn verify_identity(
        &self,
        id: &PlayerId,
        name: &str,
        max_name_length: usize,
    ) -> Result<(), GameError> {
        let player = self.player(id).ok_or(GameError::PlayerNotFound)?;
        if player.name != sanitize_name(name, max_name_length) {
            return Err(GameError::IdentityMismatch);
        }
        Ok(())
    }

    /// Resolves a player given either an id or, failing that, a nickname.
    pub fn resolve_player(
        &self,
        id: Option<&PlayerId>,
        nickname: Option<&str>,
        max_name_length: usize,
    ) -> Result<PlayerId, GameError> {
        let player = match (id, nickname) {
            (Some(id), _) => self.player(id),
            (None, Some(name)) => self.player_by_name(&sanitize_name(name, max_name_length)),
            (None, None) => None,
        };
        player
            .map(|p| p.id.clone())
            .ok_or(GameError::PlayerNotFound)
    }

    pub fn set_connected(&mut self, id: &PlayerId, connected: bool) -> bool {
        match self.player_mut(id) {
            Some(player) if player.connected != connected => {
                player.connected = connected;
                true
            }
            _ => false,
        }
    }

    pub fn start_game(
        &mut self,
        requester: &PlayerId,
        now: DateTime<Utc>,
        settings: &GameSettings,
    ) -> Result<(), GameError> {
        self.start_game_with_deck(requester, Deck::shuffled(), now, settings)
    }

    /// Starts a ride that deals from `deck` as given.
    pub fn start_game_with_deck(
        &mut self,
        requester: &PlayerId,
        deck: Deck,
        now: DateTime<Utc>,
        settings: &GameSettings,
    ) -> Result<(), GameError> {
        self.ensure_host(requester)?;
        self.ensure_open()?;
        if self.game.started {
            return Err(GameError::AlreadyStarted);
        }
        if self.guests().next().is_none() {
            return Err(GameError::NotEnoughPlayers);
        }

        let mut game = Game {
            started: true,
            active_players: self.guests().map(|p| p.id.clone()).collect(),
            deck,
            ..Default::default()
        };
        game.deal()?;
        game.deadline = Some(now + settings.round_duration);
        info!(
            "{}: ride started with {} players",
            self.code,
            game.active_players.len()
        );
        self.game = game;
        Ok(())
    }

    pub fn restart_game(&mut self, requester: &PlayerId) -> Result<(), GameError> {
        self.ensure_host(requester)?;
        self.ensure_open()?;
        self.reset_game();
        info!("{}: ride reset by host", self.code);
        Ok(())
    }

    /// Drops the current game. Player totals carry over.
    pub fn reset_game(&mut self) {
        self.game = Game::default();
    }

    pub fn submit_guess(
        &mut self,
        player_id: &PlayerId,
        value: &str,
        expected_round: Option<u8>,
        now: DateTime<Utc>,
        settings: &GameSettings,
    ) -> Result<Option<RoundSummary>, GameError> {
        self.ensure_open()?;
        if !self.game.active_players.contains(player_id) {
            return Err(GameError::NotActive);
        }
        let Some(kind) = self.game.round_kind().filter(|_| self.game.is_guessing()) else {
            return Err(GameError::WrongPhase);
        };
        if let Some(expected) = expected_round
            && expected != self.game.round
        {
            return Err(GameError::StaleRound {
                expected,
                current: self.game.round,
            });
        }
        if self.game.has_guessed(player_id) {
            return Err(GameError::AlreadyGuessed);
        }
        let guess = value
            .parse::<Guess>()
            .ok()
            .filter(|g| kind.accepts(*g))
            .ok_or_else(|| GameError::InvalidValue {
                value: value.trim().to_string(),
            })?;

        let guesses = self.game.guesses.entry(player_id.clone()).or_default();
        if guesses.len() + 1 != usize::from(self.game.round) {
            return Err(GameError::InvariantViolation(format!(
                "{player_id} guessing round {} with {} guesses on record",
                self.game.round,
                guesses.len()
            )));
        }
        guesses.push(guess);
        debug!(
            "{}: {player_id} guessed {guess} in round {}",
            self.code, self.game.round
        );

        if self.game.all_active_guessed() {
            return self.resolve_round(now, settings).map(Some);
        }
        Ok(None)
    }

    /// Turns over the face-down card and settles the round. Missing guesses
    /// count as wrong.
    pub fn resolve_round(
        &mut self,
        now: DateTime<Utc>,
        settings: &GameSettings,
    ) -> Result<RoundSummary, GameError> {
        let round = self.game.round;
        let kind = self
            .game
            .round_kind()
            .filter(|_| self.game.is_guessing())
            .ok_or(GameError::WrongPhase)?;
        let stake = settings.stake(round);
        let idx = usize::from(round) - 1;
        let card = *self
            .game
            .shared
            .get(idx)
            .ok_or_else(|| GameError::InvariantViolation(format!("no card for round {round}")))?;

        let mut summary = RoundSummary {
            round,
            card,
            correct: Vec::new(),
            eliminated: Vec::new(),
            tapped_out: self.game.pending_tap_out.iter().cloned().collect(),
        };
        let active: Vec<PlayerId> = self.game.active_players.iter().cloned().collect();
        for player_id in active {
            let correct = self
                .game
                .guesses
                .get(&player_id)
                .and_then(|g| g.get(idx))
                .is_some_and(|g| rules::is_correct(kind, &self.game.shared, *g));
            if correct {
                *self.game.give_out_remaining.entry(player_id.clone()).or_default() += stake;
                summary.correct.push(player_id);
            } else {
                *self.game.drink_now.entry(player_id.clone()).or_default() += stake;
                if let Some(player) = self.player_mut(&player_id) {
                    player.drink(stake);
                }
                self.game.active_players.remove(&player_id);
                summary.eliminated.push(player_id);
            }
        }
        for player_id in std::mem::take(&mut self.game.pending_tap_out) {
            self.game.active_players.remove(&player_id);
        }
        info!(
            "{}: round {round} resolved on {card}, {} correct, {} out",
            self.code,
            summary.correct.len(),
            summary.eliminated.len()
        );

        if round < NUM_ROUNDS && !self.game.active_players.is_empty() {
            self.game.deal()?;
            self.game.deadline = Some(now + settings.round_duration);
        } else {
            self.game.deadline = None;
            self.enter_distribution(now, settings);
        }
        Ok(summary)
    }

    /// Opens the hand-out phase if anyone has sips to give and someone to
    /// give them to; otherwise the ride is over.
    pub fn enter_distribution(&mut self, now: DateTime<Utc>, settings: &GameSettings) {
        self.game.give_out_remaining.retain(|_, left| *left > 0);
        let has_targets = self.guests().nth(1).is_some();
        if !self.game.give_out_remaining.is_empty() && has_targets {
            self.game.distribution_active = true;
            self.game.distribution_deadline = Some(now + settings.distribution_duration);
            info!(
                "{}: distribution open for {} givers",
                self.code,
                self.game.give_out_remaining.len()
            );
        } else {
            let forfeited = self.game.finish();
            info!("{}: ride finished, {forfeited} sips forfeited", self.code);
        }
    }

    pub fn request_tap_out(&mut self, player_id: &PlayerId) -> Result<(), GameError> {
        self.ensure_open()?;
        if !self.game.is_guessing() {
            return Err(GameError::WrongPhase);
        }
        if !self.game.active_players.contains(player_id) {
            return Err(GameError::NotActive);
        }
        if !self.game.pending_tap_out.insert(player_id.clone()) {
            return Err(GameError::TapOutAlreadyRequested);
        }
        debug!(
            "{}: {player_id} taps out after round {}",
            self.code, self.game.round
        );
        Ok(())
    }

    pub fn submit_distribution(
        &mut self,
        giver: &PlayerId,
        allocations: &BTreeMap<PlayerId, u32>,
    ) -> Result<(), GameError> {
        self.ensure_open()?;
        if !self.game.distribution_active {
            return Err(GameError::WrongPhase);
        }
        let remaining = self
            .game
            .give_out_remaining
            .get(giver)
            .copied()
            .filter(|left| *left > 0)
            .ok_or_else(|| GameError::invalid_allocation("nothing left to give"))?;

        let mut total: u64 = 0;
        for (target, count) in allocations.iter().filter(|(_, count)| **count > 0) {
            if target == giver {
                return Err(GameError::invalid_allocation("can't give to yourself"));
            }
            if self.is_host(target) || self.player(target).is_none() {
                return Err(GameError::invalid_allocation(format!("unknown target {target}")));
            }
            total += u64::from(*count);
        }
        if total != u64::from(remaining) {
            return Err(GameError::invalid_allocation(format!(
                "allocated {total} of {remaining}"
            )));
        }

        for (target, count) in allocations.iter().filter(|(_, count)| **count > 0) {
            *self.game.drink_now.entry(target.clone()).or_default() += count;
            if let Some(player) = self.player_mut(target) {
                player.drink(*count);
            }
        }
        if let Some(player) = self.player_mut(giver) {
            player.given_out += remaining;
        }
        self.game.give_out_remaining.remove(giver);
        info!("{}: {giver} handed out {remaining} sips", self.code);

        if self.game.give_out_remaining.is_empty() {
            self.game.finish();
            info!("{}: ride finished", self.code);
        }
        Ok(())
    }

    /// Applies whichever timer has lapsed at `now`, if any.
    pub fn handle_deadline(
        &mut self,
        now: DateTime<Utc>,
        settings: &GameSettings,
    ) -> Result<Option<Expired>, GameError> {
        if self.game.distribution_active {
            if self.game.distribution_deadline.is_some_and(|d| now >= d) {
                let forfeited = self.game.finish();
                info!(
                    "{}: distribution timed out, {forfeited} sips forfeited",
                    self.code
                );
                return Ok(Some(Expired::Distribution { forfeited }));
            }
        } else if self.game.is_guessing() && self.game.deadline.is_some_and(|d| now >= d) {
            debug!("{}: round {} timed out", self.code, self.game.round);
            return self
                .resolve_round(now, settings)
                .map(|summary| Some(Expired::Round(summary)));
        }
        Ok(None)
    }

    /// Host-initiated close. The lobby lingers for `grace` so clients can see
    /// it going away.
    pub fn close(
        &mut self,
        requester: &PlayerId,
        now: DateTime<Utc>,
        grace: TimeDelta,
    ) -> Result<(), GameError> {
        self.ensure_host(requester)?;
        self.ensure_open()?;
        self.begin_shutdown(now, grace);
        Ok(())
    }

    pub fn begin_shutdown(&mut self, now: DateTime<Utc>, grace: TimeDelta) {
        self.status = SessionStatus::ShuttingDown;
        self.shutting_down_at = Some(now + grace);
        info!("{}: shutting down", self.code);
    }
}
