//! Client-side projection of a session snapshot into what a screen shows.
//!
//! [`project`] is a pure function of the snapshot, so any client holding the
//! latest snapshot renders the same thing no matter how it got there.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

use crate::game::{
    SessionSnapshot, SessionStatus,
    entities::{Card, Guess, PlayerId, RoundKind},
    rules,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    Waiting,
    Guessing(RoundKind),
    Distribution,
    Result,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Guessing(kind) => kind.label(),
            Self::Distribution => "distribution",
            Self::Result => "result",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl Serialize for Phase {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatus {
    pub id: PlayerId,
    pub nickname: String,
    pub ready: bool,
    pub is_spectator: bool,
    pub last_guess: Option<Guess>,
    pub last_guess_round: Option<u8>,
    pub last_guess_correct: Option<bool>,
    pub drink_now: u32,
    pub give_out_remaining: u32,
    pub pending_tap_out: bool,
    pub lifetime_drank: u32,
    pub connected: bool,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub code: String,
    pub host_id: PlayerId,
    pub phase: Phase,
    pub round: u8,
    pub deadline: Option<DateTime<Utc>>,
    pub current_card: Option<Card>,
    pub previous_card: Option<Card>,
    pub revealed_cards: Vec<Card>,
    pub lobby_status: SessionStatus,
    pub shutting_down_at: Option<DateTime<Utc>>,
    pub players: Vec<PlayerStatus>,
}

impl ViewState {
    pub fn player(&self, id: &PlayerId) -> Option<&PlayerStatus> {
        self.players.iter().find(|p| &p.id == id)
    }
}

pub fn phase_of(snapshot: &SessionSnapshot) -> Phase {
    let game = &snapshot.game;
    if !game.started {
        Phase::Waiting
    } else if game.distribution_active {
        Phase::Distribution
    } else if game.finished {
        Phase::Result
    } else {
        RoundKind::from_round(game.round).map_or(Phase::Waiting, Phase::Guessing)
    }
}

pub fn project(snapshot: &SessionSnapshot) -> ViewState {
    let game = &snapshot.game;
    let phase = phase_of(snapshot);
    let revealed = &game.shared;

    let deadline = match phase {
        Phase::Guessing(_) => game.deadline,
        Phase::Distribution => game.distribution_deadline,
        Phase::Waiting | Phase::Result => None,
    };

    let players = snapshot
        .players
        .iter()
        .filter(|p| p.id != snapshot.host_id)
        .map(|p| {
            let guesses = game.guesses.get(&p.id).map(Vec::as_slice).unwrap_or_default();
            let ready = matches!(phase, Phase::Guessing(_))
                && guesses.len() >= usize::from(game.round);
            let resolved = guesses.len().min(revealed.len());
            let last = resolved.checked_sub(1).and_then(|idx| {
                let round = u8::try_from(idx + 1).ok()?;
                let kind = RoundKind::from_round(round)?;
                let guess = guesses[idx];
                Some((guess, round, rules::is_correct(kind, revealed, guess)))
            });

            PlayerStatus {
                id: p.id.clone(),
                nickname: p.name.clone(),
                ready,
                is_spectator: game.started && !game.active_players.contains(&p.id),
                last_guess: last.map(|(guess, _, _)| guess),
                last_guess_round: last.map(|(_, round, _)| round),
                last_guess_correct: last.map(|(_, _, correct)| correct),
                drink_now: game.drink_now_by_player.get(&p.id).copied().unwrap_or(0),
                give_out_remaining: game
                    .give_out_remaining_by_player
                    .get(&p.id)
                    .copied()
                    .unwrap_or(0),
                pending_tap_out: game.pending_tap_out.contains(&p.id),
                lifetime_drank: p.lifetime_drank,
                connected: p.connected,
            }
        })
        .collect();

    ViewState {
        code: snapshot.code.clone(),
        host_id: snapshot.host_id.clone(),
        phase,
        round: game.round,
        deadline,
        current_card: revealed.last().copied(),
        previous_card: revealed.len().checked_sub(2).map(|idx| revealed[idx]),
        revealed_cards: revealed.clone(),
        lobby_status: snapshot.status,
        shutting_down_at: snapshot.shutting_down_at,
        players,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{
        GameSettings, Session,
        entities::{Deck, Player, Suit},
    };

    fn ride() -> (Session, Vec<PlayerId>) {
        let host = Player::new(PlayerId::host(), "Host".into());
        let host_id = host.id.clone();
        let mut session = Session::new("TEST".into(), host, Utc::now());
        let settings = GameSettings::default();
        let ids: Vec<_> = ["p1", "p2"]
            .iter()
            .map(|n| session.join(n, None, &settings).unwrap())
            .collect();
        let deck = Deck::stacked(vec![
            Card::new(7, Suit::Heart),
            Card::new(10, Suit::Spade),
            Card::new(3, Suit::Diamond),
            Card::new(12, Suit::Club),
        ]);
        session
            .start_game_with_deck(&host_id, deck, Utc::now(), &settings)
            .unwrap();
        (session, ids)
    }

    fn submit(session: &mut Session, id: &PlayerId, value: &str) {
        session
            .submit_guess(id, value, None, Utc::now(), &GameSettings::default())
            .unwrap();
    }

    #[test]
    fn test_waiting_lobby() {
        let host = Player::new(PlayerId::host(), "Host".into());
        let session = Session::new("TEST".into(), host, Utc::now());
        let view = project(&session.snapshot());
        assert_eq!(view.phase, Phase::Waiting);
        assert!(view.players.is_empty());
        assert!(view.current_card.is_none());
        assert!(view.deadline.is_none());
    }

    #[test]
    fn test_first_round_shows_no_cards() {
        let (session, ids) = ride();
        let view = project(&session.snapshot());
        assert_eq!(view.phase, Phase::Guessing(RoundKind::RedBlack));
        assert_eq!(view.phase.label(), "red_black");
        assert!(view.current_card.is_none());
        assert!(view.revealed_cards.is_empty());
        assert!(view.deadline.is_some());
        assert_eq!(view.players.len(), 2);
        assert!(!view.player(&ids[0]).unwrap().ready);
    }

    #[test]
    fn test_ready_and_last_guess() {
        let (mut session, ids) = ride();
        submit(&mut session, &ids[0], "red");
        let view = project(&session.snapshot());
        let p1 = view.player(&ids[0]).unwrap();
        assert!(p1.ready);
        assert_eq!(p1.last_guess, None);

        submit(&mut session, &ids[1], "black");
        let view = project(&session.snapshot());
        assert_eq!(view.phase, Phase::Guessing(RoundKind::HigherLower));
        assert_eq!(view.current_card, Some(Card::new(7, Suit::Heart)));
        assert_eq!(view.previous_card, None);

        let p1 = view.player(&ids[0]).unwrap();
        assert!(!p1.ready);
        assert_eq!(p1.last_guess, Some(Guess::Red));
        assert_eq!(p1.last_guess_round, Some(1));
        assert_eq!(p1.last_guess_correct, Some(true));
        assert_eq!(p1.give_out_remaining, 2);

        let p2 = view.player(&ids[1]).unwrap();
        assert!(p2.is_spectator);
        assert_eq!(p2.last_guess_correct, Some(false));
        assert_eq!(p2.drink_now, 2);
    }

    #[test]
    fn test_distribution_phase() {
        let (mut session, ids) = ride();
        submit(&mut session, &ids[0], "red");
        submit(&mut session, &ids[1], "black");
        submit(&mut session, &ids[0], "higher");
        submit(&mut session, &ids[0], "between");
        let view = project(&session.snapshot());
        assert_eq!(view.phase, Phase::Distribution);
        assert_eq!(view.deadline, session.game.distribution_deadline);
        assert_eq!(view.current_card, Some(Card::new(3, Suit::Diamond)));
        assert_eq!(view.previous_card, Some(Card::new(10, Suit::Spade)));
        let p1 = view.player(&ids[0]).unwrap();
        assert_eq!(p1.last_guess_round, Some(3));
        assert_eq!(p1.last_guess_correct, Some(false));
        assert_eq!(p1.drink_now, 8);
        assert_eq!(p1.give_out_remaining, 6);
    }

    #[test]
    fn test_phase_serializes_as_label() {
        let (session, _) = ride();
        let json = serde_json::to_value(project(&session.snapshot())).unwrap();
        assert_eq!(json["phase"], "red_black");
        assert_eq!(json["lobbyStatus"], "active");
        assert_eq!(json["players"][0]["isSpectator"], false);
    }
}
