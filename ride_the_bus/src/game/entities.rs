use rand::seq::SliceRandom;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{borrow::Borrow, fmt, str::FromStr};
use uuid::Uuid;

use super::constants::{self, NUM_ROUNDS};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Suit {
    #[serde(rename = "hearts")]
    Heart,
    #[serde(rename = "diamonds")]
    Diamond,
    #[serde(rename = "clubs")]
    Club,
    #[serde(rename = "spades")]
    Spade,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Heart, Suit::Diamond, Suit::Club, Suit::Spade];

    pub fn is_red(self) -> bool {
        matches!(self, Self::Heart | Self::Diamond)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Heart => "hearts",
            Self::Diamond => "diamonds",
            Self::Club => "clubs",
            Self::Spade => "spades",
        }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Club => "♣",
            Self::Spade => "♠",
            Self::Diamond => "♦",
            Self::Heart => "♥",
        };
        write!(f, "{repr}")
    }
}

impl FromStr for Suit {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|suit| suit.name() == s)
            .ok_or(())
    }
}

/// Card rank, ace low (1) through king (13).
pub type Value = u8;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card {
    pub rank: Value,
    pub suit: Suit,
}

impl Card {
    pub const fn new(rank: Value, suit: Suit) -> Self {
        Self { rank, suit }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let value = match self.rank {
            1 => "A",
            11 => "J",
            12 => "Q",
            13 => "K",
            v => &v.to_string(),
        };
        let repr = format!("{value}/{}", self.suit);
        write!(f, "{repr:>4}")
    }
}

/// Cards left to deal in the current ride. Never serialized, so cards that
/// haven't been turned over can't reach a client.
#[derive(Clone, Debug)]
pub struct Deck {
    cards: Vec<Card>,
    pub deck_idx: usize,
}

impl Deck {
    /// A full 52-card deck in a fresh random order.
    pub fn shuffled() -> Self {
        let mut deck = Self::default();
        deck.shuffle();
        deck
    }

    /// A deck that deals `cards` in the given order. Used to replay known rides.
    pub fn stacked(cards: Vec<Card>) -> Self {
        Self { cards, deck_idx: 0 }
    }

    pub fn deal_card(&mut self) -> Option<Card> {
        let card = self.cards.get(self.deck_idx).copied()?;
        self.deck_idx += 1;
        Some(card)
    }

    pub fn shuffle(&mut self) {
        self.cards.shuffle(&mut rand::rng());
        self.deck_idx = 0;
    }

    pub fn remaining(&self) -> usize {
        self.cards.len() - self.deck_idx
    }
}

impl Default for Deck {
    fn default() -> Self {
        let mut cards = Vec::with_capacity(52);
        for suit in Suit::ALL {
            for rank in 1..=13 {
                cards.push(Card::new(rank, suit));
            }
        }
        Self { cards, deck_idx: 0 }
    }
}

/// Opaque player identity handed out on join. Doubles as the resume token a
/// client presents when it reconnects.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn host() -> Self {
        Self(format!("host_{}", Uuid::new_v4()))
    }

    pub fn player() -> Self {
        Self(format!("player_{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Borrow<str> for PlayerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PlayerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Trim a display name and cap it at `max_len` characters. Empty names are
/// rejected by callers.
pub fn sanitize_name(name: &str, max_len: usize) -> String {
    name.trim().chars().take(max_len).collect()
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Sips taken this lobby, whether lost or handed out by someone else.
    pub score: u32,
    pub lifetime_drank: u32,
    pub given_out: u32,
    /// At least one live subscriber is presenting this identity.
    pub connected: bool,
}

impl Player {
    pub fn new(id: PlayerId, name: String) -> Self {
        Self {
            id,
            name,
            score: 0,
            lifetime_drank: 0,
            given_out: 0,
            connected: false,
        }
    }

    pub fn drink(&mut self, sips: u32) {
        self.score += sips;
        self.lifetime_drank += sips;
    }
}

/// The four guess phases, in ride order.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RoundKind {
    RedBlack,
    HigherLower,
    BetweenOutside,
    Suit,
}

impl RoundKind {
    pub fn from_round(round: u8) -> Option<Self> {
        match round {
            1 => Some(Self::RedBlack),
            2 => Some(Self::HigherLower),
            3 => Some(Self::BetweenOutside),
            4 => Some(Self::Suit),
            _ => None,
        }
    }

    pub fn round(self) -> u8 {
        match self {
            Self::RedBlack => 1,
            Self::HigherLower => 2,
            Self::BetweenOutside => 3,
            Self::Suit => NUM_ROUNDS,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::RedBlack => "red_black",
            Self::HigherLower => "higher_lower",
            Self::BetweenOutside => "between_outside",
            Self::Suit => "suit",
        }
    }

    pub fn accepts(self, guess: Guess) -> bool {
        matches!(
            (self, guess),
            (Self::RedBlack, Guess::Red | Guess::Black)
                | (Self::HigherLower, Guess::Higher | Guess::Lower)
                | (Self::BetweenOutside, Guess::Between | Guess::Outside)
                | (Self::Suit, Guess::Suit(_))
        )
    }
}

impl fmt::Display for RoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Guess {
    Red,
    Black,
    Higher,
    Lower,
    Between,
    Outside,
    Suit(Suit),
}

impl Guess {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Black => "black",
            Self::Higher => "higher",
            Self::Lower => "lower",
            Self::Between => "between",
            Self::Outside => "outside",
            Self::Suit(suit) => suit.name(),
        }
    }
}

impl fmt::Display for Guess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Guess {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let guess = match normalized.as_str() {
            "red" => Self::Red,
            "black" => Self::Black,
            "higher" => Self::Higher,
            "lower" => Self::Lower,
            "between" | "inside" => Self::Between,
            "outside" => Self::Outside,
            other => other
                .parse::<Suit>()
                .map(Self::Suit)
                .map_err(|_| normalized.clone())?,
        };
        Ok(guess)
    }
}

impl Serialize for Guess {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Guess {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse()
            .map_err(|bad| serde::de::Error::custom(format!("unknown guess `{bad}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_red_suits() {
        assert!(Suit::Heart.is_red());
        assert!(Suit::Diamond.is_red());
        assert!(!Suit::Club.is_red());
        assert!(!Suit::Spade.is_red());
    }

    #[test]
    fn test_card_display() {
        assert_eq!(format!("{}", Card::new(1, Suit::Spade)), " A/♠");
        assert_eq!(format!("{}", Card::new(12, Suit::Heart)), " Q/♥");
        assert_eq!(format!("{}", Card::new(10, Suit::Club)), "10/♣");
    }

    #[test]
    fn test_card_serializes_with_named_suit() {
        let json = serde_json::to_string(&Card::new(7, Suit::Heart)).unwrap();
        assert_eq!(json, r#"{"rank":7,"suit":"hearts"}"#);
    }

    #[test]
    fn test_deck_has_every_card_once() {
        let mut deck = Deck::shuffled();
        let mut seen = std::collections::HashSet::new();
        while let Some(card) = deck.deal_card() {
            assert!((1..=13).contains(&card.rank));
            assert!(seen.insert(card));
        }
        assert_eq!(seen.len(), 52);
        assert_eq!(deck.remaining(), 0);
    }

    #[test]
    fn test_stacked_deck_deals_in_order() {
        let mut deck = Deck::stacked(vec![Card::new(7, Suit::Heart), Card::new(10, Suit::Spade)]);
        assert_eq!(deck.deal_card(), Some(Card::new(7, Suit::Heart)));
        assert_eq!(deck.deal_card(), Some(Card::new(10, Suit::Spade)));
        assert_eq!(deck.deal_card(), None);
    }

    #[test]
    fn test_player_ids_are_prefixed_and_unique() {
        let host = PlayerId::host();
        let a = PlayerId::player();
        let b = PlayerId::player();
        assert!(host.as_str().starts_with("host_"));
        assert!(a.as_str().starts_with("player_"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("  alice  ", constants::MAX_NAME_LENGTH), "alice");
        assert_eq!(
            sanitize_name(&"x".repeat(100), constants::MAX_NAME_LENGTH).len(),
            constants::MAX_NAME_LENGTH
        );
        assert_eq!(sanitize_name(" alexander ", 4), "alex");
    }

    #[test]
    fn test_guess_parsing_normalizes() {
        assert_eq!(" RED ".parse::<Guess>(), Ok(Guess::Red));
        assert_eq!("inside".parse::<Guess>(), Ok(Guess::Between));
        assert_eq!("Spades".parse::<Guess>(), Ok(Guess::Suit(Suit::Spade)));
        assert!("purple".parse::<Guess>().is_err());
    }

    #[test]
    fn test_round_kind_accepts_only_its_domain() {
        assert!(RoundKind::RedBlack.accepts(Guess::Black));
        assert!(!RoundKind::RedBlack.accepts(Guess::Higher));
        assert!(RoundKind::HigherLower.accepts(Guess::Lower));
        assert!(RoundKind::BetweenOutside.accepts(Guess::Between));
        assert!(!RoundKind::BetweenOutside.accepts(Guess::Suit(Suit::Club)));
        assert!(RoundKind::Suit.accepts(Guess::Suit(Suit::Club)));
        assert!(!RoundKind::Suit.accepts(Guess::Red));
        assert_eq!(RoundKind::from_round(0), None);
        assert_eq!(RoundKind::from_round(5), None);
    }

    #[test]
    fn test_guess_serializes_as_plain_string() {
        let json = serde_json::to_string(&vec![Guess::Red, Guess::Suit(Suit::Diamond)]).unwrap();
        assert_eq!(json, r#"["red","diamonds"]"#);
        let back: Vec<Guess> = serde_json::from_str(r#"["inside"]"#).unwrap();
        assert_eq!(back, vec![Guess::Between]);
    }
}
