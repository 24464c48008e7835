//! # Ride the Bus
//!
//! Authoritative engine for the Ride the Bus party game: one host screen, a
//! handful of phones, four rounds of guessing and a pile of sips to hand out.
//!
//! ## Architecture
//!
//! A ride moves through four guess phases, each judged against a card that
//! stays face down until the round resolves:
//!
//! - **Red or black**: colour of the first card
//! - **Higher or lower**: second card against the first
//! - **Between or outside**: third card against the first two
//! - **Suit**: suit of the fourth card
//!
//! A wrong or missing guess costs the round's stake and puts the player out
//! for the rest of the ride. Right guesses earn sips to hand out once the
//! guessing is over.
//!
//! ## Core Modules
//!
//! - [`game`]: cards, rules and the session state machine
//! - [`view`]: pure projection of a snapshot into what a screen shows
//! - [`broadcast`]: snapshot fan-out and the [`SnapshotFeed`] seam
//! - [`lobby`]: per-lobby actors and the code-addressed [`LobbyManager`]

/// Core game logic, entities, and state machine.
pub mod game;
pub use game::{
    ErrorKind, GameError, GameSettings, Session, SessionSnapshot, SessionStatus,
    constants::{self, NUM_ROUNDS},
    entities::{self, Card, Guess, Player, PlayerId, RoundKind, Suit},
};

/// Snapshot subscribers and the push protocol.
pub mod broadcast;
pub use broadcast::{ResumeToken, ServerMessage, SnapshotFeed, SubscriberId, Subscription};

/// Lobby actors and the session store.
pub mod lobby;
pub use lobby::{LobbyConfig, LobbyManager, PlayerRef};

/// Display-state projection.
pub mod view;
pub use view::{Phase, PlayerStatus, ViewState, project};
