//! Ride the Bus game engine.
//!
//! - [`entities`]: cards, decks, guesses and players
//! - [`rules`]: deciding whether a guess was right
//! - [`state`]: the per-ride [`Game`] and its invariants
//! - [`session`]: a lobby's full state and its wire snapshot
//! - [`engine`]: the operations that move a session forward

pub mod constants;
pub mod engine;
pub mod entities;
pub mod errors;
pub mod rules;
pub mod session;
pub mod state;

pub use engine::{Expired, GameSettings, RoundSummary};
pub use errors::{ErrorKind, GameError};
pub use session::{Session, SessionSnapshot, SessionStatus};
pub use state::{Game, GameSnapshot};
