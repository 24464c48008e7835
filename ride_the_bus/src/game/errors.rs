use thiserror::Error;

/// Coarse classification of a [`GameError`], used by transports to pick a
/// status code.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Invariant,
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum GameError {
    #[error("not an active player")]
    NotActive,
    #[error("can't do that in the current phase")]
    WrongPhase,
    #[error("already guessed this round")]
    AlreadyGuessed,
    #[error("invalid choice `{value}`")]
    InvalidValue { value: String },
    #[error("invalid allocation: {reason}")]
    InvalidAllocation { reason: String },
    #[error("game already in progress")]
    AlreadyStarted,
    #[error("need 1+ players")]
    NotEnoughPlayers,
    #[error("only the host can do that")]
    NotHost,
    #[error("tap-out already requested")]
    TapOutAlreadyRequested,
    #[error("name is required")]
    NameRequired,
    #[error("player id and name don't match")]
    IdentityMismatch,
    #[error("lobby is closing")]
    LobbyClosing,
    #[error("lobby not found")]
    LobbyNotFound,
    #[error("player not found")]
    PlayerNotFound,
    #[error("round {expected} is over, now on round {current}")]
    StaleRound { expected: u8, current: u8 },
    #[error("invalid game state: {0}")]
    InvariantViolation(String),
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::LobbyNotFound | Self::PlayerNotFound => ErrorKind::NotFound,
            Self::StaleRound { .. } => ErrorKind::Conflict,
            Self::InvariantViolation(_) => ErrorKind::Invariant,
            _ => ErrorKind::Validation,
        }
    }

    pub(crate) fn invalid_allocation(reason: impl Into<String>) -> Self {
        Self::InvalidAllocation {
            reason: reason.into(),
        }
    }
}
