use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{
    entities::{Player, PlayerId},
    state::{Game, GameSnapshot},
};

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Active,
    ShuttingDown,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::ShuttingDown => write!(f, "shutting_down"),
        }
    }
}

/// A lobby: the host, everyone who joined, and the current game.
#[derive(Clone, Debug)]
pub struct Session {
    pub code: String,
    pub host_id: PlayerId,
    /// Join order, host first.
    pub players: Vec<Player>,
    pub created_at: DateTime<Utc>,
    pub game: Game,
    pub status: SessionStatus,
    pub shutting_down_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(code: String, host: Player, now: DateTime<Utc>) -> Self {
        Self {
            code,
            host_id: host.id.clone(),
            players: vec![host],
            created_at: now,
            game: Game::default(),
            status: SessionStatus::Active,
            shutting_down_at: None,
        }
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    pub fn player_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| &p.id == id)
    }

    pub fn player_by_name(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name == name)
    }

    pub fn is_host(&self, id: &PlayerId) -> bool {
        &self.host_id == id
    }

    /// Everyone who isn't the host display.
    pub fn guests(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.id != self.host_id)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.status == SessionStatus::ShuttingDown
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            code: self.code.clone(),
            host_id: self.host_id.clone(),
            players: self.players.clone(),
            created_at: self.created_at,
            game: self.game.snapshot(),
            status: self.status,
            shutting_down_at: self.shutting_down_at,
        }
    }
}

/// What gets pushed to every subscriber after a committed change.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub code: String,
    pub host_id: PlayerId,
    pub players: Vec<Player>,
    pub created_at: DateTime<Utc>,
    pub game: GameSnapshot,
    pub status: SessionStatus,
    pub shutting_down_at: Option<DateTime<Utc>>,
}

impl SessionSnapshot {
    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_has_host_only() {
        let host = Player::new(PlayerId::host(), "Host".into());
        let session = Session::new("BRAVE-OTTER-JUMPS".into(), host.clone(), Utc::now());
        assert_eq!(session.players.len(), 1);
        assert!(session.is_host(&host.id));
        assert_eq!(session.guests().count(), 0);
        assert_eq!(session.status, SessionStatus::Active);
    }

    #[test]
    fn test_snapshot_field_names() {
        let host = Player::new(PlayerId::from("host_1"), "Host".into());
        let session = Session::new("CODE".into(), host, Utc::now());
        let json = serde_json::to_value(session.snapshot()).unwrap();
        assert_eq!(json["hostId"], "host_1");
        assert_eq!(json["status"], "active");
        assert!(json["shuttingDownAt"].is_null());
        assert_eq!(json["players"][0]["lifetimeDrank"], 0);
    }

    #[test]
    fn test_identical_sessions_serialize_identically() {
        let host = Player::new(PlayerId::from("host_1"), "Host".into());
        let now = Utc::now();
        let a = Session::new("CODE".into(), host.clone(), now);
        let b = a.clone();
        assert_eq!(
            serde_json::to_string(&a.snapshot()).unwrap(),
            serde_json::to_string(&b.snapshot()).unwrap()
        );
    }
}
