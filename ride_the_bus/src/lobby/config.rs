//! Lobby configuration models.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::game::{
    GameSettings,
    constants::{
        DEFAULT_DISTRIBUTION_DURATION_SECS, DEFAULT_IDLE_CLOSE_AFTER_SECS,
        DEFAULT_ROUND_DURATION_SECS, DEFAULT_SHUTDOWN_GRACE_SECS, DEFAULT_STAKES,
        DEFAULT_SUBSCRIBER_BUFFER, MAX_NAME_LENGTH, NUM_ROUNDS,
    },
};

/// Lobby configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LobbyConfig {
    /// Seconds each guessing round stays open (default: 15)
    pub round_duration_secs: u64,

    /// Seconds givers get to hand out sips (default: 20)
    pub distribution_duration_secs: u64,

    /// Sips at stake in rounds 1 through 4
    pub stakes: [u32; NUM_ROUNDS as usize],

    /// Close a lobby after this long without subscribers (default: 15 min)
    pub idle_close_after_secs: u64,

    /// Time between entering `shutting_down` and teardown (default: 30)
    pub shutdown_grace_secs: u64,

    /// Snapshots buffered per subscriber before eviction
    pub subscriber_buffer: usize,

    /// Longest accepted display name, in characters
    pub max_name_length: usize,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            round_duration_secs: DEFAULT_ROUND_DURATION_SECS,
            distribution_duration_secs: DEFAULT_DISTRIBUTION_DURATION_SECS,
            stakes: DEFAULT_STAKES,
            idle_close_after_secs: DEFAULT_IDLE_CLOSE_AFTER_SECS,
            shutdown_grace_secs: DEFAULT_SHUTDOWN_GRACE_SECS,
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
            max_name_length: MAX_NAME_LENGTH,
        }
    }
}

impl LobbyConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.round_duration_secs == 0 {
            return Err("Round duration must be at least 1 second".to_string());
        }

        if self.distribution_duration_secs == 0 {
            return Err("Distribution duration must be at least 1 second".to_string());
        }

        if self.stakes.contains(&0) {
            return Err("Every round must have a stake".to_string());
        }

        if self.subscriber_buffer == 0 {
            return Err("Subscriber buffer must hold at least 1 snapshot".to_string());
        }

        if self.max_name_length == 0 {
            return Err("Max name length must be positive".to_string());
        }

        Ok(())
    }

    pub fn game_settings(&self) -> GameSettings {
        GameSettings {
            round_duration: secs(self.round_duration_secs),
            distribution_duration: secs(self.distribution_duration_secs),
            stakes: self.stakes,
            max_name_length: self.max_name_length,
        }
    }

    pub fn idle_close_after(&self) -> TimeDelta {
        secs(self.idle_close_after_secs)
    }

    pub fn shutdown_grace(&self) -> TimeDelta {
        secs(self.shutdown_grace_secs)
    }
}

fn secs(value: u64) -> TimeDelta {
    TimeDelta::seconds(i64::from(u32::try_from(value).unwrap_or(u32::MAX)))
}
