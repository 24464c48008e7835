//! Lobby module providing the session store as a set of async actors.
//!
//! This module implements:
//! - LobbyActor: async actor owning one lobby's session, subscribers and timers
//! - LobbyManager: code-addressed registry that spawns and reaps lobby actors
//! - Message-based communication with tokio channels
//!
//! ## Architecture
//!
//! Each lobby runs in a separate Tokio task with an mpsc message inbox, so
//! every command for a lobby is applied in arrival order by a single writer.
//! Round, distribution, idle and shutdown timers are computed from the
//! session on every loop iteration and disappear with the task.
//!
//! ## Example
//!
//! ```no_run
//! use ride_the_bus::lobby::{LobbyConfig, LobbyManager};
//!
//! # async fn demo() -> Result<(), ride_the_bus::GameError> {
//! let manager = LobbyManager::new(LobbyConfig::default());
//! let lobby = manager.create_lobby(Some("Big Screen")).await?;
//! let joined = manager.join_lobby(&lobby.code, "alice".into(), None).await?;
//! manager.start_game(&lobby.code, lobby.host_id.clone()).await?;
//! # let _ = joined;
//! # Ok(())
//! # }
//! ```

pub mod actor;
pub mod codes;
pub mod config;
pub mod manager;
pub mod messages;

pub use actor::{LobbyActor, LobbyHandle};
pub use codes::normalize_code;
pub use config::LobbyConfig;
pub use manager::{CreatedLobby, LobbyManager};
pub use messages::{JoinAccepted, LobbyMessage, LobbyResult, PlayerRef};
