//! HTTP API client for the lobby server.

use anyhow::{Context, Result};
use reqwest::{StatusCode, Url};
use ride_the_bus::{PlayerId, SessionSnapshot};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::BTreeMap;

/// API client for communicating with a lobby server
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateLobbyRequest<'a> {
    host_name: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedLobby {
    pub code: String,
    pub host_id: PlayerId,
    pub session: SessionSnapshot,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JoinRequest<'a> {
    name: &'a str,
    player_id: Option<&'a PlayerId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Joined {
    pub player_id: PlayerId,
    pub session: SessionSnapshot,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HostRequest<'a> {
    host_id: &'a PlayerId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChoiceRequest<'a> {
    player_id: &'a PlayerId,
    choice: &'a str,
    round: Option<u8>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DistributeRequest<'a> {
    player_id: &'a PlayerId,
    allocations: &'a BTreeMap<PlayerId, u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlayerRequest<'a> {
    player_id: &'a PlayerId,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Open a new lobby; the caller becomes its host
    pub async fn create_lobby(&self, host_name: Option<&str>) -> Result<CreatedLobby> {
        self.post("/api/lobbies", &CreateLobbyRequest { host_name })
            .await
            .context("Create lobby failed")
    }

    /// Join a lobby, or rejoin with a previously issued id
    pub async fn join(
        &self,
        code: &str,
        name: &str,
        player_id: Option<&PlayerId>,
    ) -> Result<Joined> {
        self.post(
            &format!("/api/lobbies/{code}/join"),
            &JoinRequest { name, player_id },
        )
        .await
        .context("Join lobby failed")
    }

    pub async fn get_session(&self, code: &str) -> Result<SessionSnapshot> {
        let response = self
            .client
            .get(format!("{}/api/lobbies/{code}", self.base_url))
            .send()
            .await
            .context("Failed to send request")?;
        parse_response(response).await
    }

    pub async fn start_game(&self, code: &str, host_id: &PlayerId) -> Result<SessionSnapshot> {
        self.post(&format!("/api/lobbies/{code}/start"), &HostRequest { host_id })
            .await
    }

    pub async fn restart_game(&self, code: &str, host_id: &PlayerId) -> Result<SessionSnapshot> {
        self.post(
            &format!("/api/lobbies/{code}/restart"),
            &HostRequest { host_id },
        )
        .await
    }

    pub async fn submit_choice(
        &self,
        code: &str,
        player_id: &PlayerId,
        choice: &str,
        round: Option<u8>,
    ) -> Result<SessionSnapshot> {
        self.post(
            &format!("/api/lobbies/{code}/choice"),
            &ChoiceRequest {
                player_id,
                choice,
                round,
            },
        )
        .await
    }

    pub async fn submit_distribution(
        &self,
        code: &str,
        player_id: &PlayerId,
        allocations: &BTreeMap<PlayerId, u32>,
    ) -> Result<SessionSnapshot> {
        self.post(
            &format!("/api/lobbies/{code}/distribute"),
            &DistributeRequest {
                player_id,
                allocations,
            },
        )
        .await
    }

    pub async fn request_tap_out(&self, code: &str, player_id: &PlayerId) -> Result<SessionSnapshot> {
        self.post(
            &format!("/api/lobbies/{code}/tap"),
            &PlayerRequest { player_id },
        )
        .await
    }

    pub async fn close_lobby(&self, code: &str, host_id: &PlayerId) -> Result<SessionSnapshot> {
        self.post(&format!("/api/lobbies/{code}/close"), &HostRequest { host_id })
            .await
    }

    /// Push-channel URL for a lobby, carrying the resume token when there is one
    pub fn websocket_url(&self, code: &str, identity: Option<(&PlayerId, &str)>) -> Result<String> {
        let ws_base = self
            .base_url
            .replace("http://", "ws://")
            .replace("https://", "wss://");
        let base = format!("{ws_base}/api/lobbies/{code}/ws");

        let url = match identity {
            Some((player_id, name)) => {
                Url::parse_with_params(&base, &[("playerId", player_id.as_str()), ("name", name)])
            }
            None => Url::parse(&base),
        }
        .context("Invalid server URL")?;

        Ok(url.to_string())
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;
        parse_response(response).await
    }
}

/// Decode a success body, or turn the server's `{"error": ...}` into an error
async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return response.json().await.context("Failed to parse response");
    }

    let text = response
        .text()
        .await
        .unwrap_or_else(|e| format!("Failed to read error response: {}", e));
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or(text);

    match status {
        StatusCode::NOT_FOUND => anyhow::bail!("Not found: {message}"),
        StatusCode::CONFLICT => anyhow::bail!("Out of date: {message}"),
        _ => anyhow::bail!("{message}"),
    }
}
