//! Lobby command API handlers.
//!
//! Every command answers with the session snapshot it produced, so a client
//! that just acted doesn't have to wait for the push channel to see the result.
//! Rejected commands change nothing and push nothing.
//!
//! # Examples
//!
//! Open a lobby:
//! ```bash
//! curl -X POST http://localhost:3000/api/lobbies
//! ```
//!
//! Lock in a guess:
//! ```bash
//! curl -X POST http://localhost:3000/api/lobbies/BRAVE-OTTER-JUMPS/choice \
//!   -H "Content-Type: application/json" \
//!   -d '{"playerId": "player_...", "choice": "red", "round": 1}'
//! ```

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use ride_the_bus::{
    ErrorKind, GameError, PlayerId, PlayerRef, SessionSnapshot, lobby::JoinAccepted,
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};

use super::AppState;
use crate::{logging, metrics};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLobbyRequest {
    pub host_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLobbyResponse {
    pub code: String,
    pub host_id: PlayerId,
    pub session: Arc<SessionSnapshot>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub name: String,
    pub player_id: Option<PlayerId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub player_id: PlayerId,
    pub session: Arc<SessionSnapshot>,
}

impl From<JoinAccepted> for JoinResponse {
    fn from(joined: JoinAccepted) -> Self {
        Self {
            player_id: joined.player_id,
            session: joined.session,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostRequest {
    pub host_id: PlayerId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceRequest {
    pub player_id: Option<PlayerId>,
    pub nickname: Option<String>,
    pub choice: String,
    pub round: Option<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributeRequest {
    pub player_id: Option<PlayerId>,
    pub nickname: Option<String>,
    pub allocations: BTreeMap<PlayerId, u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TapRequest {
    pub player_id: Option<PlayerId>,
    pub nickname: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

/// HTTP status for a game error
pub fn status_for(err: &GameError) -> StatusCode {
    match err.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Invariant => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(code: &str, command: &str, status: StatusCode, message: String) -> ApiError {
    logging::log_command_rejected(code, command, status.as_u16(), &message);
    metrics::commands_total(command, status.as_u16());
    (status, Json(ErrorResponse { error: message }))
}

fn game_error(code: &str, command: &str, err: GameError) -> ApiError {
    reject(code, command, status_for(&err), err.to_string())
}

fn accepted<T>(command: &str, value: T) -> ApiResult<T> {
    metrics::commands_total(command, StatusCode::OK.as_u16());
    Ok(Json(value))
}

/// Unwrap a JSON body, answering a malformed one like any other bad command
fn json_body<T>(
    code: &str,
    command: &str,
    payload: Result<Json<T>, JsonRejection>,
) -> Result<T, ApiError> {
    payload.map(|Json(request)| request).map_err(|rejection| {
        reject(
            code,
            command,
            StatusCode::BAD_REQUEST,
            format!("invalid body: {}", rejection.body_text()),
        )
    })
}

fn player_ref(
    code: &str,
    command: &str,
    player_id: Option<PlayerId>,
    nickname: Option<String>,
) -> Result<PlayerRef, ApiError> {
    PlayerRef::from_parts(player_id, nickname).ok_or_else(|| {
        reject(
            code,
            command,
            StatusCode::BAD_REQUEST,
            "playerId or nickname is required".to_string(),
        )
    })
}

/// Open a new lobby.
///
/// The body is optional; `{"hostName": "..."}` names the host display.
///
/// # Response
///
/// Returns `201 Created` with `{code, hostId, session}`.
pub async fn create_lobby(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<CreateLobbyResponse>), ApiError> {
    let request: CreateLobbyRequest = if body.is_empty() {
        CreateLobbyRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            reject("-", "create", StatusCode::BAD_REQUEST, format!("invalid body: {e}"))
        })?
    };

    let created = state
        .lobby_manager
        .create_lobby(request.host_name.as_deref())
        .await
        .map_err(|e| game_error("-", "create", e))?;

    metrics::lobbies_created_total();
    metrics::commands_total("create", StatusCode::CREATED.as_u16());

    Ok((
        StatusCode::CREATED,
        Json(CreateLobbyResponse {
            code: created.code,
            host_id: created.host_id,
            session: created.session,
        }),
    ))
}

/// Current snapshot of a lobby.
pub async fn get_lobby(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Arc<SessionSnapshot>> {
    let session = state
        .lobby_manager
        .get_session(&code)
        .await
        .map_err(|e| game_error(&code, "get", e))?;
    Ok(Json(session))
}

/// Join a lobby, or rejoin with a `playerId` previously handed out.
///
/// # Errors
///
/// - `400 Bad Request`: Blank name, name doesn't match `playerId`, lobby closing
/// - `404 Not Found`: Unknown lobby or `playerId`
pub async fn join_lobby(
    State(state): State<AppState>,
    Path(code): Path<String>,
    payload: Result<Json<JoinRequest>, JsonRejection>,
) -> ApiResult<JoinResponse> {
    let request = json_body(&code, "join", payload)?;
    let joined = state
        .lobby_manager
        .join_lobby(&code, request.name, request.player_id)
        .await
        .map_err(|e| game_error(&code, "join", e))?;
    accepted("join", joined.into())
}

/// Host starts a ride.
pub async fn start_game(
    State(state): State<AppState>,
    Path(code): Path<String>,
    payload: Result<Json<HostRequest>, JsonRejection>,
) -> ApiResult<Arc<SessionSnapshot>> {
    let request = json_body(&code, "start", payload)?;
    let session = state
        .lobby_manager
        .start_game(&code, request.host_id)
        .await
        .map_err(|e| game_error(&code, "start", e))?;
    accepted("start", session)
}

/// Host resets the game; player totals carry over.
pub async fn restart_game(
    State(state): State<AppState>,
    Path(code): Path<String>,
    payload: Result<Json<HostRequest>, JsonRejection>,
) -> ApiResult<Arc<SessionSnapshot>> {
    let request = json_body(&code, "restart", payload)?;
    let session = state
        .lobby_manager
        .restart_game(&code, request.host_id)
        .await
        .map_err(|e| game_error(&code, "restart", e))?;
    accepted("restart", session)
}

/// Lock in a guess for the current round.
///
/// Sending `round` guards against a stale screen: if the lobby has moved on,
/// the guess is refused with `409 Conflict`.
pub async fn submit_choice(
    State(state): State<AppState>,
    Path(code): Path<String>,
    payload: Result<Json<ChoiceRequest>, JsonRejection>,
) -> ApiResult<Arc<SessionSnapshot>> {
    let request = json_body(&code, "choice", payload)?;
    let player = player_ref(&code, "choice", request.player_id, request.nickname)?;
    let session = state
        .lobby_manager
        .submit_choice(&code, player, request.choice, request.round)
        .await
        .map_err(|e| game_error(&code, "choice", e))?;
    metrics::guesses_submitted_total();
    accepted("choice", session)
}

/// Hand out earned sips. Counts must add up to everything the giver has left.
pub async fn submit_distribution(
    State(state): State<AppState>,
    Path(code): Path<String>,
    payload: Result<Json<DistributeRequest>, JsonRejection>,
) -> ApiResult<Arc<SessionSnapshot>> {
    let request = json_body(&code, "distribute", payload)?;
    let player = player_ref(&code, "distribute", request.player_id, request.nickname)?;
    let session = state
        .lobby_manager
        .submit_distribution(&code, player, request.allocations)
        .await
        .map_err(|e| game_error(&code, "distribute", e))?;
    metrics::distributions_submitted_total();
    accepted("distribute", session)
}

/// Ask to leave the ride once the current round resolves.
pub async fn request_tap_out(
    State(state): State<AppState>,
    Path(code): Path<String>,
    payload: Result<Json<TapRequest>, JsonRejection>,
) -> ApiResult<Arc<SessionSnapshot>> {
    let request = json_body(&code, "tap", payload)?;
    let player = player_ref(&code, "tap", request.player_id, request.nickname)?;
    let session = state
        .lobby_manager
        .request_tap_out(&code, player)
        .await
        .map_err(|e| game_error(&code, "tap", e))?;
    accepted("tap", session)
}

/// Host closes the lobby. It reports `shutting_down` until the grace period ends.
pub async fn close_lobby(
    State(state): State<AppState>,
    Path(code): Path<String>,
    payload: Result<Json<HostRequest>, JsonRejection>,
) -> ApiResult<Arc<SessionSnapshot>> {
    let request = json_body(&code, "close", payload)?;
    let session = state
        .lobby_manager
        .close_lobby(&code, request.host_id)
        .await
        .map_err(|e| game_error(&code, "close", e))?;
    accepted("close", session)
}
