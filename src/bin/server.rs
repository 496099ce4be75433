use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chain_reaction_server::engine::{apply_command, create_room, join_room, leave_room};
use chain_reaction_server::error::EngineError;
use chain_reaction_server::room_store::{RoomStore, StoreError};
use chain_reaction_server::server_protocol::{parse_command, parse_create_room, parse_player};
use chain_reaction_server::server_utils::{
    normalize_room_id, normalize_room_settings, now_ms, sanitize_name,
};
use chain_reaction_server::types::{GameStatus, Room};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde_json::json;
use tokio::sync::Mutex;
use tower_http::services::{ServeDir, ServeFile};
use tracing_subscriber::EnvFilter;

const GENERATED_ROOM_ID_LEN: usize = 8;

type SharedState = Arc<Mutex<RoomStore>>;

#[derive(Debug)]
enum ApiError {
    BadRequest(&'static str),
    Engine {
        error: EngineError,
        room: Option<Room>,
    },
    Store(StoreError),
}

impl From<EngineError> for ApiError {
    fn from(error: EngineError) -> Self {
        Self::Engine { error, room: None }
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        Self::Store(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::BadRequest(code) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": code, "message": "malformed request" }),
            ),
            Self::Engine { error, room } => {
                let mut body = json!({ "error": error.code(), "message": error.to_string() });
                if let Some(room) = room {
                    body["room"] = json!(room);
                }
                (engine_status(&error), body)
            }
            Self::Store(error) => (
                store_status(&error),
                json!({ "error": error.code(), "message": error.to_string() }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

fn engine_status(error: &EngineError) -> StatusCode {
    match error {
        EngineError::InvalidCoordinates { .. } | EngineError::InvalidBoard(_) => {
            StatusCode::BAD_REQUEST
        }
        EngineError::NotHost
        | EngineError::NotYourTurn
        | EngineError::CellOwnedByAnotherPlayer
        | EngineError::CanOnlyUndoOwnMoves
        | EngineError::UndoDisabled => StatusCode::FORBIDDEN,
        EngineError::PlayerNotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::CONFLICT,
    }
}

fn store_status(error: &StoreError) -> StatusCode {
    match error {
        StoreError::RoomNotFound(_) => StatusCode::NOT_FOUND,
        StoreError::RoomExists(_) | StoreError::VersionConflict { .. } => StatusCode::CONFLICT,
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("chain_reaction_server=info,server=info")),
        )
        .init();

    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let store = match std::env::var("ROOMS_DB_PATH") {
        Ok(raw) if raw.trim().is_empty() => {
            tracing::info!("room persistence disabled");
            RoomStore::in_memory()
        }
        Ok(raw) => RoomStore::open(PathBuf::from(raw)),
        Err(_) => RoomStore::open(PathBuf::from(".data/rooms.json")),
    };
    let state: SharedState = Arc::new(Mutex::new(store));

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/rooms", get(list_rooms).post(create_room_handler))
        .route("/api/rooms/{id}", get(get_room))
        .route("/api/rooms/{id}/join", post(join_room_handler))
        .route("/api/rooms/{id}/leave", post(leave_room_handler))
        .route("/api/rooms/{id}/commands", post(command_handler))
        .with_state(state);

    let app = if let Some(static_dir) = resolve_static_dir() {
        let index_file = static_dir.join("index.html");
        tracing::info!(root = %static_dir.display(), "serving static files");
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        tracing::warn!("static file root not found, serving the API only");
        app
    };

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!(port, "listening");
    axum::serve(listener, app).await
}

fn resolve_static_dir() -> Option<PathBuf> {
    if let Ok(raw) = std::env::var("STATIC_DIR") {
        let path = PathBuf::from(raw);
        if path.join("index.html").is_file() {
            return Some(path);
        }
    }

    let candidates = [PathBuf::from("dist/client"), PathBuf::from("../dist/client")];
    candidates
        .into_iter()
        .find(|path| path.join("index.html").is_file())
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn list_rooms(State(state): State<SharedState>) -> impl IntoResponse {
    let guard = state.lock().await;
    Json(guard.build_listing())
}

async fn get_room(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
) -> Result<Json<Room>, ApiError> {
    let room_id = room_key(&room_id)?;
    let guard = state.lock().await;
    Ok(Json(guard.get(&room_id)?.clone()))
}

async fn create_room_handler(
    State(state): State<SharedState>,
    body: String,
) -> Result<impl IntoResponse, ApiError> {
    let parsed = parse_create_room(&body).ok_or(ApiError::BadRequest("invalid_request"))?;
    let settings = normalize_room_settings(&parsed.settings);
    let host_name = sanitize_name(parsed.host.name.as_deref().unwrap_or_default());

    let mut guard = state.lock().await;
    let room_id = match parsed.room_id {
        Some(raw) => room_key(&raw)?,
        None => unused_room_id(&guard),
    };
    let room = create_room(
        &room_id,
        &parsed.host.player_id,
        &host_name,
        settings,
        now_ms(),
    )?;
    let room = guard.insert(room)?.clone();
    tracing::info!(room = %room.id, host = %room.host_id, private = room.settings.is_private, "room created");
    Ok((StatusCode::CREATED, Json(room)))
}

async fn join_room_handler(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
    body: String,
) -> Result<Json<Room>, ApiError> {
    let room_id = room_key(&room_id)?;
    let player = parse_player(&body).ok_or(ApiError::BadRequest("invalid_request"))?;
    let name = sanitize_name(player.name.as_deref().unwrap_or_default());

    let mut guard = state.lock().await;
    let room = guard.get(&room_id)?.clone();
    let next = join_room(&room, &player.player_id, &name)?;
    let committed = guard.commit(next, room.version)?.clone();
    tracing::info!(room = %room_id, player = %player.player_id, "player joined");
    Ok(Json(committed))
}

async fn leave_room_handler(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
    body: String,
) -> Result<impl IntoResponse, ApiError> {
    let room_id = room_key(&room_id)?;
    let player = parse_player(&body).ok_or(ApiError::BadRequest("invalid_request"))?;

    let mut guard = state.lock().await;
    let room = guard.get(&room_id)?.clone();
    let next = leave_room(&room, &player.player_id)?;
    tracing::info!(room = %room_id, player = %player.player_id, "player left");
    if next.game_state.status == GameStatus::Lobby && next.game_state.players.is_empty() {
        guard.remove(&room_id)?;
        tracing::info!(room = %room_id, "empty room closed");
        return Ok(Json(json!({ "closed": true })));
    }
    let committed = guard.commit(next, room.version)?;
    Ok(Json(json!({ "closed": false, "room": committed })))
}

async fn command_handler(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
    body: String,
) -> Result<impl IntoResponse, ApiError> {
    let room_id = room_key(&room_id)?;
    let parsed = parse_command(&body).ok_or(ApiError::BadRequest("invalid_command"))?;

    let mut guard = state.lock().await;
    let room = guard.get(&room_id)?.clone();
    if let Some(expected) = parsed.expected_version {
        if expected != room.version {
            return Err(StoreError::VersionConflict {
                expected,
                actual: room.version,
            }
            .into());
        }
    }

    match apply_command(&room, parsed.command, now_ms()) {
        Ok(applied) => {
            let committed = guard.commit(applied.room, room.version)?;
            Ok(Json(json!({ "outcome": applied.outcome, "room": committed })))
        }
        Err(error) => {
            let Some(timed_out) = error.attached_state().cloned() else {
                tracing::debug!(room = %room_id, code = error.code(), "command rejected");
                return Err(error.into());
            };
            let mut next = room.clone();
            next.game_state = timed_out;
            let committed = guard.commit(next, room.version)?.clone();
            tracing::info!(room = %room_id, code = error.code(), "timeout applied instead of move");
            Err(ApiError::Engine {
                error,
                room: Some(committed),
            })
        }
    }
}

fn room_key(raw: &str) -> Result<String, ApiError> {
    normalize_room_id(raw).ok_or(ApiError::BadRequest("invalid_room_id"))
}

fn unused_room_id(store: &RoomStore) -> String {
    loop {
        let candidate = make_room_id();
        if !store.contains(&candidate) {
            return candidate;
        }
    }
}

fn make_room_id() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(GENERATED_ROOM_ID_LEN)
        .map(|byte| char::from(byte).to_ascii_lowercase())
        .collect()
}
