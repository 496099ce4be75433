use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Room, RoomListResponse, RoomSummary};

const STORE_FILE_VERSION: u8 = 1;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("room {0} not found")]
    RoomNotFound(String),
    #[error("room {0} already exists")]
    RoomExists(String),
    #[error("room was modified concurrently (expected version {expected}, found {actual})")]
    VersionConflict { expected: u64, actual: u64 },
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::RoomNotFound(_) => "room_not_found",
            Self::RoomExists(_) => "room_exists",
            Self::VersionConflict { .. } => "version_conflict",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RoomStoreFile {
    version: u8,
    rooms: HashMap<String, Room>,
}

#[derive(Debug, Deserialize)]
struct RoomStoreFileRaw {
    version: u8,
    rooms: HashMap<String, serde_json::Value>,
}

/// Room records keyed by id. Every write goes through a compare-and-swap on
/// `Room::version`, so a command computed from a stale read is refused.
pub struct RoomStore {
    file_path: Option<PathBuf>,
    rooms: HashMap<String, Room>,
}

impl RoomStore {
    pub fn in_memory() -> Self {
        Self {
            file_path: None,
            rooms: HashMap::new(),
        }
    }

    pub fn open(file_path: PathBuf) -> Self {
        let rooms = load_rooms(&file_path);
        tracing::info!(path = %file_path.display(), rooms = rooms.len(), "room store loaded");
        Self {
            file_path: Some(file_path),
            rooms,
        }
    }

    pub fn get(&self, room_id: &str) -> Result<&Room, StoreError> {
        self.rooms
            .get(room_id)
            .ok_or_else(|| StoreError::RoomNotFound(room_id.to_string()))
    }

    pub fn contains(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn insert(&mut self, mut room: Room) -> Result<&Room, StoreError> {
        if self.rooms.contains_key(&room.id) {
            return Err(StoreError::RoomExists(room.id));
        }
        room.version = 0;
        let room_id = room.id.clone();
        self.rooms.insert(room_id.clone(), room);
        self.save();
        self.get(&room_id)
    }

    /// Replaces the stored room if its version still equals
    /// `expected_version`, then bumps the version.
    pub fn commit(&mut self, mut room: Room, expected_version: u64) -> Result<&Room, StoreError> {
        let stored = self
            .rooms
            .get(&room.id)
            .ok_or_else(|| StoreError::RoomNotFound(room.id.clone()))?;
        if stored.version != expected_version {
            tracing::warn!(
                room = %room.id,
                expected = expected_version,
                actual = stored.version,
                "rejected stale room write"
            );
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                actual: stored.version,
            });
        }
        room.version = expected_version + 1;
        let room_id = room.id.clone();
        self.rooms.insert(room_id.clone(), room);
        self.save();
        self.get(&room_id)
    }

    pub fn remove(&mut self, room_id: &str) -> Result<Room, StoreError> {
        let room = self
            .rooms
            .remove(room_id)
            .ok_or_else(|| StoreError::RoomNotFound(room_id.to_string()))?;
        self.save();
        Ok(room)
    }

    /// Public rooms, newest first.
    pub fn build_listing(&self) -> RoomListResponse {
        let mut rooms: Vec<RoomSummary> = self
            .rooms
            .values()
            .filter(|room| !room.settings.is_private)
            .map(|room| RoomSummary {
                id: room.id.clone(),
                host_name: room
                    .game_state
                    .player(&room.host_id)
                    .map(|player| player.name.clone())
                    .unwrap_or_default(),
                player_count: room.game_state.players.len(),
                max_players: room.settings.max_players,
                board_size: room.settings.board_size,
                status: room.game_state.status,
                created_at_ms: room.created_at_ms,
            })
            .collect();
        rooms.sort_by(|a, b| {
            b.created_at_ms
                .cmp(&a.created_at_ms)
                .then_with(|| a.id.cmp(&b.id))
        });
        RoomListResponse {
            generated_at_iso: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            rooms,
        }
    }

    fn save(&self) {
        let Some(file_path) = self.file_path.as_ref() else {
            return;
        };
        if let Some(parent) = file_path.parent() {
            if let Err(error) = fs::create_dir_all(parent) {
                tracing::error!(path = %parent.display(), %error, "failed to create room store dir");
                return;
            }
        }

        let payload = RoomStoreFile {
            version: STORE_FILE_VERSION,
            rooms: self.rooms.clone(),
        };
        match serde_json::to_string_pretty(&payload) {
            Ok(text) => {
                if let Err(error) = fs::write(file_path, text) {
                    tracing::error!(path = %file_path.display(), %error, "failed to write room store");
                }
            }
            Err(error) => {
                tracing::error!(path = %file_path.display(), %error, "failed to serialize room store");
            }
        }
    }
}

fn load_rooms(path: &Path) -> HashMap<String, Room> {
    let text = match fs::read_to_string(path) {
        Ok(value) => value,
        Err(error) => {
            if error.kind() != std::io::ErrorKind::NotFound {
                tracing::error!(path = %path.display(), %error, "failed to read room store");
            }
            return HashMap::new();
        }
    };
    let parsed = match serde_json::from_str::<RoomStoreFileRaw>(&text) {
        Ok(value) if value.version == STORE_FILE_VERSION => value,
        Ok(value) => {
            tracing::warn!(path = %path.display(), version = value.version, "unsupported room store version");
            return HashMap::new();
        }
        Err(error) => {
            tracing::error!(path = %path.display(), %error, "failed to parse room store");
            return HashMap::new();
        }
    };

    let mut rooms = HashMap::new();
    for (room_id, raw_value) in parsed.rooms {
        match serde_json::from_value::<Room>(raw_value) {
            Ok(room) if room.id == room_id => {
                rooms.insert(room_id, room);
            }
            Ok(_) => {
                tracing::warn!(room = %room_id, "skipping room stored under a mismatched key");
            }
            Err(error) => {
                tracing::warn!(room = %room_id, %error, "skipping malformed room record");
            }
        }
    }
    rooms
}
