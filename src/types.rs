use serde::{Deserialize, Serialize};

use crate::constants::{get_board_size_by_player_count, MIN_PLAYERS};
use crate::grid::{Coord, Grid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Lobby,
    Active,
    Finished,
    Runaway,
}

impl GameStatus {
    pub fn is_over(self) -> bool {
        matches!(self, Self::Finished | Self::Runaway)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutKind {
    Game,
    Move,
}

impl TimeoutKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "game" => Some(Self::Game),
            "move" => Some(Self::Move),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(rename = "orbCount")]
    pub orb_count: u32,
    #[serde(rename = "isEliminated")]
    pub is_eliminated: bool,
    #[serde(rename = "isConnected")]
    pub is_connected: bool,
}

impl Player {
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: color.into(),
            orb_count: 0,
            is_eliminated: false,
            is_connected: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub grid: Grid,
    pub players: Vec<Player>,
    #[serde(rename = "currentPlayerId", default)]
    pub current_player_id: Option<String>,
    #[serde(rename = "moveCount")]
    pub move_count: u32,
    #[serde(rename = "turnStartedAt")]
    pub turn_started_at_ms: u64,
    pub status: GameStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
}

impl GameState {
    pub fn new_lobby(grid: Grid, players: Vec<Player>, now_ms: u64) -> Self {
        let current_player_id = players.first().map(|player| player.id.clone());
        Self {
            grid,
            players,
            current_player_id,
            move_count: 0,
            turn_started_at_ms: now_ms,
            status: GameStatus::Lobby,
            winner: None,
        }
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|player| player.id == player_id)
    }

    pub fn is_current_player(&self, player_id: &str) -> bool {
        self.current_player_id.as_deref() == Some(player_id)
    }

    pub fn remaining_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|player| !player.is_eliminated)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSize {
    pub rows: usize,
    pub cols: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSettings {
    #[serde(rename = "maxPlayers")]
    pub max_players: usize,
    #[serde(rename = "boardSize")]
    pub board_size: BoardSize,
    #[serde(rename = "gameTimeLimitMs", default, skip_serializing_if = "Option::is_none")]
    pub game_time_limit_ms: Option<u64>,
    #[serde(rename = "moveTimeLimitMs", default, skip_serializing_if = "Option::is_none")]
    pub move_time_limit_ms: Option<u64>,
    #[serde(rename = "undoEnabled")]
    pub undo_enabled: bool,
    #[serde(rename = "isPrivate")]
    pub is_private: bool,
}

impl Default for RoomSettings {
    fn default() -> Self {
        let (rows, cols) = get_board_size_by_player_count(MIN_PLAYERS);
        Self {
            max_players: MIN_PLAYERS,
            board_size: BoardSize { rows, cols },
            game_time_limit_ms: None,
            move_time_limit_ms: None,
            undo_enabled: true,
            is_private: false,
        }
    }
}

/// Snapshot of the state taken just before `player_id` placed at `placement`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "gameState")]
    pub game_state: GameState,
    pub timestamp: u64,
    #[serde(rename = "playerId")]
    pub player_id: String,
    #[serde(rename = "move")]
    pub placement: Coord,
}

/// One synchronous round of explosions: the cells that burst and the grid as
/// it stood right before they did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplosionWave {
    pub exploding: Vec<Coord>,
    pub grid: Grid,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TimeoutCheck {
    #[serde(rename = "isGameTimeout")]
    pub is_game_timeout: bool,
    #[serde(rename = "isMoveTimeout")]
    pub is_move_timeout: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
}

/// Persisted room record handed to the engine on every command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    #[serde(rename = "hostId")]
    pub host_id: String,
    pub settings: RoomSettings,
    #[serde(rename = "gameState")]
    pub game_state: GameState,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(rename = "createdAt")]
    pub created_at_ms: u64,
    #[serde(rename = "restartedAt", default, skip_serializing_if = "Option::is_none")]
    pub restarted_at_ms: Option<u64>,
    #[serde(default)]
    pub version: u64,
}

impl Room {
    /// Reference point for the game clock: room creation, or the latest
    /// restart once the host has restarted.
    pub fn game_clock_start_ms(&self) -> u64 {
        self.restarted_at_ms.unwrap_or(self.created_at_ms)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RoomSummary {
    pub id: String,
    #[serde(rename = "hostName")]
    pub host_name: String,
    #[serde(rename = "playerCount")]
    pub player_count: usize,
    #[serde(rename = "maxPlayers")]
    pub max_players: usize,
    #[serde(rename = "boardSize")]
    pub board_size: BoardSize,
    pub status: GameStatus,
    #[serde(rename = "createdAt")]
    pub created_at_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct RoomListResponse {
    #[serde(rename = "generatedAtIso")]
    pub generated_at_iso: String,
    pub rooms: Vec<RoomSummary>,
}
