use std::time::{SystemTime, UNIX_EPOCH};

use crate::constants::{
    get_board_size_by_player_count, MAX_BOARD_SIDE, MAX_GAME_TIME_LIMIT_MS,
    MAX_MOVE_TIME_LIMIT_MS, MAX_PLAYERS, MIN_BOARD_SIDE, MIN_GAME_TIME_LIMIT_MS,
    MIN_MOVE_TIME_LIMIT_MS, MIN_PLAYERS,
};
use crate::types::{BoardSize, RoomSettings};

pub fn now_ms() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    now as u64
}

pub fn sanitize_name(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "Player".to_string();
    }
    trimmed.chars().take(16).collect()
}

/// Room ids are short lowercase slugs; anything else is rejected.
pub fn normalize_room_id(raw: &str) -> Option<String> {
    let normalized = raw.trim().to_ascii_lowercase();
    if normalized.is_empty() || normalized.len() > 32 {
        return None;
    }
    if !normalized
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return None;
    }
    Some(normalized)
}

pub fn normalize_max_players(value: Option<i64>) -> usize {
    value
        .unwrap_or(MIN_PLAYERS as i64)
        .clamp(MIN_PLAYERS as i64, MAX_PLAYERS as i64) as usize
}

pub fn normalize_board_side(value: Option<i64>, fallback: usize) -> usize {
    value
        .map(|side| side.clamp(MIN_BOARD_SIDE as i64, MAX_BOARD_SIDE as i64) as usize)
        .unwrap_or(fallback)
}

/// Seconds from the client, milliseconds internally. Zero or negative turns
/// the limit off.
pub fn normalize_time_limit_ms(seconds: Option<i64>, min_ms: u64, max_ms: u64) -> Option<u64> {
    let seconds = seconds?;
    if seconds <= 0 {
        return None;
    }
    Some((seconds as u64).saturating_mul(1_000).clamp(min_ms, max_ms))
}

#[derive(Clone, Debug, Default)]
pub struct RawRoomSettings {
    pub max_players: Option<i64>,
    pub rows: Option<i64>,
    pub cols: Option<i64>,
    pub game_time_limit_seconds: Option<i64>,
    pub move_time_limit_seconds: Option<i64>,
    pub undo_enabled: Option<bool>,
    pub is_private: Option<bool>,
}

pub fn normalize_room_settings(raw: &RawRoomSettings) -> RoomSettings {
    let max_players = normalize_max_players(raw.max_players);
    let (default_rows, default_cols) = get_board_size_by_player_count(max_players);
    RoomSettings {
        max_players,
        board_size: BoardSize {
            rows: normalize_board_side(raw.rows, default_rows),
            cols: normalize_board_side(raw.cols, default_cols),
        },
        game_time_limit_ms: normalize_time_limit_ms(
            raw.game_time_limit_seconds,
            MIN_GAME_TIME_LIMIT_MS,
            MAX_GAME_TIME_LIMIT_MS,
        ),
        move_time_limit_ms: normalize_time_limit_ms(
            raw.move_time_limit_seconds,
            MIN_MOVE_TIME_LIMIT_MS,
            MAX_MOVE_TIME_LIMIT_MS,
        ),
        undo_enabled: raw.undo_enabled.unwrap_or(true),
        is_private: raw.is_private.unwrap_or(false),
    }
}
