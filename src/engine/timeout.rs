use crate::engine::utils::leader_by_orbs;
use crate::types::{GameState, GameStatus, RoomSettings, TimeoutCheck};

/// Reports expired clocks without touching the state. `clock_start_ms` is the
/// moment the game clock started; limits are exceeded only strictly.
pub fn check_timeouts(
    state: &GameState,
    settings: &RoomSettings,
    clock_start_ms: u64,
    now_ms: u64,
) -> TimeoutCheck {
    if state.status != GameStatus::Active {
        return TimeoutCheck::default();
    }

    let is_game_timeout = settings
        .game_time_limit_ms
        .is_some_and(|limit| now_ms.saturating_sub(clock_start_ms) > limit);
    let is_move_timeout = settings
        .move_time_limit_ms
        .is_some_and(|limit| now_ms.saturating_sub(state.turn_started_at_ms) > limit);
    let winner = if is_game_timeout {
        leader_by_orbs(state.remaining_players()).map(|player| player.id.clone())
    } else {
        None
    };

    TimeoutCheck {
        is_game_timeout,
        is_move_timeout,
        winner,
    }
}
