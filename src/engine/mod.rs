use serde::Serialize;

use crate::constants::{get_color_for_seat, PLAYER_COLORS};
use crate::error::EngineError;
use crate::grid::Grid;
use crate::types::{
    ExplosionWave, GameState, GameStatus, HistoryEntry, Player, Room, RoomSettings, TimeoutKind,
};

mod explosion;
mod history;
mod moves;
mod timeout;
mod turns;
mod utils;

pub use self::explosion::{simulate, simulate_with_cap, ExplosionResult};
pub use self::history::{push_history, undo, UndoResult};
pub use self::moves::{process_move, MoveResult};
pub use self::timeout::check_timeouts;
pub use self::turns::{advance_turn, handle_move_timeout};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Start { requester_id: String },
    Move { player_id: String, row: i64, col: i64 },
    CheckTimeout { kind: TimeoutKind },
    Undo { player_id: String },
    Restart { requester_id: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outcome {
    Started,
    Moved {
        #[serde(rename = "isRunaway")]
        is_runaway: bool,
        waves: Vec<ExplosionWave>,
    },
    TimedOut {
        kind: TimeoutKind,
        message: String,
    },
    Undone,
    Restarted,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Applied {
    pub room: Room,
    pub outcome: Outcome,
}

pub fn create_room(
    room_id: &str,
    host_id: &str,
    host_name: &str,
    settings: RoomSettings,
    now_ms: u64,
) -> Result<Room, EngineError> {
    let grid = Grid::new(settings.board_size.rows, settings.board_size.cols)?;
    let host = Player::new(host_id, host_name, get_color_for_seat(0));
    Ok(Room {
        id: room_id.to_string(),
        host_id: host_id.to_string(),
        settings,
        game_state: GameState::new_lobby(grid, vec![host], now_ms),
        history: Vec::new(),
        created_at_ms: now_ms,
        restarted_at_ms: None,
        version: 0,
    })
}

pub fn join_room(room: &Room, player_id: &str, name: &str) -> Result<Room, EngineError> {
    let state = &room.game_state;
    if state.status != GameStatus::Lobby {
        return Err(EngineError::AlreadyStarted);
    }
    if state.player(player_id).is_some() {
        return Err(EngineError::AlreadyJoined);
    }
    if state.players.len() >= room.settings.max_players {
        return Err(EngineError::RoomFull);
    }

    let color = PLAYER_COLORS
        .iter()
        .copied()
        .find(|color| state.players.iter().all(|player| player.color != *color))
        .unwrap_or_else(|| get_color_for_seat(state.players.len()));
    let mut next = room.clone();
    next.game_state
        .players
        .push(Player::new(player_id, name, color));
    Ok(next)
}

/// Leaving the lobby frees the seat; leaving a running game only marks the
/// player as disconnected so seat order and history stay intact.
pub fn leave_room(room: &Room, player_id: &str) -> Result<Room, EngineError> {
    let mut next = room.clone();
    let state = &mut next.game_state;
    let idx = state
        .players
        .iter()
        .position(|player| player.id == player_id)
        .ok_or(EngineError::PlayerNotFound)?;

    if state.status != GameStatus::Lobby {
        state.players[idx].is_connected = false;
        return Ok(next);
    }

    state.players.remove(idx);
    let first = state.players.first().map(|player| player.id.clone());
    state.current_player_id = first.clone();
    if next.host_id == player_id {
        if let Some(new_host) = first {
            next.host_id = new_host;
        }
    }
    Ok(next)
}

pub fn set_connected(room: &Room, player_id: &str, connected: bool) -> Result<Room, EngineError> {
    let mut next = room.clone();
    let player = next
        .game_state
        .players
        .iter_mut()
        .find(|player| player.id == player_id)
        .ok_or(EngineError::PlayerNotFound)?;
    player.is_connected = connected;
    Ok(next)
}

/// Single entry point for game commands. The room is never modified in place;
/// a successful command returns the room the caller must persist.
pub fn apply_command(room: &Room, command: Command, now_ms: u64) -> Result<Applied, EngineError> {
    match command {
        Command::Start { requester_id } => start_game(room, &requester_id, now_ms),
        Command::Move {
            player_id,
            row,
            col,
        } => submit_move(room, &player_id, row, col, now_ms),
        Command::CheckTimeout { kind } => check_timeout(room, kind, now_ms),
        Command::Undo { player_id } => undo_move(room, &player_id, now_ms),
        Command::Restart { requester_id } => restart_game(room, &requester_id, now_ms),
    }
}

fn start_game(room: &Room, requester_id: &str, now_ms: u64) -> Result<Applied, EngineError> {
    if room.host_id != requester_id {
        return Err(EngineError::NotHost);
    }
    if room.game_state.status != GameStatus::Lobby {
        return Err(EngineError::AlreadyStarted);
    }
    if room.game_state.remaining_players().count() < 2 {
        return Err(EngineError::InsufficientPlayers);
    }

    let mut next = room.clone();
    let state = &mut next.game_state;
    state.grid = state.grid.cleared();
    for player in &mut state.players {
        player.orb_count = 0;
    }
    let first = state
        .remaining_players()
        .next()
        .map(|player| player.id.clone());
    state.current_player_id = first;
    state.status = GameStatus::Active;
    state.move_count = 0;
    state.turn_started_at_ms = now_ms;
    state.winner = None;
    next.history.clear();
    tracing::debug!(room = %room.id, players = room.game_state.players.len(), "game started");
    Ok(Applied {
        room: next,
        outcome: Outcome::Started,
    })
}

fn submit_move(
    room: &Room,
    player_id: &str,
    row: i64,
    col: i64,
    now_ms: u64,
) -> Result<Applied, EngineError> {
    let state = &room.game_state;
    if state.status == GameStatus::Active {
        if state.grid.checked_coord(row, col).is_none() {
            return Err(EngineError::InvalidCoordinates { row, col });
        }
        if state.player(player_id).is_none() {
            return Err(EngineError::NotYourTurn);
        }
        let check = check_timeouts(state, &room.settings, room.game_clock_start_ms(), now_ms);
        if check.is_game_timeout {
            let state = finish_with_winner(state.clone(), check.winner);
            return Err(EngineError::GameTimedOut {
                state: Box::new(state),
            });
        }
        if check.is_move_timeout {
            let state = handle_move_timeout(state.clone(), now_ms);
            return Err(EngineError::MoveTimedOut {
                state: Box::new(state),
            });
        }
    }

    let result = process_move(state, player_id, row, col, now_ms)?;
    let entry = HistoryEntry {
        game_state: state.clone(),
        timestamp: now_ms,
        player_id: player_id.to_string(),
        placement: result.placement,
    };

    let mut next = room.clone();
    next.history = push_history(next.history, entry);
    next.game_state = result.state;
    Ok(Applied {
        room: next,
        outcome: Outcome::Moved {
            is_runaway: result.is_runaway,
            waves: result.waves,
        },
    })
}

fn check_timeout(room: &Room, kind: TimeoutKind, now_ms: u64) -> Result<Applied, EngineError> {
    let state = &room.game_state;
    if state.status != GameStatus::Active {
        return Err(EngineError::GameNotActive);
    }
    let check = check_timeouts(state, &room.settings, room.game_clock_start_ms(), now_ms);

    let (game_state, message) = match kind {
        TimeoutKind::Game if check.is_game_timeout => {
            let message = match check.winner.as_deref().and_then(|id| state.player(id)) {
                Some(winner) => format!("Time is up! {} wins with the most orbs", winner.name),
                None => "Time is up!".to_string(),
            };
            (finish_with_winner(state.clone(), check.winner), message)
        }
        TimeoutKind::Move if check.is_move_timeout => {
            let name = state
                .current_player_id
                .as_deref()
                .and_then(|id| state.player(id))
                .map(|player| player.name.clone())
                .unwrap_or_default();
            (
                handle_move_timeout(state.clone(), now_ms),
                format!("{name} ran out of time, turn skipped"),
            )
        }
        _ => return Err(EngineError::NoTimeoutDetected),
    };

    let mut next = room.clone();
    next.game_state = game_state;
    Ok(Applied {
        room: next,
        outcome: Outcome::TimedOut { kind, message },
    })
}

fn undo_move(room: &Room, player_id: &str, now_ms: u64) -> Result<Applied, EngineError> {
    let result = undo(
        &room.game_state,
        &room.history,
        player_id,
        room.settings.undo_enabled,
        now_ms,
    )?;
    let mut next = room.clone();
    next.game_state = result.state;
    next.history = result.history;
    Ok(Applied {
        room: next,
        outcome: Outcome::Undone,
    })
}

fn restart_game(room: &Room, requester_id: &str, now_ms: u64) -> Result<Applied, EngineError> {
    if room.host_id != requester_id {
        return Err(EngineError::NotHost);
    }
    if !room.game_state.status.is_over() {
        return Err(EngineError::GameNotFinished);
    }

    let mut next = room.clone();
    let state = &mut next.game_state;
    state.grid = Grid::new(state.grid.rows(), state.grid.cols())?;
    for player in &mut state.players {
        player.is_eliminated = false;
        player.orb_count = 0;
    }
    state.current_player_id = state.players.first().map(|player| player.id.clone());
    state.status = GameStatus::Active;
    state.move_count = 0;
    state.turn_started_at_ms = now_ms;
    state.winner = None;
    next.history.clear();
    next.restarted_at_ms = Some(now_ms);
    tracing::debug!(room = %room.id, "game restarted");
    Ok(Applied {
        room: next,
        outcome: Outcome::Restarted,
    })
}

fn finish_with_winner(mut state: GameState, winner: Option<String>) -> GameState {
    state.status = GameStatus::Finished;
    state.winner = winner;
    state
}
