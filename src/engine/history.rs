use crate::constants::HISTORY_LIMIT;
use crate::error::EngineError;
use crate::types::{GameState, GameStatus, HistoryEntry};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UndoResult {
    pub state: GameState,
    pub history: Vec<HistoryEntry>,
}

/// Appends a pre-move snapshot, dropping the oldest entries beyond the limit.
pub fn push_history(mut history: Vec<HistoryEntry>, entry: HistoryEntry) -> Vec<HistoryEntry> {
    history.push(entry);
    if history.len() > HISTORY_LIMIT {
        let excess = history.len() - HISTORY_LIMIT;
        history.drain(..excess);
    }
    history
}

pub fn undo(
    state: &GameState,
    history: &[HistoryEntry],
    player_id: &str,
    undo_enabled: bool,
    now_ms: u64,
) -> Result<UndoResult, EngineError> {
    if !undo_enabled {
        return Err(EngineError::UndoDisabled);
    }
    if state.status != GameStatus::Active {
        return Err(EngineError::GameNotActive);
    }
    if !state.is_current_player(player_id) {
        return Err(EngineError::NotYourTurn);
    }
    if state.move_count == 0 {
        return Err(EngineError::NoMovesToUndo);
    }
    let Some((last, rest)) = history.split_last() else {
        return Err(EngineError::NoHistoryAvailable);
    };
    if last.player_id != player_id {
        return Err(EngineError::CanOnlyUndoOwnMoves);
    }

    let mut restored = last.game_state.clone();
    restored.turn_started_at_ms = now_ms;
    // Presence is live data, not part of the move being undone.
    for player in &mut restored.players {
        if let Some(current) = state.player(&player.id) {
            player.is_connected = current.is_connected;
        }
    }
    Ok(UndoResult {
        state: restored,
        history: rest.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Coord, Grid};
    use crate::types::Player;

    fn make_active() -> GameState {
        let players = vec![Player::new("a", "A", "red"), Player::new("b", "B", "blue")];
        let mut state = GameState::new_lobby(Grid::new(3, 3).expect("grid"), players, 0);
        state.status = GameStatus::Active;
        state
    }

    fn entry(state: &GameState, player_id: &str, timestamp: u64) -> HistoryEntry {
        HistoryEntry {
            game_state: state.clone(),
            timestamp,
            player_id: player_id.to_string(),
            placement: Coord::new(0, 0),
        }
    }

    #[test]
    fn history_is_capped_dropping_oldest() {
        let state = make_active();
        let mut history = Vec::new();
        for idx in 0..25 {
            history = push_history(history, entry(&state, "a", idx));
            assert!(history.len() <= HISTORY_LIMIT);
        }
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history[0].timestamp, 15);
        assert_eq!(history[HISTORY_LIMIT - 1].timestamp, 24);
    }

    #[test]
    fn failure_reasons_are_checked_in_order() {
        let mut state = make_active();
        let history = vec![entry(&state, "b", 1)];

        assert_eq!(
            undo(&state, &history, "a", false, 5),
            Err(EngineError::UndoDisabled)
        );

        state.status = GameStatus::Finished;
        assert_eq!(
            undo(&state, &history, "a", true, 5),
            Err(EngineError::GameNotActive)
        );

        state.status = GameStatus::Active;
        assert_eq!(
            undo(&state, &history, "b", true, 5),
            Err(EngineError::NotYourTurn)
        );
        assert_eq!(
            undo(&state, &history, "a", true, 5),
            Err(EngineError::NoMovesToUndo)
        );

        state.move_count = 1;
        assert_eq!(
            undo(&state, &[], "a", true, 5),
            Err(EngineError::NoHistoryAvailable)
        );
        assert_eq!(
            undo(&state, &history, "a", true, 5),
            Err(EngineError::CanOnlyUndoOwnMoves)
        );
    }

    #[test]
    fn not_current_player_is_rejected_even_with_own_history() {
        let mut state = make_active();
        state.move_count = 3;
        let history = vec![entry(&state, "b", 1)];
        assert_eq!(
            undo(&state, &history, "b", true, 5),
            Err(EngineError::NotYourTurn)
        );
    }

    #[test]
    fn restores_snapshot_and_pops_entry() {
        let before = make_active();
        let mut after = before.clone();
        after.move_count = 1;
        after.grid.cell_mut(Coord::new(0, 0)).orbs = 1;
        after.grid.cell_mut(Coord::new(0, 0)).owner_id = Some("a".to_string());
        let history = vec![entry(&before, "b", 1), entry(&before, "a", 2)];

        let result = undo(&after, &history, "a", true, 777).expect("undo");

        assert_eq!(result.history.len(), 1);
        assert_eq!(result.history[0].timestamp, 1);
        assert_eq!(result.state.turn_started_at_ms, 777);
        let mut expected = before;
        expected.turn_started_at_ms = 777;
        assert_eq!(result.state, expected);
    }

    #[test]
    fn undo_keeps_current_connection_flags() {
        let before = make_active();
        let mut after = before.clone();
        after.move_count = 1;
        after.players[1].is_connected = false;
        let history = vec![entry(&before, "a", 2)];

        let result = undo(&after, &history, "a", true, 50).expect("undo");

        assert!(result.state.players[0].is_connected);
        assert!(!result.state.players[1].is_connected);
        assert_eq!(result.state.move_count, 0);
    }
}
