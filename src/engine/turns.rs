use crate::types::GameState;

/// Hands the turn to the next non-eliminated seat after the current one,
/// wrapping around, and restarts the turn clock. Expects at least one
/// eligible player; otherwise only the clock is reset.
pub fn advance_turn(mut state: GameState, now_ms: u64) -> GameState {
    let seats = state.players.len();
    let start = state
        .current_player_id
        .as_deref()
        .and_then(|id| state.players.iter().position(|player| player.id == id))
        .map(|idx| idx + 1)
        .unwrap_or(0);
    let next = (0..seats)
        .map(|offset| (start + offset) % seats)
        .find(|&idx| !state.players[idx].is_eliminated);
    if let Some(idx) = next {
        state.current_player_id = Some(state.players[idx].id.clone());
    }
    state.turn_started_at_ms = now_ms;
    state
}

/// Skips the pending move of a player whose turn clock expired.
pub fn handle_move_timeout(state: GameState, now_ms: u64) -> GameState {
    tracing::debug!(
        player = state.current_player_id.as_deref().unwrap_or_default(),
        "turn timed out"
    );
    advance_turn(state, now_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::types::Player;

    fn make_state(count: usize) -> GameState {
        let players = (0..count)
            .map(|idx| Player::new(format!("p{idx}"), format!("P{idx}"), "red"))
            .collect();
        GameState::new_lobby(Grid::new(3, 3).expect("grid"), players, 0)
    }

    #[test]
    fn advances_in_seat_order_and_wraps() {
        let mut state = make_state(3);
        state = advance_turn(state, 10);
        assert_eq!(state.current_player_id.as_deref(), Some("p1"));
        assert_eq!(state.turn_started_at_ms, 10);
        state = advance_turn(state, 20);
        state = advance_turn(state, 30);
        assert_eq!(state.current_player_id.as_deref(), Some("p0"));
    }

    #[test]
    fn skips_eliminated_players() {
        let mut state = make_state(4);
        state.players[1].is_eliminated = true;
        state.players[2].is_eliminated = true;
        state = advance_turn(state, 5);
        assert_eq!(state.current_player_id.as_deref(), Some("p3"));
        state = advance_turn(state, 6);
        assert_eq!(state.current_player_id.as_deref(), Some("p0"));
    }

    #[test]
    fn sole_survivor_keeps_the_turn() {
        let mut state = make_state(2);
        state.players[1].is_eliminated = true;
        state = advance_turn(state, 5);
        assert_eq!(state.current_player_id.as_deref(), Some("p0"));
    }

    #[test]
    fn move_timeout_passes_turn_without_placing() {
        let state = make_state(2);
        let grid_before = state.grid.clone();
        let next = handle_move_timeout(state, 99);
        assert_eq!(next.current_player_id.as_deref(), Some("p1"));
        assert_eq!(next.move_count, 0);
        assert_eq!(next.grid, grid_before);
        assert_eq!(next.turn_started_at_ms, 99);
    }
}
