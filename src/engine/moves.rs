use crate::engine::explosion::simulate;
use crate::engine::turns::advance_turn;
use crate::engine::utils::{leader_by_orbs, refresh_orb_counts, update_eliminations};
use crate::error::EngineError;
use crate::grid::Coord;
use crate::types::{ExplosionWave, GameState, GameStatus};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveResult {
    pub state: GameState,
    pub placement: Coord,
    pub waves: Vec<ExplosionWave>,
    pub is_runaway: bool,
}

/// Validates and applies one orb placement. Rejections leave `state`
/// untouched; the checks run in a fixed order so each failure has a single
/// reason.
pub fn process_move(
    state: &GameState,
    player_id: &str,
    row: i64,
    col: i64,
    now_ms: u64,
) -> Result<MoveResult, EngineError> {
    let coord = state
        .grid
        .checked_coord(row, col)
        .ok_or(EngineError::InvalidCoordinates { row, col })?;
    if state.status != GameStatus::Active {
        return Err(EngineError::GameNotActive);
    }
    if !state.is_current_player(player_id) {
        return Err(EngineError::NotYourTurn);
    }
    let target = state.grid.cell(coord);
    if !target.is_empty() && !target.is_owned_by(player_id) {
        return Err(EngineError::CellOwnedByAnotherPlayer);
    }

    let contenders_before = state.remaining_players().count();
    let mut next = state.clone();
    let cell = next.grid.cell_mut(coord);
    cell.orbs += 1;
    cell.owner_id = Some(player_id.to_string());
    next.move_count += 1;

    let mut waves = Vec::new();
    if next.grid.cell(coord).is_unstable() {
        let explosion = simulate(next.grid.clone(), player_id);
        next.grid = explosion.final_grid;
        waves = explosion.waves;
        refresh_orb_counts(&mut next);

        if explosion.is_runaway {
            next.status = GameStatus::Runaway;
            next.winner = leader_by_orbs(next.players.iter()).map(|player| player.id.clone());
            tracing::debug!(winner = ?next.winner, "game ended by runaway chain");
            return Ok(MoveResult {
                state: next,
                placement: coord,
                waves,
                is_runaway: true,
            });
        }
    } else {
        refresh_orb_counts(&mut next);
    }

    update_eliminations(&mut next);
    let survivor = {
        let mut remaining = next.remaining_players();
        match (remaining.next(), remaining.next()) {
            (Some(player), None) => Some(player.id.clone()),
            _ => None,
        }
    };
    if let Some(survivor) = survivor {
        if contenders_before > 1 {
            next.winner = Some(survivor);
            next.status = GameStatus::Finished;
            tracing::debug!(winner = ?next.winner, "game ended by elimination");
            return Ok(MoveResult {
                state: next,
                placement: coord,
                waves,
                is_runaway: false,
            });
        }
    }

    Ok(MoveResult {
        state: advance_turn(next, now_ms),
        placement: coord,
        waves,
        is_runaway: false,
    })
}
