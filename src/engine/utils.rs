use crate::types::{GameState, Player};

pub(super) fn refresh_orb_counts(state: &mut GameState) {
    for player in &mut state.players {
        player.orb_count = state.grid.orbs_owned_by(&player.id);
    }
}

/// Players without orbs drop out once everyone has had a chance to place.
pub(super) fn update_eliminations(state: &mut GameState) {
    if (state.move_count as usize) < state.players.len() {
        return;
    }
    for player in &mut state.players {
        if player.orb_count == 0 {
            player.is_eliminated = true;
        }
    }
}

/// Player holding the most orbs; earlier seats win ties.
pub(super) fn leader_by_orbs<'a>(players: impl Iterator<Item = &'a Player>) -> Option<&'a Player> {
    players.reduce(|best, player| {
        if player.orb_count > best.orb_count {
            player
        } else {
            best
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Coord, Grid};

    fn make_state() -> GameState {
        let players = vec![
            Player::new("a", "A", "red"),
            Player::new("b", "B", "blue"),
            Player::new("c", "C", "green"),
        ];
        GameState::new_lobby(Grid::new(3, 3).expect("grid"), players, 0)
    }

    #[test]
    fn orb_counts_follow_grid_ownership() {
        let mut state = make_state();
        let cell = state.grid.cell_mut(Coord::new(1, 1));
        cell.orbs = 3;
        cell.owner_id = Some("b".to_string());
        refresh_orb_counts(&mut state);
        assert_eq!(state.players[0].orb_count, 0);
        assert_eq!(state.players[1].orb_count, 3);
    }

    #[test]
    fn nobody_is_eliminated_during_the_opening_round() {
        let mut state = make_state();
        state.move_count = 2;
        update_eliminations(&mut state);
        assert!(state.players.iter().all(|p| !p.is_eliminated));

        state.move_count = 3;
        update_eliminations(&mut state);
        assert!(state.players.iter().all(|p| p.is_eliminated));
    }

    #[test]
    fn leader_ties_resolve_to_earlier_seat() {
        let mut state = make_state();
        state.players[1].orb_count = 4;
        state.players[2].orb_count = 4;
        let leader = leader_by_orbs(state.players.iter()).expect("leader");
        assert_eq!(leader.id, "b");
        assert!(leader_by_orbs(std::iter::empty()).is_none());
    }
}
