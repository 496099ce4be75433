use crate::constants::MAX_EXPLOSION_WAVES;
use crate::grid::{Coord, Grid};
use crate::types::ExplosionWave;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExplosionResult {
    pub final_grid: Grid,
    pub waves: Vec<ExplosionWave>,
    pub is_runaway: bool,
}

pub fn simulate(grid: Grid, triggering_player_id: &str) -> ExplosionResult {
    simulate_with_cap(grid, triggering_player_id, MAX_EXPLOSION_WAVES)
}

/// Resolves chain reactions wave by wave. Every cell at or above capacity at
/// the start of a wave bursts in that wave; deltas are taken from the pre-wave
/// grid so the outcome does not depend on scan order.
pub fn simulate_with_cap(
    mut grid: Grid,
    triggering_player_id: &str,
    max_waves: usize,
) -> ExplosionResult {
    let mut waves = Vec::new();
    while waves.len() < max_waves {
        let exploding = grid.unstable_cells();
        if exploding.is_empty() {
            return ExplosionResult {
                final_grid: grid,
                waves,
                is_runaway: false,
            };
        }
        let next = resolve_wave(&grid, &exploding, triggering_player_id);
        waves.push(ExplosionWave { exploding, grid });
        grid = next;
    }

    let is_runaway = !grid.is_stable();
    if is_runaway {
        tracing::debug!(
            player = triggering_player_id,
            waves = waves.len(),
            "explosion chain hit the wave cap"
        );
    }
    ExplosionResult {
        final_grid: grid,
        waves,
        is_runaway,
    }
}

fn resolve_wave(before: &Grid, exploding: &[Coord], triggering_player_id: &str) -> Grid {
    let mut after = before.clone();
    for &coord in exploding {
        after.cell_mut(coord).orbs -= before.cell(coord).critical_mass;
        for neighbor in before.neighbors(coord) {
            let cell = after.cell_mut(neighbor);
            cell.orbs += 1;
            cell.owner_id = Some(triggering_player_id.to_string());
        }
    }
    for &coord in exploding {
        let cell = after.cell_mut(coord);
        if cell.orbs == 0 {
            cell.owner_id = None;
        }
    }
    after
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(grid: &mut Grid, row: usize, col: usize, orbs: u32, owner: &str) {
        let cell = grid.cell_mut(Coord::new(row, col));
        cell.orbs = orbs;
        cell.owner_id = Some(owner.to_string());
    }

    #[test]
    fn corner_burst_spreads_to_both_neighbors() {
        let mut grid = Grid::new(3, 3).expect("grid");
        put(&mut grid, 0, 0, 2, "a");

        let result = simulate(grid, "a");

        assert!(!result.is_runaway);
        assert_eq!(result.waves.len(), 1);
        assert_eq!(result.waves[0].exploding, vec![Coord::new(0, 0)]);
        let corner = result.final_grid.cell(Coord::new(0, 0));
        assert_eq!(corner.orbs, 0);
        assert_eq!(corner.owner_id, None);
        for coord in [Coord::new(0, 1), Coord::new(1, 0)] {
            let cell = result.final_grid.cell(coord);
            assert_eq!(cell.orbs, 1);
            assert!(cell.is_owned_by("a"));
        }
        assert_eq!(result.final_grid.total_orbs(), 2);
    }

    #[test]
    fn burst_captures_enemy_neighbors() {
        let mut grid = Grid::new(3, 3).expect("grid");
        put(&mut grid, 0, 0, 2, "a");
        put(&mut grid, 0, 1, 1, "b");

        let result = simulate(grid, "a");

        let captured = result.final_grid.cell(Coord::new(0, 1));
        assert_eq!(captured.orbs, 2);
        assert!(captured.is_owned_by("a"));
        assert_eq!(result.final_grid.orbs_owned_by("b"), 0);
    }

    #[test]
    fn adjacent_unstable_cells_burst_in_the_same_wave() {
        let mut grid = Grid::new(3, 3).expect("grid");
        put(&mut grid, 0, 0, 2, "a");
        put(&mut grid, 0, 1, 3, "a");

        let result = simulate(grid, "a");

        assert_eq!(result.waves.len(), 1);
        assert_eq!(
            result.waves[0].exploding,
            vec![Coord::new(0, 0), Coord::new(0, 1)]
        );
        let grid = &result.final_grid;
        assert_eq!(grid.cell(Coord::new(0, 0)).orbs, 1);
        assert_eq!(grid.cell(Coord::new(0, 1)).orbs, 1);
        assert_eq!(grid.cell(Coord::new(0, 2)).orbs, 1);
        assert_eq!(grid.cell(Coord::new(1, 0)).orbs, 1);
        assert_eq!(grid.cell(Coord::new(1, 1)).orbs, 1);
        assert_eq!(grid.total_orbs(), 5);
    }

    #[test]
    fn overfull_cell_keeps_remainder_and_owner() {
        let mut grid = Grid::new(3, 3).expect("grid");
        put(&mut grid, 1, 1, 5, "a");

        let result = simulate(grid, "a");

        let center = result.final_grid.cell(Coord::new(1, 1));
        assert_eq!(center.orbs, 1);
        assert!(center.is_owned_by("a"));
        assert_eq!(result.final_grid.total_orbs(), 5);
    }

    #[test]
    fn chain_reaction_records_every_wave_and_ends_stable() {
        let mut grid = Grid::new(4, 4).expect("grid");
        put(&mut grid, 0, 0, 2, "a");
        put(&mut grid, 0, 1, 2, "b");
        put(&mut grid, 0, 2, 2, "b");
        put(&mut grid, 1, 1, 3, "b");
        let before_total = grid.total_orbs();

        let result = simulate(grid, "a");

        assert!(!result.is_runaway);
        assert!(result.waves.len() >= 2);
        assert!(result.final_grid.is_stable());
        assert_eq!(result.final_grid.orbs_owned_by("b"), 0);
        assert_eq!(result.final_grid.total_orbs(), before_total);
        assert_eq!(result.waves[0].exploding, vec![Coord::new(0, 0)]);
        assert!(!result.waves[1].grid.is_stable());
    }

    #[test]
    fn boundary_bursts_route_exactly_capacity_to_existing_neighbors() {
        for (row, col) in [(0, 0), (0, 2), (2, 4), (1, 0), (1, 2)] {
            let mut grid = Grid::new(3, 5).expect("grid");
            let coord = Coord::new(row, col);
            let capacity = grid.cell(coord).critical_mass;
            assert_eq!(grid.neighbors(coord).count() as u32, capacity);
            put(&mut grid, row, col, capacity, "a");

            let result = simulate(grid, "a");

            assert_eq!(result.final_grid.total_orbs(), capacity);
            assert_eq!(result.final_grid.cell(coord).orbs, 0);
        }
    }

    #[test]
    fn saturated_small_board_runs_away() {
        let mut grid = Grid::new(2, 2).expect("grid");
        for row in 0..2 {
            for col in 0..2 {
                put(&mut grid, row, col, 3, "a");
            }
        }

        let result = simulate(grid, "a");

        assert!(result.is_runaway);
        assert_eq!(result.waves.len(), MAX_EXPLOSION_WAVES);
        assert_eq!(result.final_grid.total_orbs(), 12);
    }

    #[test]
    fn wave_cap_is_tunable() {
        let mut grid = Grid::new(2, 3).expect("grid");
        for row in 0..2 {
            for col in 0..3 {
                put(&mut grid, row, col, 3, "a");
            }
        }

        let result = simulate_with_cap(grid, "a", 5);

        assert!(result.is_runaway);
        assert_eq!(result.waves.len(), 5);
    }

    #[test]
    fn stable_grid_produces_no_waves() {
        let mut grid = Grid::new(3, 3).expect("grid");
        put(&mut grid, 1, 1, 3, "a");
        let result = simulate(grid.clone(), "a");
        assert!(result.waves.is_empty());
        assert!(!result.is_runaway);
        assert_eq!(result.final_grid, grid);
    }
}
