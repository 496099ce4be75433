use serde::{Deserialize, Serialize};

const ORTHOGONAL: [(i64, i64); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub row: usize,
    pub col: usize,
}

impl Coord {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub orbs: u32,
    #[serde(rename = "ownerId", default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(rename = "criticalMass")]
    pub critical_mass: u32,
}

impl Cell {
    pub fn empty(critical_mass: u32) -> Self {
        Self {
            orbs: 0,
            owner_id: None,
            critical_mass,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.orbs == 0
    }

    pub fn is_unstable(&self) -> bool {
        self.orbs >= self.critical_mass
    }

    pub fn is_owned_by(&self, player_id: &str) -> bool {
        self.owner_id.as_deref() == Some(player_id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("grid must be at least 2x2, got {rows}x{cols}")]
    TooSmall { rows: usize, cols: usize },
    #[error("grid rows must all have the same length")]
    Ragged,
    #[error("cell ({row}, {col}) has critical mass {found}, expected {expected}")]
    CriticalMassMismatch {
        row: usize,
        col: usize,
        found: u32,
        expected: u32,
    },
    #[error("cell ({row}, {col}) owner does not match its orb count")]
    OwnerMismatch { row: usize, col: usize },
}

/// Capacity of a cell: 2 in corners, 3 on edges, 4 inside. Always equals the
/// number of orthogonal neighbours.
pub fn critical_mass_at(rows: usize, cols: usize, row: usize, col: usize) -> u32 {
    let on_row_edge = row == 0 || row + 1 == rows;
    let on_col_edge = col == 0 || col + 1 == cols;
    match (on_row_edge, on_col_edge) {
        (true, true) => 2,
        (true, false) | (false, true) => 3,
        (false, false) => 4,
    }
}

/// Rectangular board. Dimensions are fixed for the lifetime of a game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<Cell>>", into = "Vec<Vec<Cell>>")]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Vec<Cell>>,
}

impl Grid {
    pub fn new(rows: usize, cols: usize) -> Result<Self, GridError> {
        if rows < 2 || cols < 2 {
            return Err(GridError::TooSmall { rows, cols });
        }
        let cells = (0..rows)
            .map(|row| {
                (0..cols)
                    .map(|col| Cell::empty(critical_mass_at(rows, cols, row, col)))
                    .collect()
            })
            .collect();
        Ok(Self { rows, cols, cells })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Same dimensions, every cell emptied.
    pub fn cleared(&self) -> Self {
        let mut grid = self.clone();
        for cell in grid.cells.iter_mut().flatten() {
            cell.orbs = 0;
            cell.owner_id = None;
        }
        grid
    }

    pub fn checked_coord(&self, row: i64, col: i64) -> Option<Coord> {
        if row < 0 || col < 0 {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(Coord { row, col })
    }

    pub fn cell(&self, coord: Coord) -> &Cell {
        &self.cells[coord.row][coord.col]
    }

    pub fn cell_mut(&mut self, coord: Coord) -> &mut Cell {
        &mut self.cells[coord.row][coord.col]
    }

    pub fn neighbors(&self, coord: Coord) -> impl Iterator<Item = Coord> + '_ {
        ORTHOGONAL.iter().filter_map(move |(dr, dc)| {
            self.checked_coord(coord.row as i64 + dr, coord.col as i64 + dc)
        })
    }

    pub fn coords(&self) -> impl Iterator<Item = Coord> {
        let cols = self.cols;
        (0..self.rows).flat_map(move |row| (0..cols).map(move |col| Coord { row, col }))
    }

    /// Cells at or above capacity, in row-major order.
    pub fn unstable_cells(&self) -> Vec<Coord> {
        self.coords()
            .filter(|coord| self.cell(*coord).is_unstable())
            .collect()
    }

    pub fn is_stable(&self) -> bool {
        self.cells.iter().flatten().all(|cell| !cell.is_unstable())
    }

    pub fn total_orbs(&self) -> u32 {
        self.cells.iter().flatten().map(|cell| cell.orbs).sum()
    }

    pub fn orbs_owned_by(&self, player_id: &str) -> u32 {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| cell.is_owned_by(player_id))
            .map(|cell| cell.orbs)
            .sum()
    }
}

impl TryFrom<Vec<Vec<Cell>>> for Grid {
    type Error = GridError;

    fn try_from(cells: Vec<Vec<Cell>>) -> Result<Self, Self::Error> {
        let rows = cells.len();
        let cols = cells.first().map(Vec::len).unwrap_or(0);
        if rows < 2 || cols < 2 {
            return Err(GridError::TooSmall { rows, cols });
        }
        if cells.iter().any(|line| line.len() != cols) {
            return Err(GridError::Ragged);
        }
        for (row, line) in cells.iter().enumerate() {
            for (col, cell) in line.iter().enumerate() {
                let expected = critical_mass_at(rows, cols, row, col);
                if cell.critical_mass != expected {
                    return Err(GridError::CriticalMassMismatch {
                        row,
                        col,
                        found: cell.critical_mass,
                        expected,
                    });
                }
                if cell.owner_id.is_some() != (cell.orbs > 0) {
                    return Err(GridError::OwnerMismatch { row, col });
                }
            }
        }
        Ok(Self { rows, cols, cells })
    }
}

impl From<Grid> for Vec<Vec<Cell>> {
    fn from(grid: Grid) -> Self {
        grid.cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_mass_follows_position_for_all_board_sizes() {
        for rows in 2..=8 {
            for cols in 2..=8 {
                let grid = Grid::new(rows, cols).expect("grid");
                for coord in grid.coords() {
                    let row_edge = coord.row == 0 || coord.row == rows - 1;
                    let col_edge = coord.col == 0 || coord.col == cols - 1;
                    let expected = match (row_edge, col_edge) {
                        (true, true) => 2,
                        (false, false) => 4,
                        _ => 3,
                    };
                    assert_eq!(grid.cell(coord).critical_mass, expected);
                }
            }
        }
    }

    #[test]
    fn neighbor_count_matches_critical_mass() {
        let grid = Grid::new(5, 7).expect("grid");
        for coord in grid.coords() {
            assert_eq!(
                grid.neighbors(coord).count() as u32,
                grid.cell(coord).critical_mass
            );
        }
    }

    #[test]
    fn new_grid_is_empty_and_unowned() {
        let grid = Grid::new(3, 4).expect("grid");
        assert_eq!(grid.rows(), 3);
        assert_eq!(grid.cols(), 4);
        assert_eq!(grid.total_orbs(), 0);
        assert!(grid.coords().all(|c| grid.cell(c).owner_id.is_none()));
    }

    #[test]
    fn rejects_degenerate_dimensions() {
        assert_eq!(
            Grid::new(1, 5),
            Err(GridError::TooSmall { rows: 1, cols: 5 })
        );
    }

    #[test]
    fn checked_coord_rejects_out_of_bounds() {
        let grid = Grid::new(3, 3).expect("grid");
        assert_eq!(grid.checked_coord(2, 2), Some(Coord::new(2, 2)));
        assert_eq!(grid.checked_coord(-1, 0), None);
        assert_eq!(grid.checked_coord(0, 3), None);
        assert_eq!(grid.checked_coord(3, 0), None);
    }

    #[test]
    fn deserialization_validates_invariants() {
        let grid = Grid::new(2, 2).expect("grid");
        let text = serde_json::to_string(&grid).expect("serialize");
        let back: Grid = serde_json::from_str(&text).expect("deserialize");
        assert_eq!(back, grid);

        let owner_without_orbs =
            r#"[[{"orbs":0,"ownerId":"a","criticalMass":2},{"orbs":0,"criticalMass":2}],
                [{"orbs":0,"criticalMass":2},{"orbs":0,"criticalMass":2}]]"#;
        assert!(serde_json::from_str::<Grid>(owner_without_orbs).is_err());

        let wrong_capacity = r#"[[{"orbs":0,"criticalMass":4},{"orbs":0,"criticalMass":2}],
                [{"orbs":0,"criticalMass":2},{"orbs":0,"criticalMass":2}]]"#;
        assert!(serde_json::from_str::<Grid>(wrong_capacity).is_err());

        let ragged = r#"[[{"orbs":0,"criticalMass":2},{"orbs":0,"criticalMass":2}],
                [{"orbs":0,"criticalMass":2}]]"#;
        assert!(serde_json::from_str::<Grid>(ragged).is_err());
    }

    #[test]
    fn cleared_keeps_dimensions_and_capacities() {
        let mut grid = Grid::new(3, 3).expect("grid");
        let center = Coord::new(1, 1);
        grid.cell_mut(center).orbs = 3;
        grid.cell_mut(center).owner_id = Some("a".to_string());
        let cleared = grid.cleared();
        assert_eq!(cleared, Grid::new(3, 3).expect("grid"));
        assert_eq!(grid.orbs_owned_by("a"), 3);
    }
}
