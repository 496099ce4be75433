/// Upper bound on explosion waves resolved for a single placement. Chains that
/// are still unstable after this many waves are reported as a runaway.
pub const MAX_EXPLOSION_WAVES: usize = 100;
pub const HISTORY_LIMIT: usize = 10;

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 8;

pub const MIN_BOARD_SIDE: usize = 3;
pub const MAX_BOARD_SIDE: usize = 16;

pub const MIN_MOVE_TIME_LIMIT_MS: u64 = 5_000;
pub const MAX_MOVE_TIME_LIMIT_MS: u64 = 5 * 60 * 1000;
pub const MIN_GAME_TIME_LIMIT_MS: u64 = 60_000;
pub const MAX_GAME_TIME_LIMIT_MS: u64 = 2 * 60 * 60 * 1000;

pub const PLAYER_COLORS: [&str; MAX_PLAYERS] = [
    "#ef4444", "#3b82f6", "#22c55e", "#eab308", "#a855f7", "#f97316", "#14b8a6", "#ec4899",
];

pub fn get_color_for_seat(seat: usize) -> &'static str {
    PLAYER_COLORS[seat % PLAYER_COLORS.len()]
}

/// Default `(rows, cols)` when the host does not pick a board size.
pub fn get_board_size_by_player_count(player_count: usize) -> (usize, usize) {
    if player_count <= 2 {
        return (9, 6);
    }
    if player_count <= 4 {
        return (10, 8);
    }
    if player_count <= 6 {
        return (12, 10);
    }
    (14, 12)
}
