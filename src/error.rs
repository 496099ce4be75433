use crate::grid::GridError;
use crate::types::GameState;

/// Every way a command can be refused. Rejections never mutate the room,
/// except the two timeout variants which carry the state the caller must
/// persist in place of the attempted move.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("coordinates ({row}, {col}) are outside the board")]
    InvalidCoordinates { row: i64, col: i64 },
    #[error("game is not active")]
    GameNotActive,
    #[error("it is not your turn")]
    NotYourTurn,
    #[error("cell is owned by another player")]
    CellOwnedByAnotherPlayer,
    #[error("turn time ran out, the turn was passed on")]
    MoveTimedOut { state: Box<GameState> },
    #[error("game time ran out")]
    GameTimedOut { state: Box<GameState> },
    #[error("only the host can do that")]
    NotHost,
    #[error("at least two players are needed")]
    InsufficientPlayers,
    #[error("game already started")]
    AlreadyStarted,
    #[error("no timeout detected")]
    NoTimeoutDetected,
    #[error("undo is disabled in this room")]
    UndoDisabled,
    #[error("no moves to undo")]
    NoMovesToUndo,
    #[error("no history available")]
    NoHistoryAvailable,
    #[error("you can only undo your own moves")]
    CanOnlyUndoOwnMoves,
    #[error("game is not finished")]
    GameNotFinished,
    #[error("room is full")]
    RoomFull,
    #[error("player already joined")]
    AlreadyJoined,
    #[error("player not found")]
    PlayerNotFound,
    #[error("invalid board: {0}")]
    InvalidBoard(#[from] GridError),
}

impl EngineError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCoordinates { .. } => "invalid_coordinates",
            Self::GameNotActive => "game_not_active",
            Self::NotYourTurn => "not_your_turn",
            Self::CellOwnedByAnotherPlayer => "cell_owned_by_another_player",
            Self::MoveTimedOut { .. } => "move_timed_out",
            Self::GameTimedOut { .. } => "game_timed_out",
            Self::NotHost => "not_host",
            Self::InsufficientPlayers => "insufficient_players",
            Self::AlreadyStarted => "already_started",
            Self::NoTimeoutDetected => "no_timeout_detected",
            Self::UndoDisabled => "undo_disabled",
            Self::NoMovesToUndo => "no_moves_to_undo",
            Self::NoHistoryAvailable => "no_history_available",
            Self::CanOnlyUndoOwnMoves => "can_only_undo_own_moves",
            Self::GameNotFinished => "game_not_finished",
            Self::RoomFull => "room_full",
            Self::AlreadyJoined => "already_joined",
            Self::PlayerNotFound => "player_not_found",
            Self::InvalidBoard(_) => "invalid_board",
        }
    }

    /// State produced by a terminal timeout that the caller still has to
    /// persist.
    pub fn attached_state(&self) -> Option<&GameState> {
        match self {
            Self::MoveTimedOut { state } | Self::GameTimedOut { state } => Some(state),
            _ => None,
        }
    }
}
