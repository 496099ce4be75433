use chain_reaction_server::constants::{HISTORY_LIMIT, MAX_PLAYERS, MIN_PLAYERS};
use chain_reaction_server::engine::{apply_command, create_room, join_room, Command, Outcome};
use chain_reaction_server::error::EngineError;
use chain_reaction_server::grid::Coord;
use chain_reaction_server::server_utils::{normalize_room_settings, now_ms, RawRoomSettings};
use chain_reaction_server::types::{GameStatus, Room, RoomSettings, TimeoutKind};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const SIM_MOVE_LIMIT_SECONDS: i64 = 30;
const TIMEOUT_RATE: f64 = 0.03;

/// Plays seeded random games through the command layer and reports any
/// broken invariant as an anomaly.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long, default_value_t = 4)]
    games: u32,
    #[arg(long, default_value_t = 2)]
    players: usize,
    #[arg(long)]
    rows: Option<i64>,
    #[arg(long)]
    cols: Option<i64>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value_t = 500)]
    max_moves: u32,
    #[arg(long, default_value_t = 0.05)]
    undo_rate: f64,
    #[arg(long)]
    match_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug)]
struct Scenario {
    name: String,
    seed: u64,
    players: usize,
    rows: Option<i64>,
    cols: Option<i64>,
    max_moves: u32,
    undo_rate: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum GameEnd {
    Finished,
    Runaway,
    MoveCap,
    Stuck,
}

impl GameEnd {
    fn key(self) -> &'static str {
        match self {
            Self::Finished => "finished",
            Self::Runaway => "runaway",
            Self::MoveCap => "move_cap",
            Self::Stuck => "stuck",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
struct GameResultLine {
    scenario: String,
    seed: u64,
    players: usize,
    rows: usize,
    cols: usize,
    end: GameEnd,
    #[serde(skip_serializing_if = "Option::is_none")]
    winner: Option<String>,
    moves: u32,
    #[serde(rename = "longestChain")]
    longest_chain: usize,
    #[serde(rename = "turnTimeouts")]
    turn_timeouts: u32,
    undos: u32,
    #[serde(rename = "rejectedUndos")]
    rejected_undos: u32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    step: u32,
    message: String,
}

#[derive(Clone, Debug)]
struct GameRunResult {
    result: GameResultLine,
    anomaly_records: Vec<AnomalyRecord>,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(rename = "startedAtMs")]
    started_at_ms: u64,
    #[serde(rename = "finishedAtMs")]
    finished_at_ms: u64,
    #[serde(rename = "gameCount")]
    game_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageMoves")]
    average_moves: u32,
    #[serde(rename = "endCounts")]
    end_counts: BTreeMap<String, usize>,
    games: Vec<GameResultLine>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("chain_reaction_server=info,simulate=info")),
        )
        .init();

    let cli = Cli::parse();
    let scenarios = resolve_scenarios(&cli);
    let run_started_at_ms = now_ms();
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let match_id = cli
        .match_id
        .clone()
        .unwrap_or_else(|| default_match_id(seed_hint, run_started_at_ms));
    let mut has_anomaly = false;
    let mut results = Vec::new();
    let mut end_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_anomalies = 0usize;

    for scenario in scenarios {
        tracing::info!(
            match_id = %match_id,
            scenario = %scenario.name,
            seed = scenario.seed,
            players = scenario.players,
            "game started"
        );
        let run = run_game(&scenario);

        for anomaly in &run.anomaly_records {
            tracing::warn!(
                match_id = %match_id,
                scenario = %scenario.name,
                step = anomaly.step,
                message = %anomaly.message,
                "anomaly detected"
            );
        }
        if !run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += run.anomaly_records.len();
        *end_counts
            .entry(run.result.end.key().to_string())
            .or_insert(0) += 1;

        tracing::info!(
            match_id = %match_id,
            scenario = %scenario.name,
            end = run.result.end.key(),
            moves = run.result.moves,
            longest_chain = run.result.longest_chain,
            "game finished"
        );

        match serde_json::to_string(&run.result) {
            Ok(line) => println!("{line}"),
            Err(error) => tracing::error!(%error, "failed to serialize game result"),
        }
        results.push(run.result);
    }

    let summary = build_run_summary(
        match_id.clone(),
        run_started_at_ms,
        now_ms(),
        results,
        end_counts,
        total_anomalies,
    );

    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            tracing::error!(path = %path.display(), %error, "failed to write run summary");
            std::process::exit(2);
        }
    }

    tracing::info!(
        match_id = %match_id,
        games = summary.game_count,
        anomalies = summary.anomaly_count,
        average_moves = summary.average_moves,
        "run finished"
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = cli.seed.unwrap_or_else(now_ms);
    let players = cli.players.clamp(MIN_PLAYERS, MAX_PLAYERS);
    let undo_rate = if cli.undo_rate.is_finite() {
        cli.undo_rate.clamp(0.0, 1.0)
    } else {
        0.0
    };
    (0..cli.games.max(1))
        .map(|idx| Scenario {
            name: format!("p{players}-game{}", idx + 1),
            seed: seed.wrapping_add(idx as u64),
            players,
            rows: cli.rows,
            cols: cli.cols,
            max_moves: cli.max_moves.max(1),
            undo_rate,
        })
        .collect()
}

fn run_game(scenario: &Scenario) -> GameRunResult {
    let mut rng = StdRng::seed_from_u64(scenario.seed);
    let mut clock_ms = 1_000u64;
    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();
    let mut step = 0u32;

    let settings = normalize_room_settings(&RawRoomSettings {
        max_players: Some(scenario.players as i64),
        rows: scenario.rows,
        cols: scenario.cols,
        move_time_limit_seconds: Some(SIM_MOVE_LIMIT_SECONDS),
        undo_enabled: Some(true),
        ..RawRoomSettings::default()
    });
    let move_limit_ms = settings.move_time_limit_ms.unwrap_or(0);
    let (rows, cols) = (settings.board_size.rows, settings.board_size.cols);

    let mut room = match setup_room(scenario, settings, clock_ms) {
        Ok(room) => room,
        Err(error) => {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                0,
                format!("setup failed: {error}"),
            );
            return GameRunResult {
                result: GameResultLine {
                    scenario: scenario.name.clone(),
                    seed: scenario.seed,
                    players: scenario.players,
                    rows,
                    cols,
                    end: GameEnd::Stuck,
                    winner: None,
                    moves: 0,
                    longest_chain: 0,
                    turn_timeouts: 0,
                    undos: 0,
                    rejected_undos: 0,
                    anomalies,
                },
                anomaly_records,
            };
        }
    };

    let mut longest_chain = 0usize;
    let mut turn_timeouts = 0u32;
    let mut undos = 0u32;
    let mut rejected_undos = 0u32;
    let mut end = GameEnd::MoveCap;

    while room.game_state.status == GameStatus::Active {
        if room.game_state.move_count >= scenario.max_moves
            || step >= scenario.max_moves.saturating_mul(4)
        {
            break;
        }
        step += 1;
        clock_ms += rng.random_range(200..3_000);
        let Some(current) = room.game_state.current_player_id.clone() else {
            end = GameEnd::Stuck;
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                step,
                "active game without a current player".to_string(),
            );
            break;
        };

        if room.history.last().map(|entry| entry.player_id.as_str()) == Some(current.as_str())
            && rng.random_bool(scenario.undo_rate)
        {
            match apply_command(&room, Command::Undo { player_id: current }, clock_ms) {
                Ok(applied) => {
                    room = applied.room;
                    undos += 1;
                }
                Err(_) => rejected_undos += 1,
            }
            record_invariants(&room, step, &mut anomalies, &mut anomaly_records, &mut anomaly_seen);
            continue;
        }

        if rng.random_bool(TIMEOUT_RATE) {
            clock_ms += move_limit_ms + 1;
            let check = Command::CheckTimeout {
                kind: TimeoutKind::Move,
            };
            match apply_command(&room, check, clock_ms) {
                Ok(applied) => {
                    room = applied.room;
                    turn_timeouts += 1;
                }
                Err(error) => push_anomaly(
                    &mut anomalies,
                    &mut anomaly_records,
                    &mut anomaly_seen,
                    step,
                    format!("expired turn not detected: {}", error.code()),
                ),
            }
            record_invariants(&room, step, &mut anomalies, &mut anomaly_records, &mut anomaly_seen);
            continue;
        }

        let legal = legal_cells(&room, &current);
        if legal.is_empty() {
            end = GameEnd::Stuck;
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                step,
                format!("no legal cell for {current}"),
            );
            break;
        }
        let target = legal[rng.random_range(0..legal.len())];
        let command = Command::Move {
            player_id: current,
            row: target.row as i64,
            col: target.col as i64,
        };
        match apply_command(&room, command, clock_ms) {
            Ok(applied) => {
                if let Outcome::Moved { is_runaway, waves } = &applied.outcome {
                    longest_chain = longest_chain.max(waves.len());
                    if !is_runaway && !applied.room.game_state.grid.is_stable() {
                        push_anomaly(
                            &mut anomalies,
                            &mut anomaly_records,
                            &mut anomaly_seen,
                            step,
                            "grid left unstable after a settled move".to_string(),
                        );
                    }
                }
                room = applied.room;
            }
            Err(error) => push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                step,
                format!("legal move rejected: {}", error.code()),
            ),
        }
        record_invariants(&room, step, &mut anomalies, &mut anomaly_records, &mut anomaly_seen);
    }

    match room.game_state.status {
        GameStatus::Finished => end = GameEnd::Finished,
        GameStatus::Runaway => end = GameEnd::Runaway,
        _ => {}
    }

    GameRunResult {
        result: GameResultLine {
            scenario: scenario.name.clone(),
            seed: scenario.seed,
            players: scenario.players,
            rows,
            cols,
            end,
            winner: room.game_state.winner.clone(),
            moves: room.game_state.move_count,
            longest_chain,
            turn_timeouts,
            undos,
            rejected_undos,
            anomalies,
        },
        anomaly_records,
    }
}

fn setup_room(
    scenario: &Scenario,
    settings: RoomSettings,
    now_ms: u64,
) -> Result<Room, EngineError> {
    let mut room = create_room(&scenario.name, "bot_1", "Bot-01", settings, now_ms)?;
    for idx in 1..scenario.players {
        room = join_room(
            &room,
            &format!("bot_{}", idx + 1),
            &format!("Bot-{:02}", idx + 1),
        )?;
    }
    let start = Command::Start {
        requester_id: "bot_1".to_string(),
    };
    Ok(apply_command(&room, start, now_ms)?.room)
}

fn legal_cells(room: &Room, player_id: &str) -> Vec<Coord> {
    let grid = &room.game_state.grid;
    grid.coords()
        .filter(|coord| {
            let cell = grid.cell(*coord);
            cell.is_empty() || cell.is_owned_by(player_id)
        })
        .collect()
}

fn collect_room_anomalies(room: &Room) -> Vec<String> {
    let mut anomalies = Vec::new();
    let state = &room.game_state;

    if room.history.len() > HISTORY_LIMIT {
        anomalies.push(format!("history exceeds limit: {}", room.history.len()));
    }

    let total_orbs = state.grid.total_orbs();
    if total_orbs != state.move_count {
        anomalies.push(format!(
            "orbs not conserved: {total_orbs} on board after {} moves",
            state.move_count
        ));
    }

    for player in &state.players {
        let on_board = state.grid.orbs_owned_by(&player.id);
        if player.orb_count != on_board {
            anomalies.push(format!(
                "orb count out of sync: {} reports {} but owns {}",
                player.id, player.orb_count, on_board
            ));
        }
    }

    if state.status == GameStatus::Active {
        if let Some(current) = state
            .current_player_id
            .as_deref()
            .and_then(|id| state.player(id))
        {
            if current.is_eliminated {
                anomalies.push(format!("eliminated player holds the turn: {}", current.id));
            }
        }
    }

    if state.status == GameStatus::Finished && state.winner.is_none() {
        anomalies.push("finished game without a winner".to_string());
    }
    anomalies
}

fn record_invariants(
    room: &Room,
    step: u32,
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
) {
    for message in collect_room_anomalies(room) {
        push_anomaly(anomalies, anomaly_records, anomaly_seen, step, message);
    }
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    step: u32,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        step,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_match_id(seed: u64, timestamp_ms: u64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn build_run_summary(
    match_id: String,
    started_at_ms: u64,
    finished_at_ms: u64,
    games: Vec<GameResultLine>,
    end_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
) -> RunSummary {
    let game_count = games.len();
    let total_moves: u64 = games.iter().map(|game| game.moves as u64).sum();
    let average_moves = if game_count == 0 {
        0
    } else {
        (total_moves / game_count as u64) as u32
    };
    RunSummary {
        match_id,
        started_at_ms,
        finished_at_ms,
        game_count,
        anomaly_count,
        average_moves,
        end_counts,
        games,
    }
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    std::fs::write(path, summary_text)
}
