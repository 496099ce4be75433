use serde_json::{Map, Value};

use crate::engine::Command;
use crate::server_utils::RawRoomSettings;
use crate::types::TimeoutKind;

#[derive(Debug, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: Command,
    pub expected_version: Option<u64>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParsedPlayer {
    pub player_id: String,
    pub name: Option<String>,
}

#[derive(Debug)]
pub struct ParsedCreateRoom {
    pub room_id: Option<String>,
    pub host: ParsedPlayer,
    pub settings: RawRoomSettings,
}

pub fn parse_command(raw: &str) -> Option<ParsedCommand> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    let command = match message_type {
        "start" => Command::Start {
            requester_id: required_string(object, "playerId")?,
        },
        "move" => Command::Move {
            player_id: required_string(object, "playerId")?,
            row: object.get("row")?.as_i64()?,
            col: object.get("col")?.as_i64()?,
        },
        "undo" => Command::Undo {
            player_id: required_string(object, "playerId")?,
        },
        "check_timeout" => Command::CheckTimeout {
            kind: TimeoutKind::parse(object.get("kind")?.as_str()?)?,
        },
        "restart" => Command::Restart {
            requester_id: required_string(object, "playerId")?,
        },
        _ => return None,
    };
    let expected_version = match object.get("expectedVersion") {
        None | Some(Value::Null) => None,
        Some(value) => Some(value.as_u64()?),
    };
    Some(ParsedCommand {
        command,
        expected_version,
    })
}

pub fn parse_player(raw: &str) -> Option<ParsedPlayer> {
    let value: Value = serde_json::from_str(raw).ok()?;
    parse_player_object(value.as_object()?)
}

pub fn parse_create_room(raw: &str) -> Option<ParsedCreateRoom> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let host = parse_player_object(object)?;
    let room_id = match object.get("roomId") {
        None | Some(Value::Null) => None,
        Some(value) => Some(value.as_str()?.to_string()),
    };

    let settings = match object.get("settings") {
        None | Some(Value::Null) => RawRoomSettings::default(),
        Some(value) => {
            let settings = value.as_object()?;
            let board = match settings.get("boardSize") {
                None | Some(Value::Null) => None,
                Some(value) => Some(value.as_object()?),
            };
            RawRoomSettings {
                max_players: parse_optional_i64(settings.get("maxPlayers"))?,
                rows: parse_optional_i64(board.and_then(|board| board.get("rows")))?,
                cols: parse_optional_i64(board.and_then(|board| board.get("cols")))?,
                game_time_limit_seconds: parse_optional_i64(settings.get("gameTimeLimitSeconds"))?,
                move_time_limit_seconds: parse_optional_i64(settings.get("moveTimeLimitSeconds"))?,
                undo_enabled: parse_optional_bool(settings.get("undoEnabled"))?,
                is_private: parse_optional_bool(settings.get("isPrivate"))?,
            }
        }
    };

    Some(ParsedCreateRoom {
        room_id,
        host,
        settings,
    })
}

fn parse_player_object(object: &Map<String, Value>) -> Option<ParsedPlayer> {
    let player_id = required_string(object, "playerId")?;
    let name = match object.get("name") {
        None | Some(Value::Null) => None,
        Some(value) => Some(value.as_str()?.to_string()),
    };
    Some(ParsedPlayer { player_id, name })
}

fn required_string(object: &Map<String, Value>, key: &str) -> Option<String> {
    let value = object.get(key)?.as_str()?.trim();
    if value.is_empty() {
        return None;
    }
    Some(value.to_string())
}

fn parse_optional_bool(value: Option<&Value>) -> Option<Option<bool>> {
    match value {
        None | Some(Value::Null) => Some(None),
        Some(value) => value.as_bool().map(Some),
    }
}

/// Accepts integers and finite floats (floored); `None` means malformed.
fn parse_optional_i64(value: Option<&Value>) -> Option<Option<i64>> {
    const MAX_SAFE_INTEGER_F64: f64 = 9_007_199_254_740_991.0;

    let Some(value) = value else {
        return Some(None);
    };
    if value.is_null() {
        return Some(None);
    }
    if let Some(number) = value.as_i64() {
        return Some(Some(number));
    }
    let number = value.as_f64()?;
    if !number.is_finite() {
        return None;
    }
    let floored = number.floor();
    if floored.abs() > MAX_SAFE_INTEGER_F64 {
        return None;
    }
    Some(Some(floored as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_move_command() {
        let parsed = parse_command(r#"{"type":"move","playerId":"a","row":2,"col":0}"#)
            .expect("move should parse");
        assert_eq!(
            parsed.command,
            Command::Move {
                player_id: "a".to_string(),
                row: 2,
                col: 0
            }
        );
        assert_eq!(parsed.expected_version, None);
    }

    #[test]
    fn parse_move_keeps_negative_coordinates_for_engine_validation() {
        let parsed = parse_command(r#"{"type":"move","playerId":"a","row":-1,"col":0}"#)
            .expect("move should parse");
        assert!(matches!(parsed.command, Command::Move { row: -1, .. }));
    }

    #[test]
    fn parse_move_rejects_fractional_coordinates() {
        assert!(parse_command(r#"{"type":"move","playerId":"a","row":1.5,"col":0}"#).is_none());
        assert!(parse_command(r#"{"type":"move","playerId":"a","row":1}"#).is_none());
    }

    #[test]
    fn parse_commands_with_expected_version() {
        let parsed = parse_command(r#"{"type":"start","playerId":"h","expectedVersion":4}"#)
            .expect("start should parse");
        assert_eq!(
            parsed.command,
            Command::Start {
                requester_id: "h".to_string()
            }
        );
        assert_eq!(parsed.expected_version, Some(4));
        assert!(parse_command(r#"{"type":"undo","playerId":"h","expectedVersion":-1}"#).is_none());
    }

    #[test]
    fn parse_check_timeout_requires_known_kind() {
        let parsed = parse_command(r#"{"type":"check_timeout","kind":"game"}"#)
            .expect("timeout should parse");
        assert_eq!(
            parsed.command,
            Command::CheckTimeout {
                kind: TimeoutKind::Game
            }
        );
        assert!(parse_command(r#"{"type":"check_timeout","kind":"turn"}"#).is_none());
    }

    #[test]
    fn parse_rejects_unknown_or_blank() {
        assert!(parse_command(r#"{"type":"chat","text":"hi"}"#).is_none());
        assert!(parse_command(r#"{"type":"restart","playerId":"  "}"#).is_none());
        assert!(parse_command("not json").is_none());
    }

    #[test]
    fn parse_create_room_with_settings() {
        let parsed = parse_create_room(
            r#"{"playerId":"h","name":"Host","roomId":"abc","settings":{"maxPlayers":4,
            "boardSize":{"rows":8,"cols":6.7},"moveTimeLimitSeconds":30,"undoEnabled":false}}"#,
        )
        .expect("create should parse");
        assert_eq!(parsed.room_id.as_deref(), Some("abc"));
        assert_eq!(parsed.host.player_id, "h");
        assert_eq!(parsed.host.name.as_deref(), Some("Host"));
        assert_eq!(parsed.settings.max_players, Some(4));
        assert_eq!(parsed.settings.rows, Some(8));
        assert_eq!(parsed.settings.cols, Some(6));
        assert_eq!(parsed.settings.move_time_limit_seconds, Some(30));
        assert_eq!(parsed.settings.undo_enabled, Some(false));
        assert_eq!(parsed.settings.is_private, None);
    }

    #[test]
    fn parse_create_room_rejects_malformed_settings() {
        assert!(parse_create_room(r#"{"playerId":"h","settings":{"maxPlayers":"four"}}"#).is_none());
        assert!(parse_create_room(r#"{"playerId":"h","settings":{"maxPlayers":1e300}}"#).is_none());
        assert!(parse_create_room(r#"{"name":"no id"}"#).is_none());
    }

    #[test]
    fn parse_player_name_is_optional() {
        let parsed = parse_player(r#"{"playerId":"p"}"#).expect("player should parse");
        assert_eq!(
            parsed,
            ParsedPlayer {
                player_id: "p".to_string(),
                name: None
            }
        );
    }
}
