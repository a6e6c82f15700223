//! Server event catalog and callback normalization.
//!
//! Inbound callbacks arrive under generation-specific names
//! (`TrackMania.PlayerChat` vs `ManiaPlanet.PlayerChat`) with untyped
//! argument arrays. This module normalizes names and shapes into one
//! tagged union; anything it does not recognize survives as
//! [`ServerEvent::Unknown`] rather than being dropped.

use crate::error::Result;
use crate::xmlrpc::Value;

use super::scripted;

/// Reserved player uid for the server's own identity. Checkpoint and
/// finish callbacks for it are noise and get suppressed.
pub const SERVER_PLAYER_UID: i32 = 0;

/// A normalized server-initiated event.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// A player joined the server.
    PlayerConnect { login: String, is_spectator: bool },
    /// A player left the server.
    PlayerDisconnect { login: String },
    /// Chat line (commands included, flagged).
    PlayerChat {
        player_uid: i32,
        login: String,
        text: String,
        is_command: bool,
    },
    /// A player crossed a checkpoint.
    PlayerCheckpoint {
        login: String,
        time_ms: i32,
        checkpoint: i32,
    },
    /// A player finished the race.
    PlayerFinish { login: String, time_ms: i32 },
    /// A player abandoned the current run.
    PlayerGiveUp { login: String },
    /// A new map started.
    BeginMap { map: Value },
    /// The current map ended.
    EndMap { map: Value },
    /// `Echo` callback (inter-controller signalling).
    Echo { internal: String, public: String },
    /// Scripted sub-event that has no dedicated variant; payload is the
    /// parsed JSON document.
    Scripted {
        name: String,
        payload: serde_json::Value,
    },
    /// Directly named callback with an unrecognized name or shape.
    Unknown { name: String, args: Vec<Value> },
}

impl ServerEvent {
    /// Subscription key for this event.
    pub fn name(&self) -> &str {
        match self {
            ServerEvent::PlayerConnect { .. } => "PlayerConnect",
            ServerEvent::PlayerDisconnect { .. } => "PlayerDisconnect",
            ServerEvent::PlayerChat { .. } => "PlayerChat",
            ServerEvent::PlayerCheckpoint { .. } => "PlayerCheckpoint",
            ServerEvent::PlayerFinish { .. } => "PlayerFinish",
            ServerEvent::PlayerGiveUp { .. } => "PlayerGiveUp",
            ServerEvent::BeginMap { .. } => "BeginMap",
            ServerEvent::EndMap { .. } => "EndMap",
            ServerEvent::Echo { .. } => "Echo",
            ServerEvent::Scripted { name, .. } => name,
            ServerEvent::Unknown { name, .. } => name,
        }
    }
}

/// Strip the generation namespace and legacy vocabulary from a callback
/// name: `TrackMania.BeginChallenge` → `BeginMap`.
pub fn normalize_event_name(raw: &str) -> String {
    let bare = raw
        .strip_prefix("TrackMania.")
        .or_else(|| raw.strip_prefix("ManiaPlanet."))
        .unwrap_or(raw);
    match bare {
        "BeginChallenge" => "BeginMap".to_string(),
        "EndChallenge" => "EndMap".to_string(),
        other => other.to_string(),
    }
}

/// Normalize one inbound callback into a [`ServerEvent`].
///
/// Returns `Ok(None)` when the event is deliberately suppressed
/// (checkpoint/finish for the server identity). A scripted envelope
/// with an undecodable JSON payload returns `Err`; the caller logs and
/// drops the frame.
pub fn from_callback(method: &str, args: Vec<Value>) -> Result<Option<ServerEvent>> {
    let name = normalize_event_name(method);

    if name == "ModeScriptCallbackArray" || name == "ModeScriptCallback" {
        return scripted::demux(&args);
    }

    Ok(match build(&name, &args) {
        Built::Suppressed => None,
        Built::Event(event) => Some(event),
        Built::Unrecognized => Some(ServerEvent::Unknown { name, args }),
    })
}

enum Built {
    Event(ServerEvent),
    Suppressed,
    Unrecognized,
}

fn build(name: &str, args: &[Value]) -> Built {
    let event = match name {
        "PlayerConnect" => match args {
            [login, spectator] => match (login.as_str(), spectator.as_bool()) {
                (Some(login), Some(is_spectator)) => ServerEvent::PlayerConnect {
                    login: login.to_string(),
                    is_spectator,
                },
                _ => return Built::Unrecognized,
            },
            _ => return Built::Unrecognized,
        },
        "PlayerDisconnect" => match args.first().and_then(Value::as_str) {
            Some(login) => ServerEvent::PlayerDisconnect {
                login: login.to_string(),
            },
            None => return Built::Unrecognized,
        },
        "PlayerChat" => match args {
            [uid, login, text, is_command, ..] => match (
                uid.as_i32(),
                login.as_str(),
                text.as_str(),
                is_command.as_bool(),
            ) {
                (Some(player_uid), Some(login), Some(text), Some(is_command)) => {
                    ServerEvent::PlayerChat {
                        player_uid,
                        login: login.to_string(),
                        text: text.to_string(),
                        is_command,
                    }
                }
                _ => return Built::Unrecognized,
            },
            _ => return Built::Unrecognized,
        },
        "PlayerCheckpoint" => match args {
            [uid, login, time, _lap, index, ..] => {
                match (uid.as_i32(), login.as_str(), time.as_i32(), index.as_i32()) {
                    (Some(uid), _, _, _) if uid == SERVER_PLAYER_UID => return Built::Suppressed,
                    (Some(_), Some(login), Some(time_ms), Some(checkpoint)) => {
                        ServerEvent::PlayerCheckpoint {
                            login: login.to_string(),
                            time_ms,
                            checkpoint,
                        }
                    }
                    _ => return Built::Unrecognized,
                }
            }
            _ => return Built::Unrecognized,
        },
        "PlayerFinish" => match args {
            [uid, login, time, ..] => match (uid.as_i32(), login.as_str(), time.as_i32()) {
                (Some(uid), _, _) if uid == SERVER_PLAYER_UID => return Built::Suppressed,
                // A "finish" with no positive time is a retire.
                (Some(_), Some(login), Some(time_ms)) if time_ms <= 0 => {
                    ServerEvent::PlayerGiveUp {
                        login: login.to_string(),
                    }
                }
                (Some(_), Some(login), Some(time_ms)) => ServerEvent::PlayerFinish {
                    login: login.to_string(),
                    time_ms,
                },
                _ => return Built::Unrecognized,
            },
            _ => return Built::Unrecognized,
        },
        "BeginMap" => match args.first() {
            Some(map) => ServerEvent::BeginMap { map: map.clone() },
            None => return Built::Unrecognized,
        },
        "EndMap" => match args.first() {
            Some(map) => ServerEvent::EndMap { map: map.clone() },
            None => return Built::Unrecognized,
        },
        "Echo" => match args {
            [internal, public, ..] => match (internal.as_str(), public.as_str()) {
                (Some(internal), Some(public)) => ServerEvent::Echo {
                    internal: internal.to_string(),
                    public: public.to_string(),
                },
                _ => return Built::Unrecognized,
            },
            _ => return Built::Unrecognized,
        },
        _ => return Built::Unrecognized,
    };

    Built::Event(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_namespaces() {
        assert_eq!(normalize_event_name("TrackMania.PlayerChat"), "PlayerChat");
        assert_eq!(normalize_event_name("ManiaPlanet.PlayerChat"), "PlayerChat");
        assert_eq!(normalize_event_name("PlayerChat"), "PlayerChat");
    }

    #[test]
    fn test_normalize_maps_challenge_vocabulary() {
        assert_eq!(normalize_event_name("TrackMania.BeginChallenge"), "BeginMap");
        assert_eq!(normalize_event_name("TrackMania.EndChallenge"), "EndMap");
        assert_eq!(normalize_event_name("ManiaPlanet.BeginMap"), "BeginMap");
    }

    #[test]
    fn test_player_chat_shape() {
        let event = from_callback(
            "ManiaPlanet.PlayerChat",
            vec![
                Value::Int(12),
                Value::from("rider"),
                Value::from("/help"),
                Value::Bool(true),
            ],
        )
        .unwrap()
        .unwrap();

        assert_eq!(
            event,
            ServerEvent::PlayerChat {
                player_uid: 12,
                login: "rider".to_string(),
                text: "/help".to_string(),
                is_command: true,
            }
        );
        assert_eq!(event.name(), "PlayerChat");
    }

    #[test]
    fn test_finish_with_nonpositive_time_becomes_give_up() {
        let event = from_callback(
            "TrackMania.PlayerFinish",
            vec![Value::Int(5), Value::from("rider"), Value::Int(0)],
        )
        .unwrap()
        .unwrap();

        assert_eq!(
            event,
            ServerEvent::PlayerGiveUp {
                login: "rider".to_string()
            }
        );
    }

    #[test]
    fn test_finish_with_positive_time_passes_through() {
        let event = from_callback(
            "TrackMania.PlayerFinish",
            vec![Value::Int(5), Value::from("rider"), Value::Int(48231)],
        )
        .unwrap()
        .unwrap();

        assert_eq!(
            event,
            ServerEvent::PlayerFinish {
                login: "rider".to_string(),
                time_ms: 48231,
            }
        );
    }

    #[test]
    fn test_server_identity_finish_suppressed() {
        let result = from_callback(
            "TrackMania.PlayerFinish",
            vec![Value::Int(SERVER_PLAYER_UID), Value::from(""), Value::Int(0)],
        )
        .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_server_identity_checkpoint_suppressed() {
        let result = from_callback(
            "TrackMania.PlayerCheckpoint",
            vec![
                Value::Int(SERVER_PLAYER_UID),
                Value::from(""),
                Value::Int(1000),
                Value::Int(0),
                Value::Int(1),
            ],
        )
        .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_checkpoint_shape() {
        let event = from_callback(
            "ManiaPlanet.PlayerCheckpoint",
            vec![
                Value::Int(3),
                Value::from("rider"),
                Value::Int(15200),
                Value::Int(0),
                Value::Int(2),
            ],
        )
        .unwrap()
        .unwrap();

        assert_eq!(
            event,
            ServerEvent::PlayerCheckpoint {
                login: "rider".to_string(),
                time_ms: 15200,
                checkpoint: 2,
            }
        );
    }

    #[test]
    fn test_unrecognized_name_becomes_unknown() {
        let event = from_callback("ManiaPlanet.BillUpdated", vec![Value::Int(1)])
            .unwrap()
            .unwrap();

        assert_eq!(
            event,
            ServerEvent::Unknown {
                name: "BillUpdated".to_string(),
                args: vec![Value::Int(1)],
            }
        );
        assert_eq!(event.name(), "BillUpdated");
    }

    #[test]
    fn test_wrong_shape_becomes_unknown_not_error() {
        let event = from_callback("ManiaPlanet.PlayerConnect", vec![Value::Int(1)])
            .unwrap()
            .unwrap();
        assert!(matches!(event, ServerEvent::Unknown { .. }));
    }

    #[test]
    fn test_begin_map_carries_map_struct() {
        let mut members = std::collections::BTreeMap::new();
        members.insert("Name".to_string(), Value::from("A01-Race"));
        let map = Value::Struct(members);

        let event = from_callback("ManiaPlanet.BeginMap", vec![map.clone()])
            .unwrap()
            .unwrap();
        assert_eq!(event, ServerEvent::BeginMap { map });
    }
}
