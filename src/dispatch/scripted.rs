//! Scripted-event envelope demultiplexing.
//!
//! Script-mode servers funnel their callbacks through one generic
//! envelope (`ModeScriptCallbackArray`): the first argument is the real
//! event name, the second an array of JSON documents. This module
//! parses the JSON and rewrites the well-known racing sub-events onto
//! the same [`ServerEvent`] variants the legacy callbacks use, so
//! subscribers see one vocabulary regardless of server mode.

use serde::Deserialize;

use crate::error::{GbxError, Result};
use crate::xmlrpc::Value;

use super::event::ServerEvent;

/// `Trackmania.Event.WayPoint` payload (fields we act on).
#[derive(Debug, Deserialize)]
struct WaypointData {
    login: String,
    #[serde(default)]
    racetime: i32,
    #[serde(default)]
    checkpointinrace: i32,
    #[serde(default)]
    isendrace: bool,
}

/// `Trackmania.Event.GiveUp` payload.
#[derive(Debug, Deserialize)]
struct GiveUpData {
    login: String,
}

/// Demultiplex one scripted envelope into a normalized event.
///
/// Returns `Err` when the envelope shape or its JSON payload is
/// malformed; the caller logs and drops the frame.
pub fn demux(envelope: &[Value]) -> Result<Option<ServerEvent>> {
    let name = envelope
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| GbxError::Protocol("scripted envelope without event name".to_string()))?;

    let documents = collect_documents(envelope.get(1));

    let event = match name {
        "Trackmania.Event.WayPoint" => {
            let data: WaypointData = serde_json::from_str(primary(&documents)?)?;
            if data.isendrace {
                ServerEvent::PlayerFinish {
                    login: data.login,
                    time_ms: data.racetime,
                }
            } else {
                ServerEvent::PlayerCheckpoint {
                    login: data.login,
                    time_ms: data.racetime,
                    checkpoint: data.checkpointinrace,
                }
            }
        }
        "Trackmania.Event.GiveUp" => {
            let data: GiveUpData = serde_json::from_str(primary(&documents)?)?;
            ServerEvent::PlayerGiveUp { login: data.login }
        }
        other => {
            // No dedicated variant: parse and pass the JSON through.
            let payload = match documents.as_slice() {
                [] => serde_json::Value::Null,
                [doc] => serde_json::from_str(doc)?,
                many => serde_json::Value::Array(
                    many.iter()
                        .map(|doc| serde_json::from_str(doc))
                        .collect::<std::result::Result<_, _>>()?,
                ),
            };
            ServerEvent::Scripted {
                name: other.to_string(),
                payload,
            }
        }
    };

    Ok(Some(event))
}

/// The envelope's second argument: an array of JSON strings, or (older
/// single-document form) one bare string.
fn collect_documents(arg: Option<&Value>) -> Vec<&str> {
    match arg {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        Some(Value::String(s)) => vec![s.as_str()],
        _ => Vec::new(),
    }
}

fn primary<'a>(documents: &[&'a str]) -> Result<&'a str> {
    documents
        .first()
        .copied()
        .ok_or_else(|| GbxError::Protocol("scripted envelope without payload".to_string()))
}
