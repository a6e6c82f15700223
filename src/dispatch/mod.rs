//! Event layer - callback normalization and fan-out.
//!
//! - [`ServerEvent`] - tagged union of known callback shapes
//! - [`from_callback`] - name/shape normalization for inbound callbacks
//! - [`EventDispatcher`] - name-keyed synchronous fan-out

mod dispatcher;
mod event;
mod scripted;

pub use dispatcher::{EventDispatcher, EventHandler};
pub use event::{from_callback, normalize_event_name, ServerEvent, SERVER_PLAYER_UID};
