//! XML-RPC codec - the payload dialect carried inside frames.
//!
//! - [`Value`] - tagged union over the dialect's value types
//! - [`encode_call`] - render a `<methodCall>` document
//! - [`decode_response`] - parse a call reply (`<params>` or `<fault>`)
//! - [`decode_call`] - parse a server-initiated callback

mod decode;
mod encode;
mod value;

pub use decode::{decode_call, decode_response, Response};
pub use encode::encode_call;
pub use value::Value;
