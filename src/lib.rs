//! # gbxrpc
//!
//! Persistent client for the GBX Remote protocol: the binary-framed
//! XML-RPC dialect racing-game dedicated servers speak. One TCP
//! connection multiplexes synchronous calls, one-way commands, batched
//! multicalls and server-initiated callbacks.
//!
//! ## Architecture
//!
//! - **protocol**: length-prefixed framing (LE length + LE handle),
//!   stream reassembly tolerant of partial and multi-frame reads
//! - **xmlrpc**: the XML-RPC payload dialect carried inside frames
//! - **router**: handle allocation and reply correlation
//! - **dispatch**: callback normalization and subscriber fan-out
//! - **compat**: method vocabulary translation between server
//!   generations
//!
//! ## Example
//!
//! ```ignore
//! use gbxrpc::{GbxClient, Value};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = GbxClient::connect("127.0.0.1:5000").await.unwrap();
//!     client
//!         .call("Authenticate", &[Value::from("SuperAdmin"), Value::from("pass")])
//!         .await
//!         .unwrap();
//!     client.subscribe("PlayerChat", |event| println!("{:?}", event));
//!     client.wait_for_shutdown().await;
//! }
//! ```

pub mod compat;
pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod xmlrpc;

mod client;
mod router;
mod writer;

pub use client::{DisconnectReason, GbxClient, GbxClientBuilder, MethodCall};
pub use compat::GameVersion;
pub use dispatch::ServerEvent;
pub use error::{GbxError, Result};
pub use xmlrpc::Value;
