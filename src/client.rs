//! Client builder and connection lifecycle.
//!
//! [`GbxClientBuilder`] configures the session; `connect`/`handshake`
//! promote a raw stream into a ready client:
//! 1. Await the server banner (bounded by the handshake timeout)
//! 2. Spawn the writer task
//! 3. Spawn the read loop (frames → router or dispatcher)
//!
//! # Example
//!
//! ```ignore
//! use gbxrpc::{GbxClient, Value};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GbxClient::connect("127.0.0.1:5000").await?;
//!
//!     client
//!         .call("Authenticate", &[Value::from("SuperAdmin"), Value::from("pass")])
//!         .await?;
//!
//!     client.subscribe("PlayerFinish", |event| {
//!         println!("finish: {:?}", event);
//!     });
//!
//!     let reason = client.wait_for_shutdown().await;
//!     eprintln!("disconnected: {}", reason);
//!     Ok(())
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::compat::{translate_method, GameVersion};
use crate::dispatch::{from_callback, EventDispatcher, ServerEvent};
use crate::error::{GbxError, Result};
use crate::protocol::{Frame, FrameBuffer, HANDSHAKE_BANNER, HEADER_SIZE, MAX_FRAME_SIZE};
use crate::router::Router;
use crate::writer::{spawn_writer_task, OutboundFrame, WriterHandle};
use crate::xmlrpc::{decode_call, decode_response, encode_call, Response, Value};

/// Default handshake deadline.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Why the connection ended. Delivered once through
/// [`GbxClient::wait_for_shutdown`]; the owning application decides
/// whether to exit (current policy: it does, no automatic reconnect).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The server closed the connection.
    PeerClosed,
    /// I/O or protocol failure, with a diagnostic.
    Error(String),
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::PeerClosed => write!(f, "server closed the connection"),
            DisconnectReason::Error(detail) => write!(f, "{}", detail),
        }
    }
}

/// Builder for configuring and connecting a GBX Remote client.
pub struct GbxClientBuilder {
    game_version: GameVersion,
    handshake_timeout: Duration,
}

impl GbxClientBuilder {
    /// Create a builder with defaults (ManiaPlanet vocabulary, 5 s
    /// handshake timeout).
    pub fn new() -> Self {
        Self {
            game_version: GameVersion::default(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    /// Set the connected server's generation (drives method-name
    /// translation).
    pub fn game_version(mut self, version: GameVersion) -> Self {
        self.game_version = version;
        self
    }

    /// Set the handshake deadline.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Connect over TCP and perform the handshake.
    pub async fn connect<A: ToSocketAddrs>(self, addr: A) -> Result<GbxClient> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        self.handshake(stream).await
    }

    /// Perform the handshake on an already-connected stream.
    ///
    /// The server speaks first: an 11-byte banner behind a length
    /// prefix. Anything else, or silence past the deadline, rejects the
    /// connection and tears the stream down.
    pub async fn handshake<S>(self, stream: S) -> Result<GbxClient>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (mut reader, write_half) = tokio::io::split(stream);

        let mut frame_buffer = FrameBuffer::new();
        let (banner, early_frames) =
            tokio::time::timeout(self.handshake_timeout, read_banner(&mut reader, &mut frame_buffer))
                .await
                .map_err(|_| GbxError::HandshakeTimeout)??;

        if banner.payload() != HANDSHAKE_BANNER {
            return Err(GbxError::Protocol(format!(
                "unexpected banner {:?}",
                String::from_utf8_lossy(banner.payload())
            )));
        }
        tracing::debug!("handshake complete");

        let router = Arc::new(Router::new());
        let dispatcher = Arc::new(EventDispatcher::new());
        let (writer, writer_task) = spawn_writer_task(write_half);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let loop_router = router.clone();
        let loop_dispatcher = dispatcher.clone();
        let read_task = tokio::spawn(async move {
            let outcome = read_loop(
                reader,
                frame_buffer,
                early_frames,
                &loop_router,
                &loop_dispatcher,
            )
            .await;

            let reason = match outcome {
                Ok(()) => DisconnectReason::PeerClosed,
                Err(e) => {
                    tracing::error!("read loop error: {}", e);
                    DisconnectReason::Error(e.to_string())
                }
            };
            // Reject everything still in flight before announcing.
            loop_router.fail_all();
            let _ = shutdown_tx.send(reason);
        });

        Ok(GbxClient {
            game_version: self.game_version,
            router,
            dispatcher,
            writer,
            shutdown_rx,
            _read_task: read_task,
            _writer_task: writer_task,
        })
    }
}

impl Default for GbxClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Read until the banner frame completes. Frames completed by the same
/// chunk (the server may pipeline) are carried over to the read loop.
async fn read_banner<R: AsyncRead + Unpin>(
    reader: &mut R,
    frame_buffer: &mut FrameBuffer,
) -> Result<(Frame, Vec<Frame>)> {
    let mut buf = vec![0u8; 4096];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Err(GbxError::Protocol(
                "connection closed before banner".to_string(),
            ));
        }
        let mut frames = frame_buffer.push(&buf[..n])?;
        if !frames.is_empty() {
            let banner = frames.remove(0);
            return Ok((banner, frames));
        }
    }
}

/// Main read loop: reassemble frames and route each to the correlator
/// or the event dispatcher.
async fn read_loop<R: AsyncRead + Unpin>(
    mut reader: R,
    mut frame_buffer: FrameBuffer,
    early_frames: Vec<Frame>,
    router: &Router,
    dispatcher: &EventDispatcher,
) -> Result<()> {
    for frame in early_frames {
        process_frame(frame, router, dispatcher)?;
    }

    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => return Ok(()), // Connection closed
            Ok(n) => n,
            Err(e) => return Err(GbxError::Io(e)),
        };

        for frame in frame_buffer.push(&buf[..n])? {
            process_frame(frame, router, dispatcher)?;
        }
    }
}

/// Route one frame. Reply frames that fail to decode are fatal; a
/// malformed callback frame is logged and dropped.
fn process_frame(frame: Frame, router: &Router, dispatcher: &EventDispatcher) -> Result<()> {
    if frame.is_reply() {
        let result = match decode_response(frame.payload())? {
            Response::Success(value) => Ok(value),
            Response::Fault { code, message } => Err(GbxError::Fault { code, message }),
        };
        if !router.complete(frame.handle, result) {
            tracing::warn!(handle = frame.handle, "discarding reply for unknown handle");
        }
        return Ok(());
    }

    match decode_call(frame.payload()) {
        Ok((method, args)) => match from_callback(&method, args) {
            Ok(Some(event)) => {
                tracing::debug!(event = event.name(), "dispatching callback");
                dispatcher.dispatch(&event);
            }
            Ok(None) => {} // suppressed by normalization
            Err(e) => tracing::warn!("dropping malformed callback payload: {}", e),
        },
        Err(e) => tracing::warn!("dropping undecodable callback frame: {}", e),
    }
    Ok(())
}

/// One entry of a [`GbxClient::multicall`] batch.
#[derive(Debug, Clone)]
pub struct MethodCall {
    /// Canonical method name.
    pub method: String,
    /// Call arguments.
    pub args: Vec<Value>,
}

impl MethodCall {
    /// Create a multicall entry.
    pub fn new(method: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            args,
        }
    }
}

/// A ready GBX Remote session.
///
/// Cheap to share by reference; all operations take `&self`. Calls may
/// be issued concurrently from any number of tasks and are correlated
/// by handle, not submission order.
pub struct GbxClient {
    game_version: GameVersion,
    router: Arc<Router>,
    dispatcher: Arc<EventDispatcher>,
    writer: WriterHandle,
    shutdown_rx: oneshot::Receiver<DisconnectReason>,
    _read_task: JoinHandle<()>,
    _writer_task: JoinHandle<Result<()>>,
}

impl GbxClient {
    /// Create a client builder.
    pub fn builder() -> GbxClientBuilder {
        GbxClientBuilder::new()
    }

    /// Connect with default settings.
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        GbxClientBuilder::new().connect(addr).await
    }

    /// The server generation this session talks to.
    pub fn game_version(&self) -> GameVersion {
        self.game_version
    }

    /// Issue a synchronous call and await its reply.
    ///
    /// Suspends until the matching reply arrives or the connection
    /// dies; there is deliberately no per-call timeout. A server fault
    /// surfaces as [`GbxError::Fault`] to this caller only.
    pub async fn call(&self, method: &str, args: &[Value]) -> Result<Value> {
        let payload = self.encode(method, args)?;
        let (handle, reply) = self.router.register()?;
        tracing::debug!(method, handle, "call");
        if let Err(e) = self.writer.send(OutboundFrame::new(handle, payload)).await {
            // The request never reached the wire; free the handle now
            // instead of waiting for teardown.
            self.router.unregister(handle);
            return Err(e);
        }

        match reply.await {
            Ok(result) => result,
            // Router dropped without resolving: connection death race.
            Err(_) => Err(GbxError::ConnectionLost),
        }
    }

    /// Issue a one-way command; no reply is expected or awaited.
    pub async fn send(&self, method: &str, args: &[Value]) -> Result<()> {
        let payload = self.encode(method, args)?;
        let handle = self.router.next_handle();
        tracing::debug!(method, handle, "send");
        self.writer.send(OutboundFrame::new(handle, payload)).await
    }

    /// Batch several calls into one `system.multicall` round trip.
    ///
    /// The result list parallels `calls`: per-slot values or per-slot
    /// faults, in submission order.
    pub async fn multicall(&self, calls: &[MethodCall]) -> Result<Vec<Result<Value>>> {
        let entries: Vec<Value> = calls
            .iter()
            .map(|call| {
                let mut members = BTreeMap::new();
                members.insert(
                    "methodName".to_string(),
                    Value::String(
                        translate_method(&call.method, self.game_version).into_owned(),
                    ),
                );
                members.insert("params".to_string(), Value::Array(call.args.clone()));
                Value::Struct(members)
            })
            .collect();

        let reply = self
            .call("system.multicall", &[Value::Array(entries)])
            .await?;

        let slots = reply
            .as_array()
            .ok_or_else(|| GbxError::Protocol("multicall reply is not an array".to_string()))?;
        if slots.len() != calls.len() {
            return Err(GbxError::Protocol(format!(
                "multicall reply has {} slots for {} calls",
                slots.len(),
                calls.len()
            )));
        }

        Ok(slots.iter().map(unwrap_multicall_slot).collect())
    }

    /// Subscribe a handler to a normalized event name.
    pub fn subscribe<F>(&self, event_name: &str, handler: F)
    where
        F: Fn(&ServerEvent) + Send + Sync + 'static,
    {
        self.dispatcher.subscribe(event_name, handler);
    }

    /// Number of calls currently awaiting a reply.
    pub fn pending_calls(&self) -> usize {
        self.router.pending_count()
    }

    /// Wait until the connection ends and learn why.
    pub async fn wait_for_shutdown(self) -> DisconnectReason {
        self.shutdown_rx
            .await
            .unwrap_or(DisconnectReason::PeerClosed)
    }

    /// Encode a call, enforcing the frame ceiling before anything is
    /// handed to the writer.
    fn encode(&self, method: &str, args: &[Value]) -> Result<Bytes> {
        let method = translate_method(method, self.game_version);
        let doc = encode_call(&method, args);
        let size = HEADER_SIZE + doc.len();
        if size > MAX_FRAME_SIZE {
            return Err(GbxError::PayloadTooLarge { size });
        }
        Ok(Bytes::from(doc.into_bytes()))
    }
}

/// One multicall slot: a single-element array carries the value, a
/// struct carries that call's fault.
fn unwrap_multicall_slot(slot: &Value) -> Result<Value> {
    match slot {
        Value::Array(one) if one.len() == 1 => Ok(one[0].clone()),
        Value::Struct(members) => Err(GbxError::Fault {
            code: members
                .get("faultCode")
                .and_then(Value::as_i32)
                .unwrap_or(0),
            message: members
                .get("faultString")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
        }),
        _ => Err(GbxError::Protocol(
            "malformed multicall result slot".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncWriteExt};

    fn banner_bytes() -> Vec<u8> {
        let mut bytes = (HANDSHAKE_BANNER.len() as u32).to_le_bytes().to_vec();
        bytes.extend_from_slice(HANDSHAKE_BANNER);
        bytes
    }

    #[test]
    fn test_builder_defaults() {
        let builder = GbxClientBuilder::new();
        assert_eq!(builder.game_version, GameVersion::ManiaPlanet);
        assert_eq!(builder.handshake_timeout, DEFAULT_HANDSHAKE_TIMEOUT);
    }

    #[test]
    fn test_builder_configuration() {
        let builder = GbxClient::builder()
            .game_version(GameVersion::TmForever)
            .handshake_timeout(Duration::from_millis(250));

        assert_eq!(builder.game_version, GameVersion::TmForever);
        assert_eq!(builder.handshake_timeout, Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_handshake_accepts_banner() {
        let (client_io, mut server_io) = duplex(4096);

        let connect = GbxClient::builder().handshake(client_io);
        server_io.write_all(&banner_bytes()).await.unwrap();

        let client = connect.await.unwrap();
        assert_eq!(client.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_handshake_rejects_wrong_banner() {
        let (client_io, mut server_io) = duplex(4096);

        let connect = GbxClient::builder().handshake(client_io);
        let mut bad = 11u32.to_le_bytes().to_vec();
        bad.extend_from_slice(b"HTTP/1.1 40");
        server_io.write_all(&bad).await.unwrap();

        let result = connect.await;
        assert!(matches!(result, Err(GbxError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_handshake_times_out_without_banner() {
        let (client_io, _server_io) = duplex(4096);

        let result = GbxClient::builder()
            .handshake_timeout(Duration::from_millis(50))
            .handshake(client_io)
            .await;

        assert!(matches!(result, Err(GbxError::HandshakeTimeout)));
    }

    #[tokio::test]
    async fn test_handshake_fails_on_early_close() {
        let (client_io, server_io) = duplex(4096);
        drop(server_io);

        let result = GbxClient::builder()
            .handshake_timeout(Duration::from_millis(200))
            .handshake(client_io)
            .await;

        assert!(matches!(result, Err(GbxError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_oversized_call_fails_before_writing() {
        let (client_io, mut server_io) = duplex(1 << 16);

        let connect = GbxClient::builder().handshake(client_io);
        server_io.write_all(&banner_bytes()).await.unwrap();
        let client = connect.await.unwrap();

        let huge = "x".repeat(MAX_FRAME_SIZE);
        let result = client.call("ChatSendServerMessage", &[Value::from(huge)]).await;

        assert!(matches!(result, Err(GbxError::PayloadTooLarge { .. })));
        assert_eq!(client.pending_calls(), 0);

        // Nothing reached the wire.
        let mut probe = [0u8; 1];
        let pending_read = tokio::time::timeout(
            Duration::from_millis(50),
            tokio::io::AsyncReadExt::read(&mut server_io, &mut probe),
        )
        .await;
        assert!(pending_read.is_err(), "no bytes should have been written");
    }

    #[test]
    fn test_unwrap_multicall_slot_value() {
        let slot = Value::Array(vec![Value::Int(7)]);
        assert_eq!(unwrap_multicall_slot(&slot).unwrap(), Value::Int(7));
    }

    #[test]
    fn test_unwrap_multicall_slot_fault() {
        let mut members = BTreeMap::new();
        members.insert("faultCode".to_string(), Value::Int(-1000));
        members.insert("faultString".to_string(), Value::from("Login unknown."));
        let slot = Value::Struct(members);

        let err = unwrap_multicall_slot(&slot).unwrap_err();
        assert!(matches!(err, GbxError::Fault { code: -1000, .. }));
    }

    #[test]
    fn test_unwrap_multicall_slot_malformed() {
        assert!(unwrap_multicall_slot(&Value::Int(1)).is_err());
        assert!(unwrap_multicall_slot(&Value::Array(vec![])).is_err());
    }
}
