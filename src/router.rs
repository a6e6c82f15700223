//! Request/reply correlation.
//!
//! Outbound calls register a [`tokio::sync::oneshot`] sender keyed by
//! their handle; the read loop completes the matching entry when the
//! reply frame arrives. Replies may arrive in any order. Connection
//! death fails every outstanding entry at once.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::oneshot;

use crate::error::{GbxError, Result};
use crate::protocol::{CLIENT_HANDLE_FLOOR, HANDLE_WRAP_CEILING};
use crate::xmlrpc::Value;

/// Receiving side of one pending call.
pub type ReplyReceiver = oneshot::Receiver<Result<Value>>;

struct Inner {
    /// Pending calls keyed by handle. At most one entry per handle.
    pending: HashMap<u32, oneshot::Sender<Result<Value>>>,
    /// Next handle to hand out.
    next_handle: u32,
    /// Set once the connection has died; later registrations fail fast.
    dead: bool,
}

/// Correlates outbound handles with inbound reply frames.
pub struct Router {
    inner: Mutex<Inner>,
}

impl Router {
    /// Create a router with the handle counter at the client floor.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                pending: HashMap::new(),
                next_handle: CLIENT_HANDLE_FLOOR,
                dead: false,
            }),
        }
    }

    /// Allocate the next handle without registering anything.
    ///
    /// Used by one-way sends: the handle still comes from the client
    /// range so a reply, should one arrive anyway, is recognizable and
    /// discarded.
    pub fn next_handle(&self) -> u32 {
        let mut inner = self.inner.lock().expect("router lock");
        Self::advance(&mut inner)
    }

    /// Allocate a handle and register a pending call on it.
    ///
    /// Returns `Err(ConnectionLost)` if the connection already died.
    pub fn register(&self) -> Result<(u32, ReplyReceiver)> {
        let mut inner = self.inner.lock().expect("router lock");
        if inner.dead {
            return Err(GbxError::ConnectionLost);
        }

        let handle = Self::advance(&mut inner);
        let (tx, rx) = oneshot::channel();
        inner.pending.insert(handle, tx);
        Ok((handle, rx))
    }

    fn advance(inner: &mut Inner) -> u32 {
        loop {
            let handle = inner.next_handle;
            inner.next_handle += 1;
            if inner.next_handle >= HANDLE_WRAP_CEILING {
                inner.next_handle = CLIENT_HANDLE_FLOOR;
            }
            // A handle still pending after a full wrap cannot be reused.
            if !inner.pending.contains_key(&handle) {
                return handle;
            }
        }
    }

    /// Drop the pending entry for `handle`, freeing it for reuse.
    ///
    /// Used when a registered request never reaches the wire.
    pub fn unregister(&self, handle: u32) {
        let mut inner = self.inner.lock().expect("router lock");
        inner.pending.remove(&handle);
    }

    /// Complete the pending call registered on `handle`.
    ///
    /// Returns false when no call is pending on that handle; the caller
    /// discards the reply.
    pub fn complete(&self, handle: u32, result: Result<Value>) -> bool {
        let sender = {
            let mut inner = self.inner.lock().expect("router lock");
            inner.pending.remove(&handle)
        };
        match sender {
            // An abandoned receiver (caller dropped its future) is fine.
            Some(tx) => {
                let _ = tx.send(result);
                true
            }
            None => false,
        }
    }

    /// Reject every pending call with [`GbxError::ConnectionLost`] and
    /// refuse new registrations.
    pub fn fail_all(&self) {
        let drained: Vec<_> = {
            let mut inner = self.inner.lock().expect("router lock");
            inner.dead = true;
            inner.pending.drain().collect()
        };
        for (_, tx) in drained {
            let _ = tx.send(Err(GbxError::ConnectionLost));
        }
    }

    /// Number of calls currently awaiting a reply.
    pub fn pending_count(&self) -> usize {
        self.inner.lock().expect("router lock").pending.len()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
