//! Dedicated writer task for outbound frames.
//!
//! Callers never touch the socket directly: encoded frames go through an
//! mpsc channel to a single writer task, so concurrent `call`/`send`
//! invocations cannot interleave partial writes.
//!
//! ```text
//! call()  ─┐
//! send()  ─┼─► mpsc::Sender<OutboundFrame> ─► writer task ─► socket
//! multicall┘
//! ```

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{GbxError, Result};
use crate::protocol::{Header, HEADER_SIZE};

/// Default channel capacity for the outbound queue.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// A frame ready to be written to the socket.
#[derive(Debug)]
pub struct OutboundFrame {
    /// Pre-encoded 8-byte header.
    pub header: [u8; HEADER_SIZE],
    /// XML-RPC document bytes.
    pub payload: Bytes,
}

impl OutboundFrame {
    /// Create an outbound frame for the given handle and payload.
    pub fn new(handle: u32, payload: Bytes) -> Self {
        let header = Header::new(payload.len() as u32, handle);
        Self {
            header: header.encode(),
            payload,
        }
    }

    /// Total size of this frame (header + payload).
    #[inline]
    pub fn size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Handle for sending frames to the writer task. Cheaply cloneable.
#[derive(Clone)]
pub struct WriterHandle {
    tx: mpsc::Sender<OutboundFrame>,
}

impl WriterHandle {
    /// Queue a frame for writing.
    ///
    /// Fails with [`GbxError::ConnectionLost`] once the writer task has
    /// stopped.
    pub async fn send(&self, frame: OutboundFrame) -> Result<()> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| GbxError::ConnectionLost)
    }
}

/// Spawn the writer task and return a handle for sending frames.
pub fn spawn_writer_task<W>(writer: W) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
    let task = tokio::spawn(writer_loop(rx, writer));
    (WriterHandle { tx }, task)
}

/// Writer loop: drain the queue, flush when it runs dry.
async fn writer_loop<W>(mut rx: mpsc::Receiver<OutboundFrame>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = rx.recv().await {
        writer.write_all(&frame.header).await?;
        if !frame.payload.is_empty() {
            writer.write_all(&frame.payload).await?;
        }

        // Keep writing while more frames are already queued; flush once
        // the burst is over.
        while let Ok(next) = rx.try_recv() {
            writer.write_all(&next.header).await?;
            if !next.payload.is_empty() {
                writer.write_all(&next.payload).await?;
            }
        }
        writer.flush().await?;
    }
    // Channel closed: clean shutdown.
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::duplex;

    #[test]
    fn test_outbound_frame_layout() {
        let frame = OutboundFrame::new(0x8000_0001, Bytes::from_static(b"<xml/>"));

        assert_eq!(frame.size(), HEADER_SIZE + 6);
        let header = Header::decode(&frame.header).unwrap();
        assert_eq!(header.length, 6);
        assert_eq!(header.handle, 0x8000_0001);
    }

    #[tokio::test]
    async fn test_writer_writes_header_then_payload() {
        let (client, mut server) = duplex(4096);
        let (handle, _task) = spawn_writer_task(client);

        let frame = OutboundFrame::new(0x8000_0042, Bytes::from_static(b"hello"));
        handle.send(frame).await.unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;

        let mut buf = vec![0u8; 64];
        let n = tokio::io::AsyncReadExt::read(&mut server, &mut buf)
            .await
            .unwrap();

        assert_eq!(n, HEADER_SIZE + 5);
        let header = Header::decode(&buf[..HEADER_SIZE]).unwrap();
        assert_eq!(header.handle, 0x8000_0042);
        assert_eq!(&buf[HEADER_SIZE..n], b"hello");
    }

    #[tokio::test]
    async fn test_writer_preserves_frame_order() {
        let (client, mut server) = duplex(8192);
        let (handle, _task) = spawn_writer_task(client);

        for i in 0..10u32 {
            let payload = Bytes::copy_from_slice(format!("frame-{}", i).as_bytes());
            handle
                .send(OutboundFrame::new(0x8000_0000 + i, payload))
                .await
                .unwrap();
        }

        tokio::time::sleep(Duration::from_millis(20)).await;

        let mut parser = crate::protocol::FrameBuffer::established();
        let mut buf = vec![0u8; 8192];
        let n = tokio::io::AsyncReadExt::read(&mut server, &mut buf)
            .await
            .unwrap();
        let frames = parser.push(&buf[..n]).unwrap();

        assert_eq!(frames.len(), 10);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.handle, 0x8000_0000 + i as u32);
        }
    }

    #[tokio::test]
    async fn test_writer_shutdown_on_channel_close() {
        let (client, _server) = duplex(4096);
        let (handle, task) = spawn_writer_task(client);

        drop(handle);

        let result = task.await.unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_send_after_peer_close_is_connection_lost() {
        let (client, server) = duplex(4096);
        let (handle, task) = spawn_writer_task(client);

        // Peer gone: the next write errors and the task exits.
        drop(server);
        handle
            .send(OutboundFrame::new(0x8000_0001, Bytes::from_static(b"x")))
            .await
            .unwrap();
        assert!(task.await.unwrap().is_err());

        let result = handle
            .send(OutboundFrame::new(0x8000_0002, Bytes::new()))
            .await;
        assert!(matches!(result, Err(GbxError::ConnectionLost)));
    }
}
