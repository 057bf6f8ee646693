//! In-process ordered command pipe.
//!
//! ```text
//! game thread ─┐
//!              ├─► PipeWriter ─► unbounded mpsc ─► PipeReader ─► ReliableBackend
//! loader task ─┘
//! ```
//!
//! Writes never block and never drop. The reader drains either
//! synchronously from the render thread ([`PipeReader::read_cmds`]) or from
//! an async task ([`PipeReader::recv`]).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use crate::error::{CmdQueueError, Result};

/// Ordered, thread-safe sink for complete command records.
///
/// Each call is one atomic push; records from one writer arrive in the
/// order they were written.
pub trait CommandPipe: Send + Sync {
    fn write_cmd(&self, record: Bytes) -> Result<()>;
}

/// Create a connected writer/reader pair.
pub fn buf_pipe() -> (PipeWriter, PipeReader) {
    let (tx, rx) = mpsc::unbounded_channel();
    let pending = Arc::new(AtomicUsize::new(0));
    (
        PipeWriter {
            tx,
            pending: pending.clone(),
        },
        PipeReader { rx, pending },
    )
}

/// Writing end of a [`buf_pipe`]. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PipeWriter {
    tx: mpsc::UnboundedSender<Bytes>,
    pending: Arc<AtomicUsize>,
}

impl PipeWriter {
    /// Records written but not yet read.
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Whether the reader has been dropped.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl CommandPipe for PipeWriter {
    fn write_cmd(&self, record: Bytes) -> Result<()> {
        // Count before sending so the reader never sees a negative balance.
        self.pending.fetch_add(1, Ordering::AcqRel);
        self.tx.send(record).map_err(|_| {
            self.pending.fetch_sub(1, Ordering::Release);
            CmdQueueError::PipeClosed
        })
    }
}

/// Reading end of a [`buf_pipe`].
#[derive(Debug)]
pub struct PipeReader {
    rx: mpsc::UnboundedReceiver<Bytes>,
    pending: Arc<AtomicUsize>,
}

impl PipeReader {
    /// Hand every record already in the pipe to `handler`, in order.
    ///
    /// Returns the number of records handled. Never waits for new records.
    /// A handler error stops the drain and is returned; the failing record
    /// is consumed.
    pub fn read_cmds<F>(&mut self, mut handler: F) -> Result<usize>
    where
        F: FnMut(&[u8]) -> Result<()>,
    {
        let mut count = 0;
        loop {
            match self.rx.try_recv() {
                Ok(record) => {
                    self.pending.fetch_sub(1, Ordering::Release);
                    count += 1;
                    handler(&record)?;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return Ok(count),
            }
        }
    }

    /// Wait for the next record. `None` once every writer is gone and the
    /// pipe is empty.
    pub async fn recv(&mut self) -> Option<Bytes> {
        let record = self.rx.recv().await?;
        self.pending.fetch_sub(1, Ordering::Release);
        Some(record)
    }

    /// Records written but not yet read.
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }
}
