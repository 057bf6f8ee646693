//! Dedicated task draining the reliable pipe.
//!
//! ```text
//! ReliableIssuer ─► PipeWriter ─► PipeReader ─► worker task ─► ReliableBackend
//! ```
//!
//! The task pops one record at a time and dispatches it synchronously, so a
//! cancelled task never stops half-way through a command. It finishes when
//! every writer is gone and the pipe is empty, handing the backend back.

use tokio::task::JoinHandle;

use crate::config::ShutdownPolicy;
use crate::error::Result;
use crate::reliable::{dispatch_reliable, ReliableBackend};
use crate::transport::PipeReader;

/// Handle to a running reliable worker task.
#[derive(Debug)]
pub struct ReliableWorker<B> {
    task: JoinHandle<Result<B>>,
    policy: ShutdownPolicy,
}

/// Spawn a task that feeds every record from `reader` into `backend`.
///
/// Must be called from within a tokio runtime.
pub fn spawn_reliable_worker<B>(
    reader: PipeReader,
    backend: B,
    policy: ShutdownPolicy,
) -> ReliableWorker<B>
where
    B: ReliableBackend + Send + 'static,
{
    let task = tokio::spawn(worker_loop(reader, backend));
    ReliableWorker { task, policy }
}

async fn worker_loop<B: ReliableBackend>(mut reader: PipeReader, mut backend: B) -> Result<B> {
    tracing::debug!("Reliable worker started");
    let mut handled = 0usize;

    while let Some(record) = reader.recv().await {
        if let Err(e) = dispatch_reliable(&record, &mut backend) {
            tracing::warn!("Reliable worker stopping after {} commands: {}", handled, e);
            return Err(e);
        }
        handled += 1;
    }

    tracing::debug!("Reliable pipe closed, worker exiting after {} commands", handled);
    Ok(backend)
}

impl<B> ReliableWorker<B> {
    /// Wait for the pipe to close and the task to finish.
    ///
    /// Returns the backend, or the error that stopped the task.
    pub async fn join(self) -> Result<B> {
        self.task.await?
    }

    #[inline]
    pub fn policy(&self) -> ShutdownPolicy {
        self.policy
    }

    /// Whether the task has already finished.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop tracking the worker according to its [`ShutdownPolicy`].
    ///
    /// `Leak` detaches the task, which keeps draining until the pipe closes.
    /// `Cancel` aborts it before its next record.
    pub fn shutdown(self) {
        match self.policy {
            ShutdownPolicy::Leak => {
                tracing::debug!("Detaching reliable worker");
                drop(self.task);
            }
            ShutdownPolicy::Cancel => {
                tracing::debug!("Cancelling reliable worker");
                self.task.abort();
            }
        }
    }
}
