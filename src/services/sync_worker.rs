//! Background task that drains mirror deltas off the request path.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::services::mirror_sync::{MirrorSync, SyncOp};

enum Message {
    Op(SyncOp),
    Stop,
}

/// Cloneable submission side of a sync worker.
#[derive(Clone)]
pub struct SyncSender {
    tx: mpsc::UnboundedSender<Message>,
}

impl SyncSender {
    /// Queues an op. Returns `false` if the worker has stopped.
    pub fn submit(&self, op: SyncOp) -> bool {
        self.tx.send(Message::Op(op)).is_ok()
    }
}

/// Handle to a running sync worker.
pub struct SyncHandle {
    sender: SyncSender,
    task: JoinHandle<usize>,
}

impl SyncHandle {
    /// Spawns the worker on the current tokio runtime.
    ///
    /// Ops are applied one at a time, in submission order, on the blocking
    /// pool because the mirror API is synchronous.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime context.
    pub fn spawn(sync: Arc<MirrorSync>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
        let task = tokio::spawn(async move {
            let mut applied = 0usize;
            loop {
                match rx.recv().await {
                    Some(Message::Op(op)) => {
                        let sync = sync.clone();
                        match tokio::task::spawn_blocking(move || sync.apply(op)).await {
                            Ok(()) => applied += 1,
                            Err(e) => tracing::warn!(error = %e, "search mirror sync task failed"),
                        }
                    }
                    // Closing keeps already-queued ops receivable.
                    Some(Message::Stop) => rx.close(),
                    None => break,
                }
            }
            tracing::debug!(applied, "search mirror sync worker stopped");
            applied
        });
        Self {
            sender: SyncSender { tx },
            task,
        }
    }

    pub fn sender(&self) -> SyncSender {
        self.sender.clone()
    }

    pub fn submit(&self, op: SyncOp) -> bool {
        self.sender.submit(op)
    }

    /// Applies everything queued so far, stops the worker, and returns how
    /// many ops it applied in total. Ops accepted before the worker saw the
    /// stop are still applied; submissions after that return `false`.
    pub async fn shutdown(self) -> usize {
        let _ = self.sender.tx.send(Message::Stop);
        match self.task.await {
            Ok(applied) => applied,
            Err(e) => {
                tracing::warn!(error = %e, "search mirror sync worker panicked");
                0
            }
        }
    }
}
