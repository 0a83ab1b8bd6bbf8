//! Single-worker action queue.
//!
//! Actions run strictly one at a time: the worker finishes every sub-task
//! of an action, including all session I/O, before it takes the next one.
//! The worker owns the execution context, so nothing else mutates it.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use recorder_core::{ExecutionContext, SemanticAction};

use crate::error::{OrchestratorError, Result};
use crate::executor::{Executor, ExecutorOutput};

pub struct ActionQueue {
    sender: mpsc::UnboundedSender<SemanticAction>,
    worker: JoinHandle<ExecutorOutput>,
}

impl ActionQueue {
    pub fn spawn(executor: Executor) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<SemanticAction>();

        let worker = tokio::spawn(async move {
            let mut executor = executor;
            let mut context = ExecutionContext::new();
            let mut dispatched = 0usize;

            while let Some(action) = receiver.recv().await {
                executor.execute(&mut context, action).await;
                dispatched += 1;
            }

            debug!(dispatched, "Action queue drained");
            executor.finish()
        });

        Self { sender, worker }
    }

    pub fn push(&self, action: SemanticAction) -> Result<()> {
        self.sender
            .send(action)
            .map_err(|_| OrchestratorError::Worker("action queue is closed".to_string()))
    }

    /// Stop accepting actions and wait for the queued ones to finish.
    pub async fn drain(self) -> Result<ExecutorOutput> {
        drop(self.sender);
        self.worker
            .await
            .map_err(|e| OrchestratorError::Worker(e.to_string()))
    }
}
