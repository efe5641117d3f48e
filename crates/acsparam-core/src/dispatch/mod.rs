// ── Task dispatch ──
//
// The view never talks to the ACS. It hands `Task` values to a
// `TaskQueue` handle, which is a fire-and-forget channel sender. A
// background dispatcher owns the receiving end and delivers each task, in
// submission order, to a `TaskSink`.

mod nbi;
mod staged;

use std::future::Future;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::task::Task;

pub use nbi::NbiSink;
pub use staged::{StagedSink, StagedTask};

/// How a sink disposed of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// The ACS ran the task against the device.
    Completed,
    /// The ACS accepted the task for the device's next session.
    Queued,
    /// Held locally; nothing was sent.
    Staged,
}

/// Result of delivering one task, reported back to interested consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Delivered { task: Task, status: DeliveryStatus },
    Failed { task: Task, error: String },
}

impl TaskOutcome {
    pub fn task(&self) -> &Task {
        match self {
            Self::Delivered { task, .. } | Self::Failed { task, .. } => task,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Destination for dispatched tasks.
pub trait TaskSink: Send + Sync + 'static {
    fn deliver(&self, task: &Task) -> impl Future<Output = Result<DeliveryStatus, CoreError>> + Send;
}

// ── TaskQueue ───────────────────────────────────────────────────────

/// Cheap, cloneable submission handle.
#[derive(Debug, Clone)]
pub struct TaskQueue {
    tx: mpsc::UnboundedSender<Task>,
}

impl TaskQueue {
    /// A queue plus the receiving end, for callers that run their own
    /// delivery loop.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Task>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Enqueue `task` and return immediately. Never blocks, never reports
    /// the outcome.
    pub fn queue_task(&self, task: Task) {
        debug!(task = task.name(), device = task.device(), "task queued");
        if let Err(mpsc::error::SendError(task)) = self.tx.send(task) {
            warn!(task = task.name(), object = %task.target(), "dispatcher stopped, task dropped");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// ── TaskDispatcher ──────────────────────────────────────────────────

/// Owns delivery of queued tasks to a sink.
pub struct TaskDispatcher;

impl TaskDispatcher {
    /// Spawn the delivery loop and return a submission handle.
    ///
    /// Outcomes go to `outcomes` when provided. The loop exits when
    /// `cancel` fires or every `TaskQueue` clone has been dropped.
    pub fn spawn<S: TaskSink>(
        sink: S,
        outcomes: Option<mpsc::UnboundedSender<TaskOutcome>>,
        cancel: CancellationToken,
    ) -> (TaskQueue, JoinHandle<()>) {
        let (queue, rx) = TaskQueue::channel();
        let handle = tokio::spawn(Self::run(sink, rx, outcomes, cancel));
        (queue, handle)
    }

    /// Deliver tasks from `rx` one at a time until cancelled or closed.
    pub async fn run<S: TaskSink>(
        sink: S,
        mut rx: mpsc::UnboundedReceiver<Task>,
        outcomes: Option<mpsc::UnboundedSender<TaskOutcome>>,
        cancel: CancellationToken,
    ) {
        loop {
            let task = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                next = rx.recv() => match next {
                    Some(task) => task,
                    None => break,
                },
            };

            let outcome = match sink.deliver(&task).await {
                Ok(status) => {
                    info!(
                        task = task.name(),
                        device = task.device(),
                        object = %task.target(),
                        ?status,
                        "task delivered"
                    );
                    TaskOutcome::Delivered { task, status }
                }
                Err(e) => {
                    warn!(
                        task = task.name(),
                        device = task.device(),
                        error = %e,
                        "task delivery failed"
                    );
                    TaskOutcome::Failed {
                        task,
                        error: e.to_string(),
                    }
                }
            };

            if let Some(ref tx) = outcomes {
                let _ = tx.send(outcome);
            }
        }

        debug!("task dispatcher stopped");
    }
}
