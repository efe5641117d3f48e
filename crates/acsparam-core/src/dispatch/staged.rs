// Local sink: keeps tasks in memory instead of sending them anywhere.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use super::{DeliveryStatus, TaskSink};
use crate::error::CoreError;
use crate::task::Task;

/// A task held by [`StagedSink`], with the time it arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedTask {
    pub task: Task,
    pub staged_at: DateTime<Utc>,
}

/// Records every task it receives. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct StagedSink {
    staged: Arc<Mutex<Vec<StagedTask>>>,
}

impl StagedSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of staged tasks in arrival order.
    pub fn tasks(&self) -> Vec<StagedTask> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove and return everything staged so far.
    pub fn drain(&self) -> Vec<StagedTask> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<StagedTask>> {
        self.staged
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl TaskSink for StagedSink {
    async fn deliver(&self, task: &Task) -> Result<DeliveryStatus, CoreError> {
        self.lock().push(StagedTask {
            task: task.clone(),
            staged_at: Utc::now(),
        });
        Ok(DeliveryStatus::Staged)
    }
}
