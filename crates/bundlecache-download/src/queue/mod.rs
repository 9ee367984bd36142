//! Task scheduler state machine.
//!
//! A pure synchronous FIFO of Load and Remove tasks. No I/O, no async; the
//! owner (`BundleCache`) holds it behind its state lock and drives it.
//!
//! # Rules
//!
//! - At most one live task per `(bundle, kind)`; `enqueue` dedupes
//! - Cancellation flags the task and fires its token; the task is stripped
//!   on the next drain pass, wherever it sits in the list
//! - A failed retryable task stays in place, skipped until `rearm_retries`
//! - Tasks run one at a time, in insertion order

mod types;

use std::collections::VecDeque;

pub use types::{TaskId, TaskKind, TaskOutcome, TaskRun, TaskState, TaskSummary};

use types::Task;

use bundlecache_core::Bundle;

/// FIFO task queue.
#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: VecDeque<Task>,
    next_id: u64,
}

impl TaskQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks in the list, including canceled ones not yet stripped.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Whether a live task exists for this bundle and kind.
    pub fn has_live(&self, bundle_name: &str, kind: TaskKind) -> bool {
        self.tasks
            .iter()
            .any(|t| t.is_live() && t.kind == kind && t.bundle_name == bundle_name)
    }

    /// Append a task unless a live one already exists for `(bundle, kind)`.
    ///
    /// `snapshot` carries the removed bundle for Remove tasks.
    pub fn enqueue(
        &mut self,
        bundle_name: &str,
        kind: TaskKind,
        snapshot: Option<Bundle>,
    ) -> Option<TaskId> {
        if self.has_live(bundle_name, kind) {
            return None;
        }
        self.next_id += 1;
        let id = TaskId::new(self.next_id);
        self.tasks
            .push_back(Task::new(id, bundle_name, kind, snapshot));
        Some(id)
    }

    /// Cancel the live task for `(bundle, kind)`, if any.
    ///
    /// Fires the task's token so an in-flight run stops. Returns whether a
    /// task was canceled.
    pub fn cancel(&mut self, bundle_name: &str, kind: TaskKind) -> bool {
        let Some(task) = self
            .tasks
            .iter_mut()
            .find(|t| t.is_live() && t.kind == kind && t.bundle_name == bundle_name)
        else {
            return false;
        };
        task.canceled = true;
        task.cancel.cancel();
        true
    }

    /// Cancel every live task. Used at shutdown.
    pub fn cancel_all(&mut self) -> usize {
        let mut count = 0;
        for task in self.tasks.iter_mut().filter(|t| t.is_live()) {
            task.canceled = true;
            task.cancel.cancel();
            count += 1;
        }
        count
    }

    /// Remove every canceled task. Returns how many were removed.
    pub fn strip_canceled(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| !t.canceled);
        before - self.tasks.len()
    }

    /// First task that is neither canceled nor waiting for a retry.
    pub fn next_runnable(&self) -> Option<TaskRun> {
        self.tasks
            .iter()
            .find(|t| t.is_runnable())
            .map(Task::to_run)
    }

    /// Record how a run ended.
    ///
    /// Outcomes for unknown or canceled tasks are ignored; a canceled task is
    /// stripped on the next pass regardless of how its run ended.
    pub fn complete(&mut self, id: TaskId, outcome: TaskOutcome) {
        let Some(index) = self.tasks.iter().position(|t| t.id == id) else {
            return;
        };
        if self.tasks[index].canceled {
            return;
        }
        match outcome {
            TaskOutcome::Succeeded | TaskOutcome::Failed { retry: false, .. } => {
                self.tasks.remove(index);
            }
            TaskOutcome::Failed { error, retry: true } => {
                let task = &mut self.tasks[index];
                task.failed = true;
                task.retry = true;
                task.last_error = Some(error);
                task.failures += 1;
            }
            TaskOutcome::Cancelled => {
                self.tasks[index].canceled = true;
            }
        }
    }

    /// Make every failed retryable task runnable again.
    ///
    /// Returns the number of tasks re-armed.
    pub fn rearm_retries(&mut self) -> usize {
        let mut count = 0;
        for task in self
            .tasks
            .iter_mut()
            .filter(|t| t.failed && t.retry && !t.canceled)
        {
            task.failed = false;
            task.retry = false;
            count += 1;
        }
        count
    }

    /// Number of tasks waiting for a retry pass.
    pub fn awaiting_retry(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.state() == TaskState::AwaitingRetry)
            .count()
    }

    /// Read-only view of the list, in order.
    pub fn snapshot(&self) -> Vec<TaskSummary> {
        self.tasks.iter().map(Task::to_summary).collect()
    }
}
