//! Task types for the scheduler state machine.

use std::fmt;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use bundlecache_core::Bundle;

/// Identifier of a scheduled task, unique for the scheduler's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// What a task does to its bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Make every file of the bundle available locally.
    Load,
    /// Delete the bundle's files that no other bundle references.
    Remove,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load => f.write_str("load"),
            Self::Remove => f.write_str("remove"),
        }
    }
}

/// Observable state of a queued task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Waiting to run (or running).
    Pending,
    /// Failed, waiting for the next retry pass.
    AwaitingRetry,
    /// Canceled, waiting to be stripped.
    Canceled,
}

/// Read-only view of a queued task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    /// Task identifier.
    pub id: TaskId,
    /// Bundle the task acts on.
    pub bundle_name: String,
    /// Task kind.
    pub kind: TaskKind,
    /// Current state.
    pub state: TaskState,
    /// Message of the last failure, if any.
    pub last_error: Option<String>,
}

/// How a task run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The task did its work and leaves the queue.
    Succeeded,
    /// The task failed; it stays queued for retry when `retry` is set.
    Failed {
        /// User-facing failure message.
        error: String,
        /// Whether a later attempt could succeed.
        retry: bool,
    },
    /// The task observed its cancellation token.
    Cancelled,
}

/// Everything the orchestrator needs to run one task.
///
/// A value type detached from the queue, so the queue lock is not held while
/// the task runs.
#[derive(Debug, Clone)]
pub struct TaskRun {
    /// Task identifier.
    pub id: TaskId,
    /// Bundle the task acts on.
    pub bundle_name: String,
    /// Task kind.
    pub kind: TaskKind,
    /// Bundle as it was when a Remove task was created.
    pub snapshot: Option<Bundle>,
    /// Fires when the task is canceled.
    pub cancel: CancellationToken,
    /// Retryable failures recorded before this run.
    pub failures: u32,
}

/// A task as stored in the queue.
#[derive(Debug, Clone)]
pub(crate) struct Task {
    pub id: TaskId,
    pub bundle_name: String,
    pub kind: TaskKind,
    pub snapshot: Option<Bundle>,
    pub canceled: bool,
    pub failed: bool,
    pub retry: bool,
    pub last_error: Option<String>,
    pub failures: u32,
    pub cancel: CancellationToken,
}

impl Task {
    pub fn new(id: TaskId, bundle_name: &str, kind: TaskKind, snapshot: Option<Bundle>) -> Self {
        Self {
            id,
            bundle_name: bundle_name.to_string(),
            kind,
            snapshot,
            canceled: false,
            failed: false,
            retry: false,
            last_error: None,
            failures: 0,
            cancel: CancellationToken::new(),
        }
    }

    /// A live task can still run now or on a later retry pass.
    pub const fn is_live(&self) -> bool {
        !self.canceled
    }

    pub const fn is_runnable(&self) -> bool {
        !self.canceled && !self.failed
    }

    pub const fn state(&self) -> TaskState {
        if self.canceled {
            TaskState::Canceled
        } else if self.failed {
            TaskState::AwaitingRetry
        } else {
            TaskState::Pending
        }
    }

    pub fn to_run(&self) -> TaskRun {
        TaskRun {
            id: self.id,
            bundle_name: self.bundle_name.clone(),
            kind: self.kind,
            snapshot: self.snapshot.clone(),
            cancel: self.cancel.clone(),
            failures: self.failures,
        }
    }

    pub fn to_summary(&self) -> TaskSummary {
        TaskSummary {
            id: self.id,
            bundle_name: self.bundle_name.clone(),
            kind: self.kind,
            state: self.state(),
            last_error: self.last_error.clone(),
        }
    }
}
