//! Queue abstraction and introspection types.

use async_trait::async_trait;
use ingot_core::{AgentId, Result, Task, TaskStatus};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Predicate a polling worker supplies to restrict which tasks it accepts.
pub type FilterFn = Box<dyn Fn(&Task) -> bool + Send + Sync>;

/// The dispatch queue between pipeline producers and agent workers.
///
/// Implementations serialise every operation against one internal lock;
/// only `poll` and `wait` block after releasing it. All operations taking
/// a [`CancellationToken`] return [`ingot_core::Error::Cancelled`] promptly
/// once the token fires.
#[async_trait]
pub trait Queue: Send + Sync {
    /// Append a task to the tail of the pending list. Never fails.
    async fn push(&self, task: Task);

    /// Append a batch to the tail of the pending list, preserving the
    /// batch's relative order. Never fails.
    async fn push_at_once(&self, tasks: Vec<Task>);

    /// Subscribe a worker for `agent_id` and block until a matching task is
    /// handed to it, the caller cancels, or the worker is kicked.
    async fn poll(&self, agent_id: AgentId, filter: FilterFn, cancel: &CancellationToken)
        -> Result<Task>;

    /// Signal that a task finished with the given status. Unknown ids are
    /// tolerated; the outcome is propagated to dependents either way.
    async fn done(&self, id: &str, status: TaskStatus);

    /// Signal that a task failed. Dependents observe `TaskStatus::Failure`.
    async fn error(&self, id: &str, error: &str);

    /// Signal that several tasks failed with the same error.
    async fn error_at_once(&self, ids: &[String], error: &str);

    /// Remove a pending task. Returns `NotFound` if the id is not pending;
    /// running and dependency-blocked tasks are out of eviction's reach.
    async fn evict(&self, id: &str) -> Result<()>;

    /// Remove the first pending task found among `ids`. Returns after the
    /// first successful removal, or `NotFound` if none matched.
    async fn evict_at_once(&self, ids: &[String]) -> Result<()>;

    /// Block until the running task finishes, returning its recorded error.
    /// An id that is not running is presumed already finished and returns
    /// immediately.
    async fn wait(&self, id: &str, cancel: &CancellationToken) -> Result<()>;

    /// Renew the lease deadline for a running task. Returns `NotFound` if
    /// the id is not running.
    async fn extend(&self, id: &str) -> Result<()>;

    /// Snapshot counts and task lists for all queues. The returned copies
    /// are independent of subsequent queue mutation.
    async fn info(&self) -> QueueInfo;

    /// Stop handing out tasks. Lease expiry keeps running while paused.
    async fn pause(&self);

    /// Resume dispatching.
    async fn resume(&self);

    /// Cancel every outstanding poll for the given agent and drop its
    /// workers from the registry. Used when an agent is deregistered.
    async fn kick_agent_workers(&self, agent_id: AgentId);
}

/// Point-in-time view of the queue, taken under the lock.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueInfo {
    pub stats: QueueStats,
    pub pending: Vec<Task>,
    pub waiting_on_deps: Vec<Task>,
    pub running: Vec<Task>,
    pub paused: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct QueueStats {
    pub workers: usize,
    pub pending: usize,
    pub waiting_on_deps: usize,
    pub running: usize,
}
