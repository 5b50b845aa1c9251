//! The in-memory fifo queue and its dispatcher.

use crate::config::QueueConfig;
use crate::queue::{FilterFn, Queue, QueueInfo, QueueStats};
use async_trait::async_trait;
use ingot_core::{AgentId, Error, Result, Task, TaskStatus};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex, Notify};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Terminal outcome broadcast to waiters when a lease ends. An expired
/// lease broadcasts the default (no error) outcome, indistinguishable from
/// success.
#[derive(Debug, Clone, Default)]
struct LeaseOutcome {
    error: Option<String>,
}

/// Lease record for a task handed to a worker.
struct Entry {
    task: Task,
    done: watch::Sender<Option<LeaseOutcome>>,
    deadline: Instant,
}

/// A worker subscription created by `poll`. The slot has capacity one and
/// is empty for as long as the worker sits in the registry; dispatching
/// fills it and removes the worker in the same critical section.
struct Worker {
    id: u64,
    agent_id: AgentId,
    filter: FilterFn,
    slot: mpsc::Sender<Task>,
    kick: CancellationToken,
}

#[derive(Default)]
struct State {
    workers: Vec<Worker>,
    running: HashMap<String, Entry>,
    pending: VecDeque<Task>,
    waiting_on_deps: VecDeque<Task>,
    paused: bool,
    next_worker_id: u64,
}

impl State {
    fn remove_from_pending(&mut self, task_id: &str) {
        if let Some(idx) = self.pending.iter().position(|task| task.id == task_id) {
            debug!(task_id, "removing finished task from pending");
            self.pending.remove(idx);
        }
    }

    /// Record a finished task's status on every dependent still in queue.
    fn update_dep_status(&mut self, task_id: &str, status: TaskStatus) {
        for task in self
            .pending
            .iter_mut()
            .chain(self.waiting_on_deps.iter_mut())
        {
            if task.depends_on(task_id) {
                task.dep_status.insert(task_id.to_string(), status);
            }
        }
        for entry in self.running.values_mut() {
            if entry.task.depends_on(task_id) {
                entry.task.dep_status.insert(task_id.to_string(), status);
            }
        }
    }

    /// Return tasks whose lease deadline has passed to the front of the
    /// pending list. Lost agents must not starve their tasks.
    fn resubmit_expired(&mut self, now: Instant) {
        let expired: Vec<String> = self
            .running
            .iter()
            .filter(|(_, entry)| entry.deadline < now)
            .map(|(id, _)| id.clone())
            .collect();
        for id in expired {
            if let Some(entry) = self.running.remove(&id) {
                warn!(task_id = %id, "lease expired, resubmitting task");
                self.pending.push_front(entry.task);
                entry.done.send_replace(Some(LeaseOutcome::default()));
            }
        }
    }

    /// Re-admit every dependency-blocked task, then re-evaluate gating over
    /// the whole pending list. Gating is recomputed from scratch each pass
    /// because a dependency may have finished or left the queue since.
    fn filter_waiting(&mut self) {
        while let Some(task) = self.waiting_on_deps.pop_front() {
            self.pending.push_back(task);
        }

        let mut in_queue: HashSet<String> =
            self.pending.iter().map(|task| task.id.clone()).collect();
        in_queue.extend(self.running.keys().cloned());

        let mut ready = VecDeque::with_capacity(self.pending.len());
        for task in std::mem::take(&mut self.pending) {
            if deps_in_queue(&task, &in_queue) {
                debug!(task_id = %task.id, "waiting due to unmet dependencies");
                self.waiting_on_deps.push_back(task);
            } else {
                ready.push_back(task);
            }
        }
        self.pending = ready;
    }

    /// Match pending tasks to workers, pending-order first: a task whose
    /// only compatible worker is present must not lose it to a later task
    /// that any worker could take.
    fn assign_to_workers(&mut self, extension: Duration) {
        // A poll future dropped without cancelling leaves a worker whose
        // slot can no longer be read; purge those before matching.
        self.workers.retain(|worker| !worker.slot.is_closed());
        loop {
            let Some((task_idx, worker_idx)) = self.next_assignment() else {
                break;
            };
            let worker = self.workers.swap_remove(worker_idx);
            let Some(mut task) = self.pending.remove(task_idx) else {
                break;
            };
            task.agent_id = worker.agent_id;
            debug!(task_id = %task.id, agent_id = %worker.agent_id, "assigned task to worker");

            let (done, _) = watch::channel(None);
            self.running.insert(
                task.id.clone(),
                Entry {
                    task: task.clone(),
                    done,
                    deadline: Instant::now() + extension,
                },
            );
            if worker.slot.try_send(task).is_err() {
                // The poll future was dropped without deregistering; the
                // lease expires and the task is resubmitted.
                debug!(agent_id = %worker.agent_id, "worker vanished before delivery");
            }
        }
    }

    fn next_assignment(&self) -> Option<(usize, usize)> {
        for (task_idx, task) in self.pending.iter().enumerate() {
            if let Some(worker_idx) = self.workers.iter().position(|worker| (worker.filter)(task))
            {
                return Some((task_idx, worker_idx));
            }
        }
        None
    }
}

fn deps_in_queue(task: &Task, in_queue: &HashSet<String>) -> bool {
    task.dependencies
        .iter()
        .any(|dep| *dep != task.id && in_queue.contains(dep))
}

/// First-in-first-out dispatch queue.
///
/// A single background task runs the dispatcher; every state-changing
/// operation wakes it, and a periodic sweep bounds lease-expiry latency
/// when the queue is otherwise idle.
pub struct Fifo {
    state: Mutex<State>,
    wake: Arc<Notify>,
    config: QueueConfig,
}

impl Fifo {
    /// Create a queue with default configuration. Must be called from
    /// within a tokio runtime.
    pub fn new() -> Arc<Self> {
        Self::with_config(QueueConfig::default())
    }

    pub fn with_config(config: QueueConfig) -> Arc<Self> {
        let wake = Arc::new(Notify::new());
        let queue = Arc::new(Self {
            state: Mutex::new(State::default()),
            wake: Arc::clone(&wake),
            config: config.clone(),
        });
        tokio::spawn(dispatcher_loop(
            Arc::downgrade(&queue),
            wake,
            config.sweep_interval(),
        ));
        queue
    }

    /// One dispatcher pass, run to completion under the lock: expire
    /// leases, re-admit unblocked tasks, match tasks to workers. While
    /// paused only the expiry sweep runs.
    async fn process(&self) {
        let mut state = self.state.lock().await;
        state.resubmit_expired(Instant::now());
        if state.paused {
            return;
        }
        state.filter_waiting();
        state.assign_to_workers(self.config.extension());
    }

    async fn finish(&self, ids: &[String], status: TaskStatus, error: Option<&str>) {
        {
            let mut state = self.state.lock().await;
            for id in ids {
                if let Some(entry) = state.running.remove(id) {
                    entry.done.send_replace(Some(LeaseOutcome {
                        error: error.map(str::to_owned),
                    }));
                } else {
                    state.remove_from_pending(id);
                }
                state.update_dep_status(id, status);
            }
        }
        self.wake.notify_one();
    }
}

async fn dispatcher_loop(queue: Weak<Fifo>, wake: Arc<Notify>, sweep_interval: Duration) {
    let mut sweep = time::interval(sweep_interval);
    loop {
        tokio::select! {
            _ = wake.notified() => {}
            _ = sweep.tick() => {}
        }
        match queue.upgrade() {
            Some(queue) => queue.process().await,
            None => break,
        }
    }
}

#[async_trait]
impl Queue for Fifo {
    async fn push(&self, task: Task) {
        {
            let mut state = self.state.lock().await;
            state.pending.push_back(task);
        }
        self.wake.notify_one();
    }

    async fn push_at_once(&self, tasks: Vec<Task>) {
        {
            let mut state = self.state.lock().await;
            for task in tasks {
                state.pending.push_back(task);
            }
        }
        self.wake.notify_one();
    }

    async fn poll(
        &self,
        agent_id: AgentId,
        filter: FilterFn,
        cancel: &CancellationToken,
    ) -> Result<Task> {
        let (slot, mut delivery) = mpsc::channel(1);
        let kick = CancellationToken::new();
        let worker_id = {
            let mut state = self.state.lock().await;
            let worker_id = state.next_worker_id;
            state.next_worker_id += 1;
            state.workers.push(Worker {
                id: worker_id,
                agent_id,
                filter,
                slot,
                kick: kick.clone(),
            });
            worker_id
        };
        self.wake.notify_one();

        tokio::select! {
            biased;
            delivered = delivery.recv() => match delivered {
                Some(task) => Ok(task),
                // The slot sender is dropped without delivery only when the
                // worker was removed by a kick.
                None => Err(Error::WorkerKicked),
            },
            _ = kick.cancelled() => Err(Error::WorkerKicked),
            _ = cancel.cancelled() => {
                let mut state = self.state.lock().await;
                state.workers.retain(|worker| worker.id != worker_id);
                Err(Error::Cancelled)
            }
        }
    }

    async fn done(&self, id: &str, status: TaskStatus) {
        self.finish(&[id.to_string()], status, None).await;
    }

    async fn error(&self, id: &str, error: &str) {
        self.finish(&[id.to_string()], TaskStatus::Failure, Some(error))
            .await;
    }

    async fn error_at_once(&self, ids: &[String], error: &str) {
        self.finish(ids, TaskStatus::Failure, Some(error)).await;
    }

    async fn evict(&self, id: &str) -> Result<()> {
        self.evict_at_once(&[id.to_string()]).await
    }

    async fn evict_at_once(&self, ids: &[String]) -> Result<()> {
        let mut state = self.state.lock().await;
        for id in ids {
            if let Some(idx) = state.pending.iter().position(|task| task.id == *id) {
                state.pending.remove(idx);
                return Ok(());
            }
        }
        Err(Error::NotFound)
    }

    async fn wait(&self, id: &str, cancel: &CancellationToken) -> Result<()> {
        let subscription = {
            let state = self.state.lock().await;
            state.running.get(id).map(|entry| entry.done.subscribe())
        };
        // Not running: presumed already finished.
        let Some(mut subscription) = subscription else {
            return Ok(());
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(Error::Cancelled),
            outcome = subscription.wait_for(|done| done.is_some()) => match outcome {
                Ok(done) => match done.as_ref().and_then(|o| o.error.clone()) {
                    Some(message) => Err(Error::TaskFailed(message)),
                    None => Ok(()),
                },
                // The queue was dropped before the lease ended.
                Err(_) => Ok(()),
            },
        }
    }

    async fn extend(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        match state.running.get_mut(id) {
            Some(entry) => {
                entry.deadline = Instant::now() + self.config.extension();
                Ok(())
            }
            None => Err(Error::NotFound),
        }
    }

    async fn info(&self) -> QueueInfo {
        let state = self.state.lock().await;
        QueueInfo {
            stats: QueueStats {
                workers: state.workers.len(),
                pending: state.pending.len(),
                waiting_on_deps: state.waiting_on_deps.len(),
                running: state.running.len(),
            },
            pending: state.pending.iter().cloned().collect(),
            waiting_on_deps: state.waiting_on_deps.iter().cloned().collect(),
            running: state
                .running
                .values()
                .map(|entry| entry.task.clone())
                .collect(),
            paused: state.paused,
        }
    }

    async fn pause(&self) {
        self.state.lock().await.paused = true;
    }

    async fn resume(&self) {
        self.state.lock().await.paused = false;
        self.wake.notify_one();
    }

    async fn kick_agent_workers(&self, agent_id: AgentId) {
        let kicked = {
            let mut state = self.state.lock().await;
            let workers = std::mem::take(&mut state.workers);
            let (kicked, kept): (Vec<_>, Vec<_>) =
                workers.into_iter().partition(|w| w.agent_id == agent_id);
            state.workers = kept;
            kicked
        };
        for worker in kicked {
            info!(agent_id = %agent_id, "kicking agent worker");
            worker.kick.cancel();
        }
    }
}
