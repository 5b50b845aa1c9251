//! Workflow task types.

use crate::ids::AgentId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A unit of work flowing through the dispatch queue.
///
/// The payload is opaque to the dispatch plane; agents decode it on their
/// side. Labels drive worker matching, dependencies drive gating, and
/// `dep_status` is filled in by the queue as prerequisites finish.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Globally unique task identifier.
    pub id: String,
    /// Opaque workflow payload.
    #[serde(default)]
    pub payload: Vec<u8>,
    /// Labels the assigned worker must satisfy.
    #[serde(default)]
    pub labels: HashMap<String, String>,
    /// Ids of tasks that must finish before this task is dispatched.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Outcomes this task should still run after; empty means run on success.
    #[serde(default)]
    pub run_on: Vec<RunCondition>,
    /// Final status of each finished dependency.
    #[serde(default)]
    pub dep_status: HashMap<String, TaskStatus>,
    /// Agent holding the lease, unassigned until dispatch.
    #[serde(default)]
    pub agent_id: AgentId,
}

impl Task {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            payload: Vec::new(),
            labels: HashMap::new(),
            dependencies: Vec::new(),
            run_on: Vec::new(),
            dep_status: HashMap::new(),
            agent_id: AgentId::UNASSIGNED,
        }
    }

    pub fn depends_on(&self, id: &str) -> bool {
        self.dependencies.iter().any(|dep| dep == id)
    }

    /// Whether this task should still execute given the recorded outcomes
    /// of its dependencies.
    ///
    /// A task with an empty `run_on` runs only when every dependency
    /// succeeded (or was skipped). A failure-handling task declares
    /// `RunCondition::Failure` and is suppressed once any dependency
    /// succeeds; declaring both conditions makes the task unconditional.
    pub fn should_run(&self) -> bool {
        let on_success = self.run_on.is_empty() || self.run_on.contains(&RunCondition::Success);
        let on_failure = self.run_on.contains(&RunCondition::Failure);

        match (on_success, on_failure) {
            (true, true) => true,
            (true, false) => self
                .dep_status
                .values()
                .all(|status| matches!(status, TaskStatus::Success | TaskStatus::Skipped)),
            (false, true) => self
                .dep_status
                .values()
                .all(|status| !matches!(status, TaskStatus::Success)),
            (false, false) => false,
        }
    }
}

/// Dependency outcomes a task declares it runs after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunCondition {
    Success,
    Failure,
}

/// Lifecycle status of a task, as propagated to dependents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Success,
    Failure,
    Killed,
    Skipped,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Success | TaskStatus::Failure | TaskStatus::Killed | TaskStatus::Skipped
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_with_deps(statuses: &[(&str, TaskStatus)], run_on: Vec<RunCondition>) -> Task {
        let mut task = Task::new("t1");
        task.dependencies = statuses.iter().map(|(id, _)| id.to_string()).collect();
        task.dep_status = statuses
            .iter()
            .map(|(id, status)| (id.to_string(), *status))
            .collect();
        task.run_on = run_on;
        task
    }

    #[test]
    fn test_should_run_default_requires_success() {
        let task = task_with_deps(&[("a", TaskStatus::Success)], vec![]);
        assert!(task.should_run());

        let task = task_with_deps(&[("a", TaskStatus::Failure)], vec![]);
        assert!(!task.should_run());
    }

    #[test]
    fn test_should_run_skipped_counts_as_success() {
        let task = task_with_deps(
            &[("a", TaskStatus::Success), ("b", TaskStatus::Skipped)],
            vec![],
        );
        assert!(task.should_run());
    }

    #[test]
    fn test_should_run_failure_handler() {
        let run_on = vec![RunCondition::Failure];
        let task = task_with_deps(&[("a", TaskStatus::Failure)], run_on.clone());
        assert!(task.should_run());

        let task = task_with_deps(&[("a", TaskStatus::Success)], run_on);
        assert!(!task.should_run());
    }

    #[test]
    fn test_should_run_unconditional() {
        let run_on = vec![RunCondition::Success, RunCondition::Failure];
        let task = task_with_deps(&[("a", TaskStatus::Killed)], run_on);
        assert!(task.should_run());
    }

    #[test]
    fn test_depends_on() {
        let mut task = Task::new("t1");
        task.dependencies = vec!["a".to_string(), "b".to_string()];
        assert!(task.depends_on("a"));
        assert!(!task.depends_on("c"));
    }

    #[test]
    fn test_status_terminal() {
        assert!(TaskStatus::Success.is_terminal());
        assert!(TaskStatus::Killed.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
    }
}
