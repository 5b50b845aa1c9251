//! Worker filter constructors.

use crate::queue::FilterFn;
use std::collections::HashMap;

/// A filter that accepts every task.
pub fn accept_all() -> FilterFn {
    Box::new(|_| true)
}

/// Build the label filter for an agent.
///
/// A task matches when every one of its labels is satisfied by the agent:
/// an empty task label value means the task does not care, and an agent
/// value of `"*"` matches any requirement for that key. A label key the
/// agent does not carry at all rejects the task.
pub fn matching_labels(agent_labels: HashMap<String, String>) -> FilterFn {
    Box::new(move |task| {
        for (key, value) in &task.labels {
            if value.is_empty() {
                continue;
            }
            match agent_labels.get(key) {
                Some(agent_value) if agent_value == "*" => continue,
                Some(agent_value) if agent_value == value => continue,
                _ => return false,
            }
        }
        true
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingot_core::Task;

    fn labelled(labels: &[(&str, &str)]) -> Task {
        let mut task = Task::new("t1");
        task.labels = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        task
    }

    fn agent(labels: &[(&str, &str)]) -> HashMap<String, String> {
        labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_matches_exact_labels() {
        let filter = matching_labels(agent(&[("platform", "linux/amd64")]));
        assert!(filter(&labelled(&[("platform", "linux/amd64")])));
        assert!(!filter(&labelled(&[("platform", "linux/arm64")])));
    }

    #[test]
    fn test_unlabelled_task_matches_any_agent() {
        let filter = matching_labels(agent(&[("platform", "linux/amd64")]));
        assert!(filter(&labelled(&[])));
    }

    #[test]
    fn test_empty_task_label_value_is_ignored() {
        let filter = matching_labels(agent(&[]));
        assert!(filter(&labelled(&[("repo", "")])));
    }

    #[test]
    fn test_wildcard_agent_label() {
        let filter = matching_labels(agent(&[("repo", "*")]));
        assert!(filter(&labelled(&[("repo", "octo/spoon")])));
    }

    #[test]
    fn test_missing_agent_label_rejects() {
        let filter = matching_labels(agent(&[]));
        assert!(!filter(&labelled(&[("repo", "octo/spoon")])));
    }
}
