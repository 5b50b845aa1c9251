//! Strongly-typed identifiers for domain entities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a registered agent.
///
/// Agent identities are assigned by the control plane's registry; the
/// dispatch core only records which agent holds a task's lease. Zero means
/// no agent has been assigned yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(i64);

impl AgentId {
    /// Sentinel for a task that has not been handed to any agent.
    pub const UNASSIGNED: AgentId = AgentId(0);

    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn is_unassigned(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agt_{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_id_display() {
        let id = AgentId::new(42);
        assert_eq!(id.to_string(), "agt_42");
    }

    #[test]
    fn test_agent_id_unassigned() {
        assert!(AgentId::default().is_unassigned());
        assert!(!AgentId::new(7).is_unassigned());
    }

    #[test]
    fn test_agent_id_serde_transparent() {
        let id = AgentId::new(9);
        assert_eq!(serde_json::to_string(&id).unwrap(), "9");
    }
}
