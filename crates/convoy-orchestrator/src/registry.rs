//! Static agent registry
//!
//! The fleet roster is a fixed table known at process start. Registry
//! order is the deterministic iteration order for prompts, launches,
//! status lines, and the generated merge script.

use convoy_core::{AgentDescriptor, AgentRole, ConvoyConfig};

/// The registered fleet for one orchestration run
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    agents: Vec<AgentDescriptor>,
}

impl AgentRegistry {
    /// Build the static roster, rooting workspaces under the configured
    /// workspaces directory
    pub fn from_config(config: &ConvoyConfig) -> Self {
        let table = [
            ("crypto", AgentRole::Security, 1u8),
            ("storage", AgentRole::Services, 2),
            ("network", AgentRole::Services, 3),
            ("screens", AgentRole::Interface, 4),
            ("tests", AgentRole::Testing, 5),
        ];

        let agents = table
            .into_iter()
            .map(|(id, role, priority)| {
                AgentDescriptor::new(id, role, config.workspaces_root.join(id), id, priority)
            })
            .collect();

        Self { agents }
    }

    /// Build a registry from an explicit roster (used by tests)
    pub fn from_agents(agents: Vec<AgentDescriptor>) -> Self {
        Self { agents }
    }

    /// Agents in registry order
    pub fn agents(&self) -> &[AgentDescriptor] {
        &self.agents
    }

    pub fn get(&self, id: &str) -> Option<&AgentDescriptor> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Agent ids in registry order
    pub fn ids(&self) -> Vec<String> {
        self.agents.iter().map(|a| a.id.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roster() {
        let registry = AgentRegistry::from_config(&ConvoyConfig::default());
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.ids()[0], "crypto");

        let crypto = registry.get("crypto").unwrap();
        assert_eq!(crypto.role, AgentRole::Security);
        assert!(crypto.workspace.ends_with("workspaces/crypto"));
    }

    #[test]
    fn test_lookup_miss() {
        let registry = AgentRegistry::from_config(&ConvoyConfig::default());
        assert!(registry.get("nonexistent").is_none());
    }
}
