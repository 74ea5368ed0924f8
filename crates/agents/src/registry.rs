//! Process-wide-in-spirit, but owned-by-`AppContext`-in-practice, mapping
//! from agent name to implementation, per SPEC_FULL.md §4.2 and the
//! no-module-level-globals decision in §9.

use crate::traits::Agent;
use std::collections::HashMap;
use std::sync::Arc;

/// Registers and resolves [`Agent`] implementations by name. Registration is
/// idempotent on name: registering a second agent under a name already
/// present replaces the first, matching the source system's behavior.
#[derive(Default, Clone)]
pub struct AgentRegistry {
    agents: HashMap<String, Arc<dyn Agent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `agent` under its own [`Agent::name`], replacing any
    /// previous registration with the same name.
    pub fn register(&mut self, agent: Arc<dyn Agent>) {
        self.agents.insert(agent.name().to_string(), agent);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Agent>> {
        self.agents.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::AgentOutcome;
    use async_trait::async_trait;
    use serde_json::Value;
    use taskloom_kernel::error::CoreError;

    struct NamedAgent(&'static str);

    #[async_trait]
    impl Agent for NamedAgent {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "test stub"
        }

        fn validate(&self, _payload: &Value) -> Result<(), CoreError> {
            Ok(())
        }

        async fn execute(&self, _payload: Value) -> AgentOutcome {
            AgentOutcome::success(self.0)
        }
    }

    #[test]
    fn unregistered_name_resolves_to_none() {
        let registry = AgentRegistry::new();
        assert!(registry.get("nope").is_none());
        assert!(!registry.contains("nope"));
    }

    #[test]
    fn second_registration_replaces_first() {
        let mut registry = AgentRegistry::new();
        registry.register(Arc::new(NamedAgent("echo")));
        registry.register(Arc::new(NamedAgent("echo")));
        assert_eq!(registry.names(), vec!["echo".to_string()]);
        assert!(registry.contains("echo"));
    }

    #[test]
    fn names_are_sorted() {
        let mut registry = AgentRegistry::new();
        registry.register(Arc::new(NamedAgent("zeta")));
        registry.register(Arc::new(NamedAgent("alpha")));
        assert_eq!(registry.names(), vec!["alpha".to_string(), "zeta".to_string()]);
    }
}
