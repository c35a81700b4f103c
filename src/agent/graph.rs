//! The set of agents a run may move between.

use std::collections::HashMap;
use std::sync::Arc;

use super::agent::Agent;
use crate::error::BatonError;

/// Named agents plus their handoff edges. Cycles are allowed; the turn limit
/// bounds any ping-pong between agents.
#[derive(Debug, Clone, Default)]
pub struct AgentGraph {
    agents: HashMap<String, Arc<Agent>>,
}

impl AgentGraph {
    /// Validate and index agents. Every handoff must name an agent in the set.
    pub fn new(agents: impl IntoIterator<Item = Agent>) -> Result<Self, BatonError> {
        let mut map = HashMap::new();
        for agent in agents {
            agent.validate()?;
            let name = agent.name().to_string();
            if map.insert(name.clone(), Arc::new(agent)).is_some() {
                return Err(BatonError::Configuration(format!(
                    "duplicate agent name '{name}'"
                )));
            }
        }
        for agent in map.values() {
            for handoff in agent.handoffs() {
                if !map.contains_key(handoff.target()) {
                    return Err(BatonError::Configuration(format!(
                        "agent '{}' hands off to unknown agent '{}'",
                        agent.name(),
                        handoff.target()
                    )));
                }
            }
        }
        Ok(Self { agents: map })
    }

    pub fn single(agent: Agent) -> Result<Self, BatonError> {
        Self::new([agent])
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Agent>> {
        self.agents.get(name)
    }

    /// Like [`get`](Self::get) but a configuration error when missing.
    pub fn require(&self, name: &str) -> Result<Arc<Agent>, BatonError> {
        self.get(name)
            .cloned()
            .ok_or_else(|| BatonError::Configuration(format!("unknown agent '{name}'")))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.agents.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
