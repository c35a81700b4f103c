//! Name-keyed tool registry.

use std::collections::HashMap;
use std::sync::Arc;

use super::tool::Tool;
use crate::context::RunContext;
use crate::error::BatonError;
use crate::provider::ToolDefinition;

/// Tools available to one agent, in registration order.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Duplicate names are a configuration error.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), BatonError> {
        let name = tool.name().to_string();
        if name.trim().is_empty() {
            return Err(BatonError::Configuration("tool name must not be empty".into()));
        }
        if self.index.contains_key(&name) {
            return Err(BatonError::Configuration(format!(
                "duplicate tool name '{name}'"
            )));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// Look up a tool that is enabled for this context.
    pub fn resolve(&self, name: &str, ctx: &RunContext) -> Option<&Arc<dyn Tool>> {
        self.get(name).filter(|tool| tool.is_enabled(ctx))
    }

    pub fn enabled<'a>(&'a self, ctx: &'a RunContext) -> impl Iterator<Item = &'a Arc<dyn Tool>> + 'a {
        self.tools.iter().filter(move |tool| tool.is_enabled(ctx))
    }

    /// Definitions advertised to the model this turn.
    pub fn definitions(&self, ctx: &RunContext) -> Vec<ToolDefinition> {
        self.enabled(ctx).map(|tool| tool.definition()).collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|tool| tool.name())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
