//! Registry of sub-agent roles.

use std::collections::BTreeMap;
use taskloom_config::AgentTypeConfig;
use taskloom_core::{AgentTypeDescriptor, ToolFilter, ToolName};

/// Sub-agent roles, in the order they are offered to the model.
#[derive(Debug, Clone)]
pub struct AgentTypeRegistry {
    types: Vec<AgentTypeDescriptor>,
}

impl AgentTypeRegistry {
    /// The built-in roles: `explore`, `code` and `plan`.
    pub fn builtin() -> Self {
        Self {
            types: vec![
                AgentTypeDescriptor {
                    name: "explore".into(),
                    description: "Read-only agent for exploring code, finding files, searching".into(),
                    prompt: "You are an exploration agent. Search and analyze, but never modify files. Return a concise summary.".into(),
                    tools: ToolFilter::only([ToolName::Bash, ToolName::ReadFile]),
                },
                AgentTypeDescriptor {
                    name: "code".into(),
                    description: "Full agent for implementing features and fixing bugs".into(),
                    prompt: "You are a coding agent. Implement the requested changes efficiently.".into(),
                    tools: ToolFilter::all(),
                },
                AgentTypeDescriptor {
                    name: "plan".into(),
                    description: "Planning agent for designing implementation strategies".into(),
                    prompt: "You are a planning agent. Analyze the codebase and output a numbered implementation plan. Do NOT make changes.".into(),
                    tools: ToolFilter::only([ToolName::Bash, ToolName::ReadFile]),
                },
            ],
        }
    }

    /// Built-ins with configured roles layered on top. A configured role
    /// with a built-in name replaces it in place; new roles are appended.
    pub fn with_overrides(overrides: &BTreeMap<String, AgentTypeConfig>) -> Self {
        let mut registry = Self::builtin();
        for (name, cfg) in overrides {
            registry.insert(AgentTypeDescriptor {
                name: name.clone(),
                description: cfg.description.clone(),
                prompt: cfg.prompt.clone(),
                tools: cfg.tools.clone(),
            });
        }
        registry
    }

    pub fn insert(&mut self, descriptor: AgentTypeDescriptor) {
        match self.types.iter_mut().find(|t| t.name == descriptor.name) {
            Some(existing) => *existing = descriptor,
            None => self.types.push(descriptor),
        }
    }

    pub fn get(&self, name: &str) -> Option<&AgentTypeDescriptor> {
        self.types.iter().find(|t| t.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.types.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentTypeDescriptor> {
        self.types.iter()
    }

    /// `(name, description)` pairs for tool schemas and prompts.
    pub fn summaries(&self) -> Vec<(String, String)> {
        self.types
            .iter()
            .map(|t| (t.name.clone(), t.description.clone()))
            .collect()
    }
}

impl Default for AgentTypeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_in_order() {
        let registry = AgentTypeRegistry::builtin();
        assert_eq!(registry.names(), vec!["explore", "code", "plan"]);
        assert_eq!(
            registry.get("explore").unwrap().tools.granted(),
            vec![ToolName::Bash, ToolName::ReadFile]
        );
        assert_eq!(registry.get("code").unwrap().tools, ToolFilter::all());
    }

    #[test]
    fn overrides_replace_and_append() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            "plan".to_string(),
            AgentTypeConfig {
                description: "Custom planner".into(),
                prompt: "Plan carefully.".into(),
                tools: ToolFilter::only([ToolName::ReadFile]),
            },
        );
        overrides.insert(
            "reviewer".to_string(),
            AgentTypeConfig {
                description: "Reviews diffs".into(),
                prompt: "Review.".into(),
                tools: ToolFilter::all(),
            },
        );

        let registry = AgentTypeRegistry::with_overrides(&overrides);
        assert_eq!(registry.names(), vec!["explore", "code", "plan", "reviewer"]);
        assert_eq!(registry.get("plan").unwrap().description, "Custom planner");
    }

    #[test]
    fn unknown_role() {
        assert!(AgentTypeRegistry::builtin().get("deploy").is_none());
    }
}
