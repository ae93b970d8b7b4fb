//! Agent-type descriptors for sub-agents.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use crate::tool::ToolName;

/// Which tools a role may use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolFilter {
    /// `"*"`: every tool, meta-tools included.
    All(Wildcard),
    /// An explicit subset of the base (non-meta) toolset.
    Only(BTreeSet<ToolName>),
}

/// The literal `"*"` in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Wildcard {
    #[serde(rename = "*")]
    Star,
}

impl ToolFilter {
    pub fn all() -> Self {
        Self::All(Wildcard::Star)
    }

    pub fn only(tools: impl IntoIterator<Item = ToolName>) -> Self {
        Self::Only(tools.into_iter().collect())
    }

    /// Whether a role with this filter may invoke `tool`.
    pub fn allows(&self, tool: ToolName) -> bool {
        match self {
            Self::All(_) => true,
            Self::Only(set) => !tool.is_meta() && set.contains(&tool),
        }
    }

    /// The tools granted, in offering order.
    pub fn granted(&self) -> Vec<ToolName> {
        ToolName::ALL.into_iter().filter(|t| self.allows(*t)).collect()
    }
}

/// A named sub-agent role: its prompt fragment and toolset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTypeDescriptor {
    /// Role name (e.g. "explore")
    pub name: String,

    /// One-line description shown to the parent model
    pub description: String,

    /// Role-specific system prompt fragment
    pub prompt: String,

    /// Allowed tools
    pub tools: ToolFilter,
}
