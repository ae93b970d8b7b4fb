//! Tool identifiers.
//!
//! The set of tools is closed: every name the backend may request is a
//! variant of [`ToolName`]. Anything else is rejected before its arguments
//! are even looked at.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::error::ToolError;

/// Every tool the orchestration core knows how to dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ToolName {
    #[serde(rename = "bash")]
    Bash,
    #[serde(rename = "read_file")]
    ReadFile,
    #[serde(rename = "write_file")]
    WriteFile,
    #[serde(rename = "edit_file")]
    EditFile,
    #[serde(rename = "TodoWrite")]
    TodoWrite,
    #[serde(rename = "wait")]
    Wait,
    #[serde(rename = "Task")]
    Task,
    #[serde(rename = "Skill")]
    Skill,
}

impl ToolName {
    /// All tools, in the order they are offered to the model.
    pub const ALL: [ToolName; 8] = [
        ToolName::Bash,
        ToolName::ReadFile,
        ToolName::WriteFile,
        ToolName::EditFile,
        ToolName::TodoWrite,
        ToolName::Wait,
        ToolName::Task,
        ToolName::Skill,
    ];

    /// The wire name the model uses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bash => "bash",
            Self::ReadFile => "read_file",
            Self::WriteFile => "write_file",
            Self::EditFile => "edit_file",
            Self::TodoWrite => "TodoWrite",
            Self::Wait => "wait",
            Self::Task => "Task",
            Self::Skill => "Skill",
        }
    }

    /// Meta-tools recurse into the agent itself rather than touching the machine.
    /// They are never granted to roles with an explicit tool list.
    pub fn is_meta(&self) -> bool {
        matches!(self, Self::Task | Self::Skill)
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ToolError::UnknownTool(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_wire_form() {
        for tool in ToolName::ALL {
            assert_eq!(tool.as_str().parse::<ToolName>().unwrap(), tool);
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = "rm_rf".parse::<ToolName>().unwrap_err();
        assert_eq!(err, ToolError::UnknownTool("rm_rf".into()));
    }

    #[test]
    fn names_are_case_sensitive() {
        assert!("task".parse::<ToolName>().is_err());
        assert!("Bash".parse::<ToolName>().is_err());
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&ToolName::TodoWrite).unwrap();
        assert_eq!(json, "\"TodoWrite\"");
        let parsed: ToolName = serde_json::from_str("\"read_file\"").unwrap();
        assert_eq!(parsed, ToolName::ReadFile);
    }

    #[test]
    fn only_task_and_skill_are_meta() {
        let meta: Vec<_> = ToolName::ALL.into_iter().filter(|t| t.is_meta()).collect();
        assert_eq!(meta, vec![ToolName::Task, ToolName::Skill]);
    }
}
