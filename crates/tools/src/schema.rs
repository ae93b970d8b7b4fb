//! Tool schemas offered to the model.
//!
//! `Task` and `Skill` descriptions embed the current agent types and skills,
//! so they are built from a [`SchemaContext`] rather than being static.

use serde_json::json;
use taskloom_core::{ToolDefinition, ToolName};

/// Runtime information embedded in the meta-tool schemas.
#[derive(Debug, Clone, Default)]
pub struct SchemaContext {
    /// `(name, description)` of every agent type, in offer order
    pub agent_types: Vec<(String, String)>,
    /// Pre-rendered skill list (see `SkillStore::descriptions`)
    pub skills: String,
}

impl SchemaContext {
    /// One `- name: description` line per agent type.
    pub fn agent_descriptions(&self) -> String {
        self.agent_types
            .iter()
            .map(|(name, description)| format!("- {name}: {description}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Definitions for `tools`, in the given order.
pub fn definitions(tools: &[ToolName], ctx: &SchemaContext) -> Vec<ToolDefinition> {
    tools.iter().map(|t| definition(*t, ctx)).collect()
}

pub fn definition(tool: ToolName, ctx: &SchemaContext) -> ToolDefinition {
    let (description, parameters) = match tool {
        ToolName::Bash => (
            "Run shell command in the current environment. Use background=true for long-running tasks.".to_string(),
            json!({
                "type": "object",
                "properties": {
                    "command": {"type": "string", "description": "Command to execute."},
                    "background": {
                        "type": "boolean",
                        "description": "If true, runs command in background (nohup) and returns PID.",
                        "default": false
                    }
                },
                "required": ["command"]
            }),
        ),
        ToolName::ReadFile => (
            "Read file contents.".to_string(),
            json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string"},
                    "limit": {"type": "integer", "description": "Max lines to read"}
                },
                "required": ["path"]
            }),
        ),
        ToolName::WriteFile => (
            "Write or append content to a file. Use this to create scripts or overwrite existing ones.".to_string(),
            json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string"},
                    "content": {"type": "string"},
                    "append": {
                        "type": "boolean",
                        "description": "If true, appends to file instead of overwriting.",
                        "default": false
                    }
                },
                "required": ["path", "content"]
            }),
        ),
        ToolName::EditFile => (
            "Replace exact text in a file. WARNING: 'old_text' must match the file content EXACTLY (including whitespace/newlines). If uncertain, use write_file to overwrite the whole file.".to_string(),
            json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string"},
                    "old_text": {"type": "string"},
                    "new_text": {"type": "string"}
                },
                "required": ["path", "old_text", "new_text"]
            }),
        ),
        ToolName::TodoWrite => (
            "Update task list.".to_string(),
            json!({
                "type": "object",
                "properties": {
                    "items": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "content": {"type": "string"},
                                "status": {
                                    "type": "string",
                                    "enum": ["pending", "in_progress", "completed"]
                                },
                                "activeForm": {"type": "string"}
                            },
                            "required": ["content", "status", "activeForm"]
                        }
                    }
                },
                "required": ["items"]
            }),
        ),
        ToolName::Wait => (
            "Pause execution for a specific duration. ESSENTIAL for checking background task progress.".to_string(),
            json!({
                "type": "object",
                "properties": {
                    "seconds": {
                        "type": "integer",
                        "description": "Time to wait in seconds (e.g., 60)."
                    }
                },
                "required": ["seconds"]
            }),
        ),
        ToolName::Task => (
            format!(
                "Spawn a subagent for a focused subtask.\n\nAgent types:\n{}",
                ctx.agent_descriptions()
            ),
            json!({
                "type": "object",
                "properties": {
                    "description": {
                        "type": "string",
                        "description": "Short task description (3-5 words)"
                    },
                    "prompt": {
                        "type": "string",
                        "description": "Detailed instructions for the subagent"
                    },
                    "agent_type": {
                        "type": "string",
                        "enum": ctx.agent_types.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>()
                    }
                },
                "required": ["description", "prompt", "agent_type"]
            }),
        ),
        ToolName::Skill => (
            format!(
                "Load a skill to gain specialized knowledge for a task.\n\nAvailable skills:\n{}\n\nWhen to use:\n- IMMEDIATELY when user task matches a skill description\n- Before attempting domain-specific work (PDF, MCP, etc.)",
                ctx.skills
            ),
            json!({
                "type": "object",
                "properties": {
                    "skill": {"type": "string", "description": "Name of the skill to load"}
                },
                "required": ["skill"]
            }),
        ),
    };

    ToolDefinition {
        name: tool.as_str().to_string(),
        description,
        parameters,
    }
}
