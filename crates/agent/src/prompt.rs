//! System prompts and the per-turn status message.

use chrono::{DateTime, Local};
use std::path::Path;
use taskloom_core::Message;

/// First line of every status message.
pub const STATUS_HEADER: &str = "[Live status]";

/// System prompt for the top-level agent.
pub fn system_prompt(workdir: &Path, skills: &str, agents: &str) -> String {
    format!(
        "You are a coding agent at {}.

Loop: plan -> act with tools -> report.

**Skills available** (invoke with Skill tool when task matches):
{skills}

**Subagents available** (invoke with Task tool for focused subtasks):
{agents}

Rules:
- Use Skill tool IMMEDIATELY when a task matches a skill description
- Use Task tool for subtasks needing focused exploration or implementation
- Use TodoWrite to track multi-step work
- Prefer tools over prose. Act, don't just explain.
- After finishing, summarize what changed.",
        workdir.display()
    )
}

/// System prompt for a sub-agent of role `agent_type`.
pub fn subagent_prompt(agent_type: &str, workdir: &Path, role_prompt: &str) -> String {
    format!(
        "You are a {agent_type} subagent at {}.\n{role_prompt}\nComplete the task and return a clear, concise summary.",
        workdir.display()
    )
}

/// The ephemeral status message appended to each outgoing request.
pub fn status_message(now: DateTime<Local>, job_summary: &str) -> Message {
    Message::system(format!(
        "{STATUS_HEADER}
Current time: {}
Background jobs:
{job_summary}

If a background job is still RUNNING, use wait and then read_file on its log before reporting results. Do not relaunch a job that is already running.",
        now.format("%Y-%m-%d %H:%M:%S")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn subagent_prompt_shape() {
        let prompt = subagent_prompt("explore", Path::new("/work"), "Search only.");
        assert_eq!(
            prompt,
            "You are a explore subagent at /work.\nSearch only.\nComplete the task and return a clear, concise summary."
        );
    }

    #[test]
    fn system_prompt_embeds_catalogs() {
        let prompt = system_prompt(Path::new("/work"), "- pdf: PDFs", "- code: Full agent");
        assert!(prompt.starts_with("You are a coding agent at /work."));
        assert!(prompt.contains("- pdf: PDFs"));
        assert!(prompt.contains("- code: Full agent"));
    }

    #[test]
    fn status_message_carries_time_and_jobs() {
        let now = Local.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        let msg = status_message(now, "No background jobs running.");
        assert_eq!(msg.role, taskloom_core::Role::System);
        assert!(msg.content.starts_with(STATUS_HEADER));
        assert!(msg.content.contains("Current time: 2026-03-01 09:30:00"));
        assert!(msg.content.contains("No background jobs running."));
    }
}
