//! Sub-agent spawner: the `Task` tool.
//!
//! A sub-agent gets a fresh conversation (role prompt + task prompt, never
//! the parent's history), the toolset its role allows, and a hard ceiling on
//! completion requests. It shares the parent's session, so background jobs
//! and todos stay visible across levels.

use chrono::Utc;
use std::time::Instant;
use taskloom_core::{Conversation, DomainEvent, Message, ToolError};
use tracing::{info, warn};

use crate::dispatcher::ToolScope;
use crate::loop_runner::{AgentLoop, LoopOutcome};
use crate::prompt;
use crate::session::AgentSession;

/// Returned when a sub-agent runs out of steps.
pub const STEP_LIMIT_REACHED: &str = "(subagent step limit reached)";

/// Returned when a sub-agent finishes without any text.
pub const FINISHED_WITHOUT_TEXT: &str = "(subagent finished)";

pub struct SubAgentSpawner<'a> {
    agent: &'a AgentLoop,
}

impl<'a> SubAgentSpawner<'a> {
    pub fn new(agent: &'a AgentLoop) -> Self {
        Self { agent }
    }

    /// Run a sub-agent of role `agent_type` one level below `depth` and
    /// return its summary.
    pub async fn run_task(
        &self,
        description: &str,
        task_prompt: &str,
        agent_type: &str,
        session: &mut AgentSession,
        depth: u32,
    ) -> Result<String, ToolError> {
        let descriptor = self
            .agent
            .agent_types()
            .get(agent_type)
            .ok_or_else(|| ToolError::Failed(format!("Unknown agent type '{agent_type}'")))?;

        let mut conversation = Conversation::with_system(prompt::subagent_prompt(
            agent_type,
            self.agent.workdir(),
            &descriptor.prompt,
        ));
        conversation.push(Message::user(task_prompt));
        let scope = ToolScope::new(agent_type, descriptor.tools.clone());
        let child_depth = depth + 1;

        info!(agent_type, description, depth = child_depth, "Spawning sub-agent");
        self.agent.event_bus().publish(DomainEvent::SubAgentStarted {
            agent_type: agent_type.to_string(),
            description: description.to_string(),
            depth: child_depth,
            timestamp: Utc::now(),
        });

        let started = Instant::now();
        let max_steps = self.agent.limits().subagent_max_steps;
        let outcome = self
            .agent
            .drive(&mut conversation, session, &scope, Some(max_steps), child_depth)
            .await;

        let (summary, steps, label) = match outcome {
            LoopOutcome::Finished { content, steps } if content.trim().is_empty() => {
                (FINISHED_WITHOUT_TEXT.to_string(), steps, "finished")
            }
            LoopOutcome::Finished { content, steps } => (content, steps, "finished"),
            LoopOutcome::StepLimitReached { steps } => {
                warn!(agent_type, steps, "Sub-agent stopped at step limit");
                (STEP_LIMIT_REACHED.to_string(), steps, "step_limit")
            }
            LoopOutcome::Failed { error, steps } => {
                warn!(agent_type, error = %error, "Sub-agent completion request failed");
                (format!("Subagent Error: {error}"), steps, "error")
            }
        };

        self.agent.event_bus().publish(DomainEvent::SubAgentFinished {
            agent_type: agent_type.to_string(),
            steps,
            outcome: label.to_string(),
            elapsed_ms: started.elapsed().as_millis() as u64,
            depth: child_depth,
            timestamp: Utc::now(),
        });

        Ok(summary)
    }
}
