//! Tool dispatcher: from a raw tool-call request to the text of its result.
//!
//! Every request goes through the same steps:
//!
//! 1. Resolve the name to a [`ToolName`]. Unknown names stop here.
//! 2. Check the caller's [`ToolScope`]. Disallowed tools stop here, before
//!    any argument is looked at or any handler runs.
//! 3. Repair the raw argument text into a mapping.
//! 4. Decode the mapping into the tool's typed arguments and run the handler.
//!
//! Failures at any step become `Error: …` text for the model. Nothing here
//! aborts the loop.

use chrono::Utc;
use futures::future::BoxFuture;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Instant;
use taskloom_core::{DomainEvent, MessageToolCall, ToolError, ToolFilter, ToolName};
use taskloom_tools::repair::{self, RepairStage};
use taskloom_tools::shell::BashArgs;
use taskloom_tools::skills::{self, SkillArgs, SkillStore};
use taskloom_tools::todo::TodoInput;
use taskloom_tools::wait::{self, WaitArgs};
use taskloom_tools::{ArgumentMap, EditFileArgs, FileTools, ReadFileArgs, ShellRunner, WriteFileArgs};
use tracing::{debug, warn};

use crate::loop_runner::AgentLoop;
use crate::session::AgentSession;
use crate::subagent::SubAgentSpawner;

/// Characters of tool output carried in `ToolExecuted` events.
const PREVIEW_CHARS: usize = 200;

/// The role a loop runs as and the tools it may use.
#[derive(Debug, Clone)]
pub struct ToolScope {
    pub agent_type: String,
    pub filter: ToolFilter,
}

impl ToolScope {
    /// The top-level agent: every tool.
    pub fn main() -> Self {
        Self {
            agent_type: "main".into(),
            filter: ToolFilter::all(),
        }
    }

    pub fn new(agent_type: impl Into<String>, filter: ToolFilter) -> Self {
        Self {
            agent_type: agent_type.into(),
            filter,
        }
    }

    /// Tools offered to a loop running at `depth`. `Task` disappears once
    /// another level of sub-agents would exceed `max_depth`.
    pub fn offered(&self, depth: u32, max_depth: u32) -> Vec<ToolName> {
        self.filter
            .granted()
            .into_iter()
            .filter(|t| *t != ToolName::Task || depth < max_depth)
            .collect()
    }

    pub fn check(&self, tool: ToolName, depth: u32, max_depth: u32) -> Result<(), ToolError> {
        if !self.filter.allows(tool) {
            return Err(ToolError::NotAllowed {
                tool_name: tool.to_string(),
                agent_type: self.agent_type.clone(),
            });
        }
        if tool == ToolName::Task && depth >= max_depth {
            return Err(ToolError::PermissionDenied {
                tool_name: tool.to_string(),
                reason: format!("maximum sub-agent depth ({max_depth}) reached"),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TodoWriteArgs {
    items: Vec<TodoInput>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TaskArgs {
    pub description: String,
    pub prompt: String,
    pub agent_type: String,
}

/// Routes tool calls to their handlers.
pub struct ToolDispatcher {
    shell: ShellRunner,
    files: FileTools,
    skills: Arc<dyn SkillStore>,
    max_wait_secs: u64,
}

impl ToolDispatcher {
    pub fn new(shell: ShellRunner, files: FileTools, skills: Arc<dyn SkillStore>) -> Self {
        Self {
            shell,
            files,
            skills,
            max_wait_secs: 3600,
        }
    }

    pub fn with_max_wait(mut self, secs: u64) -> Self {
        self.max_wait_secs = secs;
        self
    }

    pub fn skills(&self) -> &dyn SkillStore {
        self.skills.as_ref()
    }

    pub fn files(&self) -> &FileTools {
        &self.files
    }

    /// Execute one tool call and return the text for its `tool` message.
    ///
    /// Boxed because `Task` re-enters the control loop, which dispatches again.
    pub fn dispatch<'a>(
        &'a self,
        agent: &'a AgentLoop,
        session: &'a mut AgentSession,
        call: &'a MessageToolCall,
        scope: &'a ToolScope,
        depth: u32,
    ) -> BoxFuture<'a, String> {
        Box::pin(async move {
            let start = Instant::now();
            let result = self.execute(agent, session, call, scope, depth).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let (success, output) = match result {
                Ok(output) => (true, output),
                Err(e) => {
                    warn!(tool = %call.name, depth, error = %e, "Tool call failed");
                    (false, format!("Error: {e}"))
                }
            };

            agent.event_bus().publish(DomainEvent::ToolExecuted {
                tool_name: call.name.clone(),
                success,
                output_preview: output.chars().take(PREVIEW_CHARS).collect(),
                duration_ms,
                depth,
                timestamp: Utc::now(),
            });

            output
        })
    }

    async fn execute(
        &self,
        agent: &AgentLoop,
        session: &mut AgentSession,
        call: &MessageToolCall,
        scope: &ToolScope,
        depth: u32,
    ) -> Result<String, ToolError> {
        let tool: ToolName = call.name.parse()?;
        scope.check(tool, depth, agent.limits().max_subagent_depth)?;

        let repaired = repair::repair(&call.arguments)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        if repaired.stage == RepairStage::Rescue {
            agent.event_bus().publish(DomainEvent::ArgumentsRescued {
                tool_name: call.name.clone(),
                timestamp: Utc::now(),
            });
        }
        let arguments = repaired.arguments;

        debug!(tool = %tool, depth, stage = ?repaired.stage, "Dispatching tool call");
        agent.event_bus().publish(DomainEvent::ToolStarted {
            tool_name: tool.to_string(),
            arguments: serde_json::Value::Object(arguments.clone()),
            depth,
            timestamp: Utc::now(),
        });

        match tool {
            ToolName::Bash => {
                let args: BashArgs = decode(arguments)?;
                if !args.background {
                    return self.shell.run(&args.command).await;
                }
                let launch = self.shell.launch_background(&args.command).await?;
                if let Err(e) = session.jobs.add(&launch.pid, &args.command, &launch.log_path) {
                    warn!(error = %e, "Background job started but is not tracked");
                }
                Ok(launch.describe())
            }
            ToolName::ReadFile => self.files.read(decode::<ReadFileArgs>(arguments)?).await,
            ToolName::WriteFile => self.files.write(decode::<WriteFileArgs>(arguments)?).await,
            ToolName::EditFile => self.files.edit(decode::<EditFileArgs>(arguments)?).await,
            ToolName::TodoWrite => {
                let args: TodoWriteArgs = decode(arguments)?;
                session
                    .todos
                    .update(args.items)
                    .map_err(|e| ToolError::Failed(e.to_string()))
            }
            ToolName::Wait => {
                let args: WaitArgs = decode(arguments)?;
                let waited = wait::wait(args, self.max_wait_secs).await;
                Ok(format!(
                    "{waited}\n\nBackground jobs:\n{}",
                    session.job_summary()
                ))
            }
            ToolName::Task => {
                let args: TaskArgs = decode(arguments)?;
                SubAgentSpawner::new(agent)
                    .run_task(&args.description, &args.prompt, &args.agent_type, session, depth)
                    .await
            }
            ToolName::Skill => {
                let args: SkillArgs = decode(arguments)?;
                skills::load_skill(self.skills.as_ref(), &args.skill)
            }
        }
    }
}

fn decode<T: DeserializeOwned>(arguments: ArgumentMap) -> Result<T, ToolError> {
    serde_json::from_value(serde_json::Value::Object(arguments))
        .map_err(|e| ToolError::InvalidArguments(e.to_string()))
}
