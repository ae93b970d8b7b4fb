//! The control loop: request a completion, run the requested tools, repeat.

use chrono::{Local, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use taskloom_config::AppConfig;
use taskloom_core::event::{DomainEvent, EventBus};
use taskloom_core::message::{Conversation, Message};
use taskloom_core::provider::{Provider, ProviderRequest, ToolChoice};
use taskloom_core::ProviderError;
use taskloom_security::CommandPolicy;
use taskloom_tools::schema::{self, SchemaContext};
use taskloom_tools::{FileTools, ShellRunner, SkillStore};
use tracing::{debug, error, info};

use crate::agent_types::AgentTypeRegistry;
use crate::dispatcher::{ToolDispatcher, ToolScope};
use crate::prompt;
use crate::session::AgentSession;

/// Bounds on sub-agent work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopLimits {
    /// Completion requests a sub-agent may make
    pub subagent_max_steps: u32,
    /// Deepest level a loop may run at; the top level is 0
    pub max_subagent_depth: u32,
}

impl Default for LoopLimits {
    fn default() -> Self {
        Self {
            subagent_max_steps: 10,
            max_subagent_depth: 2,
        }
    }
}

/// How a run of the loop ended.
#[derive(Debug)]
pub enum LoopOutcome {
    /// The model answered without requesting tools
    Finished { content: String, steps: u32 },
    /// The step ceiling was hit while the model still wanted tools
    StepLimitReached { steps: u32 },
    /// The completion request failed
    Failed { error: ProviderError, steps: u32 },
}

/// The core agent loop that orchestrates LLM calls and tool execution.
pub struct AgentLoop {
    /// The LLM provider to use
    provider: Arc<dyn Provider>,

    /// The model to use
    model: String,

    /// Temperature setting
    temperature: f32,

    /// Default max tokens per response
    max_tokens: Option<u32>,

    /// Tool routing and handlers
    dispatcher: ToolDispatcher,

    /// Sub-agent roles
    agent_types: AgentTypeRegistry,

    /// Workspace the agent operates in
    workdir: PathBuf,

    /// Agent types and skills embedded in tool schemas
    schema_ctx: SchemaContext,

    limits: LoopLimits,

    /// Event bus for domain events
    event_bus: Arc<EventBus>,
}

impl AgentLoop {
    /// Create a new agent loop.
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        dispatcher: ToolDispatcher,
        agent_types: AgentTypeRegistry,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let schema_ctx = SchemaContext {
            agent_types: agent_types.summaries(),
            skills: dispatcher.skills().descriptions(),
        };
        let workdir = dispatcher.files().workdir().to_path_buf();

        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
            dispatcher,
            agent_types,
            workdir,
            schema_ctx,
            limits: LoopLimits::default(),
            event_bus,
        }
    }

    /// Wire up handlers, roles and limits from configuration.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        skills: Arc<dyn SkillStore>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let workdir = config.workdir();
        let shell = ShellRunner::new(
            &workdir,
            CommandPolicy::new(config.shell.blocked_patterns.clone()),
        )
        .with_timeouts(
            Duration::from_secs(config.shell.timeout_secs),
            Duration::from_secs(config.shell.launch_timeout_secs),
        )
        .with_output_limit(config.shell.output_limit);
        let files = FileTools::new(&workdir).with_read_limit(config.tools.read_limit);
        let dispatcher =
            ToolDispatcher::new(shell, files, skills).with_max_wait(config.tools.max_wait_secs);

        let mut agent = Self::new(
            provider,
            model,
            dispatcher,
            AgentTypeRegistry::with_overrides(&config.agent_types),
            event_bus,
        )
        .with_temperature(config.agent.temperature)
        .with_limits(LoopLimits {
            subagent_max_steps: config.agent.subagent_max_steps,
            max_subagent_depth: config.agent.max_subagent_depth,
        });
        if let Some(max) = config.agent.max_tokens {
            agent = agent.with_max_tokens(max);
        }
        agent
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the default max tokens per LLM response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_limits(mut self, limits: LoopLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn limits(&self) -> LoopLimits {
        self.limits
    }

    pub fn agent_types(&self) -> &AgentTypeRegistry {
        &self.agent_types
    }

    pub fn skills(&self) -> &dyn SkillStore {
        self.dispatcher.skills()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// System prompt for the top-level agent.
    pub fn system_prompt(&self) -> String {
        prompt::system_prompt(
            &self.workdir,
            &self.schema_ctx.skills,
            &self.schema_ctx.agent_descriptions(),
        )
    }

    /// A fresh conversation seeded with the system prompt.
    pub fn new_conversation(&self) -> Conversation {
        Conversation::with_system(self.system_prompt())
    }

    /// Run the top-level loop until the model stops requesting tools.
    ///
    /// Returns the final assistant text. A backend failure ends the run
    /// immediately; it is printed when `interactive`, logged otherwise.
    pub async fn run(
        &self,
        conversation: &mut Conversation,
        session: &mut AgentSession,
        interactive: bool,
    ) -> Result<String, taskloom_core::Error> {
        info!(
            conversation_id = %conversation.id,
            messages = conversation.len(),
            "Processing conversation"
        );

        match self
            .drive(conversation, session, &ToolScope::main(), None, 0)
            .await
        {
            LoopOutcome::Finished { content, .. } => Ok(content),
            LoopOutcome::StepLimitReached { steps } => Err(taskloom_core::Error::Internal(
                format!("step limit reached after {steps} steps"),
            )),
            LoopOutcome::Failed { error, steps } => {
                if interactive {
                    eprintln!("Error: {error}");
                } else {
                    error!(
                        conversation_id = %conversation.id,
                        steps,
                        error = %error,
                        "Completion request failed"
                    );
                }
                self.event_bus.publish(DomainEvent::ErrorOccurred {
                    context: "completion".into(),
                    error_message: error.to_string(),
                    timestamp: Utc::now(),
                });
                Err(error.into())
            }
        }
    }

    /// The two-state loop shared by the top level and every sub-agent.
    ///
    /// `max_steps` bounds the number of completion requests; `None` means
    /// unbounded.
    pub(crate) async fn drive(
        &self,
        conversation: &mut Conversation,
        session: &mut AgentSession,
        scope: &ToolScope,
        max_steps: Option<u32>,
        depth: u32,
    ) -> LoopOutcome {
        let tools = schema::definitions(
            &scope.offered(depth, self.limits.max_subagent_depth),
            &self.schema_ctx,
        );
        let mut steps = 0;

        loop {
            if max_steps.is_some_and(|max| steps >= max) {
                info!(agent_type = %scope.agent_type, depth, steps, "Step limit reached");
                return LoopOutcome::StepLimitReached { steps };
            }
            steps += 1;
            debug!(agent_type = %scope.agent_type, depth, step = steps, "Agent loop iteration");

            // The status message rides along with this request only.
            let mut messages = conversation.messages().to_vec();
            messages.push(prompt::status_message(
                Local::now(),
                &session.job_summary(),
            ));

            let request = ProviderRequest {
                model: self.model.clone(),
                messages,
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: tools.clone(),
                tool_choice: ToolChoice::Auto,
            };

            let response = match self.provider.complete(request).await {
                Ok(response) => response,
                Err(error) => return LoopOutcome::Failed { error, steps },
            };

            self.event_bus.publish(DomainEvent::ResponseGenerated {
                conversation_id: conversation.id.to_string(),
                model: response.model.clone(),
                content: response.message.content.clone(),
                tool_calls: response.message.tool_calls.len(),
                tokens_used: response.usage.as_ref().map(|u| u.total_tokens),
                depth,
                timestamp: Utc::now(),
            });

            let message = response.message;
            if !message.has_tool_calls() {
                let content = message.content.clone();
                conversation.push(message);
                return LoopOutcome::Finished { content, steps };
            }

            debug!(tool_count = message.tool_calls.len(), "Executing tool calls");
            let tool_calls = message.tool_calls.clone();
            conversation.push(message);

            for tc in &tool_calls {
                let output = self
                    .dispatcher
                    .dispatch(self, session, tc, scope, depth)
                    .await;
                conversation.push(Message::tool_result(&tc.id, output));
            }
        }
    }
}
