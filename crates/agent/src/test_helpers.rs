//! Shared test helpers for loop and sub-agent tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use taskloom_core::error::ProviderError;
use taskloom_core::event::EventBus;
use taskloom_core::message::{Message, MessageToolCall};
use taskloom_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use taskloom_security::CommandPolicy;
use taskloom_tools::{DirSkillStore, FileTools, ProcessProbe, ProcessState, ShellRunner};

use crate::agent_types::AgentTypeRegistry;
use crate::dispatcher::ToolDispatcher;
use crate::loop_runner::{AgentLoop, LoopLimits};
use crate::session::AgentSession;

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue and
/// records the request it was given. Panics if more calls are made than
/// responses provided.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self::new_with_failures(responses.into_iter().map(Ok).collect())
    }

    pub fn new_with_failures(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider that returns a single text response (no tool calls).
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    /// Create a provider that first returns tool calls, then a final answer.
    pub fn tool_then_answer(tool_calls: Vec<MessageToolCall>, thought: &str, answer: &str) -> Self {
        Self::new(vec![
            make_tool_call_response(tool_calls, thought),
            make_text_response(answer),
        ])
    }

    /// A provider whose first call fails with a network error.
    pub fn failing() -> Self {
        Self::new_with_failures(vec![Err(ProviderError::Network("connection refused".into()))])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let index = requests.len();

        if index >= responses.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                index,
                responses.len()
            );
        }

        requests.push(request);
        responses[index].clone()
    }
}

/// Create a simple text response (no tool calls).
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Create a response with tool calls and optional thought content.
pub fn make_tool_call_response(tool_calls: Vec<MessageToolCall>, thought: &str) -> ProviderResponse {
    let mut msg = Message::assistant(thought);
    msg.tool_calls = tool_calls;
    ProviderResponse {
        message: msg,
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Helper to create a tool call.
pub fn make_tool_call(name: &str, args: serde_json::Value) -> MessageToolCall {
    make_tool_call_with_id(&format!("call_{name}"), name, args)
}

pub fn make_tool_call_with_id(id: &str, name: &str, args: serde_json::Value) -> MessageToolCall {
    make_raw_tool_call(id, name, &serde_json::to_string(&args).unwrap())
}

/// A tool call whose argument text is sent exactly as given.
pub fn make_raw_tool_call(id: &str, name: &str, arguments: &str) -> MessageToolCall {
    MessageToolCall {
        id: id.into(),
        name: name.into(),
        arguments: arguments.into(),
    }
}

/// Process probe with scripted answers; unknown pids are absent unless a
/// default is set.
#[derive(Clone, Default)]
pub struct FakeProbe {
    states: Arc<Mutex<HashMap<u32, ProcessState>>>,
    default: Arc<Mutex<Option<ProcessState>>>,
}

impl FakeProbe {
    pub fn set(&self, pid: u32, state: ProcessState) {
        self.states.lock().unwrap().insert(pid, state);
    }

    pub fn set_default(&self, state: ProcessState) {
        *self.default.lock().unwrap() = Some(state);
    }
}

impl ProcessProbe for FakeProbe {
    fn state(&self, pid: u32) -> ProcessState {
        if let Some(state) = self.states.lock().unwrap().get(&pid) {
            return *state;
        }
        self.default.lock().unwrap().unwrap_or(ProcessState::Absent)
    }
}

pub fn test_session() -> AgentSession {
    test_session_with_probe().0
}

pub fn test_session_with_probe() -> (AgentSession, FakeProbe) {
    let probe = FakeProbe::default();
    (AgentSession::with_probe(Box::new(probe.clone())), probe)
}

pub fn test_agent(provider: Arc<dyn Provider>, workdir: &Path) -> AgentLoop {
    test_agent_with(provider, workdir, AgentTypeRegistry::builtin(), LoopLimits::default())
}

pub fn test_agent_with(
    provider: Arc<dyn Provider>,
    workdir: &Path,
    agent_types: AgentTypeRegistry,
    limits: LoopLimits,
) -> AgentLoop {
    let dispatcher = ToolDispatcher::new(
        ShellRunner::new(workdir, CommandPolicy::default()),
        FileTools::new(workdir),
        Arc::new(DirSkillStore::empty()),
    );
    AgentLoop::new(
        provider,
        "mock-model",
        dispatcher,
        agent_types,
        Arc::new(EventBus::default()),
    )
    .with_limits(limits)
}
