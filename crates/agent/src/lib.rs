//! The orchestration core of taskloom.
//!
//! The agent follows a simple two-state cycle:
//!
//! 1. **Request** a completion with the full history, the offered tools and
//!    an ephemeral status message (time + background jobs)
//! 2. **If tool calls**: dispatch each in order, append the results, go to 1
//! 3. **If text**: append it and return
//!
//! `Task` calls recurse into a scoped sub-agent with its own history, a
//! restricted toolset and a step ceiling.

pub mod agent_types;
pub mod dispatcher;
pub mod loop_runner;
pub mod prompt;
pub mod session;
pub mod subagent;

#[cfg(test)]
mod test_helpers;

pub use agent_types::AgentTypeRegistry;
pub use dispatcher::{ToolDispatcher, ToolScope};
pub use loop_runner::{AgentLoop, LoopLimits, LoopOutcome};
pub use session::AgentSession;
pub use subagent::SubAgentSpawner;
