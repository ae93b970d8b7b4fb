//! # taskloom core
//!
//! Domain types, traits, and error definitions for the taskloom agent runtime.
//! This crate has **zero framework dependencies**: it defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the orchestration core is defined as a trait or a
//! plain value type here. Implementations live in their respective crates.
//! This enables:
//! - Swapping the completion backend without touching the loop
//! - Easy testing with scripted providers and fake process probes
//! - Clean dependency graph (all crates depend inward on core)

pub mod agent;
pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use agent::{AgentTypeDescriptor, ToolFilter};
pub use error::{Error, ProviderError, Result, ToolError};
pub use event::{DomainEvent, EventBus};
pub use message::{Conversation, ConversationId, Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolChoice, ToolDefinition};
pub use tool::ToolName;
