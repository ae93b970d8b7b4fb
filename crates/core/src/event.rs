//! Domain event system: decoupled progress reporting.
//!
//! The loop publishes events as it works; the CLI (or anything else) can
//! subscribe and render them without the loop knowing who is watching.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// The backend produced an assistant message
    ResponseGenerated {
        conversation_id: String,
        model: String,
        content: String,
        tool_calls: usize,
        tokens_used: Option<u32>,
        depth: u32,
        timestamp: DateTime<Utc>,
    },

    /// A tool call is about to run
    ToolStarted {
        tool_name: String,
        arguments: serde_json::Value,
        depth: u32,
        timestamp: DateTime<Utc>,
    },

    /// A tool call produced its result (or a diagnostic)
    ToolExecuted {
        tool_name: String,
        success: bool,
        output_preview: String,
        duration_ms: u64,
        depth: u32,
        timestamp: DateTime<Utc>,
    },

    /// Argument decoding fell through to the regex rescue stage
    ArgumentsRescued {
        tool_name: String,
        timestamp: DateTime<Utc>,
    },

    /// A sub-agent was spawned
    SubAgentStarted {
        agent_type: String,
        description: String,
        depth: u32,
        timestamp: DateTime<Utc>,
    },

    /// A sub-agent returned control to its parent
    SubAgentFinished {
        agent_type: String,
        steps: u32,
        outcome: String,
        elapsed_ms: u64,
        depth: u32,
        timestamp: DateTime<Utc>,
    },

    /// An error occurred
    ErrorOccurred {
        context: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(DomainEvent::ToolExecuted {
            tool_name: "bash".into(),
            success: true,
            output_preview: "ok".into(),
            duration_ms: 42,
            depth: 0,
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            DomainEvent::ToolExecuted { tool_name, success, .. } => {
                assert_eq!(tool_name, "bash");
                assert!(success);
            }
            _ => panic!("Expected ToolExecuted event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(DomainEvent::ErrorOccurred {
            context: "test".into(),
            error_message: "no subscribers".into(),
            timestamp: Utc::now(),
        });
    }
}
