//! Console rendering of domain events.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use taskloom_core::DomainEvent;
use tokio::sync::broadcast::{self, error::RecvError};

/// Characters of tool arguments shown on a call line.
const ARGS_PREVIEW_CHARS: usize = 200;

/// Turns the loop's events into console lines.
///
/// Tracks when each sub-agent level started so tool calls inside it can be
/// reported with elapsed time.
#[derive(Default)]
pub struct ProgressRenderer {
    subagents: HashMap<u32, (String, DateTime<Utc>)>,
}

impl ProgressRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, event: &DomainEvent) -> Option<String> {
        match event {
            DomainEvent::ResponseGenerated {
                content,
                tool_calls,
                depth: 0,
                ..
            } if *tool_calls > 0 && !content.trim().is_empty() => Some(content.trim().to_string()),

            DomainEvent::ToolStarted {
                tool_name,
                arguments,
                depth: 0,
                ..
            } => Some(call_line(tool_name, arguments)),

            DomainEvent::ToolExecuted {
                output_preview,
                depth: 0,
                ..
            } => Some(indent(output_preview)),

            DomainEvent::ToolExecuted {
                tool_name,
                success,
                depth,
                timestamp,
                ..
            } => {
                let (agent_type, started) = self.subagents.get(depth)?;
                let elapsed = elapsed_secs(*started, *timestamp);
                let mark = if *success { "" } else { " (error)" };
                Some(format!("  [{agent_type}] {tool_name}{mark} ({elapsed:.1}s)"))
            }

            DomainEvent::SubAgentStarted {
                agent_type,
                description,
                depth,
                timestamp,
            } => {
                self.subagents
                    .insert(*depth, (agent_type.clone(), *timestamp));
                Some(format!("  [{agent_type}] started: {description}"))
            }

            DomainEvent::SubAgentFinished {
                agent_type,
                steps,
                outcome,
                elapsed_ms,
                depth,
                ..
            } => {
                self.subagents.remove(depth);
                Some(format!(
                    "  [{agent_type}] {outcome} after {steps} steps ({:.1}s)",
                    *elapsed_ms as f64 / 1000.0
                ))
            }

            DomainEvent::ArgumentsRescued { tool_name, .. } => {
                Some(format!("  (recovered malformed arguments for {tool_name})"))
            }

            _ => None,
        }
    }
}

/// Render events until every sender is gone. Lines still queued when the
/// bus closes are delivered before this returns.
pub async fn render_until_closed(
    mut events: broadcast::Receiver<Arc<DomainEvent>>,
    mut renderer: ProgressRenderer,
    mut emit: impl FnMut(String),
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if let Some(line) = renderer.render(&event) {
                    emit(line);
                }
            }
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        }
    }
}

fn call_line(tool_name: &str, arguments: &serde_json::Value) -> String {
    let field = |key: &str| arguments.get(key).and_then(|v| v.as_str()).unwrap_or("");
    match tool_name {
        "Task" => format!("> Task ({}): {}", field("agent_type"), field("description")),
        "Skill" => format!("> Loading skill: {}", field("skill")),
        _ => {
            let args: String = arguments.to_string().chars().take(ARGS_PREVIEW_CHARS).collect();
            format!("> {tool_name}: {args}")
        }
    }
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("  {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds().max(0) as f64 / 1000.0
}
