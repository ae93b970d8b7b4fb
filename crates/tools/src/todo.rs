//! Todo list for multi-step work. Replaced wholesale on every update.

use serde::{Deserialize, Serialize};
use std::fmt;

/// At most this many items are kept.
pub const MAX_TODOS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
}

impl TodoStatus {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    fn marker(self) -> &'static str {
        match self {
            Self::Completed => "[x]",
            Self::InProgress => "[>]",
            Self::Pending => "[ ]",
        }
    }
}

/// One item as the model sends it. Everything is optional so that
/// validation can report which item is wrong.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TodoInput {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "activeForm")]
    pub active_form: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TodoItem {
    pub content: String,
    pub status: TodoStatus,
    #[serde(rename = "activeForm")]
    pub active_form: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TodoError {
    #[error("Item {0}: content and activeForm required")]
    MissingField(usize),
    #[error("Item {0}: invalid status")]
    InvalidStatus(usize),
    #[error("Only one task can be in_progress")]
    MultipleInProgress,
}

#[derive(Debug, Clone, Default)]
pub struct TodoManager {
    items: Vec<TodoItem>,
}

impl TodoManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[TodoItem] {
        &self.items
    }

    /// Validate and replace the whole list. On error the list is untouched.
    pub fn update(&mut self, items: Vec<TodoInput>) -> Result<String, TodoError> {
        let mut validated = Vec::with_capacity(items.len());
        let mut in_progress = 0;

        for (i, item) in items.into_iter().enumerate() {
            let content = item.content.unwrap_or_default().trim().to_string();
            let active_form = item.active_form.unwrap_or_default().trim().to_string();
            if content.is_empty() || active_form.is_empty() {
                return Err(TodoError::MissingField(i));
            }

            let status = match item.status {
                None => TodoStatus::Pending,
                Some(raw) => TodoStatus::parse(&raw).ok_or(TodoError::InvalidStatus(i))?,
            };
            if status == TodoStatus::InProgress {
                in_progress += 1;
            }

            validated.push(TodoItem {
                content,
                status,
                active_form,
            });
        }

        if in_progress > 1 {
            return Err(TodoError::MultipleInProgress);
        }

        validated.truncate(MAX_TODOS);
        self.items = validated;
        Ok(self.render())
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TodoManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.items.is_empty() {
            return f.write_str("No todos.");
        }
        for item in &self.items {
            writeln!(f, "{} {}", item.status.marker(), item.content)?;
        }
        let done = self
            .items
            .iter()
            .filter(|t| t.status == TodoStatus::Completed)
            .count();
        write!(f, "({done}/{} done)", self.items.len())
    }
}
