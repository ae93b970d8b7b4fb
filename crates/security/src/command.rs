//! Command screening: refuse shell commands matching a blocked pattern.
//!
//! This is a coarse substring screen, not a sandbox. It catches the obvious
//! foot-guns a model might emit (`sudo`, `rm -rf /`, `shutdown`).

/// Result of checking a command against the policy.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandCheck {
    /// Command may run
    Allowed,
    /// Command contains a blocked pattern
    Blocked { pattern: String },
}

/// Blocked-pattern policy for the shell tool.
#[derive(Debug, Clone)]
pub struct CommandPolicy {
    blocked_patterns: Vec<String>,
}

impl CommandPolicy {
    pub fn new(blocked_patterns: Vec<String>) -> Self {
        Self { blocked_patterns }
    }

    /// Check a command. The first matching pattern wins.
    pub fn check(&self, command: &str) -> CommandCheck {
        match self
            .blocked_patterns
            .iter()
            .find(|p| !p.is_empty() && command.contains(p.as_str()))
        {
            Some(pattern) => {
                tracing::warn!(command, pattern = %pattern, "Blocked shell command");
                CommandCheck::Blocked {
                    pattern: pattern.clone(),
                }
            }
            None => CommandCheck::Allowed,
        }
    }
}

impl Default for CommandPolicy {
    fn default() -> Self {
        Self::new(vec!["rm -rf /".into(), "sudo".into(), "shutdown".into()])
    }
}
