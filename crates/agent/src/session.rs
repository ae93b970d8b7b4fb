//! Per-session mutable state shared by the loop, the dispatcher and every
//! sub-agent spawned from it.

use taskloom_tools::{JobTracker, ProcessProbe, TodoManager};
use tokio::runtime::{Handle, RuntimeFlavor};

/// Background jobs and the todo list for one agent session.
///
/// Only one control-loop thread touches a session at a time, so no locking.
#[derive(Debug, Default)]
pub struct AgentSession {
    pub jobs: JobTracker,
    pub todos: TodoManager,
}

impl AgentSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_probe(probe: Box<dyn ProcessProbe>) -> Self {
        Self {
            jobs: JobTracker::with_probe(probe),
            todos: TodoManager::new(),
        }
    }

    /// Poll every job and render the summary.
    ///
    /// Probing reads procfs or runs `ps`, both blocking. On a multi-thread
    /// runtime the worker is handed off first so other tasks keep running.
    pub fn job_summary(&mut self) -> String {
        let on_multi_thread = Handle::try_current()
            .map(|h| h.runtime_flavor() == RuntimeFlavor::MultiThread)
            .unwrap_or(false);
        if on_multi_thread {
            tokio::task::block_in_place(|| self.jobs.status_summary())
        } else {
            self.jobs.status_summary()
        }
    }
}
