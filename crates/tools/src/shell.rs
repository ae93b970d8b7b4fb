//! Shell tool: run commands in the workspace, in the foreground or detached.
//!
//! Foreground commands block up to a timeout and return combined output.
//! Background commands are wrapped in `nohup … &`; the launch returns as soon
//! as the shell echoes the child's pid. Output goes to a per-launch log file
//! in the workspace.

use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use taskloom_core::ToolError;
use taskloom_security::{CommandCheck, CommandPolicy};
use tokio::process::Command;
use tracing::{debug, warn};

const TOOL: &str = "bash";

/// Distinguishes launches that land in the same millisecond.
static LAUNCH_SEQ: AtomicU64 = AtomicU64::new(0);

fn log_file_name() -> String {
    let seq = LAUNCH_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("nohup_{}_{seq}.log", chrono::Utc::now().timestamp_millis())
}

#[derive(Debug, Clone, Deserialize)]
pub struct BashArgs {
    pub command: String,
    #[serde(default)]
    pub background: bool,
}

/// A detached process that was just started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundLaunch {
    /// Pid as echoed by the shell; validated by the job tracker
    pub pid: String,
    /// Log file, relative to the workspace
    pub log_path: String,
}

impl BackgroundLaunch {
    /// Reply text for the model.
    pub fn describe(&self) -> String {
        format!(
            "Background process started.\nPID: {}\nLog file: {}\nAction: Use 'read_file {}' to check progress later.",
            self.pid, self.log_path, self.log_path
        )
    }
}

#[derive(Debug, Clone)]
pub struct ShellRunner {
    workdir: PathBuf,
    policy: CommandPolicy,
    timeout: Duration,
    launch_timeout: Duration,
    output_limit: usize,
}

impl ShellRunner {
    pub fn new(workdir: impl Into<PathBuf>, policy: CommandPolicy) -> Self {
        Self {
            workdir: workdir.into(),
            policy,
            timeout: Duration::from_secs(120),
            launch_timeout: Duration::from_secs(10),
            output_limit: 50_000,
        }
    }

    pub fn with_timeouts(mut self, timeout: Duration, launch_timeout: Duration) -> Self {
        self.timeout = timeout;
        self.launch_timeout = launch_timeout;
        self
    }

    pub fn with_output_limit(mut self, limit: usize) -> Self {
        self.output_limit = limit;
        self
    }

    fn screen(&self, command: &str) -> Result<(), ToolError> {
        match self.policy.check(command) {
            CommandCheck::Allowed => Ok(()),
            CommandCheck::Blocked { .. } => {
                Err(ToolError::SandboxViolation("Dangerous command".into()))
            }
        }
    }

    /// Run to completion and return trimmed stdout+stderr.
    pub async fn run(&self, command: &str) -> Result<String, ToolError> {
        self.screen(command)?;
        debug!(command, "Executing shell command");

        let child = Command::new("sh")
            .args(["-c", command])
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| {
                warn!(command, "Shell command timed out");
                ToolError::Timeout {
                    tool_name: TOOL.into(),
                    timeout_secs: self.timeout.as_secs(),
                }
            })?
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: TOOL.into(),
                reason: e.to_string(),
            })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        let text = text.trim();

        if !output.status.success() {
            debug!(command, exit_code = output.status.code().unwrap_or(-1), "Command exited non-zero");
        }

        if text.is_empty() {
            return Ok("(no output)".into());
        }
        Ok(text.chars().take(self.output_limit).collect())
    }

    /// Start `command` detached and return its pid and log file.
    pub async fn launch_background(&self, command: &str) -> Result<BackgroundLaunch, ToolError> {
        self.screen(command)?;

        let log_path = log_file_name();
        let wrapped = format!(
            "nohup sh -c {} > {} 2>&1 & echo $!",
            shell_quote(command),
            log_path
        );
        debug!(command, log_path = %log_path, "Launching background command");

        let launcher = Command::new("sh")
            .args(["-c", &wrapped])
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .output();

        let output = tokio::time::timeout(self.launch_timeout, launcher)
            .await
            .map_err(|_| ToolError::Timeout {
                tool_name: TOOL.into(),
                timeout_secs: self.launch_timeout.as_secs(),
            })?
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: TOOL.into(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(ToolError::Failed(format!(
                "Error starting background job: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(BackgroundLaunch {
            pid: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            log_path,
        })
    }
}

/// Single-quote `s` for `sh`.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
