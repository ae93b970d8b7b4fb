//! Job tracker: background processes and their liveness.
//!
//! Liveness is polled, never pushed. Each call to [`JobTracker::status_summary`]
//! asks a [`ProcessProbe`] about every tracked pid. A job observed as done
//! stays done, so a recycled pid cannot bring it back to life.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

/// What the OS says about a pid right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    Zombie,
    Absent,
    /// The probe could not tell
    Unknown,
}

/// Source of process liveness.
pub trait ProcessProbe: Send + Sync {
    fn state(&self, pid: u32) -> ProcessState;
}

/// Reads `/proc/<pid>/stat`, falling back to `ps` where procfs is missing.
///
/// Both paths block. Async callers poll through
/// `AgentSession::job_summary`, which moves off the worker first.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcfsProbe;

impl ProcessProbe for ProcfsProbe {
    fn state(&self, pid: u32) -> ProcessState {
        if Path::new("/proc/self/stat").exists() {
            return match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
                Ok(stat) => parse_proc_stat(&stat),
                Err(_) => ProcessState::Absent,
            };
        }

        match std::process::Command::new("ps")
            .args(["-o", "stat=", "-p", &pid.to_string()])
            .output()
        {
            Ok(output) => {
                let stat = String::from_utf8_lossy(&output.stdout);
                match stat.trim().chars().next() {
                    None => ProcessState::Absent,
                    Some('Z') => ProcessState::Zombie,
                    Some(_) => ProcessState::Running,
                }
            }
            Err(e) => {
                debug!(pid, error = %e, "ps probe failed");
                ProcessState::Unknown
            }
        }
    }
}

/// The state letter follows the parenthesised command name, which may
/// itself contain spaces and parentheses.
fn parse_proc_stat(stat: &str) -> ProcessState {
    let Some(close) = stat.rfind(')') else {
        return ProcessState::Unknown;
    };
    match stat[close + 1..].trim_start().chars().next() {
        Some('Z') => ProcessState::Zombie,
        Some('X') => ProcessState::Absent,
        Some(_) => ProcessState::Running,
        None => ProcessState::Unknown,
    }
}

/// Reported status of a tracked job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Zombie,
    Done,
    Invalid,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Running => "RUNNING",
            Self::Zombie => "ZOMBIE",
            Self::Done => "DONE",
            Self::Invalid => "INVALID",
        })
    }
}

/// A background process launched by the shell tool.
#[derive(Debug, Clone)]
pub struct Job {
    pub pid: u32,
    pub command: String,
    pub log_path: String,
    pub started_at: DateTime<Utc>,
    pub status: JobStatus,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum JobError {
    #[error("Invalid PID received: {0}")]
    InvalidPid(String),
}

/// Registry of background jobs, keyed by pid.
pub struct JobTracker {
    jobs: BTreeMap<u32, Job>,
    probe: Box<dyn ProcessProbe>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::with_probe(Box::new(ProcfsProbe))
    }

    pub fn with_probe(probe: Box<dyn ProcessProbe>) -> Self {
        Self {
            jobs: BTreeMap::new(),
            probe,
        }
    }

    /// Register a job. The pid arrives as text (it is echoed by the shell).
    pub fn add(&mut self, pid: &str, command: &str, log_path: &str) -> Result<u32, JobError> {
        let pid: u32 = pid.trim().parse().map_err(|_| {
            warn!(pid, "Refusing to track job with a non-numeric pid");
            JobError::InvalidPid(pid.to_string())
        })?;

        debug!(pid, command, log_path, "Tracking background job");
        self.jobs.insert(
            pid,
            Job {
                pid,
                command: command.to_string(),
                log_path: log_path.to_string(),
                started_at: Utc::now(),
                status: JobStatus::Running,
            },
        );
        Ok(pid)
    }

    pub fn get(&self, pid: u32) -> Option<&Job> {
        self.jobs.get(&pid)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Re-poll every job and render one line each.
    pub fn status_summary(&mut self) -> String {
        if self.jobs.is_empty() {
            return "No background jobs running.".into();
        }

        let now = Utc::now();
        let mut lines = Vec::with_capacity(self.jobs.len());

        for job in self.jobs.values_mut() {
            if job.status != JobStatus::Done {
                job.status = match self.probe.state(job.pid) {
                    ProcessState::Running => JobStatus::Running,
                    ProcessState::Zombie => JobStatus::Zombie,
                    ProcessState::Absent => JobStatus::Done,
                    ProcessState::Unknown => JobStatus::Invalid,
                };
            }

            let elapsed = (now - job.started_at).num_seconds().max(0);
            let command: String = job.command.chars().take(30).collect();
            lines.push(format!(
                "[PID {}] Status: {} | Time: {}m {}s | Log: {} | Cmd: {}...",
                job.pid,
                job.status,
                elapsed / 60,
                elapsed % 60,
                job.log_path,
                command
            ));
        }

        lines.join("\n")
    }
}

impl Default for JobTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for JobTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobTracker").field("jobs", &self.jobs).finish()
    }
}
