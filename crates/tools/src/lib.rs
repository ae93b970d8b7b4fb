//! Tool handlers and the leaf components of the orchestration core.
//!
//! - [`repair`]: decode malformed tool-argument payloads
//! - [`jobs`]: track background processes by polling their liveness
//! - [`todo`]: the model's task list
//! - [`shell`], [`files`], [`wait`], [`skills`]: capability handlers
//! - [`schema`]: tool definitions offered to the model
//!
//! Handlers return `Result<String, ToolError>`. Turning a failure into text
//! for the model is the dispatcher's job.

pub mod files;
pub mod jobs;
pub mod repair;
pub mod schema;
pub mod shell;
pub mod skills;
pub mod todo;
pub mod wait;

pub use files::{EditFileArgs, FileTools, ReadFileArgs, WriteFileArgs};
pub use jobs::{JobStatus, JobTracker, ProcessProbe, ProcessState, ProcfsProbe};
pub use repair::{ArgumentMap, ArgumentParseError, RepairStage, Repaired, parse_arguments, repair};
pub use schema::SchemaContext;
pub use shell::{BackgroundLaunch, BashArgs, ShellRunner};
pub use skills::{DirSkillStore, Skill, SkillArgs, SkillStore};
pub use todo::{TodoInput, TodoItem, TodoManager, TodoStatus};
pub use wait::WaitArgs;
