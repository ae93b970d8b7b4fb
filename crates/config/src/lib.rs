//! Configuration loading, validation, and management for taskloom.
//!
//! Loads configuration from `~/.taskloom/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use taskloom_core::agent::ToolFilter;

/// The root configuration structure.
///
/// Maps directly to `~/.taskloom/config.toml`.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the completion backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Model name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Workspace root (defaults to the current directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<PathBuf>,

    /// Skills directory (defaults to `<workdir>/skills`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills_dir: Option<PathBuf>,

    /// Loop and sub-agent settings
    #[serde(default)]
    pub agent: AgentSettings,

    /// Shell tool settings
    #[serde(default)]
    pub shell: ShellSettings,

    /// Limits for the remaining tools
    #[serde(default)]
    pub tools: ToolSettings,

    /// Extra or overriding sub-agent roles, keyed by name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub agent_types: BTreeMap<String, AgentTypeConfig>,
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("workdir", &self.workdir)
            .field("skills_dir", &self.skills_dir)
            .field("agent", &self.agent)
            .field("shell", &self.shell)
            .field("tools", &self.tools)
            .field("agent_types", &self.agent_types)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Sampling temperature; zero keeps tool routing deterministic
    #[serde(default)]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Request/response rounds a sub-agent gets before it is cut off
    #[serde(default = "default_subagent_max_steps")]
    pub subagent_max_steps: u32,

    /// How many levels of Task nesting are allowed below the top-level loop
    #[serde(default = "default_max_subagent_depth")]
    pub max_subagent_depth: u32,
}

fn default_subagent_max_steps() -> u32 {
    10
}
fn default_max_subagent_depth() -> u32 {
    2
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: None,
            subagent_max_steps: default_subagent_max_steps(),
            max_subagent_depth: default_max_subagent_depth(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellSettings {
    /// Wall-clock limit for foreground commands
    #[serde(default = "default_shell_timeout")]
    pub timeout_secs: u64,

    /// How long a background launch may take to report its pid
    #[serde(default = "default_launch_timeout")]
    pub launch_timeout_secs: u64,

    /// Maximum characters of output returned to the model
    #[serde(default = "default_output_limit")]
    pub output_limit: usize,

    /// Commands containing any of these substrings are refused
    #[serde(default = "default_blocked_patterns")]
    pub blocked_patterns: Vec<String>,
}

fn default_shell_timeout() -> u64 {
    120
}
fn default_launch_timeout() -> u64 {
    10
}
fn default_output_limit() -> usize {
    50_000
}
fn default_blocked_patterns() -> Vec<String> {
    vec!["rm -rf /".into(), "sudo".into(), "shutdown".into()]
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_shell_timeout(),
            launch_timeout_secs: default_launch_timeout(),
            output_limit: default_output_limit(),
            blocked_patterns: default_blocked_patterns(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Maximum characters returned by read_file
    #[serde(default = "default_output_limit")]
    pub read_limit: usize,

    /// Upper clamp for the wait tool
    #[serde(default = "default_max_wait")]
    pub max_wait_secs: u64,
}

fn default_max_wait() -> u64 {
    3600
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            read_limit: default_output_limit(),
            max_wait_secs: default_max_wait(),
        }
    }
}

/// A sub-agent role as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTypeConfig {
    pub description: String,

    pub prompt: String,

    /// `"*"` or a list of tool names
    #[serde(default = "ToolFilter::all")]
    pub tools: ToolFilter,
}

/// The three settings needed to reach the completion backend.
#[derive(Clone)]
pub struct BackendSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl std::fmt::Debug for BackendSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendSettings")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.taskloom/config.toml),
    /// then apply environment overrides.
    ///
    /// Environment variables (the `TASKLOOM_` form wins):
    /// - `TASKLOOM_API_KEY` / `API_KEY`
    /// - `TASKLOOM_BASE_URL` / `BASE_URL`
    /// - `TASKLOOM_MODEL` / `MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Overlay environment values onto the file values.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let pick = |primary: &str, fallback: &str| {
            lookup(primary)
                .or_else(|| lookup(fallback))
                .filter(|v| !v.trim().is_empty())
        };

        if let Some(key) = pick("TASKLOOM_API_KEY", "API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(url) = pick("TASKLOOM_BASE_URL", "BASE_URL") {
            self.base_url = Some(url);
        }
        if let Some(model) = pick("TASKLOOM_MODEL", "MODEL") {
            self.model = Some(model);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".taskloom")
    }

    /// The workspace root every tool is confined to.
    pub fn workdir(&self) -> PathBuf {
        self.workdir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Where skills are loaded from.
    pub fn skills_dir(&self) -> PathBuf {
        self.skills_dir
            .clone()
            .unwrap_or_else(|| self.workdir().join("skills"))
    }

    /// Everything needed to build the backend client, or the full list of
    /// what is missing.
    pub fn backend(&self) -> Result<BackendSettings, ConfigError> {
        let missing: Vec<&str> = [
            ("API_KEY", &self.api_key),
            ("BASE_URL", &self.base_url),
            ("MODEL", &self.model),
        ]
        .into_iter()
        .filter(|(_, v)| v.is_none())
        .map(|(name, _)| name)
        .collect();

        match (&self.api_key, &self.base_url, &self.model) {
            (Some(api_key), Some(base_url), Some(model)) => Ok(BackendSettings {
                api_key: api_key.clone(),
                base_url: base_url.clone(),
                model: model.clone(),
            }),
            _ => Err(ConfigError::MissingSettings(missing.join(", "))),
        }
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.agent.temperature) {
            return Err(ConfigError::ValidationError(
                "agent.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.subagent_max_steps == 0 {
            return Err(ConfigError::ValidationError(
                "agent.subagent_max_steps must be at least 1".into(),
            ));
        }

        if let Some((name, _)) = self
            .agent_types
            .iter()
            .find(|(_, t)| t.prompt.trim().is_empty())
        {
            return Err(ConfigError::ValidationError(format!(
                "agent_types.{name}.prompt must not be empty"
            )));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("missing settings: {0} (set them in the environment or config.toml)")]
    MissingSettings(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use taskloom_core::tool::ToolName;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.agent.temperature, 0.0);
        assert_eq!(config.agent.subagent_max_steps, 10);
        assert_eq!(config.shell.timeout_secs, 120);
        assert_eq!(config.tools.max_wait_secs, 3600);
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert!(config.api_key.is_none());
        assert_eq!(config.shell.output_limit, 50_000);
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = AppConfig {
            model: Some("from-file".into()),
            ..AppConfig::default()
        };
        config.apply_env_overrides(env(&[
            ("API_KEY", "sk-plain"),
            ("TASKLOOM_API_KEY", "sk-prefixed"),
            ("MODEL", "from-env"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("sk-prefixed"));
        assert_eq!(config.model.as_deref(), Some("from-env"));
        assert!(config.base_url.is_none());
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(env(&[("BASE_URL", "  ")]));
        assert!(config.base_url.is_none());
    }

    #[test]
    fn backend_lists_every_missing_setting() {
        let config = AppConfig {
            model: Some("m".into()),
            ..AppConfig::default()
        };
        let err = config.backend().unwrap_err();
        assert!(err.to_string().contains("API_KEY, BASE_URL"));
    }

    #[test]
    fn backend_complete() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(env(&[
            ("API_KEY", "k"),
            ("BASE_URL", "http://localhost:8000/v1"),
            ("MODEL", "m"),
        ]));
        let backend = config.backend().unwrap();
        assert_eq!(backend.model, "m");
        assert!(!format!("{backend:?}").contains("\"k\""));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        assert!(!format!("{config:?}").contains("sk-secret"));
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.agent.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_step_ceiling_rejected() {
        let mut config = AppConfig::default();
        config.agent.subagent_max_steps = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn agent_types_parse_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
model = "deepseek-chat"

[agent]
max_subagent_depth = 1

[agent_types.reviewer]
description = "Reviews diffs"
prompt = "You review code. Never modify files."
tools = ["read_file", "bash"]

[agent_types.builder]
description = "Builds things"
prompt = "You build."
tools = "*"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.agent.max_subagent_depth, 1);
        let reviewer = &config.agent_types["reviewer"];
        assert!(reviewer.tools.allows(ToolName::ReadFile));
        assert!(!reviewer.tools.allows(ToolName::WriteFile));
        assert_eq!(config.agent_types["builder"].tools, ToolFilter::all());
    }

    #[test]
    fn unknown_tool_in_agent_type_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[agent_types.bad]
description = "x"
prompt = "y"
tools = ["launch_missiles"]
"#,
        )
        .unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("subagent_max_steps"));
        assert!(toml_str.contains("blocked_patterns"));
    }
}
