//! Skills: named blocks of instructions the model can pull into context.
//!
//! A skill lives in `<skills_dir>/<name>/SKILL.md`. An optional
//! `manifest.toml` next to it may override `name` and `description`;
//! otherwise they come from `SKILL.md` frontmatter, falling back to the
//! directory name and the first line of the body.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use taskloom_core::ToolError;
use tokio::fs;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct SkillArgs {
    pub skill: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skill {
    pub name: String,
    pub description: String,
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
struct SkillManifest {
    name: Option<String>,
    description: Option<String>,
}

/// Where skill content comes from.
pub trait SkillStore: Send + Sync {
    fn names(&self) -> Vec<String>;

    fn get(&self, name: &str) -> Option<&Skill>;

    /// One `- name: description` line per skill.
    fn descriptions(&self) -> String {
        let lines: Vec<String> = self
            .names()
            .iter()
            .filter_map(|n| self.get(n))
            .map(|s| format!("- {}: {}", s.name, s.description))
            .collect();
        if lines.is_empty() {
            "(no skills available)".into()
        } else {
            lines.join("\n")
        }
    }
}

/// Render a loaded skill, or the unknown-skill error text.
pub fn load_skill(store: &dyn SkillStore, name: &str) -> Result<String, ToolError> {
    match store.get(name) {
        Some(skill) => Ok(format!(
            "<skill-loaded name=\"{}\">\n{}\n</skill-loaded>\n\nFollow the instructions in the skill above to complete the user's task.",
            skill.name, skill.content
        )),
        None => {
            let names = store.names();
            let available = if names.is_empty() {
                "none".to_string()
            } else {
                names.join(", ")
            };
            Err(ToolError::Failed(format!(
                "Unknown skill '{name}'. Available: {available}"
            )))
        }
    }
}

/// Skills loaded once from a directory tree.
#[derive(Debug, Clone, Default)]
pub struct DirSkillStore {
    skills: BTreeMap<String, Skill>,
}

impl DirSkillStore {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_skills(skills: impl IntoIterator<Item = Skill>) -> Self {
        Self {
            skills: skills.into_iter().map(|s| (s.name.clone(), s)).collect(),
        }
    }

    /// Scan `dir`. A missing directory yields an empty store.
    pub async fn load(dir: &Path) -> Self {
        let mut store = Self::default();
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "No skills directory");
                return store;
            }
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let skill_dir = entry.path();
            let skill_md = skill_dir.join("SKILL.md");
            let raw = match fs::read_to_string(&skill_md).await {
                Ok(raw) => raw,
                Err(_) => continue,
            };

            let manifest_path = skill_dir.join("manifest.toml");
            let manifest = match fs::read_to_string(&manifest_path).await {
                Ok(contents) => toml::from_str::<SkillManifest>(&contents).unwrap_or_else(|e| {
                    warn!("Failed to parse manifest at {:?}: {}", manifest_path, e);
                    SkillManifest::default()
                }),
                Err(_) => SkillManifest::default(),
            };

            let dir_name = entry.file_name().to_string_lossy().into_owned();
            let skill = parse_skill(&dir_name, &raw, manifest);
            info!("Registering skill: {}", skill.name);
            store.skills.insert(skill.name.clone(), skill);
        }

        store
    }
}

impl SkillStore for DirSkillStore {
    fn names(&self) -> Vec<String> {
        self.skills.keys().cloned().collect()
    }

    fn get(&self, name: &str) -> Option<&Skill> {
        self.skills.get(name)
    }
}

fn parse_skill(dir_name: &str, raw: &str, manifest: SkillManifest) -> Skill {
    let (front, body) = split_frontmatter(raw);
    let body = body.trim().to_string();

    let name = manifest
        .name
        .or_else(|| front.get("name").cloned())
        .unwrap_or_else(|| dir_name.to_string());
    let description = manifest
        .description
        .or_else(|| front.get("description").cloned())
        .unwrap_or_else(|| {
            body.lines()
                .map(|l| l.trim_start_matches('#').trim())
                .find(|l| !l.is_empty())
                .unwrap_or_default()
                .to_string()
        });

    Skill {
        name,
        description,
        content: body,
    }
}

/// Split a `---`-delimited `key: value` header from the body.
fn split_frontmatter(raw: &str) -> (BTreeMap<String, String>, &str) {
    let mut fields = BTreeMap::new();
    let Some(rest) = raw.strip_prefix("---") else {
        return (fields, raw);
    };
    let Some(end) = rest.find("\n---") else {
        return (fields, raw);
    };

    for line in rest[..end].lines() {
        if let Some((key, value)) = line.split_once(':') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            fields.insert(key.trim().to_string(), value.to_string());
        }
    }

    let body = &rest[end + 4..];
    (fields, body)
}
