//! Plain data structures for project / local / user configuration.
//!
//! This crate never parses YAML/TOML itself — a caller-side parser
//! deserializes directly into these structs via the `serde` derives below.
//! `MergedConfig` is the one type produced *by* this crate (via
//! [`super::merge::merge`]) rather than supplied to it.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// `scope` for a [`Command`]: which invocation context it's valid in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum CommandScope {
    Source,
    Feature,
}

/// `event` for a [`Hook`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum HookEvent {
    Up,
    Down,
    Run,
}

/// A named user script invokable by the `Run` operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub name: String,
    /// Script path, relative to `base_dir` unless absolute.
    pub command: String,
    #[serde(default)]
    pub scope: Option<CommandScope>,
    /// Stamped by the config merger; empty until merged.
    #[serde(default)]
    pub base_dir: PathBuf,
}

/// A user script bound to a lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hook {
    pub event: HookEvent,
    pub command: String,
    /// Command-name filter: `None`/empty matches all, `"prefix-*"` matches
    /// by prefix, anything else matches exactly.
    #[serde(default, rename = "for")]
    pub for_command: Option<String>,
    #[serde(default)]
    pub base_dir: PathBuf,
}

impl Hook {
    /// Does this hook's `for` filter admit `command_name`?
    pub fn matches_command(&self, command_name: &str) -> bool {
        match &self.for_command {
            None => true,
            Some(f) if f.is_empty() => true,
            Some(f) => match f.strip_suffix('*') {
                Some(prefix) => command_name.starts_with(prefix),
                None => f == command_name,
            },
        }
    }
}

/// A per-repository environment file to materialize into its worktree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EnvFile {
    /// Path relative to the source repository.
    pub source: String,
    /// Path relative to the worktree. Defaults to `source` when absent.
    #[serde(default)]
    pub dest: Option<String>,
    /// Replacement-value expressions keyed by env-file key.
    #[serde(default)]
    pub replace: std::collections::BTreeMap<String, String>,
    /// Cache TTL, e.g. `"24h"`, `"30m"`.
    #[serde(default)]
    pub cache: Option<String>,
}

impl EnvFile {
    pub fn dest_or_source(&self) -> &str {
        self.dest.as_deref().unwrap_or(&self.source)
    }
}

/// One configured repository within a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Repo {
    /// Relative directory under the project's `repos/`.
    pub path: String,
    /// Clone URL.
    pub git: String,
    /// Override for the derived identifier; when absent, derived from the
    /// last URL path segment with any trailing `.git` stripped.
    #[serde(default)]
    pub local_name: Option<String>,
    /// `None` means "default true".
    #[serde(default)]
    pub auto_refresh: Option<bool>,
    #[serde(default)]
    pub env_files: Vec<EnvFile>,
}

impl Repo {
    /// The resolved identifier used for directory names and
    /// `RAMP_REPO_PATH_<UPPER>` derivation.
    pub fn derived_name(&self) -> String {
        if let Some(name) = &self.local_name {
            return name.clone();
        }
        let last_segment = self.git.rsplit('/').next().unwrap_or(&self.git);
        last_segment
            .strip_suffix(".git")
            .unwrap_or(last_segment)
            .to_string()
    }

    /// Whether this repo refreshes by default (absent == true).
    pub fn auto_refresh_enabled(&self) -> bool {
        self.auto_refresh.unwrap_or(true)
    }
}

/// A caller-defined interactive prompt shown before certain operations.
/// Opaque to this crate: carried through verbatim for the front-end to
/// interpret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub name: String,
    pub message: String,
}

/// The project-level configuration, as already parsed by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    pub repos: Vec<Repo>,
    #[serde(default)]
    pub setup: Option<String>,
    #[serde(default)]
    pub cleanup: Option<String>,
    #[serde(default)]
    pub default_branch_prefix: String,
    #[serde(default)]
    pub base_port: Option<u16>,
    #[serde(default)]
    pub max_ports: Option<u16>,
    #[serde(default)]
    pub ports_per_feature: Option<u16>,
    #[serde(default)]
    pub commands: Vec<Command>,
    #[serde(default)]
    pub hooks: Vec<Hook>,
    #[serde(default)]
    pub prompts: Vec<Prompt>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            repos: Vec::new(),
            setup: None,
            cleanup: None,
            default_branch_prefix: String::new(),
            base_port: None,
            max_ports: None,
            ports_per_feature: None,
            commands: Vec::new(),
            hooks: Vec::new(),
            prompts: Vec::new(),
        }
    }
}

impl ProjectConfig {
    /// Validate that derived repo names are unique, per the load-time
    /// invariant in the data model.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut seen = std::collections::HashSet::new();
        for repo in &self.repos {
            let name = repo.derived_name();
            if !seen.insert(name.clone()) {
                return Err(crate::error::RampError::fatal_bug(format!(
                    "duplicate derived repo name '{name}'"
                ))
                .into());
            }
        }
        Ok(())
    }
}

/// Per-project, not-version-controlled overrides (`.ramp/local.yaml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LocalConfig {
    /// Preference name -> value, injected into user-script environments.
    #[serde(default)]
    pub preferences: std::collections::BTreeMap<String, String>,
    #[serde(default)]
    pub commands: Vec<Command>,
    #[serde(default)]
    pub hooks: Vec<Hook>,
}

/// Per-user overrides (`${RAMP_USER_CONFIG_DIR}/ramp.yaml` or
/// `~/.config/ramp/ramp.yaml`). Project-level fields are rejected
/// conceptually: this type carries only commands and hooks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub commands: Vec<Command>,
    #[serde(default)]
    pub hooks: Vec<Hook>,
}

/// The fully-resolved, read-only view a lifecycle-engine invocation
/// consumes. Owns every field it needs rather than borrowing from the
/// `ProjectConfig` that produced it: a core library cannot assume its
/// caller keeps that input alive for the invocation's duration.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedConfig {
    pub name: String,
    pub repos: Vec<Repo>,
    pub setup: Option<String>,
    pub cleanup: Option<String>,
    pub default_branch_prefix: String,
    pub base_port: Option<u16>,
    pub max_ports: Option<u16>,
    pub ports_per_feature: Option<u16>,
    pub prompts: Vec<Prompt>,
    pub preferences: std::collections::BTreeMap<String, String>,
    /// First-match-wins in project > local > user order.
    pub commands: Vec<Command>,
    /// Concatenated project, local, user — none dropped.
    pub hooks: Vec<Hook>,
}

impl MergedConfig {
    /// `GetCommand(name)`: first match.
    pub fn get_command(&self, name: &str) -> Option<&Command> {
        self.commands.iter().find(|c| c.name == name)
    }

    /// `GetHooksForEvent(event)`.
    pub fn hooks_for_event(&self, event: HookEvent) -> Vec<&Hook> {
        self.hooks.iter().filter(|h| h.event == event).collect()
    }

    /// `GetRepos()` convenience accessor.
    pub fn get_repos(&self) -> &[Repo] {
        &self.repos
    }
}
