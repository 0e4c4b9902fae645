//! Feature lifecycle engine (C9): `Up`, `Down`, `Install`, `Refresh`, `Run`.
//!
//! Each operation is a free function over a shared [`LifecycleContext`]
//! rather than a method on one god-object: one file per command, a shared
//! context struct threaded through. Rollback state is an explicit struct
//! accumulated as each phase of `Up` completes — a deferred cleanup stack
//! rather than a transactional-scope abstraction.

mod down;
mod env;
mod install;
mod refresh;
mod run;
mod up;

pub use down::{DownOptions, down};
pub use install::install;
pub use refresh::{RefreshOutcome, RefreshStatus, refresh};
pub use run::{RunOptions, run};
pub use up::{UpOptions, UpOutcome, up};

use std::path::{Path, PathBuf};

use crate::config::MergedConfig;

/// Read-only context shared by every lifecycle operation: where the
/// project lives on disk and the already-merged configuration to act on.
#[derive(Clone, Copy)]
pub struct LifecycleContext<'a> {
    pub project_dir: &'a Path,
    pub config: &'a MergedConfig,
}

impl<'a> LifecycleContext<'a> {
    pub fn new(project_dir: &'a Path, config: &'a MergedConfig) -> Self {
        Self { project_dir, config }
    }

    pub fn repo_dir(&self, repo_name: &str) -> PathBuf {
        crate::paths::repo_dir(self.project_dir, repo_name)
    }

    pub fn feature_trees_dir(&self, feature: &str) -> PathBuf {
        crate::paths::feature_trees_dir(self.project_dir, feature)
    }

    pub fn worktree_dir(&self, feature: &str, repo_name: &str) -> PathBuf {
        crate::paths::worktree_dir(self.project_dir, feature, repo_name)
    }

    pub fn branch_name(&self, feature: &str, prefix_override: Option<&str>, no_prefix: bool) -> String {
        let prefix = effective_prefix(self.config, prefix_override, no_prefix);
        format!("{prefix}{feature}")
    }

    /// Port settings: `(base, max, count)`, present only when the project
    /// configured all three.
    pub fn port_settings(&self) -> Option<(u16, u16, usize)> {
        let base = self.config.base_port?;
        let max = self.config.max_ports?;
        let count = self.config.ports_per_feature? as usize;
        Some((base, max, count))
    }
}

/// **Effective prefix**: `""` if `no_prefix`, else the explicit override if
/// non-empty, else the project's configured default.
pub fn effective_prefix(config: &MergedConfig, prefix_override: Option<&str>, no_prefix: bool) -> String {
    if no_prefix {
        return String::new();
    }
    match prefix_override {
        Some(p) if !p.is_empty() => p.to_string(),
        _ => config.default_branch_prefix.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;

    fn config_with_prefix(prefix: &str) -> MergedConfig {
        crate::config::merge(
            &ProjectConfig {
                default_branch_prefix: prefix.to_string(),
                ..Default::default()
            },
            None,
            None,
            std::path::Path::new("/proj"),
            None,
        )
    }

    #[test]
    fn effective_prefix_precedence() {
        let cfg = config_with_prefix("feature/");
        assert_eq!(effective_prefix(&cfg, None, false), "feature/");
        assert_eq!(effective_prefix(&cfg, Some("custom/"), false), "custom/");
        assert_eq!(effective_prefix(&cfg, Some("custom/"), true), "");
        assert_eq!(effective_prefix(&cfg, None, true), "");
    }

    #[test]
    fn branch_name_concatenates_without_separator() {
        let cfg = config_with_prefix("feature/");
        let ctx = LifecycleContext::new(Path::new("/proj"), &cfg);
        assert_eq!(ctx.branch_name("x", None, false), "feature/x");
        assert_eq!(ctx.branch_name("x", None, true), "x");
    }
}
