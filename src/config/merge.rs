//! Three-tier config merge (project / local / user).
//!
//! An append-only `Merge` trait folds project, local, and user tiers in
//! precedence order: commands first-match-wins by name, hooks concatenate
//! losslessly.

use std::path::{Path, PathBuf};

use super::model::{Command, Hook, LocalConfig, MergedConfig, ProjectConfig, UserConfig};

/// A mergeable collection that knows how to combine itself with another
/// instance of the same tier, in precedence order (`self` wins ties /
/// comes first).
trait Merge: Sized {
    fn merge_with(&self, other: &Self) -> Self;
}

/// Commands: first-match-wins by name, in the order the tiers are folded.
impl Merge for Vec<Command> {
    fn merge_with(&self, other: &Self) -> Self {
        let mut seen: std::collections::HashSet<&str> =
            self.iter().map(|c| c.name.as_str()).collect();
        let mut merged = self.clone();
        for cmd in other {
            if seen.insert(cmd.name.as_str()) {
                merged.push(cmd.clone());
            }
        }
        merged
    }
}

/// Hooks: concatenated, nothing dropped.
impl Merge for Vec<Hook> {
    fn merge_with(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        merged.extend(other.iter().cloned());
        merged
    }
}

fn project_base_dir(project_dir: &Path) -> PathBuf {
    crate::paths::ramp_dir(project_dir)
}

fn stamp_commands(commands: &[Command], base_dir: &Path) -> Vec<Command> {
    commands
        .iter()
        .cloned()
        .map(|mut c| {
            c.base_dir = base_dir.to_path_buf();
            c
        })
        .collect()
}

fn stamp_hooks(hooks: &[Hook], base_dir: &Path) -> Vec<Hook> {
    hooks
        .iter()
        .cloned()
        .map(|mut h| {
            h.base_dir = base_dir.to_path_buf();
            h
        })
        .collect()
}

/// Combine project, optional local, and optional user configuration into a
/// [`MergedConfig`]. Inputs are never mutated (each tier's commands/hooks
/// are cloned before stamping `base_dir`).
pub fn merge(
    project: &ProjectConfig,
    local: Option<&LocalConfig>,
    user: Option<&UserConfig>,
    project_dir: &Path,
    user_config_dir: Option<&Path>,
) -> MergedConfig {
    let project_local_base = project_base_dir(project_dir);

    let project_commands = stamp_commands(&project.commands, &project_local_base);
    let project_hooks = stamp_hooks(&project.hooks, &project_local_base);

    let local_commands = local
        .map(|l| stamp_commands(&l.commands, &project_local_base))
        .unwrap_or_default();
    let local_hooks = local
        .map(|l| stamp_hooks(&l.hooks, &project_local_base))
        .unwrap_or_default();

    let user_base = user_config_dir.map(Path::to_path_buf).unwrap_or_default();
    let user_commands = user
        .map(|u| stamp_commands(&u.commands, &user_base))
        .unwrap_or_default();
    let user_hooks = user.map(|u| stamp_hooks(&u.hooks, &user_base)).unwrap_or_default();

    let commands = project_commands
        .merge_with(&local_commands)
        .merge_with(&user_commands);
    let hooks = project_hooks
        .merge_with(&local_hooks)
        .merge_with(&user_hooks);

    let preferences = local
        .map(|l| l.preferences.clone())
        .unwrap_or_default();

    MergedConfig {
        name: project.name.clone(),
        repos: project.repos.clone(),
        setup: project.setup.clone(),
        cleanup: project.cleanup.clone(),
        default_branch_prefix: project.default_branch_prefix.clone(),
        base_port: project.base_port,
        max_ports: project.max_ports,
        ports_per_feature: project.ports_per_feature,
        prompts: project.prompts.clone(),
        preferences,
        commands,
        hooks,
    }
}
