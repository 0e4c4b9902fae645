//! Shared environment-variable construction for setup scripts and the
//! `Run` operation, in both source mode (operating on the primary clones
//! under `repos/`) and feature mode (operating on a feature's worktrees).

use std::collections::BTreeMap;
use std::path::Path;

use crate::config::MergedConfig;

/// `RAMP_REPO_PATH_<UPPER>` name transform: uppercase the derived repo
/// name, collapse every run of characters outside `[A-Z0-9]` to a single
/// `_`, then strip leading/trailing `_`.
pub fn repo_path_var_name(derived_name: &str) -> String {
    let upper = derived_name.to_uppercase();
    let mut collapsed = String::with_capacity(upper.len());
    let mut last_was_sep = false;
    for ch in upper.chars() {
        if ch.is_ascii_uppercase() || ch.is_ascii_digit() {
            collapsed.push(ch);
            last_was_sep = false;
        } else if !last_was_sep {
            collapsed.push('_');
            last_was_sep = true;
        }
    }
    format!("RAMP_REPO_PATH_{}", collapsed.trim_matches('_'))
}

/// Base env common to every invocation: the project directory plus every
/// local-config preference.
fn base_env(project_dir: &Path, config: &MergedConfig) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    env.insert("RAMP_PROJECT_DIR".to_string(), project_dir.display().to_string());
    for (k, v) in &config.preferences {
        env.insert(k.clone(), v.clone());
    }
    env
}

/// Source-mode env: per-repo `RAMP_REPO_PATH_<UPPER>` point at the primary
/// clones under `repos/`.
pub fn source_env(project_dir: &Path, config: &MergedConfig) -> BTreeMap<String, String> {
    let mut env = base_env(project_dir, config);
    for repo in &config.repos {
        let name = repo.derived_name();
        env.insert(repo_path_var_name(&name), crate::paths::repo_dir(project_dir, &name).display().to_string());
    }
    env
}

/// Feature-mode env: trees directory, worktree/display name, port
/// variables, and per-repo `RAMP_REPO_PATH_<UPPER>` pointing at worktree
/// directories instead of source directories.
pub fn feature_env(
    project_dir: &Path,
    config: &MergedConfig,
    feature: &str,
    display_name: Option<&str>,
    ports: &[u16],
) -> BTreeMap<String, String> {
    let mut env = base_env(project_dir, config);
    env.insert(
        "RAMP_TREES_DIR".to_string(),
        crate::paths::feature_trees_dir(project_dir, feature).display().to_string(),
    );
    env.insert("RAMP_WORKTREE_NAME".to_string(), feature.to_string());
    env.insert(
        "RAMP_DISPLAY_NAME".to_string(),
        display_name.unwrap_or(feature).to_string(),
    );
    if let Some(first) = ports.first() {
        env.insert("RAMP_PORT".to_string(), first.to_string());
    }
    for (i, port) in ports.iter().enumerate() {
        env.insert(format!("RAMP_PORT_{}", i + 1), port.to_string());
    }
    for repo in &config.repos {
        let name = repo.derived_name();
        env.insert(
            repo_path_var_name(&name),
            crate::paths::worktree_dir(project_dir, feature, &name).display().to_string(),
        );
    }
    env
}
