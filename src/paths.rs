//! Centralized on-disk layout under a project directory.
//!
//! No other module hand-builds one of these paths with an ad hoc `.join()`
//! chain; every location named in the on-disk layout gets a function here.

use std::path::{Path, PathBuf};

/// `${projectDir}/.ramp`
pub fn ramp_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(".ramp")
}

/// `${projectDir}/.ramp/ramp.yaml` (not parsed by this crate; path only).
pub fn project_config_file(project_dir: &Path) -> PathBuf {
    ramp_dir(project_dir).join("ramp.yaml")
}

/// `${projectDir}/.ramp/local.yaml` (not parsed by this crate; path only).
pub fn local_config_file(project_dir: &Path) -> PathBuf {
    ramp_dir(project_dir).join("local.yaml")
}

/// `${projectDir}/.ramp/port_allocations.json`
pub fn port_allocations_file(project_dir: &Path) -> PathBuf {
    ramp_dir(project_dir).join("port_allocations.json")
}

/// `${projectDir}/.ramp/feature_metadata.json`
pub fn feature_metadata_file(project_dir: &Path) -> PathBuf {
    ramp_dir(project_dir).join("feature_metadata.json")
}

/// `${projectDir}/.ramp/cache/env_files`
pub fn env_file_cache_dir(project_dir: &Path) -> PathBuf {
    ramp_dir(project_dir).join("cache").join("env_files")
}

/// `${projectDir}/.ramp/cache/env_files/<key>.cache`
pub fn env_file_cache_path(project_dir: &Path, key: &str) -> PathBuf {
    env_file_cache_dir(project_dir).join(format!("{key}.cache"))
}

/// `${projectDir}/repos`
pub fn repos_dir(project_dir: &Path) -> PathBuf {
    project_dir.join("repos")
}

/// `${projectDir}/repos/<name>`
pub fn repo_dir(project_dir: &Path, name: &str) -> PathBuf {
    repos_dir(project_dir).join(name)
}

/// `${projectDir}/trees`
pub fn trees_dir(project_dir: &Path) -> PathBuf {
    project_dir.join("trees")
}

/// `${projectDir}/trees/<feature>`
pub fn feature_trees_dir(project_dir: &Path, feature: &str) -> PathBuf {
    trees_dir(project_dir).join(feature)
}

/// `${projectDir}/trees/<feature>/<repo>`
pub fn worktree_dir(project_dir: &Path, feature: &str, repo: &str) -> PathBuf {
    feature_trees_dir(project_dir, feature).join(repo)
}

/// Default per-user config path, honoring `RAMP_USER_CONFIG_DIR`.
///
/// An explicitly *empty* `RAMP_USER_CONFIG_DIR` disables user config
/// entirely (returns `None`), distinct from the variable being unset (which
/// falls back to `${HOME}/.config/ramp`).
pub fn user_config_file() -> Option<PathBuf> {
    match std::env::var("RAMP_USER_CONFIG_DIR") {
        Ok(dir) if dir.is_empty() => None,
        Ok(dir) => Some(PathBuf::from(dir).join("ramp.yaml")),
        Err(_) => dirs::config_dir().map(|d| d.join("ramp").join("ramp.yaml")),
    }
}
