//! Env-file processor (C6): materialize per-repository env files into a
//! feature's worktree, substituting variables and caching producer-script
//! output.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;
use std::time::{Duration, SystemTime};

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::config::EnvFile;
use crate::error::RampError;

fn var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([A-Za-z0-9_]+)\}").unwrap())
}

/// Generic substitution: replace every `${NAME}` present in `env` by its
/// value; leave unmatched names untouched.
pub fn substitute_vars(content: &str, env: &BTreeMap<String, String>) -> String {
    var_pattern()
        .replace_all(content, |caps: &regex::Captures| {
            let name = &caps[1];
            env.get(name).cloned().unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Line-oriented explicit-key substitution: only lines whose trimmed form
/// begins with `<key>=` (for a key present in `replace`) are modified;
/// comment and blank lines are left untouched. Each replacement expression
/// is itself passed through [`substitute_vars`] before substitution.
pub fn substitute_explicit_keys(
    content: &str,
    replace: &BTreeMap<String, String>,
    env: &BTreeMap<String, String>,
) -> String {
    let mut out = String::with_capacity(content.len());
    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_end_matches('\n').trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            out.push_str(line);
            continue;
        }
        let matched_key = replace
            .keys()
            .find(|key| trimmed.starts_with(key.as_str()) && trimmed[key.len()..].starts_with('='));
        match matched_key {
            Some(key) => {
                let expr = &replace[key];
                let substituted = substitute_vars(expr, env);
                let trailing_newline = line.ends_with('\n');
                out.push_str(key);
                out.push('=');
                out.push_str(&substituted);
                if trailing_newline {
                    out.push('\n');
                }
            }
            None => out.push_str(line),
        }
    }
    out
}

fn cache_key(script_path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(script_path.to_string_lossy().as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}

// Minimal hex encoding to avoid an extra dependency solely for this.
mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(path)
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        let _ = path;
        false
    }
}

/// Processing a single [`EnvFile`] for one repository.
pub struct EnvFileProcessor<'a> {
    pub project_dir: &'a Path,
    pub source_repo_dir: &'a Path,
    pub worktree_dir: &'a Path,
}

impl<'a> EnvFileProcessor<'a> {
    /// Process one env file, writing it to `worktree_dir`. Returns `Ok(false)`
    /// (not an error) if the source file is missing — caller logs a warning.
    pub fn process(
        &self,
        env_file: &EnvFile,
        vars: &BTreeMap<String, String>,
        should_refresh: bool,
    ) -> anyhow::Result<bool> {
        let source_abs = self.source_repo_dir.join(&env_file.source);
        if !source_abs.exists() {
            log::warn!("env file source missing, skipping: {}", source_abs.display());
            return Ok(false);
        }

        let raw = if is_executable(&source_abs) {
            self.run_producer(&source_abs, env_file, vars, should_refresh)?
        } else {
            std::fs::read(&source_abs)?
        };

        let content = String::from_utf8_lossy(&raw).into_owned();
        let substituted = if !env_file.replace.is_empty() {
            substitute_explicit_keys(&content, &env_file.replace, vars)
        } else {
            substitute_vars(&content, vars)
        };

        let dest_abs = self.worktree_dir.join(env_file.dest_or_source());
        if let Some(parent) = dest_abs.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&dest_abs, substituted.as_bytes())?;
        set_mode_0644(&dest_abs)?;
        Ok(true)
    }

    fn run_producer(
        &self,
        script: &Path,
        env_file: &EnvFile,
        vars: &BTreeMap<String, String>,
        should_refresh: bool,
    ) -> anyhow::Result<Vec<u8>> {
        let cache_path = env_file
            .cache
            .as_deref()
            .map(|ttl| (ttl, crate::paths::env_file_cache_path(self.project_dir, &cache_key(script))));

        if !should_refresh {
            if let Some((ttl, ref path)) = cache_path {
                if let Some(cached) = read_fresh_cache(path, ttl) {
                    log::debug!("env-file producer cache hit: {}", path.display());
                    return Ok(cached);
                }
            }
        }

        let mut cmd = crate::shell_exec::login_shell_command(script, &[], self.source_repo_dir);
        for (k, v) in vars {
            cmd.env(k, v);
        }
        let output = crate::shell_exec::run_captured(&mut cmd, "env-file-producer")?;
        if !output.status.success() {
            return Err(RampError::SubprocessFailed {
                command: script.display().to_string(),
                exit_code: output.status.code(),
                output: String::from_utf8_lossy(&output.stderr).into_owned(),
            }
            .into());
        }

        if let Some((_, path)) = cache_path {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Err(e) = crate::ports::atomic_write(&path, &output.stdout) {
                log::warn!("failed to write env-file producer cache {}: {e}", path.display());
            }
        }

        Ok(output.stdout)
    }
}

fn read_fresh_cache(path: &Path, ttl: &str) -> Option<Vec<u8>> {
    let duration: Duration = humantime::parse_duration(ttl).ok()?;
    let metadata = std::fs::metadata(path).ok()?;
    let modified = metadata.modified().ok()?;
    let age = SystemTime::now().duration_since(modified).ok()?;
    if age > duration {
        return None;
    }
    std::fs::read(path).ok()
}

fn set_mode_0644(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path)?.permissions();
        perms.set_mode(0o644);
        std::fs::set_permissions(path, perms)?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn substitute_vars_replaces_known_leaves_unknown() {
        let e = env(&[("A", "1"), ("B", "2")]);
        assert_eq!(substitute_vars("${A}${B}", &e), "12");
        assert_eq!(substitute_vars("${A}${C}", &e), "1${C}");
    }

    #[test]
    fn explicit_replace_scenario_from_spec() {
        let content = "PORT=3000\nAPI_PORT=3001\nUNUSED_VAR=${RAMP_PORT}\nAPP_NAME=default\n";
        let replace = env(&[("PORT", "${RAMP_PORT}"), ("API_PORT", "${RAMP_PORT}1")]);
        let vars = env(&[("RAMP_PORT", "4000"), ("RAMP_WORKTREE_NAME", "f1")]);
        let output = substitute_explicit_keys(content, &replace, &vars);
        assert_eq!(
            output,
            "PORT=4000\nAPI_PORT=40001\nUNUSED_VAR=${RAMP_PORT}\nAPP_NAME=default\n"
        );
    }

    #[test]
    fn explicit_replace_skips_comments_and_blanks() {
        let content = "# PORT=9999\n\nPORT=3000\n";
        let replace = env(&[("PORT", "4000")]);
        let vars = BTreeMap::new();
        let output = substitute_explicit_keys(content, &replace, &vars);
        assert_eq!(output, "# PORT=9999\n\nPORT=4000\n");
    }

    #[test]
    fn cache_key_is_stable_hex() {
        let key = cache_key(Path::new("/proj/repos/api/gen_env.sh"));
        assert_eq!(key.len(), 16);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(key, cache_key(Path::new("/proj/repos/api/gen_env.sh")));
    }

    #[test]
    fn missing_source_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let processor = EnvFileProcessor {
            project_dir: dir.path(),
            source_repo_dir: dir.path(),
            worktree_dir: dir.path(),
        };
        let env_file = EnvFile {
            source: "does-not-exist.env".into(),
            ..Default::default()
        };
        let processed = processor.process(&env_file, &BTreeMap::new(), false).unwrap();
        assert!(!processed);
    }

    #[test]
    fn regular_file_is_copied_with_substitution() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("in.env"), "HOST=${HOST}\n").unwrap();
        let worktree = dir.path().join("wt");
        std::fs::create_dir_all(&worktree).unwrap();
        let processor = EnvFileProcessor {
            project_dir: dir.path(),
            source_repo_dir: dir.path(),
            worktree_dir: &worktree,
        };
        let env_file = EnvFile {
            source: "in.env".into(),
            dest: Some("out.env".into()),
            ..Default::default()
        };
        let vars = env(&[("HOST", "localhost")]);
        assert!(processor.process(&env_file, &vars, false).unwrap());
        let written = std::fs::read_to_string(worktree.join("out.env")).unwrap();
        assert_eq!(written, "HOST=localhost\n");
    }
}
