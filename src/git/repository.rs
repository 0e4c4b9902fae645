//! [`Repository`]: the typed wrapper around a `git` checkout.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use super::branch;
use super::error::GitError;

/// Result of an ahead/behind comparison against an upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AheadBehind {
    pub ahead: u32,
    pub behind: u32,
}

/// `git diff --shortstat`-equivalent summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiffStats {
    pub files: u32,
    pub insertions: u32,
    pub deletions: u32,
}

/// `git status --porcelain`-equivalent summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusStats {
    pub untracked: u32,
    pub staged: u32,
    pub modified: u32,
}

/// A checked-out git repository (or one of its linked worktrees).
///
/// Caches the default branch lookup behind a `OnceLock` since it requires a
/// remote round trip to resolve reliably and is asked for repeatedly over a
/// single lifecycle invocation; every other predicate here is cheap enough
/// (a single local `git` invocation) not to need caching.
pub struct Repository {
    root: PathBuf,
    default_branch_cache: OnceLock<Option<String>>,
}

impl Repository {
    /// Wrap an existing checkout. Does not verify `root` is actually a
    /// repository; use [`Repository::is_repo`] first if that matters.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            default_branch_cache: OnceLock::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `IsRepo(dir)`: true if `dir` is a git repository (or worktree) root.
    pub fn is_repo(dir: &Path) -> bool {
        dir.join(".git").exists()
    }

    /// `Clone(url, dest, shallow?)`. Creates parent directories as needed.
    pub fn clone(url: &str, dest: &Path, shallow: bool) -> anyhow::Result<Repository> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut args = vec!["clone"];
        if shallow {
            args.push("--depth=1");
        }
        let dest_str = dest.to_string_lossy().into_owned();
        args.push(url);
        args.push(&dest_str);
        run_in(None, &args, "git clone")?;
        Ok(Repository::at(dest.to_path_buf()))
    }

    /// Run a git subcommand in this repository's root, returning trimmed
    /// stdout on success.
    pub fn run_command(&self, args: &[&str]) -> anyhow::Result<String> {
        run_in(Some(&self.root), args, "git")
    }

    /// Run a git subcommand, returning only whether it exited successfully.
    /// Used for existence/predicate checks where stdout is irrelevant.
    pub fn run_command_check(&self, args: &[&str]) -> anyhow::Result<bool> {
        let output = self.command(args).output()?;
        Ok(output.status.success())
    }

    /// Run a git subcommand, returning the full process output (so callers
    /// that need stderr or the exact exit code can inspect them).
    pub fn run_command_output(&self, args: &[&str]) -> std::io::Result<std::process::Output> {
        self.command(args).output()
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.current_dir(&self.root).args(args);
        cmd
    }

    /// `LocalBranchExists(dir, name)` — exact match only.
    pub fn local_branch_exists(&self, name: &str) -> anyhow::Result<bool> {
        let listing = self.run_command(&["branch", "--format=%(refname:short)"])?;
        Ok(branch::exact_match(&listing, name))
    }

    /// `RemoteBranchExists(dir, name)` — exact match only, against the
    /// primary remote (`origin`).
    pub fn remote_branch_exists(&self, name: &str) -> anyhow::Result<bool> {
        let listing = self.run_command(&["branch", "-r", "--format=%(refname:short)"])?;
        Ok(branch::exact_match_remote(&listing, "origin", name))
    }

    /// `HasRemoteTrackingBranch(branch)`.
    pub fn has_remote_tracking_branch(&self, branch: &str) -> anyhow::Result<bool> {
        let refspec = format!("{branch}@{{upstream}}");
        self.run_command_check(&["rev-parse", "--verify", "--quiet", &refspec])
    }

    /// `GetCurrentBranch`. `None` in detached HEAD state.
    pub fn get_current_branch(&self) -> anyhow::Result<Option<String>> {
        let name = self.run_command(&["symbolic-ref", "--short", "-q", "HEAD"]);
        match name {
            Ok(n) if !n.is_empty() => Ok(Some(n)),
            _ => Ok(None),
        }
    }

    /// `GetDefaultBranch`: prefers `main`, then `master`, else falls back
    /// to `main` unconditionally (so callers always get a usable name).
    pub fn default_branch(&self) -> anyhow::Result<String> {
        if let Some(cached) = self.default_branch_cache.get() {
            return Ok(cached.clone().unwrap_or_else(|| "main".to_string()));
        }
        let resolved = if self.local_branch_exists("main")? {
            "main".to_string()
        } else if self.local_branch_exists("master")? {
            "master".to_string()
        } else {
            "main".to_string()
        };
        let _ = self.default_branch_cache.set(Some(resolved.clone()));
        Ok(resolved)
    }

    /// `HasUncommittedChanges`.
    pub fn has_uncommitted_changes(&self) -> anyhow::Result<bool> {
        let out = self.run_command(&["status", "--porcelain"])?;
        Ok(!out.is_empty())
    }

    /// `IsMergedInto(branch, target)`.
    pub fn is_merged_into(&self, branch: &str, target: &str) -> anyhow::Result<bool> {
        let merged = self.run_command(&["branch", "--merged", target, "--format=%(refname:short)"])?;
        Ok(super::branch::exact_match(&merged, branch))
    }

    /// `GetAheadBehindCount(branch, upstream)`.
    pub fn ahead_behind(&self, branch: &str, upstream: &str) -> anyhow::Result<AheadBehind> {
        let range = format!("{upstream}...{branch}");
        let out = self.run_command(&["rev-list", "--left-right", "--count", &range])?;
        let mut parts = out.split_whitespace();
        let behind: u32 = parts.next().unwrap_or("0").parse().unwrap_or(0);
        let ahead: u32 = parts.next().unwrap_or("0").parse().unwrap_or(0);
        Ok(AheadBehind { ahead, behind })
    }

    /// `GetRemoteTrackingStatus`: formatted per the documented forms.
    pub fn remote_tracking_status(&self, branch: &str) -> anyhow::Result<String> {
        if !self.has_remote_tracking_branch(branch)? {
            return Ok("(no remote tracking)".to_string());
        }
        let upstream = format!("{branch}@{{upstream}}");
        let ab = self.ahead_behind(branch, &upstream)?;
        Ok(match (ab.ahead, ab.behind) {
            (0, 0) => "(up to date)".to_string(),
            (a, 0) => format!("(ahead {a})"),
            (0, b) => format!("(behind {b})"),
            (a, b) => format!("(ahead {a}, behind {b})"),
        })
    }

    /// `GetDiffStats(base, head)`.
    pub fn diff_stats(&self, base: &str, head: &str) -> anyhow::Result<DiffStats> {
        let range = format!("{base}...{head}");
        let out = self.run_command(&["diff", "--shortstat", &range])?;
        Ok(parse_shortstat(&out))
    }

    /// `GetStatusStats`.
    pub fn status_stats(&self) -> anyhow::Result<StatusStats> {
        let out = self.run_command(&["status", "--porcelain"])?;
        let mut stats = StatusStats::default();
        for line in out.lines() {
            if line.len() < 2 {
                continue;
            }
            let (index, worktree) = (line.as_bytes()[0], line.as_bytes()[1]);
            if index == b'?' && worktree == b'?' {
                stats.untracked += 1;
            } else {
                if index != b' ' {
                    stats.staged += 1;
                }
                if worktree != b' ' {
                    stats.modified += 1;
                }
            }
        }
        Ok(stats)
    }

    pub fn fetch_all(&self) -> anyhow::Result<()> {
        self.run_command(&["fetch", "--all"])?;
        Ok(())
    }

    pub fn fetch_prune(&self) -> anyhow::Result<()> {
        self.run_command(&["fetch", "--prune"])?;
        Ok(())
    }

    pub fn pull(&self) -> anyhow::Result<()> {
        self.run_command(&["pull"])?;
        Ok(())
    }

    /// `DeleteBranch(dir, name)`: force-delete a local branch.
    pub fn delete_branch(&self, name: &str) -> anyhow::Result<()> {
        self.run_command(&["branch", "-D", name])?;
        Ok(())
    }

    /// `ResolveSourceBranch(repoDir, target, configuredPrefix)`.
    ///
    /// Returns the first matching ref per the documented ordered algorithm.
    pub fn resolve_source_branch(
        &self,
        target: &str,
        configured_prefix: &str,
    ) -> anyhow::Result<String> {
        if target.contains('/') {
            if self.run_command_check(&["rev-parse", "--verify", "--quiet", target])? {
                return Ok(target.to_string());
            }
            return Err(GitError::BranchNotFound {
                target: target.to_string(),
            }
            .into());
        }
        if self.local_branch_exists(target)? {
            return Ok(target.to_string());
        }
        let prefixed = format!("{configured_prefix}{target}");
        if self.local_branch_exists(&prefixed)? {
            return Ok(prefixed);
        }
        if self.remote_branch_exists(target)? {
            return Ok(format!("origin/{target}"));
        }
        if self.remote_branch_exists(&prefixed)? {
            return Ok(format!("origin/{prefixed}"));
        }
        Err(GitError::BranchNotFound {
            target: target.to_string(),
        }
        .into())
    }
}

fn parse_shortstat(out: &str) -> DiffStats {
    let mut stats = DiffStats::default();
    for part in out.split(',') {
        let part = part.trim();
        if let Some(n) = part.split_whitespace().next() {
            let n: u32 = n.parse().unwrap_or(0);
            if part.contains("file") {
                stats.files = n;
            } else if part.contains("insertion") {
                stats.insertions = n;
            } else if part.contains("deletion") {
                stats.deletions = n;
            }
        }
    }
    stats
}

/// Run `git <args>` with an optional working directory, returning trimmed
/// stdout on success or a [`GitError::CommandFailed`] on nonzero exit.
pub(super) fn run_in(cwd: Option<&Path>, args: &[&str], context: &str) -> anyhow::Result<String> {
    let mut cmd = Command::new("git");
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    cmd.args(args);

    log::debug!("[ramp-trace] context={context} cmd=\"git {}\"", args.join(" "));
    let output = cmd.output()?;
    if !output.status.success() {
        return Err(GitError::CommandFailed {
            command: args.join(" "),
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
        .into());
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
