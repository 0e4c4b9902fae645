//! Linked-worktree operations for [`Repository`].

use std::path::{Path, PathBuf};

use super::error::GitError;
use super::repository::Repository;

/// One entry of `git worktree list --porcelain`.
#[derive(Debug, Clone, PartialEq)]
pub struct WorktreeInfo {
    pub path: PathBuf,
    pub branch: Option<String>,
    pub bare: bool,
}

impl WorktreeInfo {
    fn parse_porcelain(listing: &str) -> Vec<WorktreeInfo> {
        let mut result = Vec::new();
        let mut path: Option<PathBuf> = None;
        let mut branch: Option<String> = None;
        let mut bare = false;

        let flush = |path: &mut Option<PathBuf>, branch: &mut Option<String>, bare: &mut bool, out: &mut Vec<WorktreeInfo>| {
            if let Some(p) = path.take() {
                out.push(WorktreeInfo {
                    path: p,
                    branch: branch.take(),
                    bare: *bare,
                });
            }
            *bare = false;
        };

        for line in listing.lines() {
            if line.is_empty() {
                flush(&mut path, &mut branch, &mut bare, &mut result);
                continue;
            }
            if let Some(p) = line.strip_prefix("worktree ") {
                flush(&mut path, &mut branch, &mut bare, &mut result);
                path = Some(PathBuf::from(p));
            } else if let Some(b) = line.strip_prefix("branch ") {
                branch = Some(
                    b.strip_prefix("refs/heads/").unwrap_or(b).to_string(),
                );
            } else if line == "bare" {
                bare = true;
            }
        }
        flush(&mut path, &mut branch, &mut bare, &mut result);
        result
    }
}

impl Repository {
    /// `PruneWorktrees(repoDir)`.
    pub fn prune_worktrees(&self) -> anyhow::Result<()> {
        self.run_command(&["worktree", "prune"])?;
        Ok(())
    }

    /// List linked worktrees, bare entries filtered out.
    pub fn list_worktrees(&self) -> anyhow::Result<Vec<WorktreeInfo>> {
        let out = self.run_command(&["worktree", "list", "--porcelain"])?;
        Ok(WorktreeInfo::parse_porcelain(&out)
            .into_iter()
            .filter(|w| !w.bare)
            .collect())
    }

    /// `GetWorktreeBranch(worktreeDir)`: the branch checked out at a given
    /// worktree path, if any (detached-HEAD worktrees have none).
    pub fn get_worktree_branch(&self, worktree_dir: &Path) -> anyhow::Result<Option<String>> {
        let normalized = worktree_dir.to_string_lossy().into_owned();
        Ok(self
            .list_worktrees()?
            .into_iter()
            .find(|w| w.path.to_string_lossy() == normalized)
            .and_then(|w| w.branch))
    }

    /// `AddWorktree(repoDir, worktreeDir, branchName, sourceBranch?)`.
    ///
    /// Always prunes stale worktree registrations first, then enforces that
    /// `worktreeDir` does not already exist before dispatching to the
    /// documented four-way resolution (existing local branch, existing
    /// remote branch, explicit source ref, or current HEAD).
    pub fn add_worktree(
        &self,
        worktree_dir: &Path,
        branch_name: &str,
        source_branch: Option<&str>,
    ) -> anyhow::Result<()> {
        self.prune_worktrees()?;

        if worktree_dir.exists() {
            return Err(GitError::WorktreeDirExists {
                path: worktree_dir.to_path_buf(),
            }
            .into());
        }

        let worktree_str = worktree_dir.to_string_lossy().into_owned();

        let args: Vec<String> = if source_branch.is_none() && self.local_branch_exists(branch_name)? {
            vec!["worktree".into(), "add".into(), worktree_str, branch_name.into()]
        } else if source_branch.is_none() && self.remote_branch_exists(branch_name)? {
            vec![
                "worktree".into(),
                "add".into(),
                "--track".into(),
                "-b".into(),
                branch_name.into(),
                worktree_str,
                format!("origin/{branch_name}"),
            ]
        } else if let Some(src) = source_branch {
            vec![
                "worktree".into(),
                "add".into(),
                "-b".into(),
                branch_name.into(),
                worktree_str,
                src.into(),
            ]
        } else {
            vec![
                "worktree".into(),
                "add".into(),
                "-b".into(),
                branch_name.into(),
                worktree_str,
            ]
        };

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run_command(&arg_refs)?;
        Ok(())
    }

    /// `RemoveWorktree(repoDir, worktreeDir, force=true)`.
    pub fn remove_worktree(&self, worktree_dir: &Path, force: bool) -> anyhow::Result<()> {
        let path_str = worktree_dir.to_string_lossy().into_owned();
        let mut args = vec!["worktree", "remove"];
        if force {
            args.push("--force");
        }
        args.push(&path_str);
        self.run_command(&args)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_porcelain_single_worktree() {
        let listing = "worktree /repo\nHEAD abc123\nbranch refs/heads/main\n\n";
        let parsed = WorktreeInfo::parse_porcelain(listing);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].path, PathBuf::from("/repo"));
        assert_eq!(parsed[0].branch.as_deref(), Some("main"));
        assert!(!parsed[0].bare);
    }

    #[test]
    fn parse_porcelain_multiple_worktrees_and_bare() {
        let listing = "worktree /repo\nbare\n\nworktree /repo/trees/x/api\nHEAD abc\nbranch refs/heads/feature/x\n\n";
        let parsed = WorktreeInfo::parse_porcelain(listing);
        assert_eq!(parsed.len(), 2);
        assert!(parsed[0].bare);
        assert_eq!(parsed[1].branch.as_deref(), Some("feature/x"));
    }

    #[test]
    fn parse_porcelain_detached_head_has_no_branch() {
        let listing = "worktree /repo/trees/x\nHEAD abc123\ndetached\n\n";
        let parsed = WorktreeInfo::parse_porcelain(listing);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].branch, None);
    }
}
