//! `Refresh`: fetch-all + pull-if-tracking for a selected set of
//! repositories, concurrently, with independent per-repo results.

use rayon::prelude::*;

use crate::git::Repository;
use crate::progress::ProgressSink;

use super::LifecycleContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshStatus {
    Success,
    Warning(String),
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub repo: String,
    pub status: RefreshStatus,
}

fn refresh_one(repo_dir: &std::path::Path, name: &str) -> RefreshOutcome {
    let repo = Repository::at(repo_dir);

    let branch = match repo.get_current_branch() {
        Ok(Some(b)) => b,
        Ok(None) => {
            return RefreshOutcome {
                repo: name.to_string(),
                status: RefreshStatus::Skipped("detached HEAD".to_string()),
            };
        }
        Err(e) => {
            return RefreshOutcome {
                repo: name.to_string(),
                status: RefreshStatus::Warning(format!("could not determine current branch: {e}")),
            };
        }
    };

    if let Err(e) = repo.fetch_all() {
        return RefreshOutcome {
            repo: name.to_string(),
            status: RefreshStatus::Warning(format!("fetch failed: {e}")),
        };
    }

    match repo.has_remote_tracking_branch(&branch) {
        Ok(true) => match repo.pull() {
            Ok(()) => RefreshOutcome {
                repo: name.to_string(),
                status: RefreshStatus::Success,
            },
            Err(e) => RefreshOutcome {
                repo: name.to_string(),
                status: RefreshStatus::Warning(format!("pull failed: {e}")),
            },
        },
        Ok(false) => RefreshOutcome {
            repo: name.to_string(),
            status: RefreshStatus::Skipped("no remote tracking branch".to_string()),
        },
        Err(e) => RefreshOutcome {
            repo: name.to_string(),
            status: RefreshStatus::Warning(format!("could not check remote tracking: {e}")),
        },
    }
}

/// Refresh the repos named in `selected` (each must be a valid derived
/// repo name from `ctx.config`). No single repo's failure aborts the
/// others; the aggregate is produced only once every repo has finished.
pub fn refresh(
    ctx: &LifecycleContext,
    selected: &[String],
    progress: &mut dyn ProgressSink,
) -> Vec<RefreshOutcome> {
    let dirs: Vec<(String, std::path::PathBuf)> = selected
        .iter()
        .map(|name| (name.clone(), ctx.repo_dir(name)))
        .collect();

    let results: Vec<RefreshOutcome> = dirs
        .par_iter()
        .map(|(name, dir)| refresh_one(dir, name))
        .collect();

    for outcome in &results {
        match &outcome.status {
            RefreshStatus::Success => progress.info(&format!("{}: refreshed", outcome.repo)),
            RefreshStatus::Skipped(reason) => {
                progress.info(&format!("{}: skipped ({reason})", outcome.repo))
            }
            RefreshStatus::Warning(reason) => {
                progress.warning(&format!("{}: {reason}", outcome.repo))
            }
        }
    }

    results
}

/// The repos to refresh for a given `Up` invocation: every repo if
/// `force_refresh`, else each repo with `auto_refresh` enabled.
pub(super) fn select_for_up(ctx: &LifecycleContext, force_refresh: bool) -> Vec<String> {
    ctx.config
        .repos
        .iter()
        .filter(|r| force_refresh || r.auto_refresh_enabled())
        .map(|r| r.derived_name())
        .collect()
}
