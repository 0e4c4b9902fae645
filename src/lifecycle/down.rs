//! `Down`: remove a feature — worktrees, branches, ports, metadata.

use crate::error::RampError;
use crate::git::Repository;
use crate::progress::ProgressSink;

use super::{LifecycleContext, effective_prefix, install};

#[derive(Debug, Clone, Default)]
pub struct DownOptions {
    pub auto_install: bool,
    pub force: bool,
    pub prefix_override: Option<String>,
    pub no_prefix: bool,
}

fn any_registration_survives(ctx: &LifecycleContext, feature: &str, expected_branch: &str) -> anyhow::Result<bool> {
    for repo in &ctx.config.repos {
        let name = repo.derived_name();
        let git_repo = Repository::at(ctx.repo_dir(&name));
        if !Repository::is_repo(&ctx.repo_dir(&name)) {
            continue;
        }
        let worktree_path = ctx.worktree_dir(feature, &name);
        if git_repo.get_worktree_branch(&worktree_path)?.is_some() {
            return Ok(true);
        }
        if git_repo.local_branch_exists(expected_branch)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Remove a feature: per-repo worktree and branch, port release, metadata,
/// and the trees directory.
pub fn down(
    ctx: &LifecycleContext,
    feature: &str,
    opts: &DownOptions,
    progress: &mut dyn ProgressSink,
) -> anyhow::Result<()> {
    let prefix = effective_prefix(ctx.config, opts.prefix_override.as_deref(), opts.no_prefix);
    let expected_branch = format!("{prefix}{feature}");
    let trees_dir = ctx.feature_trees_dir(feature);

    // 1. Auto-install.
    if opts.auto_install && install::any_repo_missing(ctx) {
        progress.update("installing missing repositories");
        install::install(ctx, progress)?;
    }

    // 2. Existence check / orphan cleanup.
    let trees_dir_exists = trees_dir.exists();
    if !trees_dir_exists {
        if !any_registration_survives(ctx, feature, &expected_branch)? {
            return Err(RampError::not_found("feature", feature.to_string()).into());
        }
        progress.warning(&format!("feature '{feature}' has no trees directory but has orphaned registrations, cleaning up"));
    }

    // 3. Uncommitted-changes warnings.
    if trees_dir_exists && !opts.force {
        for repo in &ctx.config.repos {
            let name = repo.derived_name();
            let worktree_path = ctx.worktree_dir(feature, &name);
            if !worktree_path.exists() {
                continue;
            }
            let git_repo = Repository::at(&worktree_path);
            if git_repo.has_uncommitted_changes().unwrap_or(false) {
                progress.warning(&format!("{name}: has uncommitted changes"));
            }
        }
    }

    // 4. Cleanup script.
    if trees_dir_exists {
        if let Some(cleanup) = &ctx.config.cleanup {
            progress.update("running cleanup script");
            let vars = super::env::feature_env(ctx.project_dir, ctx.config, feature, None, &[]);
            let script = std::path::PathBuf::from(cleanup);
            if let Err(e) = crate::process::run_captured(&script, &[], &trees_dir, &vars) {
                progress.warning(&format!("cleanup script failed: {e}"));
            }
        }
    }

    // 5. Per-repo worktree/branch removal.
    for repo in &ctx.config.repos {
        let name = repo.derived_name();
        let repo_dir = ctx.repo_dir(&name);
        if !Repository::is_repo(&repo_dir) {
            continue;
        }
        let git_repo = Repository::at(&repo_dir);
        let worktree_path = ctx.worktree_dir(feature, &name);

        let branch = git_repo
            .get_worktree_branch(&worktree_path)
            .unwrap_or(None)
            .unwrap_or_else(|| expected_branch.clone());

        if worktree_path.exists() {
            if let Err(e) = git_repo.remove_worktree(&worktree_path, true) {
                progress.warning(&format!("{name}: failed to remove worktree: {e}"));
            }
        }
        if let Err(e) = git_repo.delete_branch(&branch) {
            progress.warning(&format!("{name}: failed to delete branch {branch}: {e}"));
        }
        if let Err(e) = git_repo.fetch_prune() {
            progress.warning(&format!("{name}: failed to fetch --prune: {e}"));
        }
    }

    // 6. Release ports.
    if let Some((base, max, _)) = ctx.port_settings() {
        match crate::ports::PortAllocator::load(ctx.project_dir, base, max) {
            Ok(mut allocator) => {
                if let Err(e) = allocator.release(feature) {
                    progress.warning(&format!("failed to release ports: {e}"));
                }
            }
            Err(e) => progress.warning(&format!("failed to load port allocator: {e}")),
        }
    }

    // 7. Remove feature metadata.
    match crate::metadata::FeatureMetadataStore::load(ctx.project_dir) {
        Ok(mut store) => {
            if let Err(e) = store.remove_feature(feature) {
                progress.warning(&format!("failed to remove feature metadata: {e}"));
            }
        }
        Err(e) => progress.warning(&format!("failed to load feature metadata: {e}")),
    }

    // 8. Remove trees directory.
    if let Err(e) = std::fs::remove_dir_all(&trees_dir) {
        if e.kind() != std::io::ErrorKind::NotFound {
            progress.warning(&format!("failed to remove {}: {e}", trees_dir.display()));
        }
    }

    progress.success(&format!("feature '{feature}' is down"));
    Ok(())
}
