//! `Up`: create a feature — worktrees, ports, env files, setup script.

use std::path::PathBuf;

use crate::error::RampError;
use crate::git::Repository;
use crate::progress::{OutputStreamer, ProgressSink};

use super::refresh::select_for_up;
use super::{LifecycleContext, effective_prefix, install};

/// Caller-supplied knobs for one `Up` invocation.
#[derive(Debug, Clone, Default)]
pub struct UpOptions {
    pub auto_install: bool,
    pub skip_refresh: bool,
    pub force_refresh: bool,
    pub prefix_override: Option<String>,
    pub no_prefix: bool,
    pub target: Option<String>,
}

/// What a successful `Up` produced, for callers that want to report it.
#[derive(Debug, Clone)]
pub struct UpOutcome {
    pub branch_name: String,
    pub worktree_dirs: Vec<(String, PathBuf)>,
    pub ports: Vec<u16>,
}

/// Bookkeeping accumulated as each phase completes, so a failure partway
/// through can be unwound without re-deriving what happened.
#[derive(Default)]
struct RollbackState {
    worktrees_created: Vec<(String, PathBuf)>,
    branches_created: Vec<(String, String)>,
    trees_dir_created: bool,
    port_allocated: bool,
}

fn rollback(ctx: &LifecycleContext, feature: &str, state: RollbackState, progress: &mut dyn ProgressSink) {
    for (repo_name, worktree_path) in state.worktrees_created.iter().rev() {
        let repo = Repository::at(ctx.repo_dir(repo_name));
        if let Err(e) = repo.remove_worktree(worktree_path, true) {
            progress.warning(&format!("rollback: failed to remove worktree for {repo_name}: {e}"));
        }
    }
    for (repo_name, branch) in state.branches_created.iter().rev() {
        let repo = Repository::at(ctx.repo_dir(repo_name));
        if let Err(e) = repo.delete_branch(branch) {
            progress.warning(&format!("rollback: failed to delete branch {branch} in {repo_name}: {e}"));
        }
    }
    if state.port_allocated {
        if let Some((base, max, _)) = ctx.port_settings() {
            match crate::ports::PortAllocator::load(ctx.project_dir, base, max) {
                Ok(mut allocator) => {
                    if let Err(e) = allocator.release(feature) {
                        progress.warning(&format!("rollback: failed to release ports: {e}"));
                    }
                }
                Err(e) => progress.warning(&format!("rollback: failed to load port allocator: {e}")),
            }
        }
    }
    if state.trees_dir_created {
        let trees_dir = ctx.feature_trees_dir(feature);
        if let Err(e) = std::fs::remove_dir_all(&trees_dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                progress.warning(&format!("rollback: failed to remove {}: {e}", trees_dir.display()));
            }
        }
    }
}

/// Create a feature: worktrees for every configured repo, port allocation,
/// materialized env files, and the project's setup script.
pub fn up(
    ctx: &LifecycleContext,
    feature: &str,
    opts: &UpOptions,
    progress: &mut dyn ProgressSink,
    mut output: Option<&mut dyn OutputStreamer>,
) -> anyhow::Result<UpOutcome> {
    let prefix = effective_prefix(ctx.config, opts.prefix_override.as_deref(), opts.no_prefix);
    let branch_name = format!("{prefix}{feature}");
    let trees_dir = ctx.feature_trees_dir(feature);

    // 1. Auto-install.
    if opts.auto_install && install::any_repo_missing(ctx) {
        progress.update("installing missing repositories");
        install::install(ctx, progress)?;
    }

    // 2. Auto-refresh.
    if !opts.skip_refresh {
        let selected = select_for_up(ctx, opts.force_refresh);
        if !selected.is_empty() {
            progress.update("refreshing repositories");
            super::refresh::refresh(ctx, &selected, progress);
        }
    }

    // 3. Target resolution.
    let mut source_branches: std::collections::BTreeMap<String, String> = std::collections::BTreeMap::new();
    if let Some(target) = &opts.target {
        for repo in &ctx.config.repos {
            let name = repo.derived_name();
            let git_repo = Repository::at(ctx.repo_dir(&name));
            match git_repo.resolve_source_branch(target, &ctx.config.default_branch_prefix) {
                Ok(resolved) => {
                    source_branches.insert(name, resolved);
                }
                Err(_) => {
                    progress.warning(&format!(
                        "{name}: could not resolve target '{target}', falling back to default branch"
                    ));
                    source_branches.insert(name, String::new());
                }
            }
        }
    }

    // 4. Validation.
    if trees_dir.exists() {
        return Err(RampError::conflict("feature", format!("trees directory already exists: {}", trees_dir.display())).into());
    }
    for repo in &ctx.config.repos {
        let name = repo.derived_name();
        let repo_dir = ctx.repo_dir(&name);
        if !Repository::is_repo(&repo_dir) {
            return Err(RampError::not_found("source repository", name).into());
        }
        let git_repo = Repository::at(&repo_dir);
        git_repo.prune_worktrees()?;

        let worktree_path = ctx.worktree_dir(feature, &name);
        if worktree_path.exists() {
            return Err(RampError::conflict("worktree", format!("{} already exists", worktree_path.display())).into());
        }

        if let Some(resolved) = source_branches.get(&name) {
            if !resolved.is_empty() && git_repo.local_branch_exists(&branch_name)? {
                return Err(RampError::conflict(
                    "branch",
                    format!("{branch_name} already exists locally in {name}"),
                )
                .into());
            }
        }
    }

    let mut state = RollbackState::default();

    // 5. Create trees directory.
    std::fs::create_dir_all(&trees_dir)?;
    state.trees_dir_created = true;

    // 6. Create worktrees.
    progress.update("creating worktrees");
    for repo in &ctx.config.repos {
        let name = repo.derived_name();
        let git_repo = Repository::at(ctx.repo_dir(&name));
        let worktree_path = ctx.worktree_dir(feature, &name);
        let source_branch = source_branches.get(&name).filter(|s| !s.is_empty()).map(String::as_str);

        if let Err(e) = git_repo.add_worktree(&worktree_path, &branch_name, source_branch) {
            progress.error(&format!("{name}: failed to create worktree: {e}"));
            rollback(ctx, feature, state, progress);
            return Err(e);
        }
        state.worktrees_created.push((name.clone(), worktree_path));
        state.branches_created.push((name, branch_name.clone()));
    }

    // 7. Allocate ports.
    let mut ports = Vec::new();
    if let Some((base, max, count)) = ctx.port_settings() {
        match crate::ports::PortAllocator::load(ctx.project_dir, base, max).and_then(|mut a| {
            let p = a.allocate(feature, count)?;
            Ok(p)
        }) {
            Ok(p) => {
                ports = p;
                state.port_allocated = true;
            }
            Err(e) => {
                progress.error(&format!("failed to allocate ports: {e}"));
                rollback(ctx, feature, state, progress);
                return Err(e);
            }
        }
    }

    // 8. Process env files.
    progress.update("processing env files");
    for repo in &ctx.config.repos {
        let name = repo.derived_name();
        if repo.env_files.is_empty() {
            continue;
        }
        let should_refresh = opts.force_refresh || repo.auto_refresh_enabled();
        let repo_dir = ctx.repo_dir(&name);
        let worktree_path = ctx.worktree_dir(feature, &name);
        let vars = super::env::feature_env(ctx.project_dir, ctx.config, feature, None, &ports);
        let processor = crate::env_files::EnvFileProcessor {
            project_dir: ctx.project_dir,
            source_repo_dir: &repo_dir,
            worktree_dir: &worktree_path,
        };
        for env_file in &repo.env_files {
            match processor.process(env_file, &vars, should_refresh) {
                Ok(true) => {}
                Ok(false) => progress.warning(&format!("{name}: env file source missing: {}", env_file.source)),
                Err(e) => {
                    progress.error(&format!("{name}: failed to process env file: {e}"));
                    rollback(ctx, feature, state, progress);
                    return Err(e);
                }
            }
        }
    }

    // 9. Setup script.
    if let Some(setup) = &ctx.config.setup {
        progress.update("running setup script");
        let vars = super::env::feature_env(ctx.project_dir, ctx.config, feature, None, &ports);
        let script = PathBuf::from(setup);
        let result = match output.as_deref_mut() {
            Some(sink) => {
                progress.stop();
                crate::process::run_streamed(&script, &[], &trees_dir, &vars, sink, None, None).map(|_| ())
            }
            None => crate::process::run_captured(&script, &[], &trees_dir, &vars),
        };
        if let Err(e) = result {
            progress.error(&format!("setup script failed: {e}"));
            rollback(ctx, feature, state, progress);
            return Err(e);
        }
    }

    progress.success(&format!("feature '{feature}' is up"));
    Ok(UpOutcome {
        branch_name,
        worktree_dirs: state.worktrees_created,
        ports,
    })
}
