//! `Install`: clone every configured repository that isn't present yet.

use crate::git::Repository;
use crate::progress::ProgressSink;

use super::LifecycleContext;

/// For each configured repo whose directory is not a valid source
/// repository, clone it. Existing repos are skipped without error.
pub fn install(ctx: &LifecycleContext, progress: &mut dyn ProgressSink) -> anyhow::Result<()> {
    for repo in &ctx.config.repos {
        let name = repo.derived_name();
        let dest = ctx.repo_dir(&name);
        if Repository::is_repo(&dest) {
            progress.info(&format!("{name} already installed, skipping"));
            continue;
        }
        progress.update(&format!("cloning {name}"));
        Repository::clone(&repo.git, &dest, false)?;
        progress.success(&format!("cloned {name}"));
    }
    Ok(())
}

/// True if any configured repo's directory is missing a valid checkout.
pub(super) fn any_repo_missing(ctx: &LifecycleContext) -> bool {
    ctx.config
        .repos
        .iter()
        .any(|r| !Repository::is_repo(&ctx.repo_dir(&r.derived_name())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MergedConfig, ProjectConfig, Repo};
    use crate::progress::NullProgressSink;

    fn config(repos: Vec<Repo>) -> MergedConfig {
        crate::config::merge(
            &ProjectConfig {
                repos,
                ..Default::default()
            },
            None,
            None,
            std::path::Path::new("/proj"),
            None,
        )
    }

    #[test]
    fn any_repo_missing_true_when_no_dirs_exist() {
        let cfg = config(vec![Repo {
            git: "https://example.com/org/api.git".into(),
            ..Default::default()
        }]);
        let dir = tempfile::tempdir().unwrap();
        let ctx = LifecycleContext::new(dir.path(), &cfg);
        assert!(any_repo_missing(&ctx));
    }

    #[test]
    fn install_skips_existing_repo() {
        let cfg = config(vec![Repo {
            git: "https://example.com/org/api.git".into(),
            local_name: Some("api".into()),
            ..Default::default()
        }]);
        let dir = tempfile::tempdir().unwrap();
        let repo_dir = crate::paths::repo_dir(dir.path(), "api");
        std::fs::create_dir_all(repo_dir.join(".git")).unwrap();

        let ctx = LifecycleContext::new(dir.path(), &cfg);
        let mut sink = NullProgressSink;
        install(&ctx, &mut sink).unwrap();
        assert!(!any_repo_missing(&ctx));
    }
}
