//! End-to-end `Up`/`Down` scenarios against real git repositories.

mod common;

use rstest::rstest;

use common::{TestProject, single_repo, two_repos};
use ramp::config::ProjectConfig;
use ramp::git::Repository;
use ramp::lifecycle::{DownOptions, UpOptions, down, up};
use ramp::progress::NullProgressSink;

#[rstest]
fn basic_up_creates_branch_and_worktree_down_removes_them(
    single_repo: (TestProject, ProjectConfig),
) {
    let (project, project_config) = single_repo;
    let config = project.merged_config(project_config);
    let ctx = project.context(&config);
    let mut progress = NullProgressSink;

    let outcome = up(&ctx, "x", &UpOptions::default(), &mut progress, None).unwrap();
    assert_eq!(outcome.branch_name, "feature/x");

    let worktree = ctx.worktree_dir("x", "api");
    assert!(worktree.exists());

    let repo = Repository::at(project.repo_dir("api"));
    assert!(repo.local_branch_exists("feature/x").unwrap());

    down(
        &ctx,
        "x",
        &DownOptions {
            force: true,
            ..Default::default()
        },
        &mut progress,
    )
    .unwrap();

    assert!(!worktree.exists());
    assert!(!ctx.feature_trees_dir("x").exists());
    assert!(!repo.local_branch_exists("feature/x").unwrap());
}

#[rstest]
fn up_with_no_prefix_uses_bare_feature_name(single_repo: (TestProject, ProjectConfig)) {
    let (project, project_config) = single_repo;
    let config = project.merged_config(project_config);
    let ctx = project.context(&config);
    let mut progress = NullProgressSink;

    let opts = UpOptions {
        no_prefix: true,
        ..Default::default()
    };
    let outcome = up(&ctx, "x", &opts, &mut progress, None).unwrap();
    assert_eq!(outcome.branch_name, "x");
}

#[rstest]
fn up_twice_on_same_feature_conflicts(single_repo: (TestProject, ProjectConfig)) {
    let (project, project_config) = single_repo;
    let config = project.merged_config(project_config);
    let ctx = project.context(&config);
    let mut progress = NullProgressSink;

    up(&ctx, "x", &UpOptions::default(), &mut progress, None).unwrap();
    let err = up(&ctx, "x", &UpOptions::default(), &mut progress, None).unwrap_err();
    assert!(
        err.downcast_ref::<ramp::error::RampError>()
            .map(|e| matches!(e, ramp::error::RampError::Conflict { .. }))
            .unwrap_or(false)
    );
}

#[rstest]
fn down_on_never_created_feature_fails_not_found(single_repo: (TestProject, ProjectConfig)) {
    let (project, project_config) = single_repo;
    let config = project.merged_config(project_config);
    let ctx = project.context(&config);
    let mut progress = NullProgressSink;

    let err = down(&ctx, "ghost", &DownOptions::default(), &mut progress).unwrap_err();
    assert!(
        err.downcast_ref::<ramp::error::RampError>()
            .map(|e| matches!(e, ramp::error::RampError::NotFound { .. }))
            .unwrap_or(false)
    );
}

#[rstest]
fn up_across_two_repos_creates_both_worktrees(two_repos: (TestProject, ProjectConfig)) {
    let (project, project_config) = two_repos;
    let config = project.merged_config(project_config);
    let ctx = project.context(&config);
    let mut progress = NullProgressSink;

    up(&ctx, "x", &UpOptions::default(), &mut progress, None).unwrap();
    assert!(ctx.worktree_dir("x", "api").exists());
    assert!(ctx.worktree_dir("x", "web").exists());
}
