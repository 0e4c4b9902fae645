//! `Refresh` against a repo with a real remote tracking branch.

mod common;

use rstest::rstest;

use common::{TestProject, repo_with_remote, single_repo};
use ramp::config::ProjectConfig;
use ramp::lifecycle::{RefreshStatus, refresh};
use ramp::progress::NullProgressSink;

#[rstest]
fn refresh_pulls_when_remote_tracking_branch_exists(
    repo_with_remote: (TestProject, ProjectConfig),
) {
    let (project, project_config) = repo_with_remote;
    let config = project.merged_config(project_config);
    let ctx = project.context(&config);
    let mut progress = NullProgressSink;

    let results = refresh(&ctx, &["api".to_string()], &mut progress);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, RefreshStatus::Success);
}

#[rstest]
fn refresh_skips_repo_with_no_tracking_branch(single_repo: (TestProject, ProjectConfig)) {
    let (project, project_config) = single_repo;
    let config = project.merged_config(project_config);
    let ctx = project.context(&config);
    let mut progress = NullProgressSink;

    let results = refresh(&ctx, &["api".to_string()], &mut progress);
    assert_eq!(results.len(), 1);
    assert!(matches!(results[0].status, RefreshStatus::Skipped(_)));
}
