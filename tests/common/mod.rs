//! Shared integration-test fixture: a project directory backed by real
//! `git` repositories, not a mocked source-control layer.

use std::path::{Path, PathBuf};
use std::process::Command;

use ramp::config::{MergedConfig, ProjectConfig, Repo};
use ramp::lifecycle::LifecycleContext;

pub struct TestProject {
    pub dir: tempfile::TempDir,
}

fn run_git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .expect("git must be on PATH for integration tests");
    assert!(status.success(), "git {args:?} failed in {}", dir.display());
}

/// Initialize a real git repo at `dir` with one commit on its default
/// branch (named `main` explicitly, so tests don't depend on the host's
/// `init.defaultBranch`).
pub fn init_source_repo(dir: &Path) {
    std::fs::create_dir_all(dir).unwrap();
    run_git(dir, &["init", "-q", "-b", "main"]);
    run_git(dir, &["config", "user.email", "test@example.com"]);
    run_git(dir, &["config", "user.name", "Test"]);
    std::fs::write(dir.join("README.md"), "placeholder\n").unwrap();
    run_git(dir, &["add", "."]);
    run_git(dir, &["commit", "-q", "-m", "initial commit"]);
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn repo_dir(&self, name: &str) -> PathBuf {
        ramp::paths::repo_dir(self.path(), name)
    }

    /// Add a real source repo named `name`, registering it in the
    /// returned `Repo` config entry.
    pub fn add_repo(&self, name: &str) -> Repo {
        init_source_repo(&self.repo_dir(name));
        Repo {
            path: name.to_string(),
            git: format!("https://example.invalid/{name}.git"),
            local_name: Some(name.to_string()),
            auto_refresh: Some(false),
            env_files: Vec::new(),
        }
    }

    pub fn merged_config(&self, project: ProjectConfig) -> MergedConfig {
        ramp::config::merge(&project, None, None, self.path(), None)
    }

    pub fn context<'a>(&'a self, config: &'a MergedConfig) -> LifecycleContext<'a> {
        LifecycleContext::new(self.path(), config)
    }
}

/// A single real repo, auto-refresh disabled so tests are deterministic
/// without a network.
///
/// ```ignore
/// #[rstest]
/// fn test_something(single_repo: (TestProject, ProjectConfig)) {
///     let (project, project_config) = single_repo;
/// }
/// ```
#[rstest::fixture]
pub fn single_repo() -> (TestProject, ProjectConfig) {
    let project = TestProject::new();
    let repo = project.add_repo("api");
    let config = ProjectConfig {
        name: "test-project".to_string(),
        repos: vec![repo],
        default_branch_prefix: "feature/".to_string(),
        ..Default::default()
    };
    (project, config)
}

#[rstest::fixture]
pub fn two_repos() -> (TestProject, ProjectConfig) {
    let project = TestProject::new();
    let api = project.add_repo("api");
    let web = project.add_repo("web");
    let config = ProjectConfig {
        name: "test-project".to_string(),
        repos: vec![api, web],
        default_branch_prefix: "feature/".to_string(),
        ..Default::default()
    };
    (project, config)
}

/// A repo plus a bare "remote" clone pointed at by `origin`, for tests that
/// need `HasRemoteTrackingBranch`/refresh behavior.
#[rstest::fixture]
pub fn repo_with_remote() -> (TestProject, ProjectConfig) {
    let project = TestProject::new();
    let repo_path = project.repo_dir("api");
    init_source_repo(&repo_path);

    let remote_dir = project.path().join("remote-api.git");
    run_git(project.path(), &["init", "-q", "--bare", remote_dir.to_str().unwrap()]);
    run_git(&repo_path, &["remote", "add", "origin", remote_dir.to_str().unwrap()]);
    run_git(&repo_path, &["push", "-q", "-u", "origin", "main"]);

    let repo = Repo {
        path: "api".to_string(),
        git: remote_dir.to_string_lossy().into_owned(),
        local_name: Some("api".to_string()),
        auto_refresh: Some(true),
        env_files: Vec::new(),
    };
    let config = ProjectConfig {
        name: "test-project".to_string(),
        repos: vec![repo],
        default_branch_prefix: "feature/".to_string(),
        ..Default::default()
    };
    (project, config)
}
