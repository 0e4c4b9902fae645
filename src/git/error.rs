//! Source-control wrapper error type.
//!
//! One enum, one variant per distinguishable git failure, a hand-written
//! `Display` with no ANSI/emoji presentation layer — that belongs to a CLI
//! front-end, not this core library.

use std::fmt;

#[derive(Debug, Clone)]
pub enum GitError {
    /// A git subcommand exited nonzero.
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },
    /// Output from git could not be parsed into the expected shape.
    ParseError(String),
    /// `target` is not a valid ref in any of the positions
    /// `ResolveSourceBranch` checks.
    BranchNotFound { target: String },
    /// A local branch with this name already exists when one should not.
    BranchAlreadyExists { branch: String },
    /// The worktree directory already exists before creation.
    WorktreeDirExists { path: std::path::PathBuf },
    /// `dir` is not a git repository (or equivalent working tree).
    NotARepo { path: std::path::PathBuf },
}

impl fmt::Display for GitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GitError::CommandFailed {
                command,
                exit_code,
                stderr,
            } => {
                let code = exit_code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".into());
                write!(f, "git {command} failed (exit {code}): {stderr}")
            }
            GitError::ParseError(msg) => write!(f, "failed to parse git output: {msg}"),
            GitError::BranchNotFound { target } => {
                write!(f, "no local or remote branch resolves '{target}'")
            }
            GitError::BranchAlreadyExists { branch } => {
                write!(f, "branch '{branch}' already exists")
            }
            GitError::WorktreeDirExists { path } => {
                write!(f, "worktree directory already exists: {}", path.display())
            }
            GitError::NotARepo { path } => {
                write!(f, "not a git repository: {}", path.display())
            }
        }
    }
}

impl std::error::Error for GitError {}
