//! Core library for multi-repository feature-worktree orchestration.
//!
//! `ramp` manages a project with one or more source repositories cloned
//! under `repos/`, and lets a caller spin up a "feature" — a linked working
//! tree per repository, sharing a branch name, under `trees/<feature>/` —
//! complete with allocated ports, materialized env files, and project-
//! defined setup/cleanup scripts. It is a library only: this crate parses
//! no config file and owns no CLI; a front end deserializes a project's
//! configuration into [`config::ProjectConfig`]/[`config::LocalConfig`]/
//! [`config::UserConfig`], merges them via [`config::merge`], and drives
//! [`lifecycle`]'s free functions against the result.
//!
//! The library API is not stable.

pub mod config;
pub mod env_files;
pub mod error;
pub mod git;
pub mod hooks;
pub mod lifecycle;
pub mod lock;
pub mod metadata;
pub mod paths;
pub mod ports;
pub mod process;
pub mod progress;
pub mod shell_exec;
