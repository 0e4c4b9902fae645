//! Configuration data model and the three-tier merge (C5).
//!
//! This crate never parses a config file; it only defines the structs a
//! caller-side parser deserializes into, and the pure merge function that
//! combines them. See [`merge::merge`].

mod merge;
mod model;

pub use merge::merge;
pub use model::{
    Command, CommandScope, EnvFile, Hook, HookEvent, LocalConfig, MergedConfig, ProjectConfig,
    Prompt, Repo, UserConfig,
};
