//! Hook engine (C8): filter, sequence, and execute lifecycle hooks.
//!
//! Hook failures never abort the parent operation — every failure this
//! module can produce is reported to the [`ProgressSink`] as a warning and
//! execution continues with the next hook.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::{Hook, HookEvent};
use crate::progress::ProgressSink;

/// Resolve a hook's script to an absolute path: `command` as-is if already
/// absolute, else joined onto the hook's `base_dir`.
fn resolve_script(hook: &Hook) -> PathBuf {
    let path = Path::new(&hook.command);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        hook.base_dir.join(path)
    }
}

/// Select the hooks that fire for `event`, and (for `run` events only)
/// further narrow by `command_name` via each hook's `for` filter.
pub fn select<'a>(hooks: &'a [Hook], event: HookEvent, command_name: Option<&str>) -> Vec<&'a Hook> {
    hooks
        .iter()
        .filter(|h| h.event == event)
        .filter(|h| match (event, command_name) {
            (HookEvent::Run, Some(name)) => h.matches_command(name),
            (HookEvent::Run, None) => h.matches_command(""),
            _ => true,
        })
        .collect()
}

/// Run every hook selected by [`select`] in order, in `cwd` with `env`
/// layered onto the current process environment. Each hook's output is
/// captured and surfaced via `progress.warning` only if it fails (missing
/// script or nonzero exit); a passing hook is silent.
pub fn run(
    hooks: &[Hook],
    event: HookEvent,
    command_name: Option<&str>,
    cwd: &Path,
    env: &BTreeMap<String, String>,
    progress: &mut dyn ProgressSink,
) {
    for hook in select(hooks, event, command_name) {
        let script = resolve_script(hook);
        if !script.exists() {
            progress.warning(&format!("hook script not found, skipping: {}", script.display()));
            continue;
        }

        match crate::process::run_captured(&script, &[], cwd, env) {
            Ok(()) => {}
            Err(err) => {
                progress.warning(&format!("hook failed: {} ({err})", script.display()));
            }
        }
    }
}
