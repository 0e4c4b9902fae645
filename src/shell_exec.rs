//! Shell command construction and logged subprocess execution.
//!
//! Every user script (env-file producer, hook, setup/cleanup script, `run`
//! command) is invoked as a login shell (`bash -l <path> <args...>`) so the
//! user's profile loads the same tools a GUI-launched terminal would see.
//! This module is the one place that knows how to build that command line;
//! [`crate::process`] and [`crate::env_files`] both go through it.

use std::path::Path;
use std::process::{Command, Output};
use std::time::Instant;

/// Locate the `bash` binary to use for login-shell script invocation.
///
/// On Unix, `bash` is assumed to be on `PATH`. On Windows, prefers Git Bash
/// (discovered relative to `git.exe`, then standard install locations)
/// since that's the shell most `ramp`-managed scripts are authored against;
/// falls back to a bare `bash` lookup on `PATH` if Git Bash isn't found.
pub fn bash_path() -> std::path::PathBuf {
    #[cfg(windows)]
    {
        if let Some(git_bash) = find_git_bash() {
            return git_bash;
        }
    }
    std::path::PathBuf::from("bash")
}

#[cfg(windows)]
fn find_git_bash() -> Option<std::path::PathBuf> {
    if let Ok(git) = which::which("git") {
        // git.exe lives at .../Git/cmd/git.exe or .../Git/bin/git.exe;
        // bash.exe lives at .../Git/bin/bash.exe.
        if let Some(git_root) = git.parent().and_then(|p| p.parent()) {
            let candidate = git_root.join("bin").join("bash.exe");
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    for candidate in [
        r"C:\Program Files\Git\bin\bash.exe",
        r"C:\Program Files (x86)\Git\bin\bash.exe",
    ] {
        let path = std::path::PathBuf::from(candidate);
        if path.is_file() {
            return Some(path);
        }
    }
    None
}

/// Build a `bash -l <script> <args...>` command with the given working
/// directory, without spawning it. The returned [`Command`] has no
/// environment variables set beyond what `Command::new` inherits by
/// default; callers layer on `RAMP_*` variables via `.env(...)`.
pub fn login_shell_command(script: &Path, args: &[String], cwd: &Path) -> Command {
    let mut cmd = Command::new(bash_path());
    cmd.arg("-l").arg(script);
    cmd.args(args);
    cmd.current_dir(cwd);
    cmd
}

/// Run a command to completion, capturing stdout/stderr, logging the
/// invocation and its outcome including duration.
///
/// This is the sanctioned way to run a short-lived (non-streamed, non-
/// cancellable) subprocess: env-file producer scripts, hook scripts, and
/// captured setup/cleanup invocations all funnel through here. Streamed,
/// cancellable execution (user `run` commands) goes through
/// [`crate::process`] instead, since it needs process-group control this
/// function does not provide.
pub fn run_captured(cmd: &mut Command, context: &str) -> std::io::Result<Output> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    let args: Vec<String> = cmd
        .get_args()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    log::debug!("[ramp-trace] context={context} cmd=\"{program} {}\"", args.join(" "));

    let start = Instant::now();
    let result = cmd.output();
    let dur = start.elapsed();

    match &result {
        Ok(output) => log::debug!(
            "[ramp-trace] context={context} dur={}ms ok={}",
            dur.as_millis(),
            output.status.success()
        ),
        Err(e) => log::debug!(
            "[ramp-trace] context={context} dur={}ms err=\"{e}\"",
            dur.as_millis()
        ),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_shell_command_builds_expected_argv() {
        let cwd = std::env::temp_dir();
        let cmd = login_shell_command(Path::new("/tmp/script.sh"), &["a".into(), "b".into()], &cwd);
        assert_eq!(cmd.get_program(), bash_path().as_os_str());
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, vec!["-l", "/tmp/script.sh", "a", "b"]);
    }

    #[test]
    #[cfg(unix)]
    fn run_captured_executes_and_captures_stdout() {
        let mut cmd = Command::new("echo");
        cmd.arg("hello");
        let output = run_captured(&mut cmd, "test").unwrap();
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
    }
}
