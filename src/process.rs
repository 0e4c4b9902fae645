//! Script runner (C7): login-shell subprocess execution in two modes.
//!
//! **Captured** mode runs a script to completion and returns its full
//! output; used for setup/cleanup invocations and anywhere a caller has no
//! output sink to stream into. **Streamed** mode is for user `run` commands
//! and UI contexts: it places the subprocess in its own process group so a
//! caller can cancel the whole descendant tree, and forwards output line by
//! line to a caller-supplied sink as it arrives.

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};
use wait_timeout::ChildExt;

use crate::error::RampError;
use crate::progress::OutputStreamer;
use crate::shell_exec::login_shell_command;

/// Grace period between SIGTERM and SIGKILL during cancellation.
const CANCEL_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// How often the streamed-run loop polls for child exit / cancellation
/// between draining buffered output lines.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

fn build_command(script: &Path, args: &[String], cwd: &Path, env: &BTreeMap<String, String>) -> std::process::Command {
    let mut cmd = login_shell_command(script, args, cwd);
    for (k, v) in env {
        cmd.env(k, v);
    }
    if !args.is_empty() {
        cmd.env("RAMP_ARGS", args.join(" "));
    }
    cmd
}

/// Run a script to completion, capturing stdout/stderr. On nonzero exit,
/// returns [`RampError::SubprocessFailed`] carrying the exit code and
/// stderr. Output is never shown to the caller on success — this is the
/// "shown only on error" captured mode described for setup/cleanup scripts.
pub fn run_captured(
    script: &Path,
    args: &[String],
    cwd: &Path,
    env: &BTreeMap<String, String>,
) -> anyhow::Result<()> {
    let mut cmd = build_command(script, args, cwd, env);
    let output = crate::shell_exec::run_captured(&mut cmd, "script-captured")?;
    if !output.status.success() {
        return Err(RampError::SubprocessFailed {
            command: script.display().to_string(),
            exit_code: output.status.code(),
            output: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
        .into());
    }
    Ok(())
}

enum Line {
    Stdout(String),
    Stderr(String),
}

/// Spawn a reader thread that scans `reader` line-by-line, forwarding each
/// through `tx`. Terminates naturally when the underlying pipe closes
/// (i.e. when the process that owns the other end of the pipe exits).
fn spawn_reader<R: std::io::Read + Send + 'static>(
    reader: R,
    tx: Sender<Line>,
    wrap: fn(String) -> Line,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let mut buf = BufReader::new(reader);
        let mut line = String::new();
        loop {
            line.clear();
            match buf.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {
                    let trimmed = line.strip_suffix('\n').unwrap_or(&line);
                    let trimmed = trimmed.strip_suffix('\r').unwrap_or(trimmed);
                    let _ = tx.send(wrap(trimmed.to_string()));
                }
                Err(_) => break,
            }
        }
    })
}

/// Run a script streamed: output forwarded line-by-line to `output` as it
/// arrives, cancellable via `cancel` (closing the channel, or sending on
/// it, both signal cancellation). `on_spawn` is invoked with the child's
/// pid once it's running, before this function starts waiting, so a caller
/// can track it for out-of-band cancellation.
///
/// Returns the subprocess exit code on natural completion (`-1` if it was
/// killed by a signal other than via our own cancellation). Returns
/// [`RampError::Cancelled`] if `cancel` fired before the process exited.
pub fn run_streamed(
    script: &Path,
    args: &[String],
    cwd: &Path,
    env: &BTreeMap<String, String>,
    output: &mut dyn OutputStreamer,
    cancel: Option<&Receiver<()>>,
    on_spawn: Option<&dyn Fn(u32)>,
) -> anyhow::Result<i32> {
    let mut cmd = build_command(script, args, cwd, env);
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // process_group(0) puts the child in a new process group whose
        // PGID equals its own PID, so SIGTERM/SIGKILL to `-pid` reaches
        // every descendant the script spawned too.
        cmd.process_group(0);
    }

    let mut child = cmd.spawn()?;
    let pid = child.id();
    if let Some(cb) = on_spawn {
        cb(pid);
    }

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let (tx, rx) = unbounded();

    let stdout_handle = stdout.map(|s| spawn_reader(s, tx.clone(), Line::Stdout));
    let stderr_handle = stderr.map(|s| spawn_reader(s, tx.clone(), Line::Stderr));
    drop(tx);

    let drain = |output: &mut dyn OutputStreamer, rx: &Receiver<Line>| {
        while let Ok(line) = rx.try_recv() {
            match line {
                Line::Stdout(l) => output.write_line(&l),
                Line::Stderr(l) => output.write_error_line(&l),
            }
        }
    };

    let cancelled = loop {
        drain(output, &rx);

        // Bounded wait rather than a bare `try_wait` + sleep: reaps the
        // child as soon as it exits instead of waiting out the rest of the
        // poll interval.
        if let Some(status) = child.wait_timeout(POLL_INTERVAL)? {
            drain(output, &rx);
            if let Some(h) = stdout_handle {
                let _ = h.join();
            }
            if let Some(h) = stderr_handle {
                let _ = h.join();
            }
            return Ok(status.code().unwrap_or(-1));
        }

        if let Some(c) = cancel {
            match c.try_recv() {
                Ok(()) => break true,
                Err(crossbeam_channel::TryRecvError::Disconnected) => break true,
                Err(crossbeam_channel::TryRecvError::Empty) => {}
            }
        }
    };

    if cancelled {
        terminate_process_group(pid)?;
    }

    drain(output, &rx);
    if let Some(h) = stdout_handle {
        let _ = h.join();
    }
    if let Some(h) = stderr_handle {
        let _ = h.join();
    }
    let _ = child.wait();
    Err(RampError::Cancelled.into())
}

/// Two-stage termination of the process group rooted at `pid` (which, per
/// [`run_streamed`]'s `process_group(0)`, is also the PGID): SIGTERM, a
/// grace period, then SIGKILL if it's still alive.
#[cfg(unix)]
fn terminate_process_group(pid: u32) -> anyhow::Result<()> {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let pgid = Pid::from_raw(pid as i32);
    let _ = killpg(pgid, Signal::SIGTERM);

    let deadline = Instant::now() + CANCEL_GRACE_PERIOD;
    while Instant::now() < deadline {
        // `kill(pid, 0)`-equivalent liveness probe: killpg with no signal
        // isn't available via this API, so probe the leader pid directly.
        if !process_alive(pid) {
            return Ok(());
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    let _ = killpg(pgid, Signal::SIGKILL);
    Ok(())
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

#[cfg(not(unix))]
fn terminate_process_group(pid: u32) -> anyhow::Result<()> {
    // No portable negative-PID group signal on this platform; approximate
    // by terminating the direct child only (reduced guarantee, see
    // DESIGN.md).
    let _ = std::process::Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/T", "/F"])
        .status();
    Ok(())
}
