//! Domain error taxonomy.
//!
//! Every fallible operation in this crate returns `anyhow::Result<T>` at its
//! call boundary, but failures that a caller might need to distinguish
//! programmatically (a cancelled command vs. a failed one, a transient
//! refresh hiccup vs. a fatal config bug) are first constructed as a
//! [`RampError`] variant so `error.downcast_ref::<RampError>()` recovers the
//! kind without string-matching a message.

use std::fmt;

/// A domain-level error kind, independent of how it was triggered.
#[derive(Debug, Clone)]
pub enum RampError {
    /// A required resource (feature, command, source repo, script path) is absent.
    NotFound { what: String, name: String },
    /// A naming or state conflict: branch already exists, worktree directory
    /// already exists, duplicate repo name at config load.
    Conflict { what: String, detail: String },
    /// The port range has no room left for the requested allocation.
    ResourceExhausted {
        requested: usize,
        available: usize,
        range: (u16, u16),
    },
    /// The source-control binary or a user script exited nonzero.
    SubprocessFailed {
        command: String,
        exit_code: Option<i32>,
        output: String,
    },
    /// Sentinel for a command terminated via cancellation. Never rendered to
    /// the user as a failure; callers must check for this variant and
    /// suppress the generic "command failed" message.
    Cancelled,
    /// A failure expected to be transient (network fetch/pull); always
    /// downgraded to a per-repo warning by its caller, never aggregated into
    /// a hard failure.
    Transient { detail: String },
    /// A bug-level failure with no graceful fallback (e.g. duplicate repo
    /// names resolved at config load). Refused outright.
    FatalBug { detail: String },
}

impl RampError {
    pub fn not_found(what: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            what: what.into(),
            name: name.into(),
        }
    }

    pub fn conflict(what: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Conflict {
            what: what.into(),
            detail: detail.into(),
        }
    }

    pub fn transient(detail: impl Into<String>) -> Self {
        Self::Transient {
            detail: detail.into(),
        }
    }

    pub fn fatal_bug(detail: impl Into<String>) -> Self {
        Self::FatalBug {
            detail: detail.into(),
        }
    }

    /// True if this error (or the anyhow chain wrapping it) is the
    /// cancellation sentinel.
    pub fn is_cancelled(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<RampError>(), Some(RampError::Cancelled))
    }
}

impl fmt::Display for RampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RampError::NotFound { what, name } => write!(f, "{what} not found: {name}"),
            RampError::Conflict { what, detail } => write!(f, "{what} conflict: {detail}"),
            RampError::ResourceExhausted {
                requested,
                available,
                range,
            } => write!(
                f,
                "insufficient available ports: requested {requested}, found {available} free in range [{}, {})",
                range.0, range.1
            ),
            RampError::SubprocessFailed {
                command,
                exit_code,
                output,
            } => {
                let code = exit_code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "unknown".into());
                write!(f, "command failed (exit {code}): {command}\n{output}")
            }
            RampError::Cancelled => write!(f, "cancelled"),
            RampError::Transient { detail } => write!(f, "transient failure: {detail}"),
            RampError::FatalBug { detail } => write!(f, "unrecoverable configuration error: {detail}"),
        }
    }
}

impl std::error::Error for RampError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_is_recognized_through_anyhow() {
        let err: anyhow::Error = RampError::Cancelled.into();
        assert!(RampError::is_cancelled(&err));
    }

    #[test]
    fn other_kinds_are_not_cancelled() {
        let err: anyhow::Error = RampError::not_found("feature", "x").into();
        assert!(!RampError::is_cancelled(&err));
    }

    #[test]
    fn resource_exhausted_message_carries_fields() {
        let err = RampError::ResourceExhausted {
            requested: 3,
            available: 1,
            range: (3000, 3010),
        };
        let msg = err.to_string();
        assert!(msg.contains("requested 3"));
        assert!(msg.contains("found 1"));
        assert!(msg.contains("3000"));
    }
}
