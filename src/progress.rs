//! Progress and output sinks (C10): the two caller-supplied interfaces the
//! lifecycle engine reports through.
//!
//! Deliberately plain traits, not a thread-local global output context —
//! that's a CLI-only convenience for avoiding parameter threading through
//! deeply nested command handlers. A library whose callers include a CLI, a
//! web API, and test harnesses cannot assume a single implicit thread-local
//! sink, so both are threaded explicitly as `&mut dyn` parameters.

/// Progress reporting for a single lifecycle-engine invocation. Percentages
/// are advisory; implementers that can't render them (a line-oriented CLI)
/// are free to ignore the `pct` argument.
pub trait ProgressSink {
    fn start(&mut self, message: &str);
    fn update(&mut self, message: &str);
    fn update_with_progress(&mut self, message: &str, pct: u8);
    /// Must be called before the engine begins streaming subprocess output,
    /// so an in-place-redraw spinner doesn't interleave with it.
    fn stop(&mut self);
    fn success(&mut self, message: &str);
    fn warning(&mut self, message: &str);
    fn error(&mut self, message: &str);
    fn info(&mut self, message: &str);
    fn complete(&mut self);
}

/// Streamed subprocess output, forwarded line-by-line as it arrives.
pub trait OutputStreamer {
    fn write_line(&mut self, line: &str);
    fn write_error_line(&mut self, line: &str);
}

/// Discards everything. Useful for captured-mode callers and as a default
/// in tests that don't assert on progress/output text.
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn start(&mut self, _message: &str) {}
    fn update(&mut self, _message: &str) {}
    fn update_with_progress(&mut self, _message: &str, _pct: u8) {}
    fn stop(&mut self) {}
    fn success(&mut self, _message: &str) {}
    fn warning(&mut self, _message: &str) {}
    fn error(&mut self, _message: &str) {}
    fn info(&mut self, _message: &str) {}
    fn complete(&mut self) {}
}

pub struct NullOutputStreamer;

impl OutputStreamer for NullOutputStreamer {
    fn write_line(&mut self, _line: &str) {}
    fn write_error_line(&mut self, _line: &str) {}
}

/// Records every call it receives, in order. Used by tests that assert on
/// the exact sequence of progress/output events a lifecycle operation
/// produces.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectingProgressSink {
    pub events: Vec<String>,
}

impl ProgressSink for CollectingProgressSink {
    fn start(&mut self, message: &str) {
        self.events.push(format!("start: {message}"));
    }
    fn update(&mut self, message: &str) {
        self.events.push(format!("update: {message}"));
    }
    fn update_with_progress(&mut self, message: &str, pct: u8) {
        self.events.push(format!("update[{pct}%]: {message}"));
    }
    fn stop(&mut self) {
        self.events.push("stop".to_string());
    }
    fn success(&mut self, message: &str) {
        self.events.push(format!("success: {message}"));
    }
    fn warning(&mut self, message: &str) {
        self.events.push(format!("warning: {message}"));
    }
    fn error(&mut self, message: &str) {
        self.events.push(format!("error: {message}"));
    }
    fn info(&mut self, message: &str) {
        self.events.push(format!("info: {message}"));
    }
    fn complete(&mut self) {
        self.events.push("complete".to_string());
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectingOutputStreamer {
    pub lines: Vec<String>,
    pub error_lines: Vec<String>,
}

impl OutputStreamer for CollectingOutputStreamer {
    fn write_line(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }
    fn write_error_line(&mut self, line: &str) {
        self.error_lines.push(line.to_string());
    }
}
