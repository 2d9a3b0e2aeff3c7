//! Read, accumulate, evaluate, print.

use std::sync::Arc;

use tracing::{debug, info_span, trace};

use super::escape::unescape;
use crate::error::TermhubError;
use crate::session::{OutputSink, Session, Value};
use crate::Result;

/// Exit code returned when the session closed normally.
pub const OK_EXIT_CODE: i32 = 0;

/// Read timeout used when none is configured.
pub const DEFAULT_TIMEOUT_MS: i64 = 50;

const LINE_CONTINUATION: char = '\\';

/// Drives one session until it closes.
///
/// Lines ending in a backslash are joined with the next line, without the
/// backslash or a separator. Each completed logical line is unescaped and handed
/// to the session's evaluator. Results go to the output sink, failures to the
/// error sink, and both sinks are flushed after every evaluation.
#[derive(Debug, Clone, Copy)]
pub struct ShellEngine {
    timeout_ms: i64,
}

impl ShellEngine {
    /// Create an engine whose reads wait at most `timeout_ms`, which must be positive.
    pub fn new(timeout_ms: i64) -> Result<Self> {
        if timeout_ms <= 0 {
            return Err(TermhubError::InvalidArgument(format!(
                "Invalid timeout {timeout_ms} <= 0"
            )));
        }
        Ok(Self { timeout_ms })
    }

    pub fn timeout_ms(&self) -> i64 {
        self.timeout_ms
    }

    /// Run until `session` is closed, returning [`OK_EXIT_CODE`].
    ///
    /// Only [`TermhubError::Unsupported`] from the evaluator, and I/O
    /// failures of the sinks or input, end the run early.
    pub fn run(&self, session: &Session) -> Result<i32> {
        let span = info_span!("shell", session = %session.id());
        let _enter = span.enter();

        if !session.is_open() {
            return Ok(OK_EXIT_CODE);
        }

        let output = Arc::clone(session.output()?);
        let error = Arc::clone(session.error()?);
        let mut buffer = String::new();

        while session.is_open() {
            let line = match session.read_line(self.timeout_ms) {
                Ok(Some(line)) => line,
                Ok(None) => continue,
                Err(TermhubError::TerminalClosed(_)) => break,
                Err(e) => return Err(e),
            };

            if let Some(head) = continued(&line) {
                trace!("line continued");
                buffer.push_str(head);
                continue;
            }

            buffer.push_str(&line);
            let source = unescape(&std::mem::take(&mut buffer));
            evaluate(session, &source, output.as_ref(), error.as_ref())?;
        }

        debug!("shell finished");
        Ok(OK_EXIT_CODE)
    }
}

impl Default for ShellEngine {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// The line without its continuation marker, when it ends in a backslash.
/// Only the last backslash is the marker.
fn continued(line: &str) -> Option<&str> {
    line.strip_suffix(LINE_CONTINUATION)
}

/// Evaluate one logical line, then flush both sinks whatever happened.
fn evaluate(
    session: &Session,
    source: &str,
    output: &dyn OutputSink,
    error: &dyn OutputSink,
) -> Result<()> {
    let outcome = print_result(session, source, output, error);
    let flushed = output.flush().and_then(|()| error.flush());
    outcome.and(flushed)
}

fn print_result(
    session: &Session,
    source: &str,
    output: &dyn OutputSink,
    error: &dyn OutputSink,
) -> Result<()> {
    debug!(source, "evaluating");

    let value = match session.evaluate(source) {
        Ok(Some(value)) => value,
        Ok(None) => return Ok(()),
        Err(e) if e.is_fatal() => return Err(e),
        // closed from elsewhere mid-evaluation, the loop ends next iteration
        Err(TermhubError::TerminalClosed(id)) if id == session.id() && !session.is_open() => {
            debug!("session closed during evaluation");
            return Ok(());
        }
        Err(e) => {
            debug!(error = ?e, "evaluation failed");
            return error.println(&e.to_string());
        }
    };

    let text = match &value {
        Value::Rich(rich) => Ok(rich.terminal_text()),
        other => session.to_text(other),
    };

    match text {
        Ok(text) => output.println(&text),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            error.println(&e.to_string())?;
            error.flush()
        }
    }
}
