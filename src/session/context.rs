//! The session capability bundle and its builder.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use super::environment::{Environment, Principal, TERMINAL_ID};
use super::io::{LineReader, NoInput, OutputSink, WriterSink};
use super::value::{Evaluator, Value};
use super::SessionId;
use crate::error::TermhubError;
use crate::Result;

struct Shared {
    id: SessionId,
    open: Arc<AtomicBool>,
    input: Arc<dyn LineReader>,
    output: Arc<dyn OutputSink>,
    error: Arc<dyn OutputSink>,
    evaluator: Arc<dyn Evaluator>,
}

/// One interactive terminal connection.
///
/// Cloning is cheap and every clone observes the same open flag. The id,
/// I/O and evaluator are fixed at construction; binding another environment
/// yields a new `Session` value via [`Session::with_environment`].
#[derive(Clone)]
pub struct Session {
    shared: Arc<Shared>,
    environment: Environment,
}

impl Session {
    /// Start building a session with the given id.
    pub fn builder(id: SessionId) -> SessionBuilder {
        SessionBuilder::new(id)
    }

    pub fn id(&self) -> SessionId {
        self.shared.id
    }

    pub fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::SeqCst)
    }

    /// Close the session. Closing twice is a no-op.
    pub fn close(&self) {
        if self.shared.open.swap(false, Ordering::SeqCst) {
            debug!(session = %self.id(), "terminal closed");
        }
    }

    /// Whether `other` is a handle to the same session, environment aside.
    pub fn same_session(&self, other: &Session) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub fn input(&self) -> Result<&Arc<dyn LineReader>> {
        self.verify_open()?;
        Ok(&self.shared.input)
    }

    pub fn output(&self) -> Result<&Arc<dyn OutputSink>> {
        self.verify_open()?;
        Ok(&self.shared.output)
    }

    pub fn error(&self) -> Result<&Arc<dyn OutputSink>> {
        self.verify_open()?;
        Ok(&self.shared.error)
    }

    /// Read one line from the input, waiting at most `timeout_ms`.
    pub fn read_line(&self, timeout_ms: i64) -> Result<Option<String>> {
        self.input()?.read_line(timeout_ms)
    }

    pub fn print(&self, text: &str) -> Result<()> {
        self.output()?.print(text)
    }

    pub fn println(&self, text: &str) -> Result<()> {
        self.output()?.println(text)
    }

    /// Evaluate `source` with this session as context.
    pub fn evaluate(&self, source: &str) -> Result<Option<Value>> {
        self.verify_open()?;
        self.shared.evaluator.evaluate(source, self)
    }

    /// The evaluator's value to text conversion.
    pub fn to_text(&self, value: &Value) -> Result<String> {
        self.shared.evaluator.to_text(value, self)
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// The owning principal, taken from the environment's user.
    pub fn owner(&self) -> Option<Principal> {
        self.environment.user()
    }

    /// The same session bound to another environment.
    ///
    /// Records this session's id under `terminal` in `environment`. That
    /// write is visible through every clone sharing `environment`; pass a
    /// [`Environment::clone_environment`] copy to keep the caller's clean.
    pub fn with_environment(&self, environment: Environment) -> Session {
        if self.environment.same_as(&environment) {
            return self.clone();
        }
        record_id(&environment, self.id());
        Session {
            shared: Arc::clone(&self.shared),
            environment,
        }
    }

    /// The same session bound to a private copy of its environment.
    pub fn clone_environment(&self) -> Session {
        self.with_environment(self.environment.clone_environment())
    }

    fn verify_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(TermhubError::TerminalClosed(self.id()))
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id())
            .field("open", &self.is_open())
            .field("environment", &self.environment)
            .finish()
    }
}

fn record_id(environment: &Environment, id: SessionId) {
    // TERMINAL_ID is a plain value, setting it cannot fail
    let _ = environment.set(TERMINAL_ID, id.to_string());
}

/// Builder for [`Session`].
pub struct SessionBuilder {
    id: SessionId,
    input: Option<Arc<dyn LineReader>>,
    output: Option<Arc<dyn OutputSink>>,
    error: Option<Arc<dyn OutputSink>>,
    evaluator: Option<Arc<dyn Evaluator>>,
    environment: Option<Environment>,
    open: Option<Arc<AtomicBool>>,
}

impl SessionBuilder {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            input: None,
            output: None,
            error: None,
            evaluator: None,
            environment: None,
            open: None,
        }
    }

    /// Share the open flag with the embedder, which may clear it to close
    /// the session. It is set to `true` by [`SessionBuilder::build`].
    pub fn open_flag(mut self, open: Arc<AtomicBool>) -> Self {
        self.open = Some(open);
        self
    }

    /// Input source. Defaults to [`NoInput`].
    pub fn input(mut self, input: Arc<dyn LineReader>) -> Self {
        self.input = Some(input);
        self
    }

    /// Output sink. Defaults to stdout.
    pub fn output(mut self, output: Arc<dyn OutputSink>) -> Self {
        self.output = Some(output);
        self
    }

    /// Error sink. Defaults to stderr.
    pub fn error(mut self, error: Arc<dyn OutputSink>) -> Self {
        self.error = Some(error);
        self
    }

    pub fn evaluator<E: Evaluator + 'static>(mut self, evaluator: E) -> Self {
        self.evaluator = Some(Arc::new(evaluator));
        self
    }

    /// Use an evaluator shared with other sessions.
    pub fn shared_evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// Environment. Defaults to [`Environment::new`].
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Build the session, open.
    pub fn build(self) -> Result<Session> {
        let evaluator = self
            .evaluator
            .ok_or_else(|| TermhubError::InvalidArgument("session evaluator missing".into()))?;
        let environment = self.environment.unwrap_or_default();
        record_id(&environment, self.id);

        let line_ending = environment.line_ending();
        let output = self.output.unwrap_or_else(|| {
            Arc::new(WriterSink::new(std::io::stdout()).with_line_ending(line_ending))
        });
        let error = self.error.unwrap_or_else(|| {
            Arc::new(WriterSink::new(std::io::stderr()).with_line_ending(line_ending))
        });

        let open = self.open.unwrap_or_default();
        open.store(true, Ordering::SeqCst);

        debug!(session = %self.id, "terminal created");

        Ok(Session {
            shared: Arc::new(Shared {
                id: self.id,
                open,
                input: self.input.unwrap_or_else(|| Arc::new(NoInput)),
                output,
                error,
                evaluator,
            }),
            environment,
        })
    }
}
