//! Built-in terminal commands.
//!
//! | command                 | effect                                              |
//! |-------------------------|-----------------------------------------------------|
//! | `exit`                  | closes the session                                  |
//! | `print <text>`          | prints text without a line ending                   |
//! | `println <text>`        | prints text and a line ending                       |
//! | `printenv [names..]`    | prints environment values                           |
//! | `setenv <name> <value>` | sets an environment value                           |
//! | `readline [timeout_ms]` | reads one line of input and returns it              |
//! | `shell [timeout_ms]`    | runs a nested shell, returns its exit code          |
//!
//! Anything else goes to the fallback evaluator, if one was given.

use std::sync::Arc;

use tracing::debug;

use crate::error::TermhubError;
use crate::session::{Evaluator, Session, Value};
use crate::shell::{ShellEngine, DEFAULT_TIMEOUT_MS};
use crate::Result;

/// Timeout used by `readline` without an argument: poll once.
pub const READLINE_DEFAULT_TIMEOUT_MS: i64 = 0;

/// Evaluator implementing the built-in commands.
#[derive(Clone, Default)]
pub struct Builtins {
    fallback: Option<Arc<dyn Evaluator>>,
}

impl Builtins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send unknown commands to `fallback` instead of failing.
    pub fn with_fallback<E: Evaluator + 'static>(mut self, fallback: E) -> Self {
        self.fallback = Some(Arc::new(fallback));
        self
    }
}

impl Evaluator for Builtins {
    fn evaluate(&self, source: &str, session: &Session) -> Result<Option<Value>> {
        let line = source.trim_start();
        if line.trim_end().is_empty() {
            return Ok(None);
        }

        let (name, args) = match line.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args),
            None => (line, ""),
        };

        match name {
            "exit" => {
                if !args.trim().is_empty() {
                    return Err(TermhubError::Evaluation("exit takes no arguments".into()));
                }
                session.close();
                Ok(None)
            }
            "print" => {
                session.print(args)?;
                Ok(None)
            }
            "println" => {
                session.println(args)?;
                Ok(None)
            }
            "printenv" => {
                printenv(session, args)?;
                Ok(None)
            }
            "setenv" => {
                let (key, value) = args.trim_start().split_once(char::is_whitespace).ok_or_else(
                    || TermhubError::Evaluation("usage: setenv <name> <value>".into()),
                )?;
                session.environment().set(key, value.trim())?;
                Ok(None)
            }
            "readline" => {
                let timeout = timeout_arg(args, READLINE_DEFAULT_TIMEOUT_MS)?;
                Ok(session.read_line(timeout)?.map(Value::Text))
            }
            "shell" => {
                let engine = ShellEngine::new(timeout_arg(args, DEFAULT_TIMEOUT_MS)?)?;
                debug!(timeout_ms = engine.timeout_ms(), "nested shell");
                let code = engine.run(session)?;
                Ok(Some(Value::Integer(code.into())))
            }
            _ => match &self.fallback {
                Some(fallback) => fallback.evaluate(source, session),
                None => {
                    debug!(command = name, "unknown command");
                    Err(TermhubError::Evaluation(format!("unknown command: {name}")))
                }
            },
        }
    }

    fn to_text(&self, value: &Value, session: &Session) -> Result<String> {
        match &self.fallback {
            Some(fallback) => fallback.to_text(value, session),
            None => value.to_text(),
        }
    }
}

fn timeout_arg(args: &str, default: i64) -> Result<i64> {
    match args.trim() {
        "" => Ok(default),
        text => text
            .parse()
            .map_err(|_| TermhubError::Evaluation(format!("invalid timeout {text:?}"))),
    }
}

/// With no names print `name=value` for every value, otherwise print each
/// named value alone. Names without a value are skipped.
fn printenv(session: &Session, args: &str) -> Result<()> {
    let environment = session.environment();
    let requested: Vec<String> = args.split_whitespace().map(str::to_string).collect();
    let prefix_with_name = requested.is_empty();
    let names = if prefix_with_name {
        environment.names()
    } else {
        requested
    };

    let output = session.output()?;
    for name in names {
        if let Some(value) = environment.get(&name) {
            if prefix_with_name {
                output.print(&name)?;
                output.print("=")?;
            }
            output.println(&value)?;
        }
    }
    Ok(())
}
