//! Evaluation results and the evaluator contract.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::Session;
use crate::error::TermhubError;
use crate::Result;

/// A value that knows exactly how it should appear on a terminal.
pub trait TerminalText: Send + Sync {
    fn terminal_text(&self) -> String;
}

/// Result of evaluating one logical line.
#[derive(Clone)]
pub enum Value {
    Text(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    List(Vec<Value>),
    /// Printed verbatim through [`TerminalText`], bypassing conversion.
    Rich(Arc<dyn TerminalText>),
    /// A host value with no text conversion.
    Opaque {
        type_name: &'static str,
        value: Arc<dyn Any + Send + Sync>,
    },
}

impl Value {
    pub fn text(text: impl Into<String>) -> Self {
        Value::Text(text.into())
    }

    pub fn rich<T: TerminalText + 'static>(value: T) -> Self {
        Value::Rich(Arc::new(value))
    }

    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Value::Opaque {
            type_name: std::any::type_name::<T>(),
            value: Arc::new(value),
        }
    }

    /// Generic conversion to text.
    ///
    /// Lists render as `[a, b]`. Opaque values, alone or nested, fail with
    /// [`TermhubError::Conversion`].
    pub fn to_text(&self) -> Result<String> {
        match self {
            Value::Text(text) => Ok(text.clone()),
            Value::Integer(n) => Ok(n.to_string()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Boolean(b) => Ok(b.to_string()),
            Value::List(items) => {
                let items = items
                    .iter()
                    .map(Value::to_text)
                    .collect::<Result<Vec<_>>>()?;
                Ok(format!("[{}]", items.join(", ")))
            }
            Value::Rich(rich) => Ok(rich.terminal_text()),
            Value::Opaque { type_name, .. } => Err(TermhubError::Conversion(format!(
                "Unable to convert {type_name} to text"
            ))),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Value::Integer(n) => f.debug_tuple("Integer").field(n).finish(),
            Value::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Value::Boolean(b) => f.debug_tuple("Boolean").field(b).finish(),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Rich(rich) => f.debug_tuple("Rich").field(&rich.terminal_text()).finish(),
            Value::Opaque { type_name, .. } => f.debug_tuple("Opaque").field(type_name).finish(),
        }
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

/// Turns source text into a value, with the session as context.
///
/// Return [`TermhubError::Unsupported`] to abort a running shell; any other
/// error is reported on the session's error sink.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, source: &str, session: &Session) -> Result<Option<Value>>;

    /// Generic value to text conversion used when displaying results.
    fn to_text(&self, value: &Value, _session: &Session) -> Result<String> {
        value.to_text()
    }
}

impl<F> Evaluator for F
where
    F: Fn(&str, &Session) -> Result<Option<Value>> + Send + Sync,
{
    fn evaluate(&self, source: &str, session: &Session) -> Result<Option<Value>> {
        self(source, session)
    }
}
