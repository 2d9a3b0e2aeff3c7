//! Line-oriented REPL engine.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use termhub::session::{BufferSink, QueuedLineReader, Session, SessionId, Value};
//! use termhub::shell::ShellEngine;
//!
//! let output = Arc::new(BufferSink::new());
//! let session = Session::builder(SessionId::of(1))
//!     .input(Arc::new(QueuedLineReader::from_lines(["1 +\\", " 2", "exit"])))
//!     .output(output.clone())
//!     .error(Arc::new(BufferSink::new()))
//!     .evaluator(|source: &str, session: &Session| -> termhub::Result<Option<Value>> {
//!         if source == "exit" {
//!             session.close();
//!             return Ok(None);
//!         }
//!         Ok(Some(Value::text(source)))
//!     })
//!     .build()?;
//!
//! ShellEngine::new(10)?.run(&session)?;
//! assert_eq!(output.contents(), "1 + 2\n");
//! # Ok::<(), termhub::TermhubError>(())
//! ```

mod engine;
mod escape;

pub use engine::{ShellEngine, DEFAULT_TIMEOUT_MS, OK_EXIT_CODE};
pub use escape::unescape;
