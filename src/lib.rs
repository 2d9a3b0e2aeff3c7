//! # termhub
//!
//! Concurrent terminal sessions and a line-oriented REPL engine.
//!
//! A [`Session`] bundles line input, output and error sinks, an
//! [`Evaluator`](session::Evaluator) and a shared
//! [`Environment`](session::Environment). Sessions live in a
//! [`SessionRegistry`], optionally behind an [`AccessFilteredRegistry`] that
//! hides other users' sessions. A [`ShellEngine`] drives one session: it reads
//! lines with a timeout, joins backslash continuations, decodes escapes,
//! evaluates and prints until the session closes.
//!
//! ## Features
//!
//! - **Thread-safe registry**: atomic insert-if-absent, per-principal filtering
//! - **Pluggable evaluation**: any `Fn(&str, &Session)` is an evaluator
//! - **Built-in commands**: `exit`, `print`, `printenv`, `setenv` and friends
//! - **Stdio sessions**: stdin pumped through tokio with bounded read waits
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use termhub::session::{Environment, IdSource, SequentialIds};
//! use termhub::{system, Builtins, Registry, SessionRegistry, ShellEngine};
//!
//! fn main() -> termhub::Result<()> {
//!     termhub::logging::try_init().ok();
//!
//!     let runtime = tokio::runtime::Runtime::new()?;
//!     let handle = runtime.handle().clone();
//!     let ids = SequentialIds::new();
//!
//!     let registry = SessionRegistry::new(move |environment: Environment| {
//!         system::stdio_session(ids.next_id(), Arc::new(Builtins::new()), environment, &handle)
//!     });
//!
//!     let session = registry.create_from_environment(Environment::new())?;
//!     let code = ShellEngine::default().run(&session)?;
//!     registry.remove(session.id())?;
//!
//!     runtime.shutdown_background();
//!     std::process::exit(code);
//! }
//! ```

pub mod builtins;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod registry;
pub mod session;
pub mod shell;
pub mod system;

// Re-export commonly used types
pub use builtins::Builtins;
pub use error::{Result, TermhubError};
pub use registry::{AccessFilteredRegistry, Registry, SessionRegistry};
pub use session::{Environment, Evaluator, Principal, Session, SessionId, Value};
pub use shell::ShellEngine;
