//! Session types.
//!
//! A [`Session`] bundles an id, an open flag, line input, output and error
//! sinks, an [`Evaluator`] and an [`Environment`] carrying the owning
//! [`Principal`].

mod context;
mod environment;
mod id;
mod io;
mod value;

pub use context::{Session, SessionBuilder};
pub use environment::{
    Environment, EnvironmentChange, LineEnding, Principal, LINE_ENDING, LOCALE, TERMINAL_ID, USER,
};
pub use id::{IdSource, SequentialIds, SessionId};
pub use io::{
    read_timeout, BufferSink, ChannelLineReader, LineReader, NoInput, OutputSink,
    QueuedLineReader, WriterSink,
};
pub use value::{Evaluator, TerminalText, Value};
