//! Line input sources and text output sinks.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::environment::LineEnding;
use crate::error::TermhubError;
use crate::Result;

/// Validate a read timeout in milliseconds. Zero means "poll".
pub fn read_timeout(timeout_ms: i64) -> Result<Duration> {
    u64::try_from(timeout_ms)
        .map(Duration::from_millis)
        .map_err(|_| TermhubError::InvalidArgument(format!("Invalid timeout {timeout_ms} < 0")))
}

/// Blocking, timeout-bounded source of input lines.
pub trait LineReader: Send + Sync {
    /// Wait at most `timeout_ms` for a line.
    ///
    /// Returns `Ok(None)` when nothing arrived in time. Negative timeouts fail
    /// with [`TermhubError::InvalidArgument`].
    fn read_line(&self, timeout_ms: i64) -> Result<Option<String>>;
}

/// A reader that never produces input.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInput;

impl LineReader for NoInput {
    fn read_line(&self, timeout_ms: i64) -> Result<Option<String>> {
        read_timeout(timeout_ms)?;
        Ok(None)
    }
}

/// In-memory reader fed ahead of time or by another thread.
///
/// Each queued entry is either a line or an explicit timeout. An empty queue
/// also reads as a timeout, without waiting.
#[derive(Debug, Default)]
pub struct QueuedLineReader {
    queue: Mutex<VecDeque<Option<String>>>,
    reads: Mutex<u64>,
}

impl QueuedLineReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// A reader preloaded with `lines`.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let reader = Self::new();
        for line in lines {
            reader.push_line(line);
        }
        reader
    }

    pub fn push_line(&self, line: impl Into<String>) {
        self.lock().push_back(Some(line.into()));
    }

    /// Queue a read that times out.
    pub fn push_timeout(&self) {
        self.lock().push_back(None);
    }

    /// Entries not yet consumed.
    pub fn remaining(&self) -> usize {
        self.lock().len()
    }

    /// Number of `read_line` calls made so far.
    pub fn reads(&self) -> u64 {
        *self.reads.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Option<String>>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LineReader for QueuedLineReader {
    fn read_line(&self, timeout_ms: i64) -> Result<Option<String>> {
        read_timeout(timeout_ms)?;
        *self.reads.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(self.lock().pop_front().flatten())
    }
}

/// Reader draining a tokio channel, blocking the calling thread on the runtime.
///
/// Must be read from a thread outside the runtime's async context, e.g. one
/// started with `spawn_blocking` or a plain `std::thread`.
pub struct ChannelLineReader {
    rx: Mutex<mpsc::Receiver<String>>,
    handle: Handle,
    open: Option<Arc<AtomicBool>>,
}

impl ChannelLineReader {
    pub fn new(rx: mpsc::Receiver<String>, handle: Handle) -> Self {
        Self {
            rx: Mutex::new(rx),
            handle,
            open: None,
        }
    }

    /// Clear `open` once every sender is gone and the channel is drained.
    ///
    /// Pass the flag given to [`SessionBuilder::open_flag`](super::SessionBuilder::open_flag)
    /// to close the session at end of input.
    pub fn closing_on_disconnect(mut self, open: Arc<AtomicBool>) -> Self {
        self.open = Some(open);
        self
    }
}

impl LineReader for ChannelLineReader {
    fn read_line(&self, timeout_ms: i64) -> Result<Option<String>> {
        let timeout = read_timeout(timeout_ms)?;
        let mut rx = self.rx.lock().map_err(|_| TermhubError::LockPoisoned)?;

        self.handle.block_on(async {
            match tokio::time::timeout(timeout, rx.recv()).await {
                Ok(Some(line)) => {
                    trace!("line reader: {} bytes", line.len());
                    Ok(Some(line))
                }
                Ok(None) => {
                    match &self.open {
                        Some(open) => {
                            if open.swap(false, Ordering::SeqCst) {
                                debug!("line reader: input disconnected");
                            }
                        }
                        // nobody to tell, behave like a timeout
                        None => tokio::time::sleep(timeout).await,
                    }
                    Ok(None)
                }
                Err(_) => Ok(None),
            }
        })
    }
}

/// Destination for output or error text.
pub trait OutputSink: Send + Sync {
    fn print(&self, text: &str) -> Result<()>;

    fn flush(&self) -> Result<()>;

    /// Terminator appended by [`OutputSink::println`].
    fn line_ending(&self) -> LineEnding {
        LineEnding::Lf
    }

    fn println(&self, text: &str) -> Result<()> {
        self.print(text)?;
        self.print(self.line_ending().as_str())
    }
}

/// Sink writing to any `Write`, e.g. stdout.
pub struct WriterSink<W: Write + Send> {
    writer: Mutex<W>,
    line_ending: LineEnding,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            line_ending: LineEnding::default(),
        }
    }

    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Unwrap the writer.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> OutputSink for WriterSink<W> {
    fn print(&self, text: &str) -> Result<()> {
        let mut writer = self.writer.lock().map_err(|_| TermhubError::LockPoisoned)?;
        writer.write_all(text.as_bytes())?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        let mut writer = self.writer.lock().map_err(|_| TermhubError::LockPoisoned)?;
        writer.flush()?;
        Ok(())
    }

    fn line_ending(&self) -> LineEnding {
        self.line_ending
    }
}

#[derive(Debug, Default)]
struct Buffered {
    flushed: String,
    pending: String,
    flushes: u64,
}

/// In-memory sink that keeps flushed and not-yet-flushed text apart.
#[derive(Debug, Default)]
pub struct BufferSink {
    inner: Mutex<Buffered>,
    line_ending: LineEnding,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Everything printed, flushed or not.
    pub fn contents(&self) -> String {
        let inner = self.lock();
        format!("{}{}", inner.flushed, inner.pending)
    }

    /// Only text that has been flushed.
    pub fn flushed(&self) -> String {
        self.lock().flushed.clone()
    }

    /// Text printed since the last flush.
    pub fn pending(&self) -> String {
        self.lock().pending.clone()
    }

    pub fn flush_count(&self) -> u64 {
        self.lock().flushes
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Buffered> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl OutputSink for BufferSink {
    fn print(&self, text: &str) -> Result<()> {
        self.lock().pending.push_str(text);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        let mut inner = self.lock();
        let pending = std::mem::take(&mut inner.pending);
        inner.flushed.push_str(&pending);
        inner.flushes += 1;
        Ok(())
    }

    fn line_ending(&self) -> LineEnding {
        self.line_ending
    }
}
