//! Sessions attached to the process's stdin, stdout and stderr.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::session::{ChannelLineReader, Environment, Evaluator, Session, SessionId, WriterSink};
use crate::Result;

/// Lines buffered between the stdin pump and the reading shell.
const LINE_BUFFER: usize = 64;

/// Build a session reading stdin and writing stdout and stderr.
///
/// Stdin is pumped by a task spawned on `handle`. The session closes once
/// stdin reaches end of input and every line before it has been read. Read
/// the session from a blocking thread, not from inside the runtime.
pub fn stdio_session(
    id: SessionId,
    evaluator: Arc<dyn Evaluator>,
    environment: Environment,
    handle: &Handle,
) -> Result<Session> {
    piped_session(
        id,
        evaluator,
        environment,
        BufReader::new(tokio::io::stdin()),
        handle,
    )
}

/// Like [`stdio_session`] but reading lines from `reader`.
pub fn piped_session<R>(
    id: SessionId,
    evaluator: Arc<dyn Evaluator>,
    environment: Environment,
    reader: R,
    handle: &Handle,
) -> Result<Session>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(LINE_BUFFER);
    let open = Arc::new(AtomicBool::new(true));
    let line_ending = environment.line_ending();

    let input = ChannelLineReader::new(rx, handle.clone()).closing_on_disconnect(open.clone());
    let session = Session::builder(id)
        .open_flag(open)
        .input(Arc::new(input))
        .output(Arc::new(
            WriterSink::new(std::io::stdout()).with_line_ending(line_ending),
        ))
        .error(Arc::new(
            WriterSink::new(std::io::stderr()).with_line_ending(line_ending),
        ))
        .shared_evaluator(evaluator)
        .environment(environment)
        .build()?;

    handle.spawn(pump_lines(reader, tx));
    Ok(session)
}

/// Forward lines from `reader` until end of input, then drop `tx`.
///
/// Line terminators (`\n` or `\r\n`) are stripped. Returns the number of
/// lines forwarded.
pub async fn pump_lines<R>(reader: R, tx: mpsc::Sender<String>) -> usize
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut forwarded = 0;

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if tx.send(line).await.is_err() {
                    debug!("line pump: reader gone");
                    break;
                }
                forwarded += 1;
            }
            Ok(None) => {
                debug!(forwarded, "line pump: end of input");
                break;
            }
            Err(e) => {
                error!("line pump: read failed: {}", e);
                break;
            }
        }
    }

    forwarded
}
