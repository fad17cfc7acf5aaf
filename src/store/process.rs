//! Bounded subprocess execution.
//!
//! Every external command the store runs goes through [`run`], which enforces
//! a deadline. A child still running at the deadline is killed and the call
//! fails with [`BravetuneError::Timeout`]. Output still unread at the deadline
//! (a background grandchild holding the pipes) is dropped.

use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::BravetuneError;

const POLL_INTERVAL: Duration = Duration::from_millis(20);
/// Minimum wait for output after a child exits close to its deadline.
const DRAIN_GRACE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Captured result of a finished command.
#[derive(Debug)]
pub struct Output {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl Output {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Trimmed stderr, or the exit status when stderr is empty.
    pub fn failure_reason(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.status.to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Run `program` with `args`, waiting at most `timeout`.
pub fn run(program: &str, args: &[&str], timeout: Duration) -> Result<Output, BravetuneError> {
    debug!(program, ?args, timeout_secs = timeout.as_secs(), "running command");

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| BravetuneError::io(program, e))?;

    // Drain both pipes on their own threads so a chatty child cannot fill a
    // pipe buffer and block before exiting.
    let (tx, rx) = mpsc::channel();
    if let Some(pipe) = child.stdout.take() {
        drain(pipe, Stream::Stdout, tx.clone());
    }
    if let Some(pipe) = child.stderr.take() {
        drain(pipe, Stream::Stderr, tx.clone());
    }
    drop(tx);

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                debug!(program, "command timed out, killed");
                return Err(BravetuneError::Timeout {
                    program: program.into(),
                    after: timeout,
                });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => return Err(BravetuneError::io(program, e)),
        }
    };

    let mut output = Output {
        status,
        stdout: String::new(),
        stderr: String::new(),
    };
    let drain_until = deadline.max(Instant::now() + DRAIN_GRACE);
    loop {
        let wait = drain_until.saturating_duration_since(Instant::now());
        match rx.recv_timeout(wait) {
            Ok((Stream::Stdout, text)) => output.stdout = text,
            Ok((Stream::Stderr, text)) => output.stderr = text,
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                debug!(program, "output pipes still open after exit, not waiting");
                break;
            }
        }
    }
    debug!(program, status = %output.status, "command finished");
    Ok(output)
}

/// Read `pipe` to the end on its own thread and send the text on `tx`.
fn drain<R: Read + Send + 'static>(mut pipe: R, stream: Stream, tx: Sender<(Stream, String)>) {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send((stream, String::from_utf8_lossy(&buf).into_owned()));
    });
}
