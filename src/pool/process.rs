//! Child-process worker handle.
//!
//! A worker is this same binary re-executed with [`WORKER_ENV`] set; it
//! answers framed jobs on stdin/stdout and inherits stderr so its log
//! output lands with the parent's. Closing stdin ends the worker.

use crate::common::{Error, ProcessingResult, Result};
use crate::pool::WORKER_ENV;
use crate::pool::protocol::{decode_result, read_frame, write_frame};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

pub(crate) struct ProcessWorker {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: ChildStdout,
}

impl ProcessWorker {
    pub(crate) fn spawn() -> Result<Self> {
        let exe = std::env::current_exe()?;
        let mut child = Command::new(exe)
            .env(WORKER_ENV, "1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Worker("worker stdin was not captured".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Worker("worker stdout was not captured".into()))?;
        tracing::debug!(pid = child.id(), "worker process spawned");
        Ok(Self {
            child,
            stdin: Some(stdin),
            stdout,
        })
    }

    /// Send one encoded job and wait for its result frame.
    pub(crate) fn run(&mut self, job: &[u8]) -> Result<ProcessingResult> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| Error::Worker("worker stdin already closed".into()))?;
        write_frame(stdin, job)?;
        match read_frame(&mut self.stdout)? {
            Some(frame) => decode_result(&frame),
            None => Err(Error::Worker("worker exited before replying".into())),
        }
    }
}

impl Drop for ProcessWorker {
    fn drop(&mut self) {
        // EOF on stdin lets the worker loop finish cleanly.
        self.stdin.take();
        let _ = self.child.wait();
    }
}
