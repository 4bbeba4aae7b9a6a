//! Interactive child process with piped standard streams.
//!
//! A background task owns the [`tokio::process::Child`] and is the only thing
//! that waits on or signals it. Callers interact through [`ProcessHandle`]:
//! writing to stdin, requesting termination and observing the exit.

use std::fmt;
use std::io;
use std::path::Path;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::buffer::OutputSink;
use super::lock;
use crate::errors::ExecutionError;
use crate::executors::CommandSpec;

/// How long the exit task waits for the output readers after the process exits.
/// Grandchildren that inherited the pipes can keep them open indefinitely.
const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);
const READ_CHUNK: usize = 4096;

/// Final status of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    pub code: Option<i32>,
}

impl ProcessExit {
    fn from_status(status: io::Result<ExitStatus>) -> Self {
        match status {
            Ok(status) => Self { code: status.code() },
            Err(e) => {
                log::warn!("Failed to collect exit status: {}", e);
                Self { code: None }
            }
        }
    }

    /// Line appended to the session output once the program is gone.
    pub fn marker(&self) -> String {
        format!("\n\n[Program {}]", self)
    }
}

impl fmt::Display for ProcessExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "finished with exit code {}", code),
            None => f.write_str("terminated by signal"),
        }
    }
}

pub struct ProcessHandle {
    pid: Option<u32>,
    stdin: Mutex<Option<ChildStdin>>,
    cancel: CancellationToken,
    exit: watch::Receiver<Option<ProcessExit>>,
}

impl ProcessHandle {
    /// Spawn `spec` in `cwd`. Stdout and stderr are appended to `sink` as they
    /// arrive; `on_exit` runs once after the process has exited and its
    /// remaining output has been drained into the sink.
    pub fn spawn<F>(
        spec: &CommandSpec,
        cwd: &Path,
        sink: OutputSink,
        kill_grace: Duration,
        on_exit: F,
    ) -> Result<Self, ExecutionError>
    where
        F: FnOnce(ProcessExit) + Send + 'static,
    {
        let mut child = spec
            .to_command(cwd)
            .spawn()
            .map_err(|e| ExecutionError::spawn(&spec.program, e))?;

        let pid = child.id();
        let stdin = child.stdin.take();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(pump(stdout, sink.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(pump(stderr, sink));
        }

        let cancel = CancellationToken::new();
        let (exit_tx, exit_rx) = watch::channel(None);

        let token = cancel.clone();
        tokio::spawn(async move {
            let finished = tokio::select! {
                status = child.wait() => Some(status),
                _ = token.cancelled() => None,
            };
            let status = match finished {
                Some(status) => status,
                None => terminate(&mut child, kill_grace).await,
            };

            for mut reader in readers {
                if tokio::time::timeout(DRAIN_TIMEOUT, &mut reader).await.is_err() {
                    reader.abort();
                }
            }

            let exit = ProcessExit::from_status(status);
            let _ = exit_tx.send(Some(exit));
            on_exit(exit);
        });

        log::debug!("Spawned {} (pid {:?})", spec.program, pid);
        Ok(Self {
            pid,
            stdin: Mutex::new(stdin),
            cancel,
            exit: exit_rx,
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Write bytes to the process's stdin.
    pub async fn write(&self, bytes: &[u8]) -> io::Result<()> {
        let mut guard = self.stdin.lock().await;
        let pipe = guard
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "stdin is closed"))?;
        pipe.write_all(bytes).await?;
        pipe.flush().await
    }

    /// Ask the process to stop: SIGTERM first, SIGKILL once the grace period lapses.
    pub fn terminate(&self) {
        self.cancel.cancel();
    }

    pub fn exit(&self) -> Option<ProcessExit> {
        *self.exit.borrow()
    }

    pub fn has_exited(&self) -> bool {
        self.exit.borrow().is_some()
    }

    /// Wait up to `timeout` for the process to exit.
    pub async fn wait_exit(&self, timeout: Duration) -> Option<ProcessExit> {
        let mut rx = self.exit.clone();
        let exit = match tokio::time::timeout(timeout, rx.wait_for(|exit| exit.is_some())).await {
            Ok(Ok(exit)) => *exit,
            _ => self.exit(),
        };
        exit
    }
}

impl fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("pid", &self.pid)
            .field("exit", &self.exit())
            .finish()
    }
}

fn pump<R>(mut stream: R, sink: OutputSink) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match stream.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => lock(&sink).push(&chunk[..n]),
                Err(e) => {
                    log::debug!("Output stream closed with error: {}", e);
                    break;
                }
            }
        }
    })
}

async fn terminate(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok() {
                if let Ok(status) = tokio::time::timeout(grace, child.wait()).await {
                    return status;
                }
                log::debug!("pid {} ignored SIGTERM for {:?}, sending SIGKILL", pid, grace);
            }
        }
    }
    #[cfg(not(unix))]
    let _ = grace;

    child.kill().await?;
    child.wait().await
}
