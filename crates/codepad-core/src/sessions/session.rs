use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::buffer::OutputSink;
use super::process::{ProcessExit, ProcessHandle};
use super::{lock, SessionId, SessionOutput, SessionState};
use crate::executors::{Language, Workspace};

/// State and timestamps shared between a session and its process exit callback.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    state: SessionState,
    last_activity: Instant,
    finished_at: Option<Instant>,
    exit: Option<ProcessExit>,
}

pub(crate) type SharedLifecycle = Arc<Mutex<Lifecycle>>;

impl Lifecycle {
    pub(crate) fn shared() -> SharedLifecycle {
        Arc::new(Mutex::new(Self {
            state: SessionState::Starting,
            last_activity: Instant::now(),
            finished_at: None,
            exit: None,
        }))
    }

    /// Record the process exit. A session that was killed or expired keeps
    /// that state; anything else becomes `Completed`.
    pub(crate) fn record_exit(&mut self, exit: ProcessExit) -> SessionState {
        self.exit = Some(exit);
        if !self.state.is_terminal() {
            self.state = SessionState::Completed;
        }
        self.finished_at.get_or_insert_with(Instant::now);
        self.state
    }
}

pub struct Session {
    id: SessionId,
    language: Language,
    created_at: DateTime<Utc>,
    process: ProcessHandle,
    output: OutputSink,
    lifecycle: SharedLifecycle,
    workspace: Mutex<Option<Workspace>>,
    /// Serializes input, kill and expiry on this session.
    op_lock: tokio::sync::Mutex<()>,
}

impl Session {
    pub(crate) fn new(
        id: SessionId,
        language: Language,
        process: ProcessHandle,
        output: OutputSink,
        lifecycle: SharedLifecycle,
        workspace: Workspace,
    ) -> Self {
        Self {
            id,
            language,
            created_at: Utc::now(),
            process,
            output,
            lifecycle,
            workspace: Mutex::new(Some(workspace)),
            op_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn process(&self) -> &ProcessHandle {
        &self.process
    }

    pub fn state(&self) -> SessionState {
        lock(&self.lifecycle).state
    }

    pub fn idle_for(&self) -> Duration {
        lock(&self.lifecycle).last_activity.elapsed()
    }

    /// Time since the session reached a terminal state, if it has.
    pub fn finished_for(&self) -> Option<Duration> {
        lock(&self.lifecycle).finished_at.map(|at| at.elapsed())
    }

    pub fn touch(&self) {
        lock(&self.lifecycle).last_activity = Instant::now();
    }

    /// Move from `from` to `to`; does nothing if the session has moved on.
    pub(crate) fn transition(&self, from: SessionState, to: SessionState) -> bool {
        let mut lifecycle = lock(&self.lifecycle);
        if lifecycle.state != from {
            return false;
        }
        lifecycle.state = to;
        true
    }

    /// Enter a terminal state unless one was already reached. Returns the
    /// state the session ends up in.
    pub(crate) fn finish(&self, state: SessionState) -> SessionState {
        let mut lifecycle = lock(&self.lifecycle);
        if !lifecycle.state.is_terminal() {
            lifecycle.state = state;
            lifecycle.finished_at = Some(Instant::now());
        }
        lifecycle.state
    }

    /// Reset the buffer and mark the session busy ahead of writing input.
    /// Returns false, leaving output and state alone, once the process has
    /// exited or the session has ended.
    ///
    /// The lifecycle lock is held while the buffer is cleared. The exit
    /// callback appends its marker under the same lock, so the marker is
    /// never wiped by a clear that raced with the exit.
    pub(crate) fn begin_input(&self) -> bool {
        let mut lifecycle = lock(&self.lifecycle);
        if lifecycle.exit.is_some() || !lifecycle.state.is_idle_candidate() {
            return false;
        }
        lock(&self.output).clear();
        lifecycle.state = SessionState::Running;
        lifecycle.last_activity = Instant::now();
        true
    }

    pub fn output_text(&self) -> String {
        lock(&self.output).snapshot()
    }

    pub fn snapshot(&self) -> SessionOutput {
        let output = self.output_text();
        let state = self.state();
        SessionOutput {
            output,
            waiting_for_input: !state.is_terminal() && !self.process.has_exited(),
            state,
        }
    }

    pub(crate) async fn serialize(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.op_lock.lock().await
    }

    /// Hand out the workspace for removal. Only the first caller gets it.
    pub(crate) fn take_workspace(&self) -> Option<Workspace> {
        lock(&self.workspace).take()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("language", &self.language)
            .field("state", &self.state())
            .field("process", &self.process)
            .finish()
    }
}
