//! Interactive sessions: one long-lived OS process per submission, driven
//! across independent request/response calls.
//!
//! [`SessionManager`] owns the session table. Each session pairs a
//! [`process::ProcessHandle`] with a bounded [`buffer::OutputBuffer`] and a
//! workspace that is removed exactly once when the session ends.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

pub mod buffer;
pub mod manager;
pub mod process;
pub mod session;

pub use buffer::{OutputBuffer, OutputSink};
pub use manager::SessionManager;
pub use process::{ProcessExit, ProcessHandle};
pub use session::Session;

/// Lock a std mutex, recovering the data if a panicking holder poisoned it.
/// Nothing guarded this way is left half-updated by a panic.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Starting,
    AwaitingInput,
    Running,
    Completed,
    Killed,
    Expired,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Killed | Self::Expired)
    }

    /// States the idle sweep is allowed to expire.
    pub fn is_idle_candidate(&self) -> bool {
        matches!(self, Self::AwaitingInput | Self::Running)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Starting => "starting",
            Self::AwaitingInput => "awaiting_input",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Killed => "killed",
            Self::Expired => "expired",
        };
        f.write_str(name)
    }
}

/// Response to a successful start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedSession {
    pub session_id: SessionId,
    pub output: String,
    pub waiting_for_input: bool,
}

/// Output and liveness returned by input submission and polling.
///
/// `waiting_for_input` only means the process had not exited when the
/// response was built. It does not prove the program is blocked on a read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOutput {
    pub output: String,
    pub waiting_for_input: bool,
    pub state: SessionState,
}
