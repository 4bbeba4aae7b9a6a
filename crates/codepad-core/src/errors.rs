//! Error taxonomy for code execution and session management
//!
//! System failures (unknown runtimes, compiler rejections, capacity limits,
//! spawn and filesystem failures) are reported through [`ExecutionError`].
//! A user program that crashes or writes to stderr is not an error here: its
//! output is captured and returned like any other output.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),
    #[error("{0}")]
    CompileError(String),
    #[error("Maximum number of concurrent sessions ({0}) reached")]
    CapacityExceeded(usize),
    #[error("Session not found: {0}")]
    SessionNotFound(String),
    #[error("Session {0} has already terminated")]
    SessionTerminated(String),
    #[error("Failed to start process '{program}': {message}")]
    SpawnError { program: String, message: String },
    #[error("I/O error: {0}")]
    IoError(String),
    #[error("Execution timed out after {0} seconds")]
    Timeout(u64),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ExecutionError {
    pub fn spawn(program: impl Into<String>, message: impl ToString) -> Self {
        Self::SpawnError {
            program: program.into(),
            message: message.to_string(),
        }
    }
}

impl From<std::io::Error> for ExecutionError {
    fn from(err: std::io::Error) -> Self {
        ExecutionError::IoError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ExecutionError>;
