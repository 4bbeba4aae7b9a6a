//! Interactive code execution for a browser-based editor.
//!
//! Programs submitted by the editor run as real OS processes on the host and
//! stay alive across independent request/response calls, so a program that
//! reads from stdin can be driven one line at a time.
//!
//! # Architecture Overview
//!
//! - **Runtime registry**: maps language names to compile and run recipes
//! - **Workspaces**: one scratch directory per submission, always removed
//! - **Compile stage**: runs build steps and reports compiler diagnostics
//! - **Session manager**: owns live sessions, their output buffers and lifecycle limits
//! - **One-shot executor**: runs a program to completion with all input supplied upfront
//! - **Configuration system**: YAML and environment layered over built-in defaults

pub mod config;
pub mod errors;
pub mod executors;
pub mod sessions;

pub use config::*;
pub use errors::ExecutionError;
pub use executors::{CodeExecutor, ExecutionResult, Language, LocalCodeExecutor};
pub use sessions::{SessionId, SessionManager, SessionOutput, SessionState, StartedSession};
