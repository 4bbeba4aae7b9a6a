//! Code execution building blocks.
//!
//! The registry maps language names to compile/run recipes, the workspace
//! manager hands out per-submission directories, the compiler drives build
//! steps, and [`local::LocalCodeExecutor`] ties them together for
//! non-interactive runs where all stdin is known upfront.

use async_trait::async_trait;
use serde::Serialize;

use crate::errors::ExecutionError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl ExecutionResult {
    /// Text shown to the caller: stdout, or stderr when the program printed nothing else.
    pub fn combined(&self) -> &str {
        if self.stdout.is_empty() {
            &self.stderr
        } else {
            &self.stdout
        }
    }
}

#[async_trait]
pub trait CodeExecutor: Send + Sync {
    async fn execute_code(
        &self,
        language: &str,
        code: &str,
        stdin: &str,
    ) -> Result<ExecutionResult, ExecutionError>;
}

pub mod compiler;
pub mod local;
pub mod registry;
pub mod workspace;

pub use compiler::Compiler;
pub use local::LocalCodeExecutor;
pub use registry::{Artifact, CommandSpec, Language, Recipe};
pub use workspace::{Workspace, WorkspaceManager};
