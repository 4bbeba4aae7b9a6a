// src/executors/local.rs
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::registry::{Language, Recipe};
use super::workspace::{Workspace, WorkspaceManager};
use super::{CodeExecutor, Compiler, ExecutionResult};
use crate::errors::ExecutionError;

/// Runs a program once on the host with all of its stdin supplied upfront.
#[derive(Debug, Clone)]
pub struct LocalCodeExecutor {
    workspaces: WorkspaceManager,
    compiler: Compiler,
    timeout: Duration,
    max_output_bytes: usize,
}

impl LocalCodeExecutor {
    pub fn new(
        workspaces: WorkspaceManager,
        compiler: Compiler,
        timeout: Duration,
        max_output_bytes: usize,
    ) -> Self {
        Self {
            workspaces,
            compiler,
            timeout,
            max_output_bytes,
        }
    }

    async fn run_in(
        &self,
        workspace: &Workspace,
        recipe: &Recipe,
        code: &str,
        stdin: &str,
    ) -> Result<ExecutionResult, ExecutionError> {
        let spec = self.compiler.prepare(recipe, workspace, code).await?;

        let mut child = spec
            .to_command(workspace.path())
            .spawn()
            .map_err(|e| ExecutionError::spawn(&spec.program, e))?;

        // Feed stdin from its own task so a program that writes before reading
        // cannot deadlock against a full pipe. Dropping the handle closes the stream.
        let writer = child.stdin.take().map(|mut pipe| {
            let input = stdin.as_bytes().to_vec();
            tokio::spawn(async move {
                if !input.is_empty() {
                    if let Err(e) = pipe.write_all(&input).await {
                        log::debug!("stdin closed early: {}", e);
                    }
                }
            })
        });

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                log::warn!("One-shot execution exceeded {:?}, killed", self.timeout);
                return Err(ExecutionError::Timeout(self.timeout.as_secs()));
            }
        };

        if let Some(writer) = writer {
            writer.abort();
        }

        Ok(ExecutionResult {
            stdout: bounded_text(&output.stdout, self.max_output_bytes),
            stderr: bounded_text(&output.stderr, self.max_output_bytes),
            exit_code: output.status.code(),
        })
    }
}

#[async_trait]
impl CodeExecutor for LocalCodeExecutor {
    async fn execute_code(
        &self,
        language: &str,
        code: &str,
        stdin: &str,
    ) -> Result<ExecutionResult, ExecutionError> {
        let language = Language::resolve(language)?;
        let id = format!("once-{}", Uuid::new_v4());
        let workspace = self.workspaces.create(&id).await?;

        let result = self.run_in(&workspace, language.recipe(), code, stdin).await;
        workspace.destroy().await;

        match &result {
            Ok(r) => log::info!("{} run {} exited with {:?}", language, id, r.exit_code),
            Err(e) => log::info!("{} run {} failed: {}", language, id, e),
        }
        result
    }
}

fn bounded_text(bytes: &[u8], limit: usize) -> String {
    if bytes.len() <= limit {
        return String::from_utf8_lossy(bytes).into_owned();
    }
    let mut text = String::from_utf8_lossy(&bytes[..limit]).into_owned();
    text.push_str("\n[output truncated]");
    text
}
