//! Compile stage for languages that need a build step before running.

use super::registry::{Artifact, CommandSpec, Recipe};
use super::workspace::Workspace;
use crate::errors::ExecutionError;
use std::process::Stdio;
use std::time::Duration;

const GENERIC_COMPILE_FAILURE: &str = "Compilation failed";

/// Runs a recipe's compiler to completion. The compiler gets no stdin and its
/// stderr is captured verbatim for diagnostics.
#[derive(Debug, Clone)]
pub struct Compiler {
    timeout: Duration,
}

impl Compiler {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Write `code` into the workspace, compile it if the recipe needs it and
    /// return the command that runs the result.
    pub async fn prepare(
        &self,
        recipe: &Recipe,
        workspace: &Workspace,
        code: &str,
    ) -> Result<CommandSpec, ExecutionError> {
        let file_name = recipe.source_file_name(code);
        let source = workspace.write_source(&file_name, code).await?;
        let artifact = recipe.artifact(workspace.path(), &source, code);

        self.compile(recipe, &artifact).await?;

        let run = recipe.run_command(&artifact);
        run.ensure_available()?;
        Ok(run)
    }

    /// Compile `artifact.source`; interpreted recipes pass straight through.
    pub async fn compile(&self, recipe: &Recipe, artifact: &Artifact) -> Result<(), ExecutionError> {
        let Some(spec) = recipe.compile_command(artifact) else {
            return Ok(());
        };
        spec.ensure_available()?;

        log::debug!("Compiling with {} {:?}", spec.program, spec.args);
        let mut cmd = spec.to_command(&artifact.dir);
        cmd.stdin(Stdio::null()).stdout(Stdio::piped());

        let child = cmd
            .spawn()
            .map_err(|e| ExecutionError::spawn(&spec.program, e))?;

        // kill_on_drop reaps the compiler if the timeout drops the future.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                log::warn!(
                    "Compiler {} exceeded {:?}, killing it",
                    spec.program,
                    self.timeout
                );
                return Err(ExecutionError::CompileError(format!(
                    "Compilation timed out after {} seconds",
                    self.timeout.as_secs()
                )));
            }
        };

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = if stderr.trim().is_empty() {
            // go and some javac versions report on stdout
            let stdout = String::from_utf8_lossy(&output.stdout);
            if stdout.trim().is_empty() {
                GENERIC_COMPILE_FAILURE.to_string()
            } else {
                stdout.into_owned()
            }
        } else {
            stderr.into_owned()
        };

        log::info!(
            "Compilation failed with status {:?} ({} bytes of diagnostics)",
            output.status.code(),
            message.len()
        );
        Err(ExecutionError::CompileError(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executors::registry::Language;
    use crate::executors::workspace::WorkspaceManager;
    use tempfile::TempDir;

    fn has_tool(name: &str) -> bool {
        which::which(name).is_ok()
    }

    #[tokio::test]
    async fn test_interpreted_language_skips_compilation() {
        let root = TempDir::new().unwrap();
        let workspace = WorkspaceManager::new(root.path()).create("py").await.unwrap();
        let recipe = Language::Python.recipe();
        let source = workspace.write_source("main.py", "print('x')").await.unwrap();
        let artifact = recipe.artifact(workspace.path(), &source, "");

        Compiler::new(Duration::from_secs(5))
            .compile(recipe, &artifact)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_c_compile_success_produces_binary() {
        if !has_tool("gcc") {
            eprintln!("skipping: gcc not installed");
            return;
        }
        let root = TempDir::new().unwrap();
        let workspace = WorkspaceManager::new(root.path()).create("c-ok").await.unwrap();
        let recipe = Language::C.recipe();
        let code = "#include <stdio.h>\nint main(void) { puts(\"hi\"); return 0; }\n";
        let source = workspace.write_source("main.c", code).await.unwrap();
        let artifact = recipe.artifact(workspace.path(), &source, code);

        Compiler::new(Duration::from_secs(30))
            .compile(recipe, &artifact)
            .await
            .unwrap();
        assert!(artifact.binary.as_ref().unwrap().exists());
    }

    #[tokio::test]
    async fn test_prepare_java_names_source_after_public_class() {
        if !has_tool("javac") || !has_tool("java") {
            eprintln!("skipping: JDK not installed");
            return;
        }
        let root = TempDir::new().unwrap();
        let workspace = WorkspaceManager::new(root.path()).create("java").await.unwrap();
        let code = "public class Greeter { public static void main(String[] a) { System.out.println(\"hi\"); } }";

        let run = Compiler::new(Duration::from_secs(60))
            .prepare(Language::Java.recipe(), &workspace, code)
            .await
            .unwrap();
        assert!(workspace.path().join("Greeter.java").exists());
        assert!(workspace.path().join("Greeter.class").exists());
        assert_eq!(run.args.last().unwrap(), "Greeter");
    }

    #[tokio::test]
    async fn test_c_compile_failure_carries_diagnostics() {
        if !has_tool("gcc") {
            eprintln!("skipping: gcc not installed");
            return;
        }
        let root = TempDir::new().unwrap();
        let workspace = WorkspaceManager::new(root.path()).create("c-bad").await.unwrap();
        let recipe = Language::C.recipe();
        let code = "int main(void) { return 0 }\n";
        let source = workspace.write_source("main.c", code).await.unwrap();
        let artifact = recipe.artifact(workspace.path(), &source, code);

        let err = Compiler::new(Duration::from_secs(30))
            .compile(recipe, &artifact)
            .await
            .unwrap_err();
        match err {
            ExecutionError::CompileError(message) => {
                assert!(!message.is_empty());
                assert!(message.contains("error"), "unexpected diagnostics: {}", message);
            }
            other => panic!("expected CompileError, got {:?}", other),
        }
    }
}
