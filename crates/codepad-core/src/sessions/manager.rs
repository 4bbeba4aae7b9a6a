//! Session table and the interactive protocol.
//!
//! The table is a std mutex that is never held across an `.await`. Operations
//! that touch one session's process (input, kill, expiry) additionally take
//! that session's own async lock, so a process is never written to while it is
//! being torn down.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

use super::buffer::{OutputBuffer, OutputSink};
use super::process::{ProcessExit, ProcessHandle};
use super::session::{Lifecycle, Session, SharedLifecycle};
use super::{lock, SessionId, SessionOutput, SessionState, StartedSession};
use crate::config::{CodepadConfig, SessionSettings};
use crate::errors::ExecutionError;
use crate::executors::{CodeExecutor, Compiler, ExecutionResult, Language, LocalCodeExecutor, WorkspaceManager};

/// Upper bound on a single stdin write. A program that stopped reading can
/// leave the pipe full.
const INPUT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Extra time allowed past the kill grace for the exit to be collected.
const KILL_WAIT_SLACK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy)]
struct Retired {
    state: SessionState,
    at: Instant,
}

#[derive(Debug, Default)]
struct SessionTable {
    live: HashMap<SessionId, Arc<Session>>,
    /// Starts that passed the capacity check but are not registered yet.
    reserved: usize,
    /// Recently ended sessions, kept so a repeated kill still succeeds.
    /// Entries older than the session timeout are pruned on every removal.
    retired: HashMap<SessionId, Retired>,
}

struct ManagerInner {
    settings: SessionSettings,
    workspaces: WorkspaceManager,
    compiler: Compiler,
    executor: LocalCodeExecutor,
    table: Mutex<SessionTable>,
}

impl ManagerInner {
    /// Remove a session from the table and delete its workspace. Returns the
    /// session if this call was the one that removed it. Retired ids older
    /// than the session timeout are forgotten here as well as in the sweep.
    async fn retire(&self, id: &SessionId) -> Option<Arc<Session>> {
        let session = {
            let mut table = lock(&self.table);
            let session = table.live.remove(id)?;
            let keep_for = self.settings.session_timeout();
            table.retired.retain(|_, retired| retired.at.elapsed() < keep_for);
            table.retired.insert(
                id.clone(),
                Retired {
                    state: session.state(),
                    at: Instant::now(),
                },
            );
            session
        };

        if !session.process().has_exited() {
            session.process().terminate();
        }
        if let Some(workspace) = session.take_workspace() {
            workspace.destroy().await;
        }
        log::info!(
            "Session {} removed ({}, alive {}s)",
            id,
            session.state(),
            (chrono::Utc::now() - session.created_at()).num_seconds()
        );
        Some(session)
    }
}

/// Capacity held for a start that is still compiling or spawning. Dropping it
/// without [`commit`](SlotReservation::commit) gives the slot back.
struct SlotReservation<'a> {
    table: &'a Mutex<SessionTable>,
    committed: bool,
}

impl SlotReservation<'_> {
    fn commit(mut self, session: Arc<Session>) {
        let mut table = lock(self.table);
        table.reserved = table.reserved.saturating_sub(1);
        table.live.insert(session.id().clone(), session);
        self.committed = true;
    }
}

impl Drop for SlotReservation<'_> {
    fn drop(&mut self) {
        if !self.committed {
            let mut table = lock(self.table);
            table.reserved = table.reserved.saturating_sub(1);
        }
    }
}

/// Owns every live interactive session. Cloning is cheap and clones share the
/// same table.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<ManagerInner>,
}

impl SessionManager {
    pub fn new(config: &CodepadConfig) -> Self {
        let workspaces = WorkspaceManager::new(config.execution.workspace_root.clone());
        let compiler = Compiler::new(config.execution.compile_timeout());
        let executor = LocalCodeExecutor::new(
            workspaces.clone(),
            compiler.clone(),
            config.execution.execution_timeout(),
            config.sessions.max_output_bytes,
        );

        Self {
            inner: Arc::new(ManagerInner {
                settings: config.sessions.clone(),
                workspaces,
                compiler,
                executor,
                table: Mutex::new(SessionTable::default()),
            }),
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.inner.settings
    }

    pub fn active_sessions(&self) -> usize {
        lock(&self.inner.table).live.len()
    }

    /// Compile and launch `code`, returning once the session is addressable and
    /// its first burst of output has been captured.
    pub async fn start(&self, code: &str, language: &str) -> Result<StartedSession, ExecutionError> {
        let language = Language::resolve(language)?;
        let slot = self.reserve()?;

        let id = SessionId::new();
        let workspace = self.inner.workspaces.create(id.as_str()).await?;

        let spec = match self.inner.compiler.prepare(language.recipe(), &workspace, code).await {
            Ok(spec) => spec,
            Err(e) => {
                log::info!("Session {} ({}) not started: {}", id, language, e);
                workspace.destroy().await;
                return Err(e);
            }
        };

        let settings = &self.inner.settings;
        let output = OutputBuffer::shared(settings.max_output_bytes);
        let lifecycle = Lifecycle::shared();
        let on_exit = self.exit_callback(id.clone(), output.clone(), lifecycle.clone());

        let process = match ProcessHandle::spawn(
            &spec,
            workspace.path(),
            output.clone(),
            settings.kill_grace(),
            on_exit,
        ) {
            Ok(process) => process,
            Err(e) => {
                log::error!("Session {} ({}) failed to spawn: {}", id, language, e);
                workspace.destroy().await;
                return Err(e);
            }
        };

        let session = Arc::new(Session::new(
            id.clone(),
            language,
            process,
            output,
            lifecycle,
            workspace,
        ));
        slot.commit(session.clone());
        session.transition(SessionState::Starting, SessionState::AwaitingInput);
        log::info!(
            "Session {} created ({}, pid {:?})",
            id,
            language,
            session.process().pid()
        );

        tokio::time::sleep(settings.initial_capture()).await;

        Ok(StartedSession {
            session_id: id,
            output: session.output_text(),
            waiting_for_input: true,
        })
    }

    /// Send one line to the program and return the output it produced within
    /// the settle window.
    pub async fn submit_input(&self, id: &SessionId, text: &str) -> Result<SessionOutput, ExecutionError> {
        let session = self.live_session(id, true)?;
        let _op = session.serialize().await;

        if session.process().has_exited() || !session.begin_input() {
            return Err(ExecutionError::SessionTerminated(id.to_string()));
        }

        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');

        match tokio::time::timeout(INPUT_WRITE_TIMEOUT, session.process().write(line.as_bytes())).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                log::debug!("Session {} stdin closed: {}", id, e);
                return Err(ExecutionError::SessionTerminated(id.to_string()));
            }
            Ok(Err(e)) => return Err(ExecutionError::IoError(format!("Failed to write input: {}", e))),
            Err(_) => {
                return Err(ExecutionError::IoError(format!(
                    "Program did not accept input within {} seconds",
                    INPUT_WRITE_TIMEOUT.as_secs()
                )))
            }
        }
        log::debug!("Session {} received {} bytes of input", id, line.len());

        tokio::time::sleep(self.inner.settings.settle_delay()).await;

        session.transition(SessionState::Running, SessionState::AwaitingInput);
        session.touch();
        Ok(session.snapshot())
    }

    /// Current output without consuming it.
    pub fn poll(&self, id: &SessionId) -> Result<SessionOutput, ExecutionError> {
        let session = self.live_session(id, false)?;
        session.touch();
        Ok(session.snapshot())
    }

    /// Stop the program and remove the session. Killing a session that has
    /// already ended succeeds.
    pub async fn kill(&self, id: &SessionId) -> Result<(), ExecutionError> {
        let session = {
            let table = lock(&self.inner.table);
            match table.live.get(id) {
                Some(session) => session.clone(),
                None => match table.retired.get(id) {
                    Some(retired) => {
                        log::debug!("Session {} already ended ({})", id, retired.state);
                        return Ok(());
                    }
                    None => return Err(ExecutionError::SessionNotFound(id.to_string())),
                },
            }
        };

        {
            let _op = session.serialize().await;
            let state = session.finish(SessionState::Killed);
            session.process().terminate();
            session
                .process()
                .wait_exit(self.inner.settings.kill_grace() + KILL_WAIT_SLACK)
                .await;
            log::info!("Session {} killed (state {})", id, state);
        }

        self.inner.retire(id).await;
        Ok(())
    }

    /// Expire sessions idle past the session timeout, remove finished sessions
    /// whose grace period has passed and forget old retired ids. Returns the
    /// number of sessions expired.
    pub async fn sweep(&self) -> usize {
        let settings = &self.inner.settings;
        let timeout = settings.session_timeout();
        let grace = settings.cleanup_grace();

        let (idle, finished) = {
            let mut table = lock(&self.inner.table);
            table.retired.retain(|_, retired| retired.at.elapsed() < timeout);

            let mut idle = Vec::new();
            let mut finished = Vec::new();
            for session in table.live.values() {
                match session.finished_for() {
                    Some(elapsed) if elapsed >= grace => finished.push(session.clone()),
                    Some(_) => {}
                    None if session.idle_for() >= timeout => idle.push(session.clone()),
                    None => {}
                }
            }
            (idle, finished)
        };

        let mut expired = 0;
        for session in idle {
            let _op = session.serialize().await;
            if !session.state().is_idle_candidate() || session.idle_for() < timeout {
                continue;
            }
            if session.finish(SessionState::Expired) != SessionState::Expired {
                continue;
            }
            log::info!(
                "Session {} expired after {:?} idle",
                session.id(),
                session.idle_for()
            );
            session.process().terminate();
            session
                .process()
                .wait_exit(settings.kill_grace() + KILL_WAIT_SLACK)
                .await;
            drop(_op);
            self.inner.retire(session.id()).await;
            expired += 1;
        }

        for session in finished {
            self.inner.retire(session.id()).await;
        }

        expired
    }

    /// Run [`sweep`](Self::sweep) every cleanup interval until the manager is dropped.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let weak: Weak<ManagerInner> = Arc::downgrade(&self.inner);
        let period = self.inner.settings.cleanup_interval();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    log::debug!("Session manager dropped, sweeper exiting");
                    break;
                };
                let expired = SessionManager { inner }.sweep().await;
                if expired > 0 {
                    log::info!("Sweep expired {} idle session(s)", expired);
                }
            }
        })
    }

    /// Kill every live session and remove its workspace.
    pub async fn shutdown(&self) {
        let sessions: Vec<Arc<Session>> = lock(&self.inner.table).live.values().cloned().collect();
        if sessions.is_empty() {
            return;
        }
        log::info!("Shutting down {} session(s)", sessions.len());

        for session in &sessions {
            session.finish(SessionState::Killed);
            session.process().terminate();
        }
        let wait = self.inner.settings.kill_grace() + KILL_WAIT_SLACK;
        for session in &sessions {
            session.process().wait_exit(wait).await;
            self.inner.retire(session.id()).await;
        }
    }

    /// Non-interactive execution with all input supplied upfront.
    pub async fn run_once(
        &self,
        language: &str,
        code: &str,
        stdin: &str,
    ) -> Result<ExecutionResult, ExecutionError> {
        self.inner.executor.execute_code(language, code, stdin).await
    }

    fn reserve(&self) -> Result<SlotReservation<'_>, ExecutionError> {
        let max = self.inner.settings.max_sessions;
        let mut table = lock(&self.inner.table);
        if table.live.len() + table.reserved >= max {
            log::warn!("Rejecting start: {} sessions live", table.live.len());
            return Err(ExecutionError::CapacityExceeded(max));
        }
        table.reserved += 1;
        Ok(SlotReservation {
            table: &self.inner.table,
            committed: false,
        })
    }

    /// Look up a live session. With `for_input`, an id whose program recently
    /// finished or was killed reports `SessionTerminated`; expired ids are
    /// always `SessionNotFound`.
    fn live_session(&self, id: &SessionId, for_input: bool) -> Result<Arc<Session>, ExecutionError> {
        let table = lock(&self.inner.table);
        if let Some(session) = table.live.get(id) {
            return Ok(session.clone());
        }
        match table.retired.get(id) {
            Some(retired) if for_input && retired.state != SessionState::Expired => {
                Err(ExecutionError::SessionTerminated(id.to_string()))
            }
            _ => Err(ExecutionError::SessionNotFound(id.to_string())),
        }
    }

    fn exit_callback(
        &self,
        id: SessionId,
        output: OutputSink,
        lifecycle: SharedLifecycle,
    ) -> impl FnOnce(ProcessExit) + Send + 'static {
        let manager = Arc::downgrade(&self.inner);
        let grace = self.inner.settings.cleanup_grace();

        move |exit| {
            let state = {
                let mut lifecycle = lock(&lifecycle);
                lock(&output).push_marker(&exit.marker());
                lifecycle.record_exit(exit)
            };
            log::info!("Session {} {} ({})", id, exit, state);

            tokio::spawn(async move {
                tokio::time::sleep(grace).await;
                if let Some(inner) = manager.upgrade() {
                    inner.retire(&id).await;
                }
            });
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("active_sessions", &self.active_sessions())
            .field("workspace_root", &self.inner.workspaces.root())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ECHO_NAME: &str = "name = input('Name: ')\nprint('Hello, ' + name)\n";

    fn test_config(root: &TempDir) -> CodepadConfig {
        let mut config = CodepadConfig::default();
        config.execution.workspace_root = root.path().to_path_buf();
        config.sessions.initial_capture_ms = 200;
        config.sessions.settle_delay_ms = 200;
        config.sessions.cleanup_grace_ms = 200;
        config.sessions.kill_grace_ms = 500;
        config
    }

    fn has_python() -> bool {
        which::which("python3").is_ok()
    }

    fn workspace_count(root: &TempDir) -> usize {
        std::fs::read_dir(root.path()).unwrap().count()
    }

    async fn wait_for_output(manager: &SessionManager, id: &SessionId, needle: &str) -> SessionOutput {
        for _ in 0..100 {
            let output = manager.poll(id).unwrap();
            if output.output.contains(needle) {
                return output;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("output never contained {:?}", needle);
    }

    async fn wait_until_removed(manager: &SessionManager, id: &SessionId) {
        for _ in 0..100 {
            if matches!(manager.poll(id), Err(ExecutionError::SessionNotFound(_))) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("session {} was never removed", id);
    }

    #[tokio::test]
    async fn test_zero_capacity_rejects_before_creating_workspace() {
        let root = TempDir::new().unwrap();
        let mut config = test_config(&root);
        config.sessions.max_sessions = 0;
        let manager = SessionManager::new(&config);

        let err = manager.start(ECHO_NAME, "python").await.unwrap_err();
        assert_eq!(err, ExecutionError::CapacityExceeded(0));
        assert_eq!(workspace_count(&root), 0);
        assert_eq!(manager.active_sessions(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_language_creates_nothing() {
        let root = TempDir::new().unwrap();
        let manager = SessionManager::new(&test_config(&root));

        let err = manager.start("+++", "brainfuck").await.unwrap_err();
        assert!(matches!(err, ExecutionError::UnsupportedLanguage(_)));
        assert_eq!(workspace_count(&root), 0);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let root = TempDir::new().unwrap();
        let manager = SessionManager::new(&test_config(&root));
        let id = SessionId::from("missing");

        assert!(matches!(manager.poll(&id), Err(ExecutionError::SessionNotFound(_))));
        assert!(matches!(
            manager.submit_input(&id, "x").await,
            Err(ExecutionError::SessionNotFound(_))
        ));
        assert!(matches!(manager.kill(&id).await, Err(ExecutionError::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn test_input_round_trip_completes_and_cleans_up() {
        if !has_python() {
            eprintln!("skipping: python3 not installed");
            return;
        }
        let root = TempDir::new().unwrap();
        let mut config = test_config(&root);
        config.sessions.cleanup_grace_ms = 1000;
        let manager = SessionManager::new(&config);

        let started = manager.start(ECHO_NAME, "Python").await.unwrap();
        assert!(started.waiting_for_input);
        let id = started.session_id;
        wait_for_output(&manager, &id, "Name: ").await;

        manager.submit_input(&id, "World").await.unwrap();
        let done = wait_for_output(&manager, &id, "[Program finished with exit code 0]").await;
        assert!(done.output.contains("Hello, World"));
        assert!(!done.output.contains("Name: "), "buffer was not reset: {:?}", done.output);
        assert!(!done.waiting_for_input);
        assert_eq!(done.state, SessionState::Completed);

        wait_until_removed(&manager, &id).await;
        assert_eq!(workspace_count(&root), 0);
        manager.kill(&id).await.unwrap();
    }

    #[tokio::test]
    async fn test_poll_does_not_clear_output() {
        if !has_python() {
            eprintln!("skipping: python3 not installed");
            return;
        }
        let root = TempDir::new().unwrap();
        let manager = SessionManager::new(&test_config(&root));

        let id = manager.start(ECHO_NAME, "py").await.unwrap().session_id;
        let first = wait_for_output(&manager, &id, "Name: ").await;
        let second = manager.poll(&id).unwrap();
        assert_eq!(first.output, second.output);
        assert!(second.waiting_for_input);

        manager.kill(&id).await.unwrap();
    }

    #[tokio::test]
    async fn test_capacity_is_released_by_kill() {
        if !has_python() {
            eprintln!("skipping: python3 not installed");
            return;
        }
        let root = TempDir::new().unwrap();
        let mut config = test_config(&root);
        config.sessions.max_sessions = 1;
        let manager = SessionManager::new(&config);

        let first = manager.start(ECHO_NAME, "python").await.unwrap().session_id;
        let err = manager.start(ECHO_NAME, "python").await.unwrap_err();
        assert_eq!(err, ExecutionError::CapacityExceeded(1));
        assert_eq!(workspace_count(&root), 1);

        manager.kill(&first).await.unwrap();
        let second = manager.start(ECHO_NAME, "python").await.unwrap().session_id;
        manager.kill(&second).await.unwrap();
        assert_eq!(workspace_count(&root), 0);
    }

    #[tokio::test]
    async fn test_kill_is_idempotent() {
        if !has_python() {
            eprintln!("skipping: python3 not installed");
            return;
        }
        let root = TempDir::new().unwrap();
        let manager = SessionManager::new(&test_config(&root));

        let id = manager.start(ECHO_NAME, "python").await.unwrap().session_id;
        manager.kill(&id).await.unwrap();
        manager.kill(&id).await.unwrap();

        assert!(matches!(manager.poll(&id), Err(ExecutionError::SessionNotFound(_))));
        assert!(matches!(
            manager.submit_input(&id, "late").await,
            Err(ExecutionError::SessionTerminated(_))
        ));
        assert_eq!(manager.active_sessions(), 0);
        assert_eq!(workspace_count(&root), 0);
    }

    #[tokio::test]
    async fn test_input_after_exit_is_rejected() {
        if !has_python() {
            eprintln!("skipping: python3 not installed");
            return;
        }
        let root = TempDir::new().unwrap();
        let mut config = test_config(&root);
        config.sessions.cleanup_grace_ms = 5000;
        let manager = SessionManager::new(&config);

        let id = manager.start("print('bye')\n", "python").await.unwrap().session_id;
        wait_for_output(&manager, &id, "[Program finished").await;

        let err = manager.submit_input(&id, "anything").await.unwrap_err();
        assert_eq!(err, ExecutionError::SessionTerminated(id.to_string()));
        manager.kill(&id).await.unwrap();
    }

    #[tokio::test]
    async fn test_sweep_expires_idle_sessions() {
        if !has_python() {
            eprintln!("skipping: python3 not installed");
            return;
        }
        let root = TempDir::new().unwrap();
        let mut config = test_config(&root);
        config.sessions.session_timeout_secs = 1;
        let manager = SessionManager::new(&config);

        let id = manager.start(ECHO_NAME, "python").await.unwrap().session_id;
        assert_eq!(manager.sweep().await, 0);

        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert_eq!(manager.sweep().await, 1);
        assert!(matches!(manager.poll(&id), Err(ExecutionError::SessionNotFound(_))));
        assert_eq!(workspace_count(&root), 0);
        manager.kill(&id).await.unwrap();
    }

    #[tokio::test]
    async fn test_input_to_expired_session_is_not_found() {
        if !has_python() {
            eprintln!("skipping: python3 not installed");
            return;
        }
        let root = TempDir::new().unwrap();
        let mut config = test_config(&root);
        config.sessions.session_timeout_secs = 1;
        let manager = SessionManager::new(&config);

        let id = manager.start(ECHO_NAME, "python").await.unwrap().session_id;
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert_eq!(manager.sweep().await, 1);

        let err = manager.submit_input(&id, "late").await.unwrap_err();
        assert_eq!(err, ExecutionError::SessionNotFound(id.to_string()));
    }

    #[tokio::test]
    async fn test_input_after_exit_keeps_final_output() {
        if !has_python() {
            eprintln!("skipping: python3 not installed");
            return;
        }
        let root = TempDir::new().unwrap();
        let mut config = test_config(&root);
        config.sessions.cleanup_grace_ms = 5000;
        let manager = SessionManager::new(&config);

        let id = manager.start("print('bye')\n", "python").await.unwrap().session_id;
        wait_for_output(&manager, &id, "[Program finished with exit code 0]").await;

        let session = manager.live_session(&id, false).unwrap();
        assert!(!session.begin_input());

        let after = manager.poll(&id).unwrap();
        assert_eq!(after.state, SessionState::Completed);
        assert!(after.output.contains("bye\n"));
        assert!(after.output.ends_with("[Program finished with exit code 0]"));
        assert!(!after.waiting_for_input);
        manager.kill(&id).await.unwrap();
    }

    #[tokio::test]
    async fn test_retired_ids_are_pruned_without_sweep() {
        if !has_python() {
            eprintln!("skipping: python3 not installed");
            return;
        }
        let root = TempDir::new().unwrap();
        let mut config = test_config(&root);
        config.sessions.session_timeout_secs = 1;
        let manager = SessionManager::new(&config);

        let first = manager.start(ECHO_NAME, "python").await.unwrap().session_id;
        manager.kill(&first).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1200)).await;

        let second = manager.start(ECHO_NAME, "python").await.unwrap().session_id;
        manager.kill(&second).await.unwrap();

        assert_eq!(lock(&manager.inner.table).retired.len(), 1);
        assert!(matches!(
            manager.kill(&first).await,
            Err(ExecutionError::SessionNotFound(_))
        ));
        manager.kill(&second).await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_removes_everything() {
        if !has_python() {
            eprintln!("skipping: python3 not installed");
            return;
        }
        let root = TempDir::new().unwrap();
        let manager = SessionManager::new(&test_config(&root));

        manager.start(ECHO_NAME, "python").await.unwrap();
        manager.start(ECHO_NAME, "python").await.unwrap();
        assert_eq!(manager.active_sessions(), 2);

        manager.shutdown().await;
        assert_eq!(manager.active_sessions(), 0);
        assert_eq!(workspace_count(&root), 0);
    }

    #[tokio::test]
    async fn test_compile_error_leaves_no_session() {
        if which::which("gcc").is_err() {
            eprintln!("skipping: gcc not installed");
            return;
        }
        let root = TempDir::new().unwrap();
        let manager = SessionManager::new(&test_config(&root));

        let err = manager.start("int main(void) { return 0 }\n", "C").await.unwrap_err();
        assert!(matches!(err, ExecutionError::CompileError(_)));
        assert_eq!(manager.active_sessions(), 0);
        assert_eq!(workspace_count(&root), 0);
    }

    #[tokio::test]
    async fn test_run_once_uses_configured_limits() {
        if !has_python() {
            eprintln!("skipping: python3 not installed");
            return;
        }
        let root = TempDir::new().unwrap();
        let manager = SessionManager::new(&test_config(&root));

        let result = manager
            .run_once("python", "print(input()[::-1])\n", "abc\n")
            .await
            .unwrap();
        assert_eq!(result.stdout, "cba\n");
        assert_eq!(manager.active_sessions(), 0);
    }
}
