//! Configuration type definitions for the execution server
//!
//! Every field carries a default so that an empty YAML document, or no file at
//! all, yields a working configuration. Durations are stored as plain integer
//! seconds or milliseconds to keep the file format obvious.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::ExecutionError;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CodepadConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub sessions: SessionSettings,
    #[serde(default)]
    pub execution: ExecutionSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default = "default_true")]
    pub enable_cors: bool,
    #[serde(default)]
    pub cors_origins: Option<Vec<String>>,
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
    #[serde(default = "default_true")]
    pub enable_logging: bool,
}

/// Limits and timings for interactive sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    /// Idle window after which a live session is expired by the sweep.
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    #[serde(default = "default_initial_capture_ms")]
    pub initial_capture_ms: u64,
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_cleanup_grace_ms")]
    pub cleanup_grace_ms: u64,
    #[serde(default = "default_kill_grace_ms")]
    pub kill_grace_ms: u64,
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSettings {
    #[serde(default = "default_execution_timeout_secs")]
    pub execution_timeout_secs: u64,
    #[serde(default = "default_compile_timeout_secs")]
    pub compile_timeout_secs: u64,
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3001))
}
fn default_true() -> bool { true }
fn default_max_body_size() -> usize { 1024 * 1024 }
fn default_max_sessions() -> usize { 50 }
fn default_session_timeout_secs() -> u64 { 300 }
fn default_cleanup_interval_secs() -> u64 { 30 }
fn default_initial_capture_ms() -> u64 { 100 }
fn default_settle_delay_ms() -> u64 { 100 }
fn default_cleanup_grace_ms() -> u64 { 5000 }
fn default_kill_grace_ms() -> u64 { 2000 }
fn default_max_output_bytes() -> usize { 1024 * 1024 }
fn default_execution_timeout_secs() -> u64 { 10 }
fn default_compile_timeout_secs() -> u64 { 30 }
fn default_workspace_root() -> PathBuf {
    std::env::temp_dir().join("codepad")
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            enable_cors: true,
            cors_origins: None,
            max_body_size: default_max_body_size(),
            enable_logging: true,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            session_timeout_secs: default_session_timeout_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            initial_capture_ms: default_initial_capture_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            cleanup_grace_ms: default_cleanup_grace_ms(),
            kill_grace_ms: default_kill_grace_ms(),
            max_output_bytes: default_max_output_bytes(),
        }
    }
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            execution_timeout_secs: default_execution_timeout_secs(),
            compile_timeout_secs: default_compile_timeout_secs(),
            workspace_root: default_workspace_root(),
        }
    }
}

impl SessionSettings {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn initial_capture(&self) -> Duration {
        Duration::from_millis(self.initial_capture_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn cleanup_grace(&self) -> Duration {
        Duration::from_millis(self.cleanup_grace_ms)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }
}

impl ExecutionSettings {
    pub fn execution_timeout(&self) -> Duration {
        Duration::from_secs(self.execution_timeout_secs)
    }

    pub fn compile_timeout(&self) -> Duration {
        Duration::from_secs(self.compile_timeout_secs)
    }
}

impl CodepadConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ExecutionError> {
        if self.sessions.max_sessions == 0 {
            return Err(ExecutionError::ConfigError(
                "sessions.max_sessions must be greater than 0".to_string(),
            ));
        }

        if self.sessions.session_timeout_secs == 0 {
            return Err(ExecutionError::ConfigError(
                "sessions.session_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.sessions.cleanup_interval_secs == 0 {
            return Err(ExecutionError::ConfigError(
                "sessions.cleanup_interval_secs must be greater than 0".to_string(),
            ));
        }

        if self.sessions.max_output_bytes == 0 {
            return Err(ExecutionError::ConfigError(
                "sessions.max_output_bytes must be greater than 0".to_string(),
            ));
        }

        if self.execution.execution_timeout_secs == 0 {
            return Err(ExecutionError::ConfigError(
                "execution.execution_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.execution.compile_timeout_secs == 0 {
            return Err(ExecutionError::ConfigError(
                "execution.compile_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.server.max_body_size == 0 {
            return Err(ExecutionError::ConfigError(
                "server.max_body_size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
