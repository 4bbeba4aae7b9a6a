//! Configuration loader for YAML files and environment overrides
//!
//! Values are layered: built-in defaults, then an optional YAML file, then
//! environment variables. Command-line flags are applied by the binary on top
//! of what this loader returns.

use crate::config::types::CodepadConfig;
use crate::errors::ExecutionError;
use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::fs;

pub const ENV_PORT: &str = "PORT";
pub const ENV_BIND_ADDR: &str = "CODEPAD_BIND_ADDR";
pub const ENV_SESSION_TIMEOUT: &str = "CODEPAD_SESSION_TIMEOUT_SECS";
pub const ENV_MAX_SESSIONS: &str = "CODEPAD_MAX_SESSIONS";
pub const ENV_EXECUTION_TIMEOUT: &str = "CODEPAD_EXECUTION_TIMEOUT_SECS";
pub const ENV_COMPILE_TIMEOUT: &str = "CODEPAD_COMPILE_TIMEOUT_SECS";
pub const ENV_CLEANUP_INTERVAL: &str = "CODEPAD_CLEANUP_INTERVAL_SECS";
pub const ENV_WORKSPACE_ROOT: &str = "CODEPAD_WORKSPACE_ROOT";

/// Configuration loader with environment resolution
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load defaults, the optional YAML file and environment overrides, then validate.
    pub async fn load(path: Option<&Path>) -> Result<CodepadConfig, ExecutionError> {
        let mut config = match path {
            Some(path) => Self::from_file(path).await?,
            None => CodepadConfig::default(),
        };

        Self::apply_env(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<CodepadConfig, ExecutionError> {
        let path = path.as_ref();

        let content = fs::read_to_string(path).await.map_err(|e| {
            ExecutionError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_str(&content)
    }

    /// Parse configuration from a YAML string. An empty document yields the defaults.
    pub fn from_str(content: &str) -> Result<CodepadConfig, ExecutionError> {
        if content.trim().is_empty() {
            return Ok(CodepadConfig::default());
        }

        serde_yaml::from_str(content)
            .map_err(|e| ExecutionError::ConfigError(format!("Failed to parse YAML config: {}", e)))
    }

    /// Apply environment variable overrides in place.
    pub fn apply_env(config: &mut CodepadConfig) -> Result<(), ExecutionError> {
        if let Some(port) = env_value::<u16>(ENV_PORT)? {
            config.server.bind_addr.set_port(port);
        }
        if let Some(addr) = env_value::<SocketAddr>(ENV_BIND_ADDR)? {
            config.server.bind_addr = addr;
        }
        if let Some(secs) = env_value::<u64>(ENV_SESSION_TIMEOUT)? {
            config.sessions.session_timeout_secs = secs;
        }
        if let Some(max) = env_value::<usize>(ENV_MAX_SESSIONS)? {
            config.sessions.max_sessions = max;
        }
        if let Some(secs) = env_value::<u64>(ENV_EXECUTION_TIMEOUT)? {
            config.execution.execution_timeout_secs = secs;
        }
        if let Some(secs) = env_value::<u64>(ENV_COMPILE_TIMEOUT)? {
            config.execution.compile_timeout_secs = secs;
        }
        if let Some(secs) = env_value::<u64>(ENV_CLEANUP_INTERVAL)? {
            config.sessions.cleanup_interval_secs = secs;
        }
        if let Some(root) = env_value::<PathBuf>(ENV_WORKSPACE_ROOT)? {
            config.execution.workspace_root = root;
        }
        Ok(())
    }
}

fn env_value<T>(name: &str) -> Result<Option<T>, ExecutionError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            ExecutionError::ConfigError(format!("Invalid value '{}' for {}: {}", raw, name, e))
        }),
        Err(_) => Ok(None),
    }
}
