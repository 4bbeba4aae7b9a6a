//! codepad-server binary
//!
//! Serves the interactive execution API used by the browser editor.

use clap::Parser;
use codepad_core::{CodepadConfig, ConfigLoader, SessionManager};
use codepad_server::{shutdown_signal, CodepadServer, ServerConfig, ServerError};
use std::path::PathBuf;

/// Command line arguments for the codepad server.
#[derive(Parser, Debug)]
#[command(name = "codepad-server")]
#[command(about = "Runs user programs as interactive sessions over HTTP")]
#[command(version)]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server bind address, overrides the config file and PORT
    #[arg(short, long)]
    bind: Option<String>,

    /// Idle seconds before a session is expired
    #[arg(long)]
    session_timeout: Option<u64>,

    /// Maximum number of concurrent sessions
    #[arg(long)]
    max_sessions: Option<usize>,

    /// Wall-clock limit in seconds for one-shot runs
    #[arg(long)]
    execution_timeout: Option<u64>,

    /// Seconds between idle-session sweeps
    #[arg(long)]
    cleanup_interval: Option<u64>,

    /// Directory under which session workspaces are created
    #[arg(long)]
    workspace_root: Option<PathBuf>,

    /// Disable CORS
    #[arg(long)]
    no_cors: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn apply(&self, config: &mut CodepadConfig) -> Result<(), ServerError> {
        if let Some(bind) = &self.bind {
            config.server.bind_addr = bind
                .parse()
                .map_err(|e| ServerError::config_error(format!("Invalid bind address '{}': {}", bind, e)))?;
        }
        if let Some(secs) = self.session_timeout {
            config.sessions.session_timeout_secs = secs;
        }
        if let Some(max) = self.max_sessions {
            config.sessions.max_sessions = max;
        }
        if let Some(secs) = self.execution_timeout {
            config.execution.execution_timeout_secs = secs;
        }
        if let Some(secs) = self.cleanup_interval {
            config.sessions.cleanup_interval_secs = secs;
        }
        if let Some(root) = &self.workspace_root {
            config.execution.workspace_root = root.clone();
        }
        if self.no_cors {
            config.server.enable_cors = false;
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    let mut config = ConfigLoader::load(args.config.as_deref()).await?;
    args.apply(&mut config)?;
    config.validate()?;

    log::info!("Starting codepad server...");
    log::info!("Configuration:");
    log::info!("  Bind address: {}", config.server.bind_addr);
    log::info!("  CORS enabled: {}", config.server.enable_cors);
    log::info!("  Max sessions: {}", config.sessions.max_sessions);
    log::info!("  Session timeout: {}s", config.sessions.session_timeout_secs);
    log::info!("  Cleanup interval: {}s", config.sessions.cleanup_interval_secs);
    log::info!("  Execution timeout: {}s", config.execution.execution_timeout_secs);
    log::info!("  Workspace root: {}", config.execution.workspace_root.display());

    let manager = SessionManager::new(&config);
    let server = CodepadServer::new(manager, ServerConfig::from(&config.server));

    server.serve_with_shutdown(shutdown_signal()).await?;

    Ok(())
}
