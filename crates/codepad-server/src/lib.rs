//! HTTP boundary for interactive code execution
//!
//! HTTP has no way to keep a conversation open with a running program, so the
//! editor drives each session through separate calls: start it, send a line
//! of input, poll for output and kill it. This crate maps those calls onto a
//! [`SessionManager`] and turns its errors into status codes.

pub mod error;

pub use error::{Result, ServerError};

use axum::extract::{DefaultBodyLimit, Path, State};
use axum::extract::rejection::JsonRejection;
use axum::response::Json;
use axum::routing::{get, post};
use axum::{middleware, Router};
use codepad_core::{ServerSettings, SessionId, SessionManager, SessionOutput, StartedSession};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Health check response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub active_sessions: usize,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub code: String,
    pub language: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputRequest {
    pub session_id: SessionId,
    pub input: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KillRequest {
    pub session_id: SessionId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOnceRequest {
    pub code: String,
    pub language: String,
    #[serde(default)]
    pub stdin: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOnceResponse {
    pub stdout: String,
    pub exit_code: Option<i32>,
}

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Enable CORS
    pub enable_cors: bool,
    /// CORS allowed origins (if None, allows any origin)
    pub cors_origins: Option<Vec<String>>,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
    /// Enable request logging
    pub enable_logging: bool,
}

impl From<&ServerSettings> for ServerConfig {
    fn from(settings: &ServerSettings) -> Self {
        Self {
            bind_addr: settings.bind_addr,
            enable_cors: settings.enable_cors,
            cors_origins: settings.cors_origins.clone(),
            max_body_size: settings.max_body_size,
            enable_logging: settings.enable_logging,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub manager: SessionManager,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        active_sessions: state.manager.active_sessions(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handler for POST /execute/start.
async fn start_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<StartRequest>, JsonRejection>,
) -> Result<Json<StartedSession>> {
    let Json(request) = payload?;
    log::info!("Start request for {} ({} bytes)", request.language, request.code.len());

    let started = state.manager.start(&request.code, &request.language).await?;
    Ok(Json(started))
}

/// Handler for POST /execute/input.
async fn input_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<InputRequest>, JsonRejection>,
) -> Result<Json<SessionOutput>> {
    let Json(request) = payload?;
    let output = state
        .manager
        .submit_input(&request.session_id, &request.input)
        .await?;
    Ok(Json(output))
}

/// Handler for GET /execute/output/{session_id}.
async fn output_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionOutput>> {
    let output = state.manager.poll(&SessionId::from(session_id))?;
    Ok(Json(output))
}

/// Handler for POST /execute/kill.
async fn kill_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<KillRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>> {
    let Json(request) = payload?;
    state.manager.kill(&request.session_id).await?;
    Ok(Json(json!({ "success": true })))
}

/// Handler for POST /execute/once.
async fn run_once_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RunOnceRequest>, JsonRejection>,
) -> Result<Json<RunOnceResponse>> {
    let Json(request) = payload?;
    log::info!("One-shot request for {} ({} bytes)", request.language, request.code.len());

    let result = state
        .manager
        .run_once(&request.language, &request.code, &request.stdin)
        .await?;
    Ok(Json(RunOnceResponse {
        stdout: result.combined().to_string(),
        exit_code: result.exit_code,
    }))
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/execute/start", post(start_handler))
        .route("/execute/input", post(input_handler))
        .route("/execute/output/{session_id}", get(output_handler))
        .route("/execute/kill", post(kill_handler))
        .route("/execute/once", post(run_once_handler))
}

/// The codepad HTTP server.
pub struct CodepadServer {
    manager: SessionManager,
    config: ServerConfig,
}

impl CodepadServer {
    pub fn new(manager: SessionManager, config: ServerConfig) -> Self {
        Self { manager, config }
    }

    /// Build the Axum router with all routes and middleware. Every route is
    /// also served under `/api`.
    pub fn build_router(&self) -> Router {
        let state = AppState {
            manager: self.manager.clone(),
        };

        let mut router = Router::new()
            .merge(routes())
            .nest("/api", routes())
            .with_state(state)
            .layer(DefaultBodyLimit::max(self.config.max_body_size));

        if self.config.enable_logging {
            router = router.layer(middleware::from_fn(
                |request: axum::http::Request<axum::body::Body>, next: axum::middleware::Next| async {
                    let request_id = uuid::Uuid::new_v4().to_string();
                    let method = request.method().clone();
                    let uri = request.uri().clone();

                    // output polling is frequent, keep it out of the info log
                    let quiet = method == axum::http::Method::GET
                        && (uri.path().contains("/execute/output/") || uri.path().ends_with("/health"));
                    if quiet {
                        log::debug!("Request {} {} {}", request_id, method, uri);
                    } else {
                        log::info!("Request {} {} {}", request_id, method, uri);
                    }

                    let start = std::time::Instant::now();
                    let response = next.run(request).await;
                    let duration = start.elapsed();

                    if quiet {
                        log::debug!("Response {} {} in {:?}", request_id, response.status(), duration);
                    } else {
                        log::info!("Response {} {} in {:?}", request_id, response.status(), duration);
                    }

                    response
                },
            ));
        }

        router = router.layer(TraceLayer::new_for_http());

        if self.config.enable_cors {
            let cors_layer = if let Some(ref origins) = self.config.cors_origins {
                let origins: std::result::Result<Vec<_>, _> =
                    origins.iter().map(|s| s.parse()).collect();
                match origins {
                    Ok(origins) => CorsLayer::new()
                        .allow_origin(origins)
                        .allow_methods(Any)
                        .allow_headers(Any),
                    Err(_) => {
                        log::warn!("Invalid CORS origin list, falling back to permissive CORS");
                        CorsLayer::permissive()
                    }
                }
            } else {
                CorsLayer::permissive()
            };
            router = router.layer(cors_layer);
        }

        router
    }

    /// Serve until `shutdown_signal` resolves, then kill every live session.
    pub async fn serve_with_shutdown<F>(self, shutdown_signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let router = self.build_router();
        let listener = TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(|e| {
                ServerError::config_error(format!(
                    "Failed to bind to {}: {}",
                    self.config.bind_addr, e
                ))
            })?;

        log::info!("codepad server listening on {}", self.config.bind_addr);
        log::info!("Health check: http://{}/health", self.config.bind_addr);

        let sweeper = self.manager.spawn_sweeper();

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::internal(format!("Server error: {}", e)))?;

        sweeper.abort();
        self.manager.shutdown().await;
        log::info!("codepad server shut down gracefully");
        Ok(())
    }
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log::info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            log::info!("Received SIGTERM, shutting down...");
        },
    }
}
