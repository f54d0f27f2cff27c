// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The agent's HTTP surface.
//!
//! Routes:
//! - `POST /execute` — start a command under a PTY
//! - `GET /status/:execution_id` — poll one execution
//! - `DELETE /execute/:execution_id` — cancel (SIGTERM, SIGKILL after 5 s)
//! - `GET /health` — capacity probe used by the dispatcher's monitor
//! - `PUT /config` — live max_jobs update

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use fm_wire::{
    CancelResponse, ConfigRequest, ConfigResponse, ExecResult, ExecuteRequest, ExecuteResponse,
    HealthResponse, StatusCallback, StatusResponse,
};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::callback::post_status;
use crate::exec::{spawn_execution, ExecError};
use crate::shipper::BrokerShipper;
use crate::state::{AgentConfig, AgentState, BrokerSettings, ExecEvent};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Maximum concurrent jobs reached")]
    Capacity,
    #[error("Execution {0} already running")]
    Duplicate(String),
    #[error("Execution {0} not found")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Capacity => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Duplicate(_) => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

pub fn router(state: Arc<AgentState>) -> Router {
    Router::new()
        .route("/execute", post(execute))
        .route("/status/:execution_id", get(status))
        .route("/execute/:execution_id", delete(cancel))
        .route("/health", get(health))
        .route("/config", put(config))
        .with_state(state)
}

/// Run the agent: completion loop plus HTTP server. Blocks until the
/// listener fails.
pub async fn run_server(config: AgentConfig) -> Result<(), std::io::Error> {
    let (tx, rx) = mpsc::unbounded_channel();
    let broker = BrokerSettings::from_env(&config.backend_url);
    let state = Arc::new(AgentState::new(config, broker, tx));

    tokio::spawn(completion_loop(state.clone(), rx));

    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        worker = %state.config.worker_name,
        addr = %addr,
        max_jobs = state.config.max_jobs,
        "worker agent listening"
    );
    axum::serve(listener, router(state)).await
}

/// Apply reader-thread exit events and emit the terminal callback.
///
/// Cancelled executions already reported a `failed` callback from the
/// cancel path, so their natural exit is recorded silently.
async fn completion_loop(state: Arc<AgentState>, mut events: mpsc::UnboundedReceiver<ExecEvent>) {
    while let Some(event) = events.recv().await {
        let ExecEvent::Exited { execution_id, exit_code } = event;

        let notify = {
            let mut executions = state.executions.lock();
            match executions.get_mut(&execution_id) {
                Some(execution) => {
                    execution.killer = None;
                    execution.exit_code = Some(exit_code);
                    if execution.status == ExecResult::Running {
                        execution.status =
                            if exit_code == 0 { ExecResult::Completed } else { ExecResult::Failed };
                        true
                    } else {
                        false
                    }
                }
                None => false,
            }
        };

        if notify {
            tracing::info!(execution_id, exit_code, "execution finished");
            post_status(
                &state.http,
                &state.config.backend_url,
                &StatusCallback::finished(&execution_id, exit_code),
            )
            .await;
        }
    }
}

async fn execute(
    State(state): State<Arc<AgentState>>,
    Json(request): Json<ExecuteRequest>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    {
        let executions = state.executions.lock();
        let running = executions.values().filter(|e| e.status == ExecResult::Running).count();
        if running >= *state.max_jobs.lock() {
            return Err(ApiError::Capacity);
        }
        if executions
            .get(&request.execution_id)
            .is_some_and(|e| e.status == ExecResult::Running)
        {
            return Err(ApiError::Duplicate(request.execution_id.clone()));
        }
    }

    let (command, args) = request
        .decode()
        .map_err(|e| ApiError::Internal(format!("Failed to start command: {e}")))?;

    let shipper = Box::new(BrokerShipper::new(state.broker.clone()));
    match spawn_execution(&state, shipper, &request.execution_id, &command, &args) {
        Ok(pid) => {
            post_status(
                &state.http,
                &state.config.backend_url,
                &StatusCallback::started(&request.execution_id),
            )
            .await;
            Ok(Json(ExecuteResponse {
                execution_id: request.execution_id,
                pid,
                status: "started".to_string(),
            }))
        }
        Err(e) => {
            post_status(
                &state.http,
                &state.config.backend_url,
                &StatusCallback::failed(&request.execution_id, e.to_string()),
            )
            .await;
            let message = match e {
                ExecError::Spawn(_) => e.to_string(),
                ExecError::BadCommand => format!("Failed to start command: {e}"),
            };
            Err(ApiError::Internal(message))
        }
    }
}

async fn status(
    State(state): State<Arc<AgentState>>,
    Path(execution_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let executions = state.executions.lock();
    let execution =
        executions.get(&execution_id).ok_or_else(|| ApiError::NotFound(execution_id.clone()))?;
    Ok(Json(StatusResponse {
        execution_id,
        status: execution.status,
        exit_code: execution.exit_code,
        pid: Some(execution.pid),
    }))
}

async fn cancel(
    State(state): State<Arc<AgentState>>,
    Path(execution_id): Path<String>,
) -> Result<Json<CancelResponse>, ApiError> {
    let pid = {
        let mut executions = state.executions.lock();
        let execution = executions
            .get_mut(&execution_id)
            .filter(|e| e.status == ExecResult::Running)
            .ok_or_else(|| ApiError::NotFound(execution_id.clone()))?;
        execution.status = ExecResult::Cancelled;
        execution.pid
    };

    if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        tracing::warn!(execution_id, pid, error = %e, "SIGTERM failed");
    }

    // Escalate after the grace period if the reader has not seen the exit.
    let escalate_state = state.clone();
    let escalate_id = execution_id.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        let mut executions = escalate_state.executions.lock();
        if let Some(execution) = executions.get_mut(&escalate_id) {
            if let Some(mut killer) = execution.killer.take() {
                tracing::warn!(execution_id = %escalate_id, "graceful stop timed out, killing");
                let _ = killer.kill();
            }
        }
    });

    post_status(
        &state.http,
        &state.config.backend_url,
        &StatusCallback::failed(&execution_id, "Job cancelled"),
    )
    .await;

    Ok(Json(CancelResponse { execution_id, cancelled: true }))
}

async fn health(State(state): State<Arc<AgentState>>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.running_count(), *state.max_jobs.lock()))
}

async fn config(
    State(state): State<Arc<AgentState>>,
    Json(request): Json<ConfigRequest>,
) -> Result<Json<ConfigResponse>, ApiError> {
    if request.max_jobs < 1 {
        return Err(ApiError::Internal("max_jobs must be at least 1".to_string()));
    }
    *state.max_jobs.lock() = request.max_jobs;
    tracing::info!(max_jobs = request.max_jobs, "agent capacity updated");
    Ok(Json(ConfigResponse { max_jobs: request.max_jobs }))
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
