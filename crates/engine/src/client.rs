// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the worker agent's API.
//!
//! Error display strings deliberately carry the phrases the dispatch
//! failure classifier keys on ("timeout", "Connection refused",
//! "Server error", "rejected job").

use fm_store::WorkerRecord;
use fm_wire::{ConfigRequest, ExecuteRequest, ExecuteResponse, HealthResponse, StatusResponse};
use std::time::Duration;

const EXECUTE_TIMEOUT: Duration = Duration::from_secs(30);
const CONTROL_TIMEOUT: Duration = Duration::from_secs(10);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("timeout contacting worker agent")]
    Timeout,
    #[error("Connection refused by worker agent: {0}")]
    Connect(String),
    #[error("Server error from worker agent: {0}")]
    Server(String),
    #[error("Worker rejected job ({status}): {detail}")]
    Rejected { status: u16, detail: String },
    #[error("worker agent transport error: {0}")]
    Transport(String),
}

impl ClientError {
    async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let detail = response.text().await.unwrap_or_default();
        if status.is_server_error() {
            ClientError::Server(detail)
        } else {
            ClientError::Rejected { status: status.as_u16(), detail }
        }
    }

    fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout
        } else if e.is_connect() {
            ClientError::Connect(e.to_string())
        } else {
            ClientError::Transport(e.to_string())
        }
    }
}

/// Thin typed wrapper over the agent HTTP endpoints.
#[derive(Clone, Default)]
pub struct WorkerClient {
    http: reqwest::Client,
}

impl WorkerClient {
    pub fn new() -> Self {
        Self { http: reqwest::Client::new() }
    }

    /// `POST /execute` — command and args are base64-encoded for transport.
    pub async fn execute(
        &self,
        worker: &WorkerRecord,
        execution_id: &str,
        command: &str,
        args: &[String],
    ) -> Result<ExecuteResponse, ClientError> {
        let request = ExecuteRequest::encode(execution_id, command, args);
        let response = self
            .http
            .post(format!("{}/execute", worker.endpoint()))
            .timeout(EXECUTE_TIMEOUT)
            .json(&request)
            .send()
            .await
            .map_err(ClientError::from_transport)?;
        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }
        response.json().await.map_err(ClientError::from_transport)
    }

    /// `GET /status/{execution_id}` — None when the agent no longer knows
    /// the id.
    pub async fn status(
        &self,
        worker: &WorkerRecord,
        execution_id: &str,
    ) -> Result<Option<StatusResponse>, ClientError> {
        let response = self
            .http
            .get(format!("{}/status/{execution_id}", worker.endpoint()))
            .timeout(CONTROL_TIMEOUT)
            .send()
            .await
            .map_err(ClientError::from_transport)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }
        response.json().await.map(Some).map_err(ClientError::from_transport)
    }

    /// `DELETE /execute/{execution_id}`.
    pub async fn cancel(
        &self,
        worker: &WorkerRecord,
        execution_id: &str,
    ) -> Result<bool, ClientError> {
        let response = self
            .http
            .delete(format!("{}/execute/{execution_id}", worker.endpoint()))
            .timeout(CONTROL_TIMEOUT)
            .send()
            .await
            .map_err(ClientError::from_transport)?;
        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }
        let body: fm_wire::CancelResponse =
            response.json().await.map_err(ClientError::from_transport)?;
        Ok(body.cancelled)
    }

    /// `GET /health`.
    pub async fn health(&self, worker: &WorkerRecord) -> Result<HealthResponse, ClientError> {
        let response = self
            .http
            .get(format!("{}/health", worker.endpoint()))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
            .map_err(ClientError::from_transport)?;
        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }
        response.json().await.map_err(ClientError::from_transport)
    }

    /// `PUT /config` — push a live max_jobs change to a running agent.
    pub async fn update_config(
        &self,
        worker: &WorkerRecord,
        max_jobs: usize,
    ) -> Result<(), ClientError> {
        let response = self
            .http
            .put(format!("{}/config", worker.endpoint()))
            .timeout(CONTROL_TIMEOUT)
            .json(&ConfigRequest { max_jobs })
            .send()
            .await
            .map_err(ClientError::from_transport)?;
        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }
        Ok(())
    }
}
