// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DTOs for the worker agent's HTTP API.
//!
//! Commands and arguments travel base64-encoded so shell metacharacters and
//! embedded JSON survive transport untouched.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::envelope::ProtocolError;

/// Base64-encode a transport field.
pub fn encode_b64(raw: &str) -> String {
    B64.encode(raw.as_bytes())
}

/// Decode a base64 transport field back to UTF-8 (lossy on invalid bytes).
pub fn decode_b64(encoded: &str) -> Result<String, ProtocolError> {
    let bytes = B64.decode(encoded).map_err(|e| ProtocolError::Base64(e.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// `POST /execute` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub execution_id: String,
    /// Base64-encoded command string.
    pub command: String,
    /// Base64-encoded additional arguments.
    #[serde(default)]
    pub args: Vec<String>,
}

impl ExecuteRequest {
    /// Build a request from plain command text and args.
    pub fn encode(execution_id: impl Into<String>, command: &str, args: &[String]) -> Self {
        Self {
            execution_id: execution_id.into(),
            command: encode_b64(command),
            args: args.iter().map(|a| encode_b64(a)).collect(),
        }
    }

    /// Decode command and args back to plain text.
    pub fn decode(&self) -> Result<(String, Vec<String>), ProtocolError> {
        let command = decode_b64(&self.command)?;
        let args = self.args.iter().map(|a| decode_b64(a)).collect::<Result<Vec<_>, _>>()?;
        Ok((command, args))
    }
}

/// `POST /execute` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub execution_id: String,
    pub pid: u32,
    pub status: String,
}

/// Execution status as tracked by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecResult {
    Running,
    Completed,
    Failed,
    Cancelled,
}

fm_core::simple_display! {
    ExecResult {
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

/// `GET /status/{execution_id}` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub execution_id: String,
    pub status: ExecResult,
    pub exit_code: Option<i32>,
    pub pid: Option<u32>,
}

/// `DELETE /execute/{execution_id}` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResponse {
    pub execution_id: String,
    pub cancelled: bool,
}

/// `GET /health` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub running_jobs: usize,
    pub max_jobs: usize,
}

impl HealthResponse {
    pub fn healthy(running_jobs: usize, max_jobs: usize) -> Self {
        Self { status: "healthy".to_string(), running_jobs, max_jobs }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// `PUT /config` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigRequest {
    pub max_jobs: usize,
}

/// `PUT /config` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub max_jobs: usize,
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
