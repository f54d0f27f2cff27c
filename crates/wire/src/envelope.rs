// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker log envelope.
//!
//! Elements of the shared `logs` list are base64-wrapped JSON objects
//! carrying either an `execution_id` (job output line) or a `worker_name`
//! (agent self-log line), plus a timestamp and the message text.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid base64 payload: {0}")]
    Base64(String),
    #[error("invalid JSON payload: {0}")]
    Json(String),
    #[error("log envelope carries neither execution_id nor worker_name")]
    MissingRoute,
}

/// One log line in flight through the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_name: Option<String>,
    pub timestamp: String,
    pub message: String,
}

impl LogEnvelope {
    pub fn for_job(execution_id: impl Into<String>, timestamp: String, message: String) -> Self {
        Self { execution_id: Some(execution_id.into()), worker_name: None, timestamp, message }
    }

    pub fn for_worker(worker_name: impl Into<String>, timestamp: String, message: String) -> Self {
        Self { execution_id: None, worker_name: Some(worker_name.into()), timestamp, message }
    }

    /// Serialize to the on-wire form: base64(JSON).
    pub fn encode(&self) -> Result<String, ProtocolError> {
        let json = serde_json::to_string(self).map_err(|e| ProtocolError::Json(e.to_string()))?;
        Ok(B64.encode(json.as_bytes()))
    }

    /// Parse an on-wire element. Envelopes routing to neither a job nor a
    /// worker are refused so the consumer can drop them with a warning.
    pub fn decode(raw: &[u8]) -> Result<Self, ProtocolError> {
        let bytes = B64.decode(raw).map_err(|e| ProtocolError::Base64(e.to_string()))?;
        let envelope: LogEnvelope =
            serde_json::from_slice(&bytes).map_err(|e| ProtocolError::Json(e.to_string()))?;
        if envelope.execution_id.is_none() && envelope.worker_name.is_none() {
            return Err(ProtocolError::MissingRoute);
        }
        Ok(envelope)
    }
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
