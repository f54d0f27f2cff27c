// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent → backend status callback (`POST /api/node/status`).
//!
//! The backend treats this callback as the authoritative terminal signal
//! for a dispatched execution.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallbackStatus {
    Started,
    Completed,
    Failed,
}

fm_core::simple_display! {
    CallbackStatus {
        Started => "started",
        Completed => "completed",
        Failed => "failed",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCallback {
    pub execution_id: String,
    pub status: CallbackStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusCallback {
    pub fn started(execution_id: impl Into<String>) -> Self {
        Self {
            execution_id: execution_id.into(),
            status: CallbackStatus::Started,
            exit_code: None,
            error: None,
        }
    }

    pub fn finished(execution_id: impl Into<String>, exit_code: i32) -> Self {
        let status =
            if exit_code == 0 { CallbackStatus::Completed } else { CallbackStatus::Failed };
        Self { execution_id: execution_id.into(), status, exit_code: Some(exit_code), error: None }
    }

    pub fn failed(execution_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            execution_id: execution_id.into(),
            status: CallbackStatus::Failed,
            exit_code: None,
            error: Some(error.into()),
        }
    }
}
