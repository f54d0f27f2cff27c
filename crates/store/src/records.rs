// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed row mappings for the store tables.

use chrono::{DateTime, Utc};
use fm_core::{
    AuthMethod, DispatchStrategy, JobStatus, QueuePriority, QueueState, WorkerState, WorkerStatus,
    WorkerType,
};
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::StoreError;

fn parse<T: std::str::FromStr<Err = String>>(raw: String) -> Result<T, StoreError> {
    raw.parse::<T>().map_err(StoreError::Parse)
}

fn parse_json(raw: Option<String>) -> Option<Value> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
}

/// One job row.
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub id: i64,
    pub name: String,
    pub status: JobStatus,
    pub progress: i64,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub parameters: Option<Value>,
    pub result: Option<Value>,
    pub error_message: Option<String>,
    pub log_file_path: Option<String>,
    pub worker_name: Option<String>,
    pub queue_name: Option<String>,
    pub assigned_worker_name: Option<String>,
    pub retries: i64,
    pub max_retries: i64,
}

impl JobRecord {
    pub(crate) fn from_row(row: &SqliteRow) -> Result<Self, StoreError> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            status: parse(row.try_get::<String, _>("status")?)?,
            progress: row.try_get("progress")?,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
            parameters: parse_json(row.try_get("parameters")?),
            result: parse_json(row.try_get("result")?),
            error_message: row.try_get("error_message")?,
            log_file_path: row.try_get("log_file_path")?,
            worker_name: row.try_get("worker_name")?,
            queue_name: row.try_get("queue_name")?,
            assigned_worker_name: row.try_get("assigned_worker_name")?,
            retries: row.try_get("retries")?,
            max_retries: row.try_get("max_retries")?,
        })
    }

    /// The `runtime_args` map carried inside `parameters`.
    pub fn runtime_args(&self) -> Map<String, Value> {
        self.parameters
            .as_ref()
            .and_then(|p| p.get("runtime_args"))
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default()
    }

    /// Seconds between start and completion, when both are set.
    pub fn duration_secs(&self) -> Option<f64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64 / 1000.0),
            _ => None,
        }
    }

    /// The spec name recorded in `parameters`, falling back to the
    /// denormalized job name.
    pub fn spec_name(&self) -> &str {
        self.parameters
            .as_ref()
            .and_then(|p| p.get("spec_name"))
            .and_then(|v| v.as_str())
            .unwrap_or(&self.name)
    }
}

/// One specification row.
#[derive(Debug, Clone, Serialize)]
pub struct SpecRecord {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub command: String,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

impl SpecRecord {
    pub(crate) fn from_row(row: &SqliteRow) -> Result<Self, StoreError> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            command: row.try_get("command")?,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            is_active: row.try_get("is_active")?,
        })
    }
}

/// One queue row.
#[derive(Debug, Clone, Serialize)]
pub struct QueueRecord {
    pub id: i64,
    pub name: String,
    pub state: QueueState,
    pub time_limit: i64,
    pub priority: QueuePriority,
    pub strategy: DispatchStrategy,
    pub description: Option<String>,
    pub log_file_path: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QueueRecord {
    pub(crate) fn from_row(row: &SqliteRow) -> Result<Self, StoreError> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            state: parse(row.try_get::<String, _>("state")?)?,
            time_limit: row.try_get("time_limit")?,
            priority: parse(row.try_get::<String, _>("priority")?)?,
            strategy: parse(row.try_get::<String, _>("strategy")?)?,
            description: row.try_get("description")?,
            log_file_path: row.try_get("log_file_path")?,
            is_default: row.try_get("is_default")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// One worker row.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerRecord {
    pub id: i64,
    pub name: String,
    pub worker_type: WorkerType,
    pub hostname: Option<String>,
    pub ip_address: Option<String>,
    pub port: i64,
    pub ssh_user: Option<String>,
    pub auth_method: AuthMethod,
    #[serde(skip_serializing)]
    pub ssh_private_key: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub provision: bool,
    pub max_jobs: i64,
    pub log_file_path: Option<String>,
    pub status: WorkerStatus,
    pub state: WorkerState,
    pub last_seen: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkerRecord {
    pub(crate) fn from_row(row: &SqliteRow) -> Result<Self, StoreError> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            worker_type: parse(row.try_get::<String, _>("worker_type")?)?,
            hostname: row.try_get("hostname")?,
            ip_address: row.try_get("ip_address")?,
            port: row.try_get("port")?,
            ssh_user: row.try_get("ssh_user")?,
            auth_method: parse(row.try_get::<String, _>("auth_method")?)?,
            ssh_private_key: row.try_get("ssh_private_key")?,
            password: row.try_get("password")?,
            provision: row.try_get("provision")?,
            max_jobs: row.try_get("max_jobs")?,
            log_file_path: row.try_get("log_file_path")?,
            status: parse(row.try_get::<String, _>("status")?)?,
            state: parse(row.try_get::<String, _>("state")?)?,
            last_seen: row.try_get("last_seen")?,
            error_message: row.try_get("error_message")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    /// Host the agent's HTTP endpoint is reached on.
    pub fn endpoint_host(&self) -> String {
        match self.worker_type {
            WorkerType::Local => "127.0.0.1".to_string(),
            WorkerType::Remote => self
                .ip_address
                .clone()
                .or_else(|| self.hostname.clone())
                .unwrap_or_else(|| "127.0.0.1".to_string()),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}:{}", self.endpoint_host(), self.port)
    }
}

/// One queue↔worker assignment row.
#[derive(Debug, Clone, Serialize)]
pub struct QueueWorkerRecord {
    pub id: i64,
    pub queue_id: i64,
    pub worker_id: i64,
    pub created_at: DateTime<Utc>,
}

impl QueueWorkerRecord {
    pub(crate) fn from_row(row: &SqliteRow) -> Result<Self, StoreError> {
        Ok(Self {
            id: row.try_get("id")?,
            queue_id: row.try_get("queue_id")?,
            worker_id: row.try_get("worker_id")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
