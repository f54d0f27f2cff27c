// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker endpoints: CRUD, lifecycle actions and deployment polling.

use axum::extract::{Path, State};
use axum::Json;
use fm_core::{AuthMethod, WorkerType};
use fm_store::NewWorker;
use serde::Deserialize;
use serde_json::{json, Value};

use super::ApiError;
use crate::context::AppContext;

#[derive(Debug, Deserialize)]
pub struct WorkerCreateRequest {
    pub name: String,
    #[serde(default = "default_worker_type")]
    pub worker_type: String,
    pub hostname: Option<String>,
    pub ip_address: Option<String>,
    pub port: Option<i64>,
    pub ssh_user: Option<String>,
    #[serde(default = "default_auth_method")]
    pub auth_method: String,
    pub ssh_private_key: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub provision: bool,
    #[serde(default = "default_max_jobs")]
    pub max_jobs: i64,
}

fn default_worker_type() -> String {
    "remote".to_string()
}
fn default_auth_method() -> String {
    "key".to_string()
}
fn default_max_jobs() -> i64 {
    10
}

pub async fn create_worker(
    State(context): State<AppContext>,
    Json(request): Json<WorkerCreateRequest>,
) -> Result<Json<Value>, ApiError> {
    let new = NewWorker {
        name: request.name,
        worker_type: request.worker_type.parse::<WorkerType>().map_err(ApiError::bad_request)?,
        hostname: request.hostname,
        ip_address: request.ip_address,
        port: request.port,
        ssh_user: request.ssh_user,
        auth_method: request.auth_method.parse::<AuthMethod>().map_err(ApiError::bad_request)?,
        ssh_private_key: request.ssh_private_key,
        password: request.password,
        provision: request.provision,
        max_jobs: request.max_jobs,
        log_file_path: None,
    };
    let outcome = context.workers.create(new).await?;
    Ok(Json(json!(outcome)))
}

pub async fn list_workers(State(context): State<AppContext>) -> Result<Json<Value>, ApiError> {
    let workers = context.store.list_workers().await?;
    let count = workers.len();
    Ok(Json(json!({ "workers": workers, "count": count })))
}

pub async fn get_worker(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let worker = context
        .store
        .get_worker(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("worker {id} not found")))?;
    Ok(Json(json!({ "worker": worker })))
}

#[derive(Debug, Deserialize)]
pub struct WorkerUpdateRequest {
    pub hostname: Option<String>,
    pub ip_address: Option<String>,
    pub port: Option<i64>,
    pub ssh_user: Option<String>,
    pub max_jobs: Option<i64>,
}

pub async fn update_worker(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
    Json(request): Json<WorkerUpdateRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut worker = context
        .store
        .get_worker(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("worker {id} not found")))?;

    if let Some(max_jobs) = request.max_jobs {
        if max_jobs < 1 {
            return Err(ApiError::bad_request("max_jobs must be at least 1"));
        }
        worker.max_jobs = max_jobs;
    }
    if let Some(hostname) = request.hostname {
        worker.hostname = Some(hostname);
    }
    if let Some(ip_address) = request.ip_address {
        worker.ip_address = Some(ip_address);
    }
    if let Some(port) = request.port {
        worker.port = port;
    }
    if let Some(ssh_user) = request.ssh_user {
        worker.ssh_user = Some(ssh_user);
    }
    context.store.persist_worker(&worker).await?;

    // Push a capacity change to the live agent when reachable.
    if request.max_jobs.is_some() {
        context.workers.push_config(id, worker.max_jobs).await?;
    }

    Ok(Json(json!({ "worker": worker })))
}

pub async fn delete_worker(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    if !context.workers.delete_worker(id).await? {
        return Err(ApiError::not_found(format!("worker {id} not found")));
    }
    Ok(Json(json!({ "success": true })))
}

pub async fn start_worker(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let worker = context.workers.start_worker(id).await?;
    Ok(Json(json!({ "success": true, "worker": worker })))
}

pub async fn stop_worker(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let worker = context.workers.stop_worker(id).await?;
    Ok(Json(json!({ "success": true, "worker": worker })))
}

pub async fn pause_worker(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let worker = context.workers.pause_worker(id).await?;
    Ok(Json(json!({ "success": true, "worker": worker })))
}

pub async fn resume_worker(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let worker = context.workers.resume_worker(id).await?;
    Ok(Json(json!({ "success": true, "worker": worker })))
}

pub async fn deployment_status(
    State(context): State<AppContext>,
    Path(deployment_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let status = context
        .workers
        .deployments()
        .get(&deployment_id)
        .ok_or_else(|| ApiError::not_found(format!("deployment {deployment_id} not found")))?;
    Ok(Json(json!(status)))
}

pub async fn statistics(State(context): State<AppContext>) -> Result<Json<Value>, ApiError> {
    let stats = context.workers.statistics().await?;
    Ok(Json(json!(stats)))
}
