// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue endpoints: CRUD, state transitions and worker assignment.

use axum::extract::{Path, State};
use axum::Json;
use fm_core::{DispatchStrategy, QueuePriority, QueueState};
use fm_store::{NewQueue, QueueUpdate};
use serde::Deserialize;
use serde_json::{json, Value};

use super::ApiError;
use crate::context::AppContext;

#[derive(Debug, Deserialize)]
pub struct QueueCreateRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_state")]
    pub state: String,
    #[serde(default = "default_time_limit")]
    pub time_limit: i64,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default = "default_strategy")]
    pub strategy: String,
    #[serde(default)]
    pub is_default: bool,
}

fn default_state() -> String {
    "stopped".to_string()
}
fn default_time_limit() -> i64 {
    1200
}
fn default_priority() -> String {
    "normal".to_string()
}
fn default_strategy() -> String {
    "round_robin".to_string()
}

pub async fn create_queue(
    State(context): State<AppContext>,
    Json(request): Json<QueueCreateRequest>,
) -> Result<Json<Value>, ApiError> {
    let new = NewQueue {
        name: request.name.clone(),
        description: request.description,
        state: request.state.parse::<QueueState>().map_err(ApiError::bad_request)?,
        time_limit: request.time_limit,
        priority: request.priority.parse::<QueuePriority>().map_err(ApiError::bad_request)?,
        strategy: request.strategy.parse::<DispatchStrategy>().map_err(ApiError::bad_request)?,
        is_default: request.is_default,
        log_file_path: Some(
            context.config.paths().queue_log(&request.name).display().to_string(),
        ),
    };
    let queue = context.store.create_queue(&new).await?;
    Ok(Json(json!({ "queue": queue })))
}

pub async fn list_queues(State(context): State<AppContext>) -> Result<Json<Value>, ApiError> {
    let queues = context.store.list_queues().await?;
    let count = queues.len();
    Ok(Json(json!({ "queues": queues, "count": count })))
}

pub async fn get_queue(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let queue = context
        .store
        .get_queue(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("queue {id} not found")))?;
    let queued_jobs = context.queues.queue_jobs(&queue.name);
    Ok(Json(json!({ "queue": queue, "queued_jobs": queued_jobs })))
}

#[derive(Debug, Deserialize)]
pub struct QueueUpdateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub state: Option<String>,
    pub time_limit: Option<i64>,
    pub priority: Option<String>,
    pub strategy: Option<String>,
    pub is_default: Option<bool>,
}

pub async fn update_queue(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
    Json(request): Json<QueueUpdateRequest>,
) -> Result<Json<Value>, ApiError> {
    let update = QueueUpdate {
        name: request.name,
        description: request.description,
        state: request
            .state
            .map(|s| s.parse::<QueueState>())
            .transpose()
            .map_err(ApiError::bad_request)?,
        time_limit: request.time_limit,
        priority: request
            .priority
            .map(|p| p.parse::<QueuePriority>())
            .transpose()
            .map_err(ApiError::bad_request)?,
        strategy: request
            .strategy
            .map(|s| s.parse::<DispatchStrategy>())
            .transpose()
            .map_err(ApiError::bad_request)?,
        is_default: request.is_default,
    };
    let queue = context
        .store
        .update_queue(id, &update)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("queue {id} not found")))?;
    Ok(Json(json!({ "queue": queue })))
}

pub async fn delete_queue(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    if !context.store.delete_queue(id).await? {
        return Err(ApiError::not_found(format!("queue {id} not found")));
    }
    Ok(Json(json!({ "success": true })))
}

async fn set_state(
    context: &AppContext,
    id: i64,
    state: QueueState,
) -> Result<Json<Value>, ApiError> {
    let queue = context
        .store
        .set_queue_state(id, state)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("queue {id} not found")))?;
    let message = format!("Queue {}: {}", state, queue.name);
    tracing::info!("{message}");
    context.queues.logger().append(&queue.name, &message);
    Ok(Json(json!({ "queue": queue })))
}

pub async fn start_queue(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    set_state(&context, id, QueueState::Started).await
}

pub async fn stop_queue(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    set_state(&context, id, QueueState::Stopped).await
}

pub async fn pause_queue(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    set_state(&context, id, QueueState::Paused).await
}

pub async fn queue_jobs(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let queue = context
        .store
        .get_queue(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("queue {id} not found")))?;
    let job_ids = context.queues.queue_jobs(&queue.name);
    Ok(Json(json!({ "queue_name": queue.name, "job_ids": job_ids })))
}

pub async fn queue_workers(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let workers = context.store.workers_for_queue(id).await?;
    let count = workers.len();
    Ok(Json(json!({ "workers": workers, "count": count })))
}

pub async fn assign_worker(
    State(context): State<AppContext>,
    Path((id, worker_id)): Path<(i64, i64)>,
) -> Result<Json<Value>, ApiError> {
    if !context.store.assign_worker_to_queue(worker_id, id).await? {
        return Err(ApiError::not_found("queue or worker not found"));
    }
    Ok(Json(json!({ "success": true })))
}

pub async fn unassign_worker(
    State(context): State<AppContext>,
    Path((id, worker_id)): Path<(i64, i64)>,
) -> Result<Json<Value>, ApiError> {
    if !context.store.unassign_worker_from_queue(worker_id, id).await? {
        return Err(ApiError::not_found("assignment not found"));
    }
    Ok(Json(json!({ "success": true })))
}
