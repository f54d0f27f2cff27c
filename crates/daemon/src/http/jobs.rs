// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job endpoints: submission, lifecycle actions, logs and statistics.

use axum::extract::{Path, Query, State};
use axum::Json;
use fm_core::JobStatus;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::ApiError;
use crate::context::AppContext;

#[derive(Debug, Deserialize)]
pub struct JobRunRequest {
    #[serde(alias = "name")]
    pub spec_name: String,
    #[serde(default)]
    pub runtime_args: Map<String, Value>,
    #[serde(default = "default_created_by")]
    pub created_by: String,
    pub queue: Option<String>,
}

fn default_created_by() -> String {
    "system".to_string()
}

/// Submit a job: resolve the target queue (explicit or default), refuse
/// queues that are not started, persist, then enqueue.
pub async fn run_job(
    State(context): State<AppContext>,
    Json(request): Json<JobRunRequest>,
) -> Result<Json<Value>, ApiError> {
    let target_queue = match &request.queue {
        Some(queue) => {
            let record = context
                .store
                .get_queue_by_name(queue)
                .await
                .map_err(ApiError::from)?
                .ok_or_else(|| ApiError::bad_request(format!("Queue '{queue}' not found")))?;
            record.name
        }
        None => {
            let record = context
                .store
                .default_queue()
                .await
                .map_err(ApiError::from)?
                .ok_or_else(|| ApiError::bad_request("No default queue configured"))?;
            record.name
        }
    };

    let queue_record = context
        .store
        .get_queue_by_name(&target_queue)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::bad_request(format!("Queue '{target_queue}' not found")))?;
    if !queue_record.state.accepts_jobs() {
        return Err(ApiError::bad_request(format!(
            "Queue '{}' is {} and cannot accept new jobs",
            queue_record.name, queue_record.state
        )));
    }

    let job = context
        .jobs
        .create(&request.spec_name, request.runtime_args, &request.created_by, Some(&target_queue))
        .await?;
    context.queues.add_job(&target_queue, job.id).await?;

    Ok(Json(json!({ "job": job })))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub status: Option<String>,
}

fn default_limit() -> i64 {
    100
}

pub async fn list_jobs(
    State(context): State<AppContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let status = match &query.status {
        Some(raw) => Some(
            raw.parse::<JobStatus>().map_err(|e| ApiError::bad_request(e))?,
        ),
        None => None,
    };
    let jobs = context.store.list_jobs(query.limit, query.offset, status).await?;
    let count = jobs.len();
    Ok(Json(json!({ "jobs": jobs, "count": count })))
}

pub async fn get_job(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let job = context.jobs.get(id).await?;
    Ok(Json(json!({ "job": job })))
}

pub async fn cancel_job(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let cancelled = context.jobs.cancel(id).await?;
    if !cancelled {
        return Err(ApiError::bad_request(format!("Job {id} is not in a cancellable state")));
    }
    // Drop the job from its in-memory queue if it is still waiting there.
    let job = context.jobs.get(id).await?;
    if let Some(queue_name) = job.queue_name.as_deref() {
        context.queues.remove_job(queue_name, id);
    }
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct RetryQuery {
    #[serde(default = "default_created_by")]
    pub user_id: String,
}

pub async fn retry_job(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
    Query(query): Query<RetryQuery>,
) -> Result<Json<Value>, ApiError> {
    let Some(clone) = context.jobs.retry(id, &query.user_id).await? else {
        return Err(ApiError::bad_request(format!("Job {id} cannot be retried")));
    };
    // Queue the clone where the original ran; a stopped queue leaves it
    // Pending for startup reconciliation.
    if let Some(queue_name) = clone.queue_name.clone() {
        if let Err(e) = context.queues.add_job(&queue_name, clone.id).await {
            tracing::warn!(job_id = clone.id, error = %e, "retried job not queued");
        }
    }
    Ok(Json(json!({ "new_job_id": clone.id })))
}

pub async fn delete_job(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    if !context.jobs.delete(id).await? {
        return Err(ApiError::not_found(format!("job {id} not found")));
    }
    Ok(Json(json!({ "success": true })))
}

pub async fn job_logs(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    // 404 for unknown jobs, placeholder text for empty logs.
    context.jobs.get(id).await?;
    let content = context.jobs.get_log(id).await?;
    Ok(Json(json!({ "job_id": id, "logs": content })))
}

#[derive(Debug, Deserialize)]
pub struct StatisticsQuery {
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_days() -> i64 {
    7
}

pub async fn statistics(
    State(context): State<AppContext>,
    Query(query): Query<StatisticsQuery>,
) -> Result<Json<Value>, ApiError> {
    let stats = context.jobs.statistics(query.days).await?;
    Ok(Json(json!(stats)))
}

#[derive(Debug, Deserialize)]
pub struct CleanupQuery {
    #[serde(default = "default_cleanup_days")]
    pub days: i64,
}

fn default_cleanup_days() -> i64 {
    30
}

/// Remove terminal jobs older than `days`, together with their log files.
pub async fn cleanup_jobs(
    State(context): State<AppContext>,
    Query(query): Query<CleanupQuery>,
) -> Result<Json<Value>, ApiError> {
    let removed = context.jobs.cleanup_old(query.days).await?;
    Ok(Json(json!({ "removed": removed, "days": query.days })))
}
