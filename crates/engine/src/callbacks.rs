// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handling of agent status callbacks (`POST /api/node/status`).
//!
//! The callback is the authoritative terminal signal for an execution:
//! it settles the job's final status, removes it from the in-memory queue
//! and closes the cached log handle. Log-parsed errors keep precedence
//! over worker-reported ones.

use fm_core::{ExecutionId, ExecutionIdError, JobStatus};
use fm_wire::{CallbackStatus, StatusCallback};

use crate::ingest::LogIngestor;
use crate::jobs::{JobError, JobService, StatusFields};
use crate::queue::QueueEngine;

#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    #[error(transparent)]
    BadExecutionId(#[from] ExecutionIdError),
    #[error(transparent)]
    Job(#[from] JobError),
}

pub async fn handle_status_callback(
    jobs: &JobService,
    queues: &QueueEngine,
    ingestor: &LogIngestor,
    callback: StatusCallback,
) -> Result<(), CallbackError> {
    let execution: ExecutionId = callback.execution_id.parse()?;
    let job_id = execution.job_id();

    match callback.status {
        CallbackStatus::Started => {
            jobs.update_status(job_id, JobStatus::Running, StatusFields::default()).await?;
        }
        CallbackStatus::Completed => {
            let job = ensure_not_pending(jobs, job_id).await?;
            let exit_code = callback.exit_code.unwrap_or(0);
            if exit_code == 0 {
                if job.status == JobStatus::Failed {
                    // An ERROR= line already failed the job; the clean exit
                    // does not resurrect it.
                    tracing::info!(job_id, "job already Failed, preserving status");
                } else {
                    jobs.update_status(
                        job_id,
                        JobStatus::Completed,
                        StatusFields { progress: Some(100), ..Default::default() },
                    )
                    .await?;
                }
            } else {
                jobs.update_status(
                    job_id,
                    JobStatus::Failed,
                    StatusFields {
                        error_message: Some(format!("Process exited with code {exit_code}")),
                        ..Default::default()
                    },
                )
                .await?;
            }
            settle(queues, ingestor, &execution, &callback);
        }
        CallbackStatus::Failed => {
            ensure_not_pending(jobs, job_id).await?;
            let error_message =
                callback.error.clone().unwrap_or_else(|| "Worker reported job failure".to_string());
            jobs.update_status(
                job_id,
                JobStatus::Failed,
                StatusFields { error_message: Some(error_message), ..Default::default() },
            )
            .await?;
            settle(queues, ingestor, &execution, &callback);
        }
    }

    Ok(())
}

/// A terminal callback for a job we still consider Pending means the
/// `started` callback was lost; move it through Running so the terminal
/// transition is legal and `started_at` is recorded.
async fn ensure_not_pending(
    jobs: &JobService,
    job_id: i64,
) -> Result<fm_store::JobRecord, CallbackError> {
    let job = jobs.get(job_id).await?;
    if job.status == JobStatus::Pending {
        return Ok(jobs.update_status(job_id, JobStatus::Running, StatusFields::default()).await?);
    }
    Ok(job)
}

fn settle(
    queues: &QueueEngine,
    ingestor: &LogIngestor,
    execution: &ExecutionId,
    callback: &StatusCallback,
) {
    queues.remove_job(execution.queue(), execution.job_id());
    ingestor.close_log(&callback.execution_id);
}

#[cfg(test)]
#[path = "callbacks_tests.rs"]
mod tests;
