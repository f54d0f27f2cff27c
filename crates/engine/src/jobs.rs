// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job service: creation, status transitions, retry, progress/result/error
//! capture and log file lifecycle.

use async_trait::async_trait;
use chrono::Utc;
use fm_core::{JobStatus, LogValue, PrefixPaths};
use fm_store::{JobRecord, JobStatistics, Store, StoreError};
use serde_json::{json, Map, Value};
use std::io::Write;
use std::path::Path;

use crate::sink::JobSink;

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("job {0} not found")]
    NotFound(i64),
    #[error("job log I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Optional fields accompanying a status update.
#[derive(Debug, Clone, Default)]
pub struct StatusFields {
    pub progress: Option<i64>,
    pub result: Option<Value>,
    pub error_message: Option<String>,
    pub worker_name: Option<String>,
}

/// Persistence-backed job operations. Cheap to clone.
#[derive(Clone)]
pub struct JobService {
    store: Store,
    paths: PrefixPaths,
}

impl JobService {
    pub fn new(store: Store, paths: PrefixPaths) -> Self {
        Self { store, paths }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Persist a new Pending job and initialize its log file.
    pub async fn create(
        &self,
        name: &str,
        runtime_args: Map<String, Value>,
        created_by: &str,
        target_queue: Option<&str>,
    ) -> Result<JobRecord, JobError> {
        let parameters = json!({
            "spec_name": name,
            "created_by": created_by,
            "runtime_args": runtime_args,
        });
        let mut job = self.store.create_job(name, &parameters, created_by, target_queue).await?;

        let log_path = self.paths.job_log(job.id);
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(&log_path)?;
        writeln!(file, "=== Job {} Log ===", job.id)?;
        writeln!(file, "Job Name: {name}")?;
        writeln!(file, "Created By: {created_by}")?;
        writeln!(file, "Created At: {}", Utc::now().to_rfc3339())?;
        if !job.runtime_args().is_empty() {
            writeln!(file, "Parameters: {}", Value::Object(job.runtime_args()))?;
        }
        writeln!(file, "Queue: {}", target_queue.unwrap_or("-"))?;
        writeln!(file, "Job created and awaiting queue assignment...")?;
        writeln!(file)?;
        writeln!(file, "{}", "=".repeat(50))?;
        writeln!(file)?;

        job.log_file_path = Some(log_path.display().to_string());
        self.store.persist_job(&job).await?;

        tracing::info!(job_id = job.id, spec = name, created_by, "created job");
        Ok(job)
    }

    pub async fn get(&self, id: i64) -> Result<JobRecord, JobError> {
        self.store.get_job(id).await?.ok_or(JobError::NotFound(id))
    }

    /// Apply a status transition with its side fields.
    ///
    /// Transitions outside the allowed table are a no-op returning the
    /// current row. A Failed write never clears a pre-existing
    /// error_message: the log parser's verdict outranks worker-reported
    /// errors.
    pub async fn update_status(
        &self,
        id: i64,
        status: JobStatus,
        fields: StatusFields,
    ) -> Result<JobRecord, JobError> {
        let mut job = self.get(id).await?;

        if status != job.status && !job.status.can_transition_to(status) {
            tracing::warn!(
                job_id = id,
                from = %job.status,
                to = %status,
                "refusing invalid status transition"
            );
            return Ok(job);
        }

        job.status = status;
        if let Some(progress) = fields.progress {
            job.progress = progress.clamp(0, 100);
        }
        if let Some(result) = fields.result {
            job.result = Some(result);
        }
        if let Some(error_message) = fields.error_message {
            let keep_existing = status == JobStatus::Failed
                && job.error_message.as_deref().is_some_and(|m| !m.trim().is_empty());
            if !keep_existing {
                job.error_message = Some(error_message);
            }
        }
        if let Some(worker_name) = fields.worker_name {
            job.worker_name = Some(worker_name);
        }

        let now = Utc::now();
        if status == JobStatus::Running && job.started_at.is_none() {
            job.started_at = Some(now);
        }
        if status.is_terminal() && job.completed_at.is_none() {
            job.completed_at = Some(now);
        }

        self.store.persist_job(&job).await?;
        tracing::info!(job_id = id, status = %status, "updated job status");
        Ok(job)
    }

    /// Cancel from Pending or Running; anything else is refused.
    pub async fn cancel(&self, id: i64) -> Result<bool, JobError> {
        let job = self.get(id).await?;
        if !job.status.is_active() {
            return Ok(false);
        }
        self.update_status(id, JobStatus::Cancelled, StatusFields::default()).await?;
        Ok(true)
    }

    /// Retry a Failed job by cloning it; the original only gains a retry
    /// count. Returns the new job id, or None when the job is not
    /// retryable.
    pub async fn retry(&self, id: i64, user: &str) -> Result<Option<JobRecord>, JobError> {
        let mut job = self.get(id).await?;
        if !job.status.is_retryable() {
            tracing::warn!(job_id = id, status = %job.status, "job cannot be retried");
            return Ok(None);
        }

        let clone =
            self.create(&job.name, job.runtime_args(), user, job.queue_name.as_deref()).await?;
        job.retries += 1;
        self.store.persist_job(&job).await?;

        tracing::info!(job_id = id, new_job_id = clone.id, "retried job");
        Ok(Some(clone))
    }

    /// Clamp and store progress; a Pending job implicitly starts Running.
    pub async fn update_progress(&self, id: i64, progress: i64) -> Result<(), JobError> {
        let job = self.get(id).await?;
        let status =
            if job.status == JobStatus::Pending { JobStatus::Running } else { job.status };
        self.update_status(id, status, StatusFields { progress: Some(progress), ..Default::default() })
            .await?;
        Ok(())
    }

    /// Store a result; non-terminal jobs move to Completed. A result line
    /// from a job we still considered Pending proves it is running, so the
    /// transition goes through Running first.
    pub async fn update_result(&self, id: i64, result: Value) -> Result<(), JobError> {
        let mut job = self.get(id).await?;
        if job.status == JobStatus::Pending {
            job = self.update_status(id, JobStatus::Running, StatusFields::default()).await?;
        }
        let status = if job.status.is_terminal() { job.status } else { JobStatus::Completed };
        self.update_status(id, status, StatusFields { result: Some(result), ..Default::default() })
            .await?;
        Ok(())
    }

    /// Force the job to Failed with the given message. The first recorded
    /// error wins; later ones only appear in the log file. Jobs already
    /// settled as Completed or Cancelled keep their status — only the log
    /// records the late error.
    pub async fn update_error(&self, id: i64, message: &str) -> Result<(), JobError> {
        let mut job = self.get(id).await?;

        if job.status.is_terminal() && job.status != JobStatus::Failed {
            tracing::warn!(job_id = id, status = %job.status, "late error for settled job");
            self.append_log(id, &format!("Job failed with error: {message}")).await?;
            return Ok(());
        }

        if job.error_message.as_deref().map_or(true, |m| m.trim().is_empty()) {
            job.error_message = Some(message.to_string());
        } else {
            tracing::debug!(job_id = id, "error message already set, preserving existing");
        }
        job.status = JobStatus::Failed;
        if job.completed_at.is_none() {
            job.completed_at = Some(Utc::now());
        }
        self.store.persist_job(&job).await?;

        self.append_log(id, &format!("Job failed with error: {message}")).await?;
        tracing::info!(job_id = id, error = message, "job failed");
        Ok(())
    }

    /// Append a line to the job's log file, creating it if needed.
    pub async fn append_log(&self, id: i64, text: &str) -> Result<(), JobError> {
        let path = self.log_path(id).await?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new().create(true).append(true).open(&path)?;
        if text.ends_with('\n') {
            write!(file, "{text}")?;
        } else {
            writeln!(file, "{text}")?;
        }
        Ok(())
    }

    /// Full log content; an empty or missing file reads as a placeholder
    /// rather than an empty string.
    pub async fn get_log(&self, id: i64) -> Result<String, JobError> {
        let path = self.log_path(id).await?;
        if !path.exists() {
            return Ok("(no logs yet)".to_string());
        }
        let content = std::fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            Ok("(no logs yet)".to_string())
        } else {
            Ok(content)
        }
    }

    pub async fn statistics(&self, days: i64) -> Result<JobStatistics, JobError> {
        Ok(self.store.job_statistics(days).await?)
    }

    /// Delete one job and its log file.
    pub async fn delete(&self, id: i64) -> Result<bool, JobError> {
        match self.store.delete_job(id).await? {
            Some(job) => {
                remove_log_file(job.log_file_path.as_deref());
                tracing::info!(job_id = id, "deleted job");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove terminal jobs older than `days`, log files included.
    pub async fn cleanup_old(&self, days: i64) -> Result<usize, JobError> {
        let removed = self.store.cleanup_terminal_jobs(days).await?;
        for job in &removed {
            remove_log_file(job.log_file_path.as_deref());
        }
        if !removed.is_empty() {
            tracing::info!(count = removed.len(), days, "cleaned up old jobs");
        }
        Ok(removed.len())
    }

    async fn log_path(&self, id: i64) -> Result<std::path::PathBuf, JobError> {
        match self.store.get_job(id).await? {
            Some(job) => Ok(job
                .log_file_path
                .map(std::path::PathBuf::from)
                .unwrap_or_else(|| self.paths.job_log(id))),
            None => Ok(self.paths.job_log(id)),
        }
    }
}

fn remove_log_file(path: Option<&str>) {
    if let Some(path) = path {
        let path = Path::new(path);
        if path.exists() {
            if let Err(e) = std::fs::remove_file(path) {
                tracing::warn!(path = %path.display(), error = %e, "failed to delete log file");
            }
        }
    }
}

#[async_trait]
impl JobSink for JobService {
    async fn progress(&self, job_id: i64, percent: u8) {
        if let Err(e) = self.update_progress(job_id, percent as i64).await {
            tracing::error!(job_id, error = %e, "failed to update progress from log stream");
        }
    }

    async fn result(&self, job_id: i64, value: LogValue) {
        if let Err(e) = self.update_result(job_id, value.result_value()).await {
            tracing::error!(job_id, error = %e, "failed to update result from log stream");
        }
    }

    async fn error(&self, job_id: i64, message: String) {
        if let Err(e) = self.update_error(job_id, &message).await {
            tracing::error!(job_id, error = %e, "failed to update error from log stream");
        }
    }
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;
