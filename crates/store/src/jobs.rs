// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job row operations.

use chrono::{Duration, Utc};
use fm_core::JobStatus;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::records::JobRecord;
use crate::{Store, StoreError};

/// Aggregate counters returned by [`Store::job_statistics`].
#[derive(Debug, Clone, Serialize)]
pub struct JobStatistics {
    pub period_days: i64,
    pub total_jobs: i64,
    pub completed_jobs: i64,
    pub failed_jobs: i64,
    pub running_jobs: i64,
    pub pending_jobs: i64,
    pub cancelled_jobs: i64,
    pub jobs_last_24h: i64,
    pub average_duration_seconds: f64,
    pub success_rate: f64,
    pub failure_rate: f64,
    /// Spec name → job count, most frequent first.
    pub spec_distribution: Vec<(String, i64)>,
}

impl Store {
    /// Insert a new Pending job and return the stored row.
    pub async fn create_job(
        &self,
        name: &str,
        parameters: &Value,
        created_by: &str,
        queue_name: Option<&str>,
    ) -> Result<JobRecord, StoreError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO jobs (name, status, created_by, created_at, parameters, queue_name)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(name)
        .bind(JobStatus::Pending.to_string())
        .bind(created_by)
        .bind(now)
        .bind(parameters.to_string())
        .bind(queue_name)
        .execute(self.pool())
        .await?;

        let id = result.last_insert_rowid();
        self.get_job(id)
            .await?
            .ok_or_else(|| StoreError::NotFound("job", id.to_string()))
    }

    pub async fn get_job(&self, id: i64) -> Result<Option<JobRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(JobRecord::from_row).transpose()
    }

    /// Write back every mutable column of a loaded job row.
    pub async fn persist_job(&self, job: &JobRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE jobs SET
                name = ?, status = ?, progress = ?, started_at = ?, completed_at = ?,
                parameters = ?, result = ?, error_message = ?, log_file_path = ?,
                worker_name = ?, queue_name = ?, assigned_worker_name = ?,
                retries = ?, max_retries = ?
            WHERE id = ?
            "#,
        )
        .bind(&job.name)
        .bind(job.status.to_string())
        .bind(job.progress)
        .bind(job.started_at)
        .bind(job.completed_at)
        .bind(job.parameters.as_ref().map(|v| v.to_string()))
        .bind(job.result.as_ref().map(|v| v.to_string()))
        .bind(&job.error_message)
        .bind(&job.log_file_path)
        .bind(&job.worker_name)
        .bind(&job.queue_name)
        .bind(&job.assigned_worker_name)
        .bind(job.retries)
        .bind(job.max_retries)
        .bind(job.id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Jobs still needing work, oldest first (startup reconciliation order).
    pub async fn list_non_terminal_jobs(&self) -> Result<Vec<JobRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM jobs WHERE status IN ('Pending', 'Running') ORDER BY created_at ASC",
        )
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(JobRecord::from_row).collect()
    }

    pub async fn list_jobs(
        &self,
        limit: i64,
        offset: i64,
        status: Option<JobStatus>,
    ) -> Result<Vec<JobRecord>, StoreError> {
        let rows = match status {
            Some(status) => {
                sqlx::query(
                    "SELECT * FROM jobs WHERE status = ? ORDER BY created_at DESC LIMIT ? OFFSET ?",
                )
                .bind(status.to_string())
                .bind(limit)
                .bind(offset)
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query("SELECT * FROM jobs ORDER BY created_at DESC LIMIT ? OFFSET ?")
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(self.pool())
                    .await?
            }
        };
        rows.iter().map(JobRecord::from_row).collect()
    }

    /// Jobs currently consuming a slot on the given worker.
    pub async fn count_running_for_worker(&self, worker_name: &str) -> Result<i64, StoreError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM jobs WHERE assigned_worker_name = ? AND status = 'Running'",
        )
        .bind(worker_name)
        .fetch_one(self.pool())
        .await?;
        Ok(sqlx::Row::try_get(&row, "n")?)
    }

    /// Delete one job row, returning it so the caller can remove its log file.
    pub async fn delete_job(&self, id: i64) -> Result<Option<JobRecord>, StoreError> {
        let job = self.get_job(id).await?;
        if job.is_some() {
            sqlx::query("DELETE FROM jobs WHERE id = ?").bind(id).execute(self.pool()).await?;
        }
        Ok(job)
    }

    /// Delete terminal jobs older than `days`, returning the removed rows so
    /// the caller can delete their log files.
    pub async fn cleanup_terminal_jobs(&self, days: i64) -> Result<Vec<JobRecord>, StoreError> {
        let cutoff = Utc::now() - Duration::days(days);
        let rows = sqlx::query(
            r#"
            SELECT * FROM jobs
            WHERE status IN ('Completed', 'Failed', 'Cancelled') AND created_at < ?
            "#,
        )
        .bind(cutoff)
        .fetch_all(self.pool())
        .await?;
        let victims: Vec<JobRecord> =
            rows.iter().map(JobRecord::from_row).collect::<Result<_, _>>()?;

        sqlx::query(
            "DELETE FROM jobs WHERE status IN ('Completed', 'Failed', 'Cancelled') AND created_at < ?",
        )
        .bind(cutoff)
        .execute(self.pool())
        .await?;
        Ok(victims)
    }

    pub async fn job_statistics(&self, days: i64) -> Result<JobStatistics, StoreError> {
        let rows = sqlx::query("SELECT * FROM jobs").fetch_all(self.pool()).await?;
        let jobs: Vec<JobRecord> = rows.iter().map(JobRecord::from_row).collect::<Result<_, _>>()?;

        let count = |status: JobStatus| jobs.iter().filter(|j| j.status == status).count() as i64;
        let total = jobs.len() as i64;
        let completed = count(JobStatus::Completed);
        let failed = count(JobStatus::Failed);

        let durations: Vec<f64> = jobs.iter().filter_map(JobRecord::duration_secs).collect();
        let average_duration_seconds = if durations.is_empty() {
            0.0
        } else {
            durations.iter().sum::<f64>() / durations.len() as f64
        };

        let last_24h_cutoff = Utc::now() - Duration::hours(24);
        let jobs_last_24h = jobs.iter().filter(|j| j.created_at >= last_24h_cutoff).count() as i64;

        let mut by_spec: HashMap<String, i64> = HashMap::new();
        for job in &jobs {
            *by_spec.entry(job.spec_name().to_string()).or_insert(0) += 1;
        }
        let mut spec_distribution: Vec<(String, i64)> = by_spec.into_iter().collect();
        spec_distribution.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let rate = |n: i64| if total > 0 { n as f64 / total as f64 * 100.0 } else { 0.0 };

        Ok(JobStatistics {
            period_days: days,
            total_jobs: total,
            completed_jobs: completed,
            failed_jobs: failed,
            running_jobs: count(JobStatus::Running),
            pending_jobs: count(JobStatus::Pending),
            cancelled_jobs: count(JobStatus::Cancelled),
            jobs_last_24h,
            average_duration_seconds,
            success_rate: rate(completed),
            failure_rate: rate(failed),
            spec_distribution,
        })
    }
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;
