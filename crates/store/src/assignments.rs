// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue↔worker assignment operations.

use chrono::Utc;

use crate::records::{QueueRecord, WorkerRecord};
use crate::{Store, StoreError};

impl Store {
    /// Assign a worker to a queue. Idempotent: an existing pair is left
    /// untouched.
    pub async fn assign_worker_to_queue(
        &self,
        worker_id: i64,
        queue_id: i64,
    ) -> Result<bool, StoreError> {
        if self.get_queue(queue_id).await?.is_none() || self.get_worker(worker_id).await?.is_none()
        {
            return Ok(false);
        }
        sqlx::query(
            r#"
            INSERT INTO queue_workers (queue_id, worker_id, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT (queue_id, worker_id) DO NOTHING
            "#,
        )
        .bind(queue_id)
        .bind(worker_id)
        .bind(Utc::now())
        .execute(self.pool())
        .await?;
        Ok(true)
    }

    pub async fn unassign_worker_from_queue(
        &self,
        worker_id: i64,
        queue_id: i64,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM queue_workers WHERE queue_id = ? AND worker_id = ?")
            .bind(queue_id)
            .bind(worker_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Workers assigned to a queue, id ascending (the dispatch tie-break
    /// order).
    pub async fn workers_for_queue(&self, queue_id: i64) -> Result<Vec<WorkerRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT w.* FROM workers w
            JOIN queue_workers qw ON qw.worker_id = w.id
            WHERE qw.queue_id = ?
            ORDER BY w.id ASC
            "#,
        )
        .bind(queue_id)
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(WorkerRecord::from_row).collect()
    }

    pub async fn workers_for_queue_name(
        &self,
        queue_name: &str,
    ) -> Result<Vec<WorkerRecord>, StoreError> {
        match self.get_queue_by_name(queue_name).await? {
            Some(queue) => self.workers_for_queue(queue.id).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn queues_for_worker(&self, worker_id: i64) -> Result<Vec<QueueRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT q.* FROM queues q
            JOIN queue_workers qw ON qw.queue_id = q.id
            WHERE qw.worker_id = ?
            ORDER BY q.id ASC
            "#,
        )
        .bind(worker_id)
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(QueueRecord::from_row).collect()
    }
}

#[cfg(test)]
#[path = "assignments_tests.rs"]
mod tests;
