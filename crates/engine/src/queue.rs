// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory FIFO queues over the persistent queue table.
//!
//! The live ordering is process state only: it is rebuilt from the store at
//! startup and never persisted per job.

use fm_core::{JobStatus, PrefixPaths, QueueState};
use fm_store::{Store, StoreError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Write;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Queue '{0}' not found")]
    UnknownQueue(String),
    #[error("Queue '{queue}' is {state} and cannot accept new jobs")]
    NotAccepting { queue: String, state: QueueState },
    #[error("Job {0} not found")]
    UnknownJob(i64),
}

/// Append-only logger for per-queue activity logs.
///
/// Each `append()` opens, writes one `[timestamp] message` line and closes.
/// Failures are logged via tracing but do not propagate.
pub struct QueueLogger {
    paths: PrefixPaths,
}

impl QueueLogger {
    pub fn new(paths: PrefixPaths) -> Self {
        Self { paths }
    }

    pub fn append(&self, queue_name: &str, message: &str) {
        let path = self.paths.queue_log(queue_name);
        let write = || -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut file = std::fs::OpenOptions::new().create(true).append(true).open(&path)?;
            writeln!(file, "[{}] {}", fm_core::format_local_stamp(), message)?;
            Ok(())
        };
        if let Err(e) = write() {
            tracing::warn!(queue = queue_name, error = %e, "failed to write queue log");
        }
    }
}

/// Counters from startup reconciliation.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    pub restored: usize,
    pub reset_from_running: usize,
    pub assigned_default: usize,
    pub skipped: usize,
}

/// The queue engine: per-queue FIFO job lists behind one coarse mutex.
pub struct QueueEngine {
    store: Store,
    logger: QueueLogger,
    queues: Mutex<HashMap<String, Vec<i64>>>,
}

impl QueueEngine {
    pub fn new(store: Store, paths: PrefixPaths) -> Self {
        Self { store, logger: QueueLogger::new(paths), queues: Mutex::new(HashMap::new()) }
    }

    pub fn logger(&self) -> &QueueLogger {
        &self.logger
    }

    /// Rebuild the in-memory lists from persistence.
    ///
    /// Non-terminal jobs are walked oldest first. Jobs without a queue go to
    /// the default queue (or are skipped with a warning when none exists);
    /// interrupted Running jobs are reset to Pending with their start time
    /// and worker assignment cleared.
    pub async fn restore(&self) -> Result<RestoreSummary, QueueError> {
        let default_queue = self.store.default_queue().await?.map(|q| q.name);
        if default_queue.is_none() {
            tracing::warn!("no default queue configured, unassigned jobs will not be restored");
        }

        let mut summary = RestoreSummary::default();
        for mut job in self.store.list_non_terminal_jobs().await? {
            let queue_name = match job.queue_name.clone().filter(|q| !q.trim().is_empty()) {
                Some(name) => name,
                None => match &default_queue {
                    Some(name) => {
                        job.queue_name = Some(name.clone());
                        summary.assigned_default += 1;
                        name.clone()
                    }
                    None => {
                        tracing::warn!(job_id = job.id, "skipping job with no queue and no default");
                        summary.skipped += 1;
                        continue;
                    }
                },
            };

            if job.status == JobStatus::Running {
                job.status = JobStatus::Pending;
                job.started_at = None;
                job.assigned_worker_name = None;
                summary.reset_from_running += 1;
                tracing::info!(job_id = job.id, "reset interrupted job to Pending");
            }
            self.store.persist_job(&job).await?;

            let mut queues = self.queues.lock();
            let list = queues.entry(queue_name).or_default();
            if !list.contains(&job.id) {
                list.push(job.id);
                summary.restored += 1;
            }
        }

        tracing::info!(
            restored = summary.restored,
            reset = summary.reset_from_running,
            "queue restore complete"
        );
        Ok(summary)
    }

    /// Add a job to a queue's in-memory list.
    ///
    /// The queue is looked up case-insensitively and must be started; the
    /// returned string is the stored canonical name. Duplicate ids are
    /// ignored.
    pub async fn add_job(&self, queue_name: &str, job_id: i64) -> Result<String, QueueError> {
        let queue = self
            .store
            .get_queue_by_name(queue_name)
            .await?
            .ok_or_else(|| QueueError::UnknownQueue(queue_name.to_string()))?;

        if !queue.state.accepts_jobs() {
            return Err(QueueError::NotAccepting { queue: queue.name, state: queue.state });
        }
        if self.store.get_job(job_id).await?.is_none() {
            return Err(QueueError::UnknownJob(job_id));
        }

        let message = {
            let mut queues = self.queues.lock();
            let list = queues.entry(queue.name.clone()).or_default();
            if list.contains(&job_id) {
                format!("Job {job_id} already in queue {}", queue.name)
            } else {
                list.push(job_id);
                format!("Job {job_id} added")
            }
        };
        tracing::info!(queue = %queue.name, job_id, "{message}");
        self.logger.append(&queue.name, &message);
        Ok(queue.name)
    }

    /// Pop the head job (FIFO).
    pub fn next_job(&self, queue_name: &str) -> Option<i64> {
        let mut queues = self.queues.lock();
        let list = queues.get_mut(queue_name)?;
        if list.is_empty() {
            None
        } else {
            Some(list.remove(0))
        }
    }

    /// Put a job back after a temporary dispatch failure. Requeues at the
    /// tail so one stuck job cannot starve the rest of the queue.
    pub fn requeue(&self, queue_name: &str, job_id: i64) {
        let mut queues = self.queues.lock();
        let list = queues.entry(queue_name.to_string()).or_default();
        if !list.contains(&job_id) {
            list.push(job_id);
        }
    }

    /// Remove a job wherever it sits in the named queue.
    pub fn remove_job(&self, queue_name: &str, job_id: i64) -> bool {
        let mut queues = self.queues.lock();
        if let Some(list) = queues.get_mut(queue_name) {
            if let Some(pos) = list.iter().position(|&id| id == job_id) {
                list.remove(pos);
                self.logger.append(queue_name, &format!("Job {job_id} removed from queue"));
                return true;
            }
        }
        false
    }

    pub fn queue_jobs(&self, queue_name: &str) -> Vec<i64> {
        self.queues.lock().get(queue_name).cloned().unwrap_or_default()
    }

    pub fn queue_size(&self, queue_name: &str) -> usize {
        self.queues.lock().get(queue_name).map_or(0, |l| l.len())
    }

    /// Snapshot of every non-empty queue.
    pub fn all_queue_jobs(&self) -> HashMap<String, Vec<i64>> {
        self.queues
            .lock()
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(name, list)| (name.clone(), list.clone()))
            .collect()
    }

    pub fn clear(&self, queue_name: &str) -> usize {
        let mut queues = self.queues.lock();
        match queues.get_mut(queue_name) {
            Some(list) => {
                let count = list.len();
                list.clear();
                count
            }
            None => 0,
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
