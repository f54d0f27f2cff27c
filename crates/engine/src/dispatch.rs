// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The dispatcher loop: pick a job, pick a worker, start the execution.

use fm_core::worker::dispatch_eligible;
use fm_core::{render_command, DispatchStrategy, ExecutionId};
use fm_store::{QueueRecord, Store, WorkerRecord};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::client::WorkerClient;
use crate::jobs::JobService;
use crate::queue::QueueEngine;

/// Why a dispatch attempt did not start an execution.
///
/// Temporary failures requeue the job (at the tail); permanent ones fail it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchFailure {
    Temporary(String),
    Permanent(String),
}

const TEMPORARY_REASONS: [&str; 3] = [
    "No workers assigned",
    "No started and online workers available",
    "No workers with available capacity",
];

const PERMANENT_REASONS: [&str; 7] = [
    "rejected job",
    "exception during dispatch",
    "server error",
    "internal server error",
    "failed to start command",
    "connection refused",
    "timeout",
];

/// Classify a dispatch failure reason.
///
/// Unknown reasons default to temporary so a job is never silently lost to
/// a transient condition we failed to anticipate.
pub fn classify_failure(reason: &str) -> DispatchFailure {
    if TEMPORARY_REASONS.iter().any(|t| reason.contains(t)) {
        return DispatchFailure::Temporary(reason.to_string());
    }
    let lowered = reason.to_lowercase();
    if PERMANENT_REASONS.iter().any(|p| lowered.contains(p)) {
        return DispatchFailure::Permanent(reason.to_string());
    }
    DispatchFailure::Temporary(reason.to_string())
}

/// Pick the index of the worker to dispatch to.
///
/// `candidates` is (worker, running-count), already ordered by worker id
/// ascending — which is also the tie-break order.
pub fn select_index(
    strategy: DispatchStrategy,
    candidates: &[(WorkerRecord, i64)],
    cursor: &mut usize,
) -> usize {
    match strategy {
        DispatchStrategy::RoundRobin => {
            let index = *cursor % candidates.len();
            *cursor = cursor.wrapping_add(1);
            index
        }
        DispatchStrategy::LeastLoaded => candidates
            .iter()
            .enumerate()
            .min_by_key(|(_, (worker, running))| (*running, worker.id))
            .map(|(i, _)| i)
            .unwrap_or(0),
        DispatchStrategy::Random => fastrand::usize(0..candidates.len()),
        DispatchStrategy::Priority => 0,
    }
}

/// The dispatcher control loop.
pub struct Dispatcher {
    store: Store,
    jobs: JobService,
    queues: Arc<QueueEngine>,
    client: WorkerClient,
    cursors: Mutex<HashMap<String, usize>>,
    interval: Duration,
}

impl Dispatcher {
    pub fn new(
        store: Store,
        jobs: JobService,
        queues: Arc<QueueEngine>,
        client: WorkerClient,
        interval: Duration,
    ) -> Self {
        Self { store, jobs, queues, client, cursors: Mutex::new(HashMap::new()), interval }
    }

    /// Run until cancelled; one poll cycle per interval.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        tracing::info!("queue dispatcher started");
        loop {
            self.cycle().await;
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        tracing::info!("queue dispatcher stopped");
    }

    /// One pass over all started queues, highest priority first. Each queue
    /// drains until empty or until its first dispatch failure.
    pub async fn cycle(&self) {
        let queues = match self.store.list_started_queues().await {
            Ok(queues) => queues,
            Err(e) => {
                tracing::error!(error = %e, "failed to list started queues");
                return;
            }
        };

        for queue in queues {
            loop {
                let Some(job_id) = self.queues.next_job(&queue.name) else { break };
                match self.dispatch_one(&queue, job_id).await {
                    Ok(worker) => {
                        let message = format!("Dispatched job {job_id} to worker {worker}");
                        tracing::info!(queue = %queue.name, "{message}");
                        self.queues.logger().append(&queue.name, &message);
                    }
                    Err(DispatchFailure::Temporary(reason)) => {
                        self.queues.requeue(&queue.name, job_id);
                        let message =
                            format!("Failed to dispatch job {job_id} ({reason}) - will retry");
                        tracing::warn!(queue = %queue.name, "{message}");
                        self.queues.logger().append(&queue.name, &message);
                        if let Err(e) = self
                            .jobs
                            .append_log(
                                job_id,
                                &format!("[DISPATCH] Dispatch failed: {reason} - retrying..."),
                            )
                            .await
                        {
                            tracing::warn!(job_id, error = %e, "failed to log dispatch failure");
                        }
                        break;
                    }
                    Err(DispatchFailure::Permanent(reason)) => {
                        let error_message = format!("Job dispatch failed permanently: {reason}");
                        if let Err(e) = self.jobs.update_error(job_id, &error_message).await {
                            tracing::error!(job_id, error = %e, "failed to fail job");
                        }
                        let message =
                            format!("Job {job_id} marked as failed due to permanent dispatch error: {reason}");
                        tracing::error!(queue = %queue.name, "{message}");
                        self.queues.logger().append(&queue.name, &message);
                        break;
                    }
                }
            }
        }
    }

    /// Attempt to dispatch one job from one queue.
    async fn dispatch_one(
        &self,
        queue: &QueueRecord,
        job_id: i64,
    ) -> Result<String, DispatchFailure> {
        let workers = self.store.workers_for_queue(queue.id).await.map_err(store_failure)?;
        if workers.is_empty() {
            return Err(DispatchFailure::Temporary("No workers assigned".to_string()));
        }

        let eligible: Vec<WorkerRecord> =
            workers.into_iter().filter(|w| dispatch_eligible(w.state, w.status)).collect();
        if eligible.is_empty() {
            return Err(DispatchFailure::Temporary(
                "No started and online workers available".to_string(),
            ));
        }

        let mut candidates = Vec::new();
        for worker in eligible {
            let running =
                self.store.count_running_for_worker(&worker.name).await.map_err(store_failure)?;
            if running < worker.max_jobs {
                candidates.push((worker, running));
            }
        }
        if candidates.is_empty() {
            return Err(DispatchFailure::Temporary(
                "No workers with available capacity".to_string(),
            ));
        }

        let index = {
            let mut cursors = self.cursors.lock();
            let cursor = cursors.entry(queue.name.clone()).or_insert(0);
            select_index(queue.strategy, &candidates, cursor)
        };
        let worker = candidates[index].0.clone();

        let mut job = self
            .store
            .get_job(job_id)
            .await
            .map_err(store_failure)?
            .ok_or_else(|| DispatchFailure::Permanent("Job not found in database".to_string()))?;

        let spec = self
            .store
            .get_spec_by_name(&job.name)
            .await
            .map_err(store_failure)?
            .ok_or_else(|| DispatchFailure::Permanent(format!("Spec '{}' not found", job.name)))?;

        let rendered = render_command(&spec.command, &job.runtime_args());
        for key in &rendered.missing_keys {
            tracing::warn!(job_id, key, "template key not found in runtime args");
        }

        let execution_id = ExecutionId::new(queue.name.clone(), job_id).to_string();
        match self.client.execute(&worker, &execution_id, &rendered.command, &rendered.args).await {
            Ok(response) => {
                job.assigned_worker_name = Some(worker.name.clone());
                job.worker_name = Some(worker.name.clone());
                self.store.persist_job(&job).await.map_err(store_failure)?;
                tracing::info!(job_id, worker = %worker.name, pid = response.pid, "execution started");
                Ok(worker.name)
            }
            Err(e) => Err(classify_failure(&e.to_string())),
        }
    }
}

fn store_failure(e: fm_store::StoreError) -> DispatchFailure {
    DispatchFailure::Temporary(format!("store error during dispatch: {e}"))
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
