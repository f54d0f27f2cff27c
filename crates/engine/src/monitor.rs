// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker health monitoring.
//!
//! One pass per interval: reconcile tracked local agent processes, scan the
//! process table for untracked ones, then probe every agent's `/health`
//! endpoint. The probe only moves `status` (online/offline); operator
//! `state` is never touched here.

use fm_core::{WorkerState, WorkerStatus, WorkerType};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::workers::WorkerManager;

/// Run the monitor until cancelled.
pub async fn run_health_monitor(
    manager: Arc<WorkerManager>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    tracing::info!(interval_secs = interval.as_secs(), "worker health monitor started");
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
        health_pass(&manager).await;
    }
    tracing::info!("worker health monitor stopped");
}

/// One monitoring sweep over all workers.
pub async fn health_pass(manager: &WorkerManager) {
    let workers = match manager.store().list_workers().await {
        Ok(workers) => workers,
        Err(e) => {
            tracing::error!(error = %e, "health monitor could not list workers");
            return;
        }
    };

    for worker in workers {
        if worker.worker_type == WorkerType::Local {
            match manager.tracked_child_exited(worker.id) {
                Some(true) => {
                    // The subprocess died; reflect that and skip the probe.
                    set_stopped_offline(manager, worker.id, &worker.name).await;
                    continue;
                }
                Some(false) => {}
                None => {
                    // Nothing tracked: the agent may have been started
                    // outside this daemon. If the process table has it,
                    // probe it like any other worker; otherwise mark it
                    // down.
                    if find_agent_pid(&worker.name).is_none() {
                        if worker.state != WorkerState::Stopped
                            || worker.status != WorkerStatus::Offline
                        {
                            set_stopped_offline(manager, worker.id, &worker.name).await;
                        }
                        continue;
                    }
                    tracing::debug!(worker = %worker.name, "agent running externally");
                }
            }
        }

        let healthy = match manager.client().health(&worker).await {
            Ok(health) => health.is_healthy(),
            Err(e) => {
                tracing::debug!(worker = %worker.name, error = %e, "health probe failed");
                false
            }
        };
        let status = if healthy { WorkerStatus::Online } else { WorkerStatus::Offline };
        if worker.status != status {
            tracing::info!(worker = %worker.name, from = %worker.status, to = %status, "worker status change");
            if let Err(e) = manager.store().set_worker_status(worker.id, status, None).await {
                tracing::error!(worker = %worker.name, error = %e, "failed to update worker status");
            }
        }
    }
}

async fn set_stopped_offline(manager: &WorkerManager, worker_id: i64, name: &str) {
    let store = manager.store();
    if let Err(e) = store.set_worker_state(worker_id, WorkerState::Stopped).await {
        tracing::error!(worker = name, error = %e, "failed to update worker state");
    }
    if let Err(e) = store.set_worker_status(worker_id, WorkerStatus::Offline, None).await {
        tracing::error!(worker = name, error = %e, "failed to update worker status");
    }
}

/// Look for a running agent process carrying this worker's name.
fn find_agent_pid(worker_name: &str) -> Option<u32> {
    let output = std::process::Command::new("pgrep")
        .arg("-f")
        .arg(format!("fm-agent.*--worker-name {worker_name}"))
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .and_then(|line| line.trim().parse().ok())
}
