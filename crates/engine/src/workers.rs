// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker lifecycle: record management, starting and stopping agent
//! processes (local subprocesses and remote hosts over SSH), and shutdown.

use fm_core::{PrefixPaths, WorkerState, WorkerStatus, WorkerType};
use fm_store::{NewWorker, Store, StoreError, WorkerRecord};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::os::unix::process::CommandExt;
use std::sync::Arc;
use std::time::Duration;

use crate::client::WorkerClient;
use crate::provision::{self, DeploymentTracker};

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("worker {0} not found")]
    NotFound(i64),
    #[error("{0}")]
    Validation(String),
    #[error("SSH error: {0}")]
    Ssh(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result of a create call: a plain record, or a background deployment
/// whose progress is polled by id.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CreateOutcome {
    Created(WorkerRecord),
    Deploying { deployment_id: String, message: String },
}

/// Worker counters for the statistics endpoint.
#[derive(Debug, Serialize)]
pub struct WorkerStatistics {
    pub total_workers: usize,
    pub online_count: usize,
    pub offline_count: usize,
    pub provisioning_count: usize,
    pub error_count: usize,
    pub local_workers: usize,
    pub remote_workers: usize,
    pub availability_rate: f64,
}

struct LocalChild {
    pid: u32,
    child: std::process::Child,
}

/// Owns worker records and their agent processes.
pub struct WorkerManager {
    store: Store,
    paths: PrefixPaths,
    client: WorkerClient,
    backend_url: String,
    agent_command: String,
    children: Mutex<HashMap<i64, LocalChild>>,
    deployments: DeploymentTracker,
}

impl WorkerManager {
    pub fn new(store: Store, paths: PrefixPaths, client: WorkerClient, backend_url: String) -> Self {
        Self {
            store,
            paths,
            client,
            backend_url,
            agent_command: "fm-agent".to_string(),
            children: Mutex::new(HashMap::new()),
            deployments: DeploymentTracker::new(),
        }
    }

    /// Override the agent executable used for local workers.
    pub fn with_agent_command(mut self, command: impl Into<String>) -> Self {
        self.agent_command = command.into();
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn paths(&self) -> &PrefixPaths {
        &self.paths
    }

    pub fn client(&self) -> &WorkerClient {
        &self.client
    }

    pub fn deployments(&self) -> &DeploymentTracker {
        &self.deployments
    }

    /// Create a worker record. Remote workers with `provision=true` and
    /// complete connection parameters instead start an asynchronous
    /// deployment; the record is persisted when the deployment succeeds.
    pub async fn create(self: &Arc<Self>, mut new: NewWorker) -> Result<CreateOutcome, WorkerError> {
        if new.log_file_path.is_none() {
            new.log_file_path = Some(self.paths.worker_log(&new.name).display().to_string());
        }

        let provisionable = new.provision
            && new.worker_type == WorkerType::Remote
            && new.hostname.as_deref().or(new.ip_address.as_deref()).is_some()
            && new.ssh_user.is_some()
            && new.password.is_some();

        if !provisionable {
            let record = self.store.create_worker(&new).await?;
            tracing::info!(worker = %record.name, worker_type = %record.worker_type, "worker created");
            return Ok(CreateOutcome::Created(record));
        }

        let deployment_id = self.deployments.start(&new.name);
        let manager = self.clone();
        let id = deployment_id.clone();
        tokio::spawn(async move {
            provision::run_deployment(manager, id, new).await;
        });

        Ok(CreateOutcome::Deploying {
            message: "Worker deployment started".to_string(),
            deployment_id,
        })
    }

    /// Start a worker's agent. A failed start leaves `state=failed` until
    /// the next explicit start.
    pub async fn start_worker(&self, id: i64) -> Result<WorkerRecord, WorkerError> {
        let worker = self.store.get_worker(id).await?.ok_or(WorkerError::NotFound(id))?;

        let started = match worker.worker_type {
            WorkerType::Local => self.start_local(&worker).await,
            WorkerType::Remote => self.start_remote(&worker).await,
        };

        match started {
            Ok(()) => {
                self.store.set_worker_state(id, WorkerState::Started).await?;
                tracing::info!(worker = %worker.name, "worker started");
            }
            Err(ref e) => {
                self.store.set_worker_state(id, WorkerState::Failed).await?;
                self.store
                    .set_worker_status(id, WorkerStatus::Offline, Some(&e.to_string()))
                    .await?;
                tracing::error!(worker = %worker.name, error = %e, "worker start failed");
            }
        }
        started?;
        self.store.get_worker(id).await?.ok_or(WorkerError::NotFound(id))
    }

    /// Launch the agent as a local subprocess in its own process group,
    /// with stdout+stderr merged into the worker's log file.
    async fn start_local(&self, worker: &WorkerRecord) -> Result<(), WorkerError> {
        if let Some(existing) = self.children.lock().get_mut(&worker.id) {
            if existing.child.try_wait()?.is_none() {
                tracing::warn!(worker = %worker.name, pid = existing.pid, "agent already running");
                return Ok(());
            }
        }
        self.children.lock().remove(&worker.id);

        let log_path = worker
            .log_file_path
            .clone()
            .unwrap_or_else(|| self.paths.worker_log(&worker.name).display().to_string());
        if let Some(parent) = std::path::Path::new(&log_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let log_file = std::fs::OpenOptions::new().create(true).append(true).open(&log_path)?;
        let log_err = log_file.try_clone()?;

        let mut command = std::process::Command::new(&self.agent_command);
        command
            .arg("--backend-url")
            .arg(&self.backend_url)
            .arg("--worker-name")
            .arg(&worker.name)
            .arg("--port")
            .arg(worker.port.to_string())
            .arg("--max-jobs")
            .arg(worker.max_jobs.to_string())
            .current_dir(self.paths.prefix())
            .stdin(std::process::Stdio::null())
            .stdout(log_file)
            .stderr(log_err)
            .process_group(0);

        if let Ok(secret) = std::fs::read_to_string(self.paths.broker_secret()) {
            let secret = secret.trim();
            if !secret.is_empty() {
                command.env("REDIS_PASSWORD", secret);
            }
        }

        let mut child = command
            .spawn()
            .map_err(|e| WorkerError::Validation(format!("failed to spawn agent: {e}")))?;
        let pid = child.id();

        // Give the process a beat to fail fast on bad arguments or a taken
        // port before declaring it alive.
        tokio::time::sleep(Duration::from_millis(500)).await;
        if let Some(status) = child.try_wait()? {
            return Err(WorkerError::Validation(format!(
                "agent exited immediately with {status}"
            )));
        }

        tracing::info!(worker = %worker.name, pid, port = worker.port, "local agent running");
        self.children.lock().insert(worker.id, LocalChild { pid, child });
        Ok(())
    }

    /// Start the agent on a remote host over SSH with the stored key.
    async fn start_remote(&self, worker: &WorkerRecord) -> Result<(), WorkerError> {
        let secret = std::fs::read_to_string(self.paths.broker_secret())
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        provision::start_remote_agent(&self.paths, worker, &self.backend_url, &secret).await
    }

    /// Stop a worker's agent and set `state=stopped`.
    pub async fn stop_worker(&self, id: i64) -> Result<WorkerRecord, WorkerError> {
        let worker = self.store.get_worker(id).await?.ok_or(WorkerError::NotFound(id))?;

        match worker.worker_type {
            WorkerType::Local => {
                let removed = self.children.lock().remove(&id);
                if let Some(local) = removed {
                    let name = worker.name.clone();
                    tokio::task::spawn_blocking(move || stop_process_group(local))
                        .await
                        .map_err(|e| WorkerError::Validation(e.to_string()))?;
                    tracing::info!(worker = %name, "local agent terminated");
                }
            }
            WorkerType::Remote => {
                if let Err(e) = provision::stop_remote_agent(&self.paths, &worker).await {
                    tracing::error!(worker = %worker.name, error = %e, "remote stop failed");
                }
            }
        }

        self.store.set_worker_state(id, WorkerState::Stopped).await?;
        self.store.get_worker(id).await?.ok_or(WorkerError::NotFound(id))
    }

    /// Pause leaves the agent running and reachable; only the dispatch
    /// eligibility flag flips.
    pub async fn pause_worker(&self, id: i64) -> Result<WorkerRecord, WorkerError> {
        let worker = self.store.get_worker(id).await?.ok_or(WorkerError::NotFound(id))?;
        self.store.set_worker_state(id, WorkerState::Paused).await?;
        tracing::info!(worker = %worker.name, "worker paused");
        self.store.get_worker(id).await?.ok_or(WorkerError::NotFound(id))
    }

    /// Resume returns the worker to started; the health monitor recomputes
    /// reachability on its next pass.
    pub async fn resume_worker(&self, id: i64) -> Result<WorkerRecord, WorkerError> {
        let worker = self.store.get_worker(id).await?.ok_or(WorkerError::NotFound(id))?;
        if worker.state != WorkerState::Paused {
            tracing::warn!(worker = %worker.name, state = %worker.state, "worker is not paused");
            return Ok(worker);
        }
        self.store.set_worker_state(id, WorkerState::Started).await?;
        self.store.set_worker_status(id, WorkerStatus::Offline, None).await?;
        tracing::info!(worker = %worker.name, "worker resumed");
        self.store.get_worker(id).await?.ok_or(WorkerError::NotFound(id))
    }

    /// Delete a worker record, tearing down remote installations and
    /// generated SSH keys. The System worker is refused by the store.
    pub async fn delete_worker(&self, id: i64) -> Result<bool, WorkerError> {
        let Some(worker) = self.store.get_worker(id).await? else {
            return Ok(false);
        };
        if worker.name == fm_store::SYSTEM_WORKER {
            return Err(WorkerError::Validation("Cannot delete System worker".to_string()));
        }

        let removed = self.children.lock().remove(&id);
        if let Some(local) = removed {
            tokio::task::spawn_blocking(move || stop_process_group(local))
                .await
                .map_err(|e| WorkerError::Validation(e.to_string()))?;
        }
        if worker.worker_type == WorkerType::Remote {
            if let Err(e) = provision::teardown_remote(&self.paths, &worker).await {
                tracing::error!(worker = %worker.name, error = %e, "remote cleanup failed");
            }
        }

        self.store.delete_worker(id).await?;
        tracing::info!(worker = %worker.name, "worker deleted");
        Ok(true)
    }

    /// Push a live capacity change to a running agent.
    pub async fn push_config(&self, id: i64, max_jobs: i64) -> Result<(), WorkerError> {
        let worker = self.store.get_worker(id).await?.ok_or(WorkerError::NotFound(id))?;
        if worker.status == WorkerStatus::Online {
            if let Err(e) = self.client.update_config(&worker, max_jobs.max(1) as usize).await {
                tracing::warn!(worker = %worker.name, error = %e, "config push failed");
            }
        }
        Ok(())
    }

    pub async fn statistics(&self) -> Result<WorkerStatistics, WorkerError> {
        let workers = self.store.list_workers().await?;
        let total = workers.len();
        let count_status =
            |status: WorkerStatus| workers.iter().filter(|w| w.status == status).count();
        let online = count_status(WorkerStatus::Online);
        Ok(WorkerStatistics {
            total_workers: total,
            online_count: online,
            offline_count: count_status(WorkerStatus::Offline),
            provisioning_count: count_status(WorkerStatus::Provisioning),
            error_count: count_status(WorkerStatus::Error),
            local_workers: workers.iter().filter(|w| w.worker_type == WorkerType::Local).count(),
            remote_workers: workers.iter().filter(|w| w.worker_type == WorkerType::Remote).count(),
            availability_rate: if total > 0 { online as f64 / total as f64 * 100.0 } else { 0.0 },
        })
    }

    /// Start every worker at daemon startup; individual failures are
    /// recorded on the worker and do not stop the rest.
    pub async fn start_all(&self) {
        let workers = match self.store.list_workers().await {
            Ok(workers) => workers,
            Err(e) => {
                tracing::warn!(error = %e, "could not list workers at startup");
                return;
            }
        };
        for worker in workers {
            if let Err(e) = self.start_worker(worker.id).await {
                tracing::error!(worker = %worker.name, error = %e, "startup worker start failed");
            }
        }
    }

    /// True when a tracked child exists for the worker; used by the health
    /// monitor.
    pub(crate) fn tracked_child_exited(&self, worker_id: i64) -> Option<bool> {
        let mut children = self.children.lock();
        let local = children.get_mut(&worker_id)?;
        match local.child.try_wait() {
            Ok(Some(status)) => {
                tracing::warn!(worker_id, pid = local.pid, %status, "agent process exited");
                children.remove(&worker_id);
                Some(true)
            }
            Ok(None) => Some(false),
            Err(e) => {
                tracing::warn!(worker_id, error = %e, "could not poll agent process");
                Some(false)
            }
        }
    }

    /// Terminate every tracked agent process: SIGTERM to the group, a grace
    /// period, then SIGKILL.
    pub fn shutdown(&self) {
        let children: Vec<(i64, LocalChild)> = self.children.lock().drain().collect();
        if !children.is_empty() {
            tracing::info!(count = children.len(), "terminating agent processes");
        }
        for (_, local) in children {
            stop_process_group(local);
        }
    }
}

/// SIGTERM the process group, wait up to 5 s, then SIGKILL the group.
fn stop_process_group(mut local: LocalChild) {
    let pgid = Pid::from_raw(local.pid as i32);
    if let Err(e) = killpg(pgid, Signal::SIGTERM) {
        tracing::debug!(pid = local.pid, error = %e, "SIGTERM failed (process gone?)");
    }

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    loop {
        match local.child.try_wait() {
            Ok(Some(_)) => return,
            Ok(None) if std::time::Instant::now() < deadline => {
                std::thread::sleep(Duration::from_millis(100));
            }
            _ => break,
        }
    }

    tracing::warn!(pid = local.pid, "agent did not stop gracefully, killing group");
    let _ = killpg(pgid, Signal::SIGKILL);
    let _ = local.child.wait();
}

#[cfg(test)]
#[path = "workers_tests.rs"]
mod tests;
