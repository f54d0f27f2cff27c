// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log ingestion: the broker, its consumer, and the per-job/per-worker
//! file writers.
//!
//! One long-lived consumer blocks on the shared `logs` list, demultiplexes
//! each element to the right append-only file and feeds in-band keywords
//! into the job sink. Writes are synchronous with an fsync per message so a
//! crash never loses an acknowledged line.

use fm_core::{parse_keywords, ExecutionId, Keyword, PrefixPaths};
use fm_store::{Store, StoreError};
use fm_wire::{LogEnvelope, ProtocolError};
use parking_lot::Mutex;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::sink::JobSink;

const MAX_CONSECUTIVE_ERRORS: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("broker error: {0}")]
    Broker(String),
}

/// The log ingestion service.
pub struct LogIngestor {
    store: Store,
    paths: PrefixPaths,
    sink: Arc<dyn JobSink>,
    broker_port: u16,
    handles: Mutex<HashMap<String, File>>,
}

impl LogIngestor {
    pub fn new(store: Store, paths: PrefixPaths, sink: Arc<dyn JobSink>, broker_port: u16) -> Self {
        Self { store, paths, sink, broker_port, handles: Mutex::new(HashMap::new()) }
    }

    /// Read the broker shared secret, generating one (0600) on first use.
    pub fn ensure_secret(&self) -> Result<Option<String>, IngestError> {
        let path = self.paths.broker_secret();
        if path.exists() {
            let secret = std::fs::read_to_string(&path)?.trim().to_string();
            return Ok(if secret.is_empty() { None } else { Some(secret) });
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let secret = uuid::Uuid::new_v4().simple().to_string();
        std::fs::write(&path, &secret)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;
        }
        tracing::info!(path = %path.display(), "generated broker secret");
        Ok(Some(secret))
    }

    fn broker_url(&self, secret: &Option<String>) -> String {
        match secret {
            Some(secret) => format!("redis://:{}@127.0.0.1:{}/0", secret, self.broker_port),
            None => format!("redis://127.0.0.1:{}/0", self.broker_port),
        }
    }

    fn ping(&self, secret: &Option<String>) -> bool {
        let Ok(client) = redis::Client::open(self.broker_url(secret)) else {
            return false;
        };
        // Loopback connects refuse instantly when nothing listens, so a
        // plain blocking connection attempt is a cheap liveness probe.
        match client.get_connection() {
            Ok(mut conn) => redis::cmd("PING").query::<String>(&mut conn).is_ok(),
            Err(_) => false,
        }
    }

    /// Start `redis-server` unless one is already answering. Bound to all
    /// interfaces so remote agents can reach it; protected by the shared
    /// secret when present.
    pub fn start_broker(&self) -> Result<(), IngestError> {
        let secret = self.ensure_secret()?;
        if self.ping(&secret) {
            tracing::info!(port = self.broker_port, "broker already running");
            return Ok(());
        }

        let mut command = std::process::Command::new("redis-server");
        command
            .arg("--bind")
            .arg("0.0.0.0")
            .arg("--port")
            .arg(self.broker_port.to_string())
            .arg("--daemonize")
            .arg("yes")
            .arg("--protected-mode")
            .arg("yes")
            .arg("--logfile")
            .arg(self.paths.broker_log())
            .arg("--pidfile")
            .arg(self.paths.broker_pidfile())
            .arg("--dir")
            .arg(self.paths.broker_data_dir());
        if let Some(secret) = &secret {
            command.arg("--requirepass").arg(secret);
        }

        let output = command.output().map_err(|e| IngestError::Broker(e.to_string()))?;
        if !output.status.success() {
            return Err(IngestError::Broker(format!(
                "redis-server failed to start: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        std::thread::sleep(Duration::from_secs(2));
        if !self.ping(&secret) {
            return Err(IngestError::Broker("broker not reachable after start".to_string()));
        }
        tracing::info!(port = self.broker_port, "started broker");
        Ok(())
    }

    /// Consume the `logs` list until cancelled.
    ///
    /// Broker errors back off exponentially (2^min(n,4) seconds); after ten
    /// consecutive errors the client is rebuilt from scratch.
    pub async fn run_consumer(self: Arc<Self>, shutdown: CancellationToken) {
        tracing::info!("log consumer started");
        let mut consecutive_errors: u32 = 0;

        'reconnect: while !shutdown.is_cancelled() {
            let secret = match self.ensure_secret() {
                Ok(secret) => secret,
                Err(e) => {
                    tracing::error!(error = %e, "cannot read broker secret");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    continue;
                }
            };
            let client = match redis::Client::open(self.broker_url(&secret)) {
                Ok(client) => client,
                Err(e) => {
                    tracing::error!(error = %e, "invalid broker settings");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    continue;
                }
            };
            let mut conn = match client.get_multiplexed_async_connection().await {
                Ok(conn) => conn,
                Err(e) => {
                    consecutive_errors += 1;
                    let backoff = 2u64.pow(consecutive_errors.min(4));
                    tracing::error!(error = %e, backoff, "broker connection failed");
                    tokio::select! {
                        _ = shutdown.cancelled() => break 'reconnect,
                        _ = tokio::time::sleep(Duration::from_secs(backoff)) => {}
                    }
                    continue;
                }
            };

            loop {
                let popped: Result<Option<(String, Vec<u8>)>, redis::RedisError> = tokio::select! {
                    _ = shutdown.cancelled() => break 'reconnect,
                    result = conn.brpop("logs", 0.0) => result,
                };
                match popped {
                    Ok(Some((_key, payload))) => {
                        consecutive_errors = 0;
                        self.handle_element(&payload).await;
                    }
                    Ok(None) => {
                        consecutive_errors = 0;
                    }
                    Err(e) => {
                        consecutive_errors += 1;
                        let backoff = 2u64.pow(consecutive_errors.min(4));
                        tracing::error!(
                            error = %e,
                            consecutive_errors,
                            backoff,
                            "broker pop failed"
                        );
                        tokio::select! {
                            _ = shutdown.cancelled() => break 'reconnect,
                            _ = tokio::time::sleep(Duration::from_secs(backoff)) => {}
                        }
                        if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                            consecutive_errors = 0;
                            continue 'reconnect;
                        }
                    }
                }
            }
        }

        self.close_all();
        tracing::info!("log consumer stopped");
    }

    /// Decode one list element and route it.
    pub async fn handle_element(&self, raw: &[u8]) {
        match LogEnvelope::decode(raw) {
            Ok(envelope) => {
                if let Some(execution_id) = envelope.execution_id.as_deref() {
                    self.ingest_job_line(execution_id, &envelope.message).await;
                } else if let Some(worker) = envelope.worker_name.as_deref() {
                    if let Err(e) = self.append_worker_line(worker, &envelope.message) {
                        tracing::error!(worker, error = %e, "failed to append worker log");
                    }
                }
            }
            Err(ProtocolError::MissingRoute) => {
                tracing::warn!("invalid log message: missing execution_id or worker_name");
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to decode log message");
            }
        }
    }

    /// Parse keywords, mutate job state through the sink, then write the
    /// line to the job's log file.
    pub async fn ingest_job_line(&self, execution_id: &str, line: &str) {
        match execution_id.parse::<ExecutionId>() {
            Ok(id) => {
                for keyword in parse_keywords(line) {
                    match keyword {
                        Keyword::Progress(percent) => self.sink.progress(id.job_id(), percent).await,
                        Keyword::Result(value) => self.sink.result(id.job_id(), value).await,
                        Keyword::Error(value) => {
                            self.sink.error(id.job_id(), value.error_message()).await
                        }
                    }
                }
            }
            Err(e) => tracing::warn!(execution_id, error = %e, "unparseable execution id"),
        }

        if let Err(e) = self.append_job_line(execution_id, line).await {
            tracing::error!(execution_id, error = %e, "failed to append job log");
        }
    }

    /// Append one line (agent-stamped) to the job's log file through the
    /// cached handle, fsyncing afterwards.
    async fn append_job_line(&self, execution_id: &str, line: &str) -> Result<(), IngestError> {
        if !self.handles.lock().contains_key(execution_id) {
            let path = self.job_log_path(execution_id).await?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new().create(true).append(true).open(&path)?;
            tracing::info!(execution_id, path = %path.display(), "opened job log");
            self.handles.lock().entry(execution_id.to_string()).or_insert(file);
        }

        let mut handles = self.handles.lock();
        if let Some(file) = handles.get_mut(execution_id) {
            writeln!(file, "{line}")?;
            file.flush()?;
            file.sync_all()?;
        }
        Ok(())
    }

    /// Worker self-log lines get a local timestamp prefix; the cache key is
    /// namespaced so a worker named like an execution id cannot collide.
    fn append_worker_line(&self, worker_name: &str, line: &str) -> Result<(), IngestError> {
        let key = format!("worker:{worker_name}");
        if !self.handles.lock().contains_key(&key) {
            let path = self.paths.worker_log(worker_name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new().create(true).append(true).open(&path)?;
            self.handles.lock().entry(key.clone()).or_insert(file);
        }

        let mut handles = self.handles.lock();
        if let Some(file) = handles.get_mut(&key) {
            writeln!(file, "[{}] {}", fm_core::format_local_stamp(), line)?;
            file.flush()?;
            file.sync_all()?;
        }
        Ok(())
    }

    /// Flush and drop the cached handle for an execution. Closing an
    /// unknown or already-closed handle is a no-op; the next append
    /// reopens transparently.
    pub fn close_log(&self, execution_id: &str) {
        let mut handles = self.handles.lock();
        match handles.remove(execution_id) {
            Some(file) => {
                drop(file);
                tracing::info!(execution_id, "closed job log");
            }
            None => {
                tracing::debug!(execution_id, "no cached log handle to close");
            }
        }
    }

    fn close_all(&self) {
        self.handles.lock().clear();
    }

    async fn job_log_path(&self, execution_id: &str) -> Result<PathBuf, IngestError> {
        let id: ExecutionId = execution_id
            .parse()
            .map_err(|e: fm_core::ExecutionIdError| IngestError::Broker(e.to_string()))?;
        match self.store.get_job(id.job_id()).await? {
            Some(job) => Ok(job
                .log_file_path
                .map(PathBuf::from)
                .unwrap_or_else(|| self.paths.job_log(id.job_id()))),
            None => Ok(self.paths.job_log(id.job_id())),
        }
    }
}

#[cfg(test)]
#[path = "ingest_tests.rs"]
mod tests;
