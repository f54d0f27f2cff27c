// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Composition root: one context owning handles to every subsystem,
//! shared by the HTTP layer and the background tasks.

use fm_core::{DispatchStrategy, PrefixPaths, QueueState};
use fm_engine::{
    Dispatcher, JobService, LogIngestor, QueueEngine, SpecRegistry, WorkerClient, WorkerManager,
};
use fm_store::{NewQueue, Store, StoreError};
use std::sync::Arc;

use crate::config::Config;

/// Shared application state. Handlers clone the `Arc`s they need.
#[derive(Clone)]
pub struct AppContext {
    pub config: Config,
    pub store: Store,
    pub jobs: JobService,
    pub specs: SpecRegistry,
    pub queues: Arc<QueueEngine>,
    pub workers: Arc<WorkerManager>,
    pub ingestor: Arc<LogIngestor>,
    pub dispatcher: Arc<Dispatcher>,
}

impl AppContext {
    /// Wire every subsystem together against an opened store.
    pub fn build(config: Config, store: Store) -> Self {
        let paths = config.paths();
        let client = WorkerClient::new();
        let jobs = JobService::new(store.clone(), paths.clone());
        let specs = SpecRegistry::new(store.clone());
        let queues = Arc::new(QueueEngine::new(store.clone(), paths.clone()));
        let workers = Arc::new(WorkerManager::new(
            store.clone(),
            paths.clone(),
            client.clone(),
            config.backend_url(),
        ));
        let ingestor = Arc::new(LogIngestor::new(
            store.clone(),
            paths,
            Arc::new(jobs.clone()),
            config.broker_port,
        ));
        let dispatcher = Arc::new(Dispatcher::new(
            store.clone(),
            jobs.clone(),
            queues.clone(),
            client,
            config.dispatch_interval,
        ));

        Self { config, store, jobs, specs, queues, workers, ingestor, dispatcher }
    }

    /// First-startup seeding: the System worker and a started default
    /// queue, so submissions without an explicit queue have a destination.
    pub async fn seed(&self, paths: &PrefixPaths) -> Result<(), StoreError> {
        let system_log = paths.worker_log(fm_store::SYSTEM_WORKER);
        self.store.ensure_system_worker(&system_log.display().to_string()).await?;

        if self.store.default_queue().await?.is_none() {
            let mut queue = NewQueue::named("default");
            queue.description = Some("Default job queue".to_string());
            queue.state = QueueState::Started;
            queue.strategy = DispatchStrategy::RoundRobin;
            queue.is_default = true;
            queue.log_file_path = Some(paths.queue_log("default").display().to_string());
            self.store.create_queue(&queue).await?;
            tracing::info!("seeded default queue");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
