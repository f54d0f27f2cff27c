// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared agent state: configuration and the execution table.

use fm_wire::ExecResult;
use parking_lot::Mutex;
use portable_pty::ChildKiller;
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Broker connection settings, resolved from environment variables with the
/// backend host as the fallback (the broker usually runs next to the
/// dispatcher).
#[derive(Debug, Clone)]
pub struct BrokerSettings {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
}

impl BrokerSettings {
    pub fn from_env(backend_url: &str) -> Self {
        let backend_host = backend_url
            .trim_start_matches("http://")
            .trim_start_matches("https://")
            .split([':', '/'])
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("localhost")
            .to_string();

        let host = std::env::var("REDIS_HOST").unwrap_or(backend_host);
        let port = std::env::var("REDIS_PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(6379);
        let password = std::env::var("REDIS_PASSWORD").ok().filter(|p| !p.is_empty());
        Self { host, port, password }
    }

    pub fn url(&self) -> String {
        match &self.password {
            Some(password) => format!("redis://:{}@{}:{}/0", password, self.host, self.port),
            None => format!("redis://{}:{}/0", self.host, self.port),
        }
    }
}

/// Static agent configuration from the CLI.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub backend_url: String,
    pub worker_name: String,
    pub host: String,
    pub port: u16,
    pub max_jobs: usize,
}

/// One tracked execution. The killer handle stays until the reader thread
/// observes the child's exit.
pub struct Execution {
    pub pid: u32,
    pub status: ExecResult,
    pub exit_code: Option<i32>,
    pub killer: Option<Box<dyn ChildKiller + Send + Sync>>,
}

/// Event sent from a PTY reader thread when its child finishes.
#[derive(Debug)]
pub enum ExecEvent {
    Exited { execution_id: String, exit_code: i32 },
}

/// Process-wide agent state shared between HTTP handlers, reader threads
/// and the completion loop.
pub struct AgentState {
    pub config: AgentConfig,
    pub broker: BrokerSettings,
    pub max_jobs: Mutex<usize>,
    pub executions: Mutex<HashMap<String, Execution>>,
    pub http: reqwest::Client,
    pub events: mpsc::UnboundedSender<ExecEvent>,
}

impl AgentState {
    pub fn new(
        config: AgentConfig,
        broker: BrokerSettings,
        events: mpsc::UnboundedSender<ExecEvent>,
    ) -> Self {
        let max_jobs = config.max_jobs;
        Self {
            config,
            broker,
            max_jobs: Mutex::new(max_jobs),
            executions: Mutex::new(HashMap::new()),
            http: reqwest::Client::new(),
            events,
        }
    }

    /// Executions currently holding a capacity slot.
    pub fn running_count(&self) -> usize {
        self.executions.lock().values().filter(|e| e.status == ExecResult::Running).count()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
