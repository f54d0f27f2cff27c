// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem layout under the foreman prefix.
//!
//! ```text
//! <prefix>/
//!   etc/.redis_password        broker shared secret
//!   etc/ssh_keys/<h>-<u>.id    worker SSH private key
//!   etc/ssh_keys/<h>-<u>.pub   worker SSH public key
//!   lib/foreman.db             SQLite store
//!   logs/jobs/<id>.log         per-job log
//!   logs/workers/<name>.log    per-worker log
//!   logs/queues/<name>.log     per-queue log
//!   logs/redis.log             broker server log
//!   tmp/redis.pid              broker pidfile
//!   tmp/fmd.lock               daemon instance lock
//! ```

use std::path::{Path, PathBuf};

/// Resolved filesystem layout rooted at the prefix directory.
#[derive(Debug, Clone)]
pub struct PrefixPaths {
    prefix: PathBuf,
}

impl PrefixPaths {
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        Self { prefix: prefix.into() }
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    pub fn database(&self) -> PathBuf {
        self.prefix.join("lib").join("foreman.db")
    }

    pub fn broker_secret(&self) -> PathBuf {
        self.prefix.join("etc").join(".redis_password")
    }

    pub fn ssh_keys_dir(&self) -> PathBuf {
        self.prefix.join("etc").join("ssh_keys")
    }

    /// Key file stem: the short hostname (before the first dot) plus the
    /// SSH user, `web01-deploy`.
    pub fn ssh_key_id(hostname: &str, ssh_user: &str) -> String {
        let short = hostname.split('.').next().filter(|s| !s.is_empty()).unwrap_or("unknown");
        format!("{short}-{ssh_user}")
    }

    pub fn ssh_private_key(&self, hostname: &str, ssh_user: &str) -> PathBuf {
        self.ssh_keys_dir().join(format!("{}.id", Self::ssh_key_id(hostname, ssh_user)))
    }

    pub fn ssh_public_key(&self, hostname: &str, ssh_user: &str) -> PathBuf {
        self.ssh_keys_dir().join(format!("{}.pub", Self::ssh_key_id(hostname, ssh_user)))
    }

    pub fn job_logs_dir(&self) -> PathBuf {
        self.prefix.join("logs").join("jobs")
    }

    pub fn job_log(&self, job_id: i64) -> PathBuf {
        self.job_logs_dir().join(format!("{job_id}.log"))
    }

    pub fn worker_logs_dir(&self) -> PathBuf {
        self.prefix.join("logs").join("workers")
    }

    pub fn worker_log(&self, worker_name: &str) -> PathBuf {
        self.worker_logs_dir().join(format!("{}.log", worker_name.to_lowercase()))
    }

    pub fn queue_logs_dir(&self) -> PathBuf {
        self.prefix.join("logs").join("queues")
    }

    pub fn queue_log(&self, queue_name: &str) -> PathBuf {
        self.queue_logs_dir().join(format!("{}.log", queue_name.to_lowercase()))
    }

    pub fn broker_log(&self) -> PathBuf {
        self.prefix.join("logs").join("redis.log")
    }

    pub fn broker_pidfile(&self) -> PathBuf {
        self.prefix.join("tmp").join("redis.pid")
    }

    pub fn broker_data_dir(&self) -> PathBuf {
        self.prefix.join("data")
    }

    pub fn daemon_lock(&self) -> PathBuf {
        self.prefix.join("tmp").join("fmd.lock")
    }

    /// Create every directory the daemon writes into.
    pub fn ensure_layout(&self) -> std::io::Result<()> {
        for dir in [
            self.prefix.join("etc"),
            self.ssh_keys_dir(),
            self.prefix.join("lib"),
            self.job_logs_dir(),
            self.worker_logs_dir(),
            self.queue_logs_dir(),
            self.prefix.join("tmp"),
            self.broker_data_dir(),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
