// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker row operations.

use chrono::Utc;
use fm_core::{AuthMethod, WorkerState, WorkerStatus, WorkerType};

use crate::records::WorkerRecord;
use crate::{Store, StoreError};

/// Name of the built-in local worker seeded at first startup. It can never
/// be deleted.
pub const SYSTEM_WORKER: &str = "System";

/// Parameters for creating a worker.
#[derive(Debug, Clone)]
pub struct NewWorker {
    pub name: String,
    pub worker_type: WorkerType,
    pub hostname: Option<String>,
    pub ip_address: Option<String>,
    /// Defaults to `8500 + next id` when absent.
    pub port: Option<i64>,
    pub ssh_user: Option<String>,
    pub auth_method: AuthMethod,
    pub ssh_private_key: Option<String>,
    pub password: Option<String>,
    pub provision: bool,
    pub max_jobs: i64,
    pub log_file_path: Option<String>,
}

impl NewWorker {
    pub fn named(name: impl Into<String>, worker_type: WorkerType) -> Self {
        Self {
            name: name.into(),
            worker_type,
            hostname: None,
            ip_address: None,
            port: None,
            ssh_user: None,
            auth_method: AuthMethod::Key,
            ssh_private_key: None,
            password: None,
            provision: false,
            max_jobs: 10,
            log_file_path: None,
        }
    }
}

impl Store {
    pub async fn create_worker(&self, new: &NewWorker) -> Result<WorkerRecord, StoreError> {
        if new.max_jobs < 1 {
            return Err(StoreError::InvalidValue("max_jobs must be at least 1".to_string()));
        }
        if self.get_worker_by_name(&new.name).await?.is_some() {
            return Err(StoreError::Duplicate(format!(
                "Worker with name '{}' already exists",
                new.name
            )));
        }

        let port = match new.port {
            Some(port) => port,
            None => {
                let row = sqlx::query("SELECT COALESCE(MAX(id), 0) AS max_id FROM workers")
                    .fetch_one(self.pool())
                    .await?;
                let max_id: i64 = sqlx::Row::try_get(&row, "max_id")?;
                8500 + max_id + 1
            }
        };

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO workers
                (name, worker_type, hostname, ip_address, port, ssh_user, auth_method,
                 ssh_private_key, password, provision, max_jobs, log_file_path,
                 status, state, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'offline', 'stopped', ?, ?)
            "#,
        )
        .bind(&new.name)
        .bind(new.worker_type.to_string())
        .bind(&new.hostname)
        .bind(&new.ip_address)
        .bind(port)
        .bind(&new.ssh_user)
        .bind(new.auth_method.to_string())
        .bind(&new.ssh_private_key)
        .bind(&new.password)
        .bind(new.provision)
        .bind(new.max_jobs)
        .bind(&new.log_file_path)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        let id = result.last_insert_rowid();
        self.get_worker(id)
            .await?
            .ok_or_else(|| StoreError::NotFound("worker", id.to_string()))
    }

    pub async fn get_worker(&self, id: i64) -> Result<Option<WorkerRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM workers WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(WorkerRecord::from_row).transpose()
    }

    pub async fn get_worker_by_name(&self, name: &str) -> Result<Option<WorkerRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM workers WHERE name = ?")
            .bind(name)
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(WorkerRecord::from_row).transpose()
    }

    pub async fn list_workers(&self) -> Result<Vec<WorkerRecord>, StoreError> {
        let rows =
            sqlx::query("SELECT * FROM workers ORDER BY id ASC").fetch_all(self.pool()).await?;
        rows.iter().map(WorkerRecord::from_row).collect()
    }

    /// Write back every mutable column of a loaded worker row.
    pub async fn persist_worker(&self, worker: &WorkerRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE workers SET
                name = ?, worker_type = ?, hostname = ?, ip_address = ?, port = ?,
                ssh_user = ?, auth_method = ?, ssh_private_key = ?, password = ?,
                provision = ?, max_jobs = ?, log_file_path = ?, status = ?, state = ?,
                last_seen = ?, error_message = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&worker.name)
        .bind(worker.worker_type.to_string())
        .bind(&worker.hostname)
        .bind(&worker.ip_address)
        .bind(worker.port)
        .bind(&worker.ssh_user)
        .bind(worker.auth_method.to_string())
        .bind(&worker.ssh_private_key)
        .bind(&worker.password)
        .bind(worker.provision)
        .bind(worker.max_jobs)
        .bind(&worker.log_file_path)
        .bind(worker.status.to_string())
        .bind(worker.state.to_string())
        .bind(worker.last_seen)
        .bind(&worker.error_message)
        .bind(Utc::now())
        .bind(worker.id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn set_worker_status(
        &self,
        id: i64,
        status: WorkerStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        let now = Utc::now();
        match error_message {
            Some(msg) => {
                sqlx::query(
                    "UPDATE workers SET status = ?, error_message = ?, last_seen = ?, updated_at = ? WHERE id = ?",
                )
                .bind(status.to_string())
                .bind(msg)
                .bind(now)
                .bind(now)
                .bind(id)
                .execute(self.pool())
                .await?;
            }
            None => {
                sqlx::query(
                    "UPDATE workers SET status = ?, last_seen = ?, updated_at = ? WHERE id = ?",
                )
                .bind(status.to_string())
                .bind(now)
                .bind(now)
                .bind(id)
                .execute(self.pool())
                .await?;
            }
        }
        Ok(())
    }

    pub async fn set_worker_state(&self, id: i64, state: WorkerState) -> Result<(), StoreError> {
        sqlx::query("UPDATE workers SET state = ?, updated_at = ? WHERE id = ?")
            .bind(state.to_string())
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Delete a worker row; assignments cascade. The System worker is
    /// protected.
    pub async fn delete_worker(&self, id: i64) -> Result<Option<WorkerRecord>, StoreError> {
        let Some(worker) = self.get_worker(id).await? else {
            return Ok(None);
        };
        if worker.name == SYSTEM_WORKER {
            return Err(StoreError::Protected("Cannot delete System worker".to_string()));
        }
        sqlx::query("DELETE FROM workers WHERE id = ?").bind(id).execute(self.pool()).await?;
        Ok(Some(worker))
    }

    /// Seed the built-in System worker when missing. Fixed at 4 slots.
    pub async fn ensure_system_worker(
        &self,
        log_file_path: &str,
    ) -> Result<WorkerRecord, StoreError> {
        if let Some(existing) = self.get_worker_by_name(SYSTEM_WORKER).await? {
            return Ok(existing);
        }
        let mut new = NewWorker::named(SYSTEM_WORKER, WorkerType::Local);
        new.hostname = Some("localhost".to_string());
        new.ip_address = Some("127.0.0.1".to_string());
        new.max_jobs = 4;
        new.log_file_path = Some(log_file_path.to_string());
        self.create_worker(&new).await
    }
}

#[cfg(test)]
#[path = "workers_tests.rs"]
mod tests;
