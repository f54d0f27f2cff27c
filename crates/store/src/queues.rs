// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue row operations.

use chrono::Utc;
use fm_core::{DispatchStrategy, QueuePriority, QueueState};

use crate::records::QueueRecord;
use crate::{Store, StoreError};

/// Parameters for creating a queue.
#[derive(Debug, Clone)]
pub struct NewQueue {
    pub name: String,
    pub description: Option<String>,
    pub state: QueueState,
    pub time_limit: i64,
    pub priority: QueuePriority,
    pub strategy: DispatchStrategy,
    pub is_default: bool,
    pub log_file_path: Option<String>,
}

impl NewQueue {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            state: QueueState::Stopped,
            time_limit: 1200,
            priority: QueuePriority::Normal,
            strategy: DispatchStrategy::RoundRobin,
            is_default: false,
            log_file_path: None,
        }
    }
}

/// Field updates for an existing queue; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct QueueUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub state: Option<QueueState>,
    pub time_limit: Option<i64>,
    pub priority: Option<QueuePriority>,
    pub strategy: Option<DispatchStrategy>,
    pub is_default: Option<bool>,
}

impl Store {
    pub async fn create_queue(&self, new: &NewQueue) -> Result<QueueRecord, StoreError> {
        if self.get_queue_by_name(&new.name).await?.is_some() {
            return Err(StoreError::Duplicate(format!(
                "Queue with name '{}' already exists",
                new.name
            )));
        }

        let now = Utc::now();
        let mut tx = self.pool().begin().await?;
        if new.is_default {
            sqlx::query("UPDATE queues SET is_default = 0").execute(&mut *tx).await?;
        }
        let result = sqlx::query(
            r#"
            INSERT INTO queues
                (name, state, time_limit, priority, strategy, description,
                 log_file_path, is_default, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new.name)
        .bind(new.state.to_string())
        .bind(new.time_limit)
        .bind(new.priority.to_string())
        .bind(new.strategy.to_string())
        .bind(&new.description)
        .bind(&new.log_file_path)
        .bind(new.is_default)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        let id = result.last_insert_rowid();
        tx.commit().await?;

        self.get_queue(id)
            .await?
            .ok_or_else(|| StoreError::NotFound("queue", id.to_string()))
    }

    pub async fn get_queue(&self, id: i64) -> Result<Option<QueueRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM queues WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(QueueRecord::from_row).transpose()
    }

    /// Name lookup is case-insensitive (column collation); the returned
    /// record carries the stored canonical name.
    pub async fn get_queue_by_name(&self, name: &str) -> Result<Option<QueueRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM queues WHERE name = ?")
            .bind(name)
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(QueueRecord::from_row).transpose()
    }

    pub async fn default_queue(&self) -> Result<Option<QueueRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM queues WHERE is_default = 1 LIMIT 1")
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(QueueRecord::from_row).transpose()
    }

    pub async fn list_queues(&self) -> Result<Vec<QueueRecord>, StoreError> {
        let rows = sqlx::query("SELECT * FROM queues ORDER BY created_at DESC")
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(QueueRecord::from_row).collect()
    }

    /// Queues eligible for dispatch, highest priority first.
    pub async fn list_started_queues(&self) -> Result<Vec<QueueRecord>, StoreError> {
        let mut queues: Vec<QueueRecord> = sqlx::query("SELECT * FROM queues WHERE state = 'started'")
            .fetch_all(self.pool())
            .await?
            .iter()
            .map(QueueRecord::from_row)
            .collect::<Result<_, _>>()?;
        queues.sort_by_key(|q| (q.priority.rank(), q.id));
        Ok(queues)
    }

    pub async fn update_queue(
        &self,
        id: i64,
        update: &QueueUpdate,
    ) -> Result<Option<QueueRecord>, StoreError> {
        let Some(mut queue) = self.get_queue(id).await? else {
            return Ok(None);
        };

        if let Some(name) = &update.name {
            if !name.eq_ignore_ascii_case(&queue.name) {
                if self.get_queue_by_name(name).await?.is_some() {
                    return Err(StoreError::Duplicate(format!(
                        "Queue with name '{name}' already exists"
                    )));
                }
            }
            queue.name = name.clone();
        }
        if let Some(description) = &update.description {
            queue.description = Some(description.clone());
        }
        if let Some(state) = update.state {
            queue.state = state;
        }
        if let Some(time_limit) = update.time_limit {
            queue.time_limit = time_limit;
        }
        if let Some(priority) = update.priority {
            queue.priority = priority;
        }
        if let Some(strategy) = update.strategy {
            queue.strategy = strategy;
        }
        if let Some(is_default) = update.is_default {
            queue.is_default = is_default;
        }

        let mut tx = self.pool().begin().await?;
        if update.is_default == Some(true) {
            sqlx::query("UPDATE queues SET is_default = 0 WHERE id != ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query(
            r#"
            UPDATE queues SET
                name = ?, state = ?, time_limit = ?, priority = ?, strategy = ?,
                description = ?, is_default = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&queue.name)
        .bind(queue.state.to_string())
        .bind(queue.time_limit)
        .bind(queue.priority.to_string())
        .bind(queue.strategy.to_string())
        .bind(&queue.description)
        .bind(queue.is_default)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        self.get_queue(id).await
    }

    pub async fn set_queue_state(
        &self,
        id: i64,
        state: QueueState,
    ) -> Result<Option<QueueRecord>, StoreError> {
        let result = sqlx::query("UPDATE queues SET state = ?, updated_at = ? WHERE id = ?")
            .bind(state.to_string())
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_queue(id).await
    }

    /// Hard delete; assignment rows cascade. The default queue is protected.
    pub async fn delete_queue(&self, id: i64) -> Result<bool, StoreError> {
        let Some(queue) = self.get_queue(id).await? else {
            return Ok(false);
        };
        if queue.is_default {
            return Err(StoreError::Protected("Cannot delete default queue".to_string()));
        }
        sqlx::query("DELETE FROM queues WHERE id = ?").bind(id).execute(self.pool()).await?;
        Ok(true)
    }
}

#[cfg(test)]
#[path = "queues_tests.rs"]
mod tests;
