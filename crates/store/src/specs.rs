// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Specification registry rows: named command templates with soft delete.

use chrono::Utc;

use crate::records::SpecRecord;
use crate::{Store, StoreError};

/// Field updates for a specification; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct SpecUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub command: Option<String>,
}

impl Store {
    /// Create a specification. The name must be unique among active specs.
    pub async fn create_spec(
        &self,
        name: &str,
        command: &str,
        description: Option<&str>,
        created_by: &str,
    ) -> Result<SpecRecord, StoreError> {
        if self.get_spec_by_name(name).await?.is_some() {
            return Err(StoreError::Duplicate(format!(
                "Specification with name '{name}' already exists"
            )));
        }
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO specs (name, description, command, created_by, created_at, updated_at, is_active)
            VALUES (?, ?, ?, ?, ?, ?, 1)
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(command)
        .bind(created_by)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        let id = result.last_insert_rowid();
        self.get_spec(id)
            .await?
            .ok_or_else(|| StoreError::NotFound("spec", id.to_string()))
    }

    /// Active specs only; soft-deleted rows are invisible.
    pub async fn get_spec(&self, id: i64) -> Result<Option<SpecRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM specs WHERE id = ? AND is_active = 1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(SpecRecord::from_row).transpose()
    }

    pub async fn get_spec_by_name(&self, name: &str) -> Result<Option<SpecRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM specs WHERE name = ? AND is_active = 1")
            .bind(name)
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(SpecRecord::from_row).transpose()
    }

    pub async fn list_specs(&self) -> Result<Vec<SpecRecord>, StoreError> {
        let rows = sqlx::query("SELECT * FROM specs WHERE is_active = 1 ORDER BY name ASC")
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(SpecRecord::from_row).collect()
    }

    pub async fn update_spec(
        &self,
        id: i64,
        update: &SpecUpdate,
    ) -> Result<Option<SpecRecord>, StoreError> {
        let Some(spec) = self.get_spec(id).await? else {
            return Ok(None);
        };

        if let Some(name) = &update.name {
            if name != &spec.name && self.get_spec_by_name(name).await?.is_some() {
                return Err(StoreError::Duplicate(format!(
                    "Specification with name '{name}' already exists"
                )));
            }
        }

        sqlx::query(
            "UPDATE specs SET name = ?, description = ?, command = ?, updated_at = ? WHERE id = ?",
        )
        .bind(update.name.as_ref().unwrap_or(&spec.name))
        .bind(update.description.as_ref().or(spec.description.as_ref()))
        .bind(update.command.as_ref().unwrap_or(&spec.command))
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool())
        .await?;

        self.get_spec(id).await
    }

    /// Soft delete: the row stays but becomes invisible to lookups, and its
    /// name becomes reusable.
    pub async fn soft_delete_spec(&self, id: i64) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE specs SET is_active = 0, updated_at = ? WHERE id = ? AND is_active = 1")
                .bind(Utc::now())
                .bind(id)
                .execute(self.pool())
                .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
#[path = "specs_tests.rs"]
mod tests;
