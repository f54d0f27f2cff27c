// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Specification registry: CRUD over named command templates.
//!
//! Validation (duplicate active names, soft delete) lives in the store;
//! this layer adds logging and is the only place the rest of the engine
//! resolves specs through.

use fm_store::{SpecRecord, SpecUpdate, Store, StoreError};

#[derive(Clone)]
pub struct SpecRegistry {
    store: Store,
}

impl SpecRegistry {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        name: &str,
        command: &str,
        description: Option<&str>,
        created_by: &str,
    ) -> Result<SpecRecord, StoreError> {
        let spec = self.store.create_spec(name, command, description, created_by).await?;
        tracing::info!(spec = name, command, "created specification");
        Ok(spec)
    }

    pub async fn get(&self, id: i64) -> Result<Option<SpecRecord>, StoreError> {
        self.store.get_spec(id).await
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<SpecRecord>, StoreError> {
        self.store.get_spec_by_name(name).await
    }

    pub async fn list(&self) -> Result<Vec<SpecRecord>, StoreError> {
        self.store.list_specs().await
    }

    pub async fn update(
        &self,
        id: i64,
        update: &SpecUpdate,
    ) -> Result<Option<SpecRecord>, StoreError> {
        let spec = self.store.update_spec(id, update).await?;
        if spec.is_some() {
            tracing::info!(spec_id = id, "updated specification");
        }
        Ok(spec)
    }

    pub async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let deleted = self.store.soft_delete_spec(id).await?;
        if deleted {
            tracing::info!(spec_id = id, "deleted specification");
        }
        Ok(deleted)
    }
}
