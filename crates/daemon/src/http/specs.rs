// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Specification registry endpoints.

use axum::extract::{Path, State};
use axum::Json;
use fm_store::SpecUpdate;
use serde::Deserialize;
use serde_json::{json, Value};

use super::ApiError;
use crate::context::AppContext;

#[derive(Debug, Deserialize)]
pub struct SpecCreateRequest {
    pub name: String,
    pub command: String,
    pub description: Option<String>,
    #[serde(default = "default_created_by")]
    pub created_by: String,
}

fn default_created_by() -> String {
    "system".to_string()
}

pub async fn create_spec(
    State(context): State<AppContext>,
    Json(request): Json<SpecCreateRequest>,
) -> Result<Json<Value>, ApiError> {
    let spec = context
        .specs
        .create(&request.name, &request.command, request.description.as_deref(), &request.created_by)
        .await?;
    Ok(Json(json!({ "spec": spec })))
}

pub async fn list_specs(State(context): State<AppContext>) -> Result<Json<Value>, ApiError> {
    let specs = context.specs.list().await?;
    let count = specs.len();
    Ok(Json(json!({ "specs": specs, "count": count })))
}

pub async fn get_spec(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let spec = context
        .specs
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("spec {id} not found")))?;
    Ok(Json(json!({ "spec": spec })))
}

pub async fn get_spec_by_name(
    State(context): State<AppContext>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let spec = context
        .specs
        .get_by_name(&name)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("spec '{name}' not found")))?;
    Ok(Json(json!({ "spec": spec })))
}

#[derive(Debug, Deserialize)]
pub struct SpecUpdateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub command: Option<String>,
}

pub async fn update_spec(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
    Json(request): Json<SpecUpdateRequest>,
) -> Result<Json<Value>, ApiError> {
    let update = SpecUpdate {
        name: request.name,
        description: request.description,
        command: request.command,
    };
    let spec = context
        .specs
        .update(id, &update)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("spec {id} not found")))?;
    Ok(Json(json!({ "spec": spec })))
}

pub async fn delete_spec(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    if !context.specs.delete(id).await? {
        return Err(ApiError::not_found(format!("spec {id} not found")));
    }
    Ok(Json(json!({ "success": true })))
}
