// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent ingress: the status callback that settles executions.

use axum::extract::State;
use axum::Json;
use fm_wire::StatusCallback;
use serde_json::{json, Value};

use super::ApiError;
use crate::context::AppContext;

pub async fn node_status(
    State(context): State<AppContext>,
    Json(callback): Json<StatusCallback>,
) -> Result<Json<Value>, ApiError> {
    let execution_id = callback.execution_id.clone();
    let status = callback.status;
    fm_engine::handle_status_callback(&context.jobs, &context.queues, &context.ingestor, callback)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Execution {execution_id} status updated to {status}"),
    })))
}
