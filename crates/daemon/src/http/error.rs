// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP error mapping: engine errors become JSON `{detail}` bodies.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fm_engine::callbacks::CallbackError;
use fm_engine::{JobError, QueueError, WorkerError};
use fm_store::StoreError;
use serde_json::json;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, detail: detail.into() }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self { status: StatusCode::NOT_FOUND, detail: detail.into() }
    }

    fn internal(detail: impl Into<String>) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, detail: detail.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(detail = %self.detail, "request failed");
        }
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(_) | StoreError::InvalidValue(_) | StoreError::Protected(_) => {
                ApiError::bad_request(e.to_string())
            }
            StoreError::NotFound(..) => ApiError::not_found(e.to_string()),
            _ => ApiError::internal(e.to_string()),
        }
    }
}

impl From<JobError> for ApiError {
    fn from(e: JobError) -> Self {
        match e {
            JobError::NotFound(_) => ApiError::not_found(e.to_string()),
            JobError::Store(inner) => inner.into(),
            _ => ApiError::internal(e.to_string()),
        }
    }
}

impl From<QueueError> for ApiError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::UnknownQueue(_) | QueueError::UnknownJob(_) => {
                ApiError::bad_request(e.to_string())
            }
            QueueError::NotAccepting { .. } => ApiError::bad_request(e.to_string()),
            QueueError::Store(inner) => inner.into(),
        }
    }
}

impl From<WorkerError> for ApiError {
    fn from(e: WorkerError) -> Self {
        match e {
            WorkerError::NotFound(_) => ApiError::not_found(e.to_string()),
            WorkerError::Validation(_) => ApiError::bad_request(e.to_string()),
            WorkerError::Store(inner) => inner.into(),
            _ => ApiError::internal(e.to_string()),
        }
    }
}

impl From<CallbackError> for ApiError {
    fn from(e: CallbackError) -> Self {
        match e {
            CallbackError::BadExecutionId(_) => ApiError::bad_request(e.to_string()),
            CallbackError::Job(inner) => inner.into(),
        }
    }
}
