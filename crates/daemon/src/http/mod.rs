// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The daemon's HTTP surface: thin request validation and JSON mapping
//! over the engine. No auth, no pagination streaming.

mod error;
mod jobs;
mod node;
mod queues;
mod specs;
mod workers;

pub use error::ApiError;

use axum::routing::{get, post, put};
use axum::Router;

use crate::context::AppContext;

pub fn router(context: AppContext) -> Router {
    Router::new()
        .route("/", get(root))
        // Jobs
        .route("/api/jobs/run", post(jobs::run_job))
        .route("/api/jobs", get(jobs::list_jobs))
        .route("/api/jobs/statistics/summary", get(jobs::statistics))
        .route("/api/jobs/cleanup", post(jobs::cleanup_jobs))
        .route("/api/jobs/:id", get(jobs::get_job).delete(jobs::delete_job))
        .route("/api/jobs/:id/cancel", put(jobs::cancel_job))
        .route("/api/jobs/:id/retry", put(jobs::retry_job))
        .route("/api/jobs/:id/logs", get(jobs::job_logs))
        // Specifications
        .route("/api/specs", post(specs::create_spec).get(specs::list_specs))
        .route(
            "/api/specs/:id",
            get(specs::get_spec).put(specs::update_spec).delete(specs::delete_spec),
        )
        .route("/api/specs/name/:name", get(specs::get_spec_by_name))
        // Queues
        .route("/api/queues", post(queues::create_queue).get(queues::list_queues))
        .route(
            "/api/queues/:id",
            get(queues::get_queue).put(queues::update_queue).delete(queues::delete_queue),
        )
        .route("/api/queues/:id/start", post(queues::start_queue))
        .route("/api/queues/:id/stop", post(queues::stop_queue))
        .route("/api/queues/:id/pause", post(queues::pause_queue))
        .route("/api/queues/:id/jobs", get(queues::queue_jobs))
        .route("/api/queues/:id/workers", get(queues::queue_workers))
        .route(
            "/api/queues/:id/workers/:worker_id",
            post(queues::assign_worker).delete(queues::unassign_worker),
        )
        // Workers
        .route("/api/workers", post(workers::create_worker).get(workers::list_workers))
        .route("/api/workers/statistics", get(workers::statistics))
        .route("/api/workers/deployments/:deployment_id", get(workers::deployment_status))
        .route(
            "/api/workers/:id",
            get(workers::get_worker).put(workers::update_worker).delete(workers::delete_worker),
        )
        .route("/api/workers/:id/start", post(workers::start_worker))
        .route("/api/workers/:id/stop", post(workers::stop_worker))
        .route("/api/workers/:id/pause", post(workers::pause_worker))
        .route("/api/workers/:id/resume", post(workers::resume_worker))
        // Agent ingress
        .route("/api/node/status", post(node::node_status))
        .with_state(context)
}

async fn root() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "foreman",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
