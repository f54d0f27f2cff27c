// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Narrow callback surface the log ingestor uses to mutate job state.
//!
//! The ingestor must not depend on the full job service (the original
//! system had a logger → job → store → logger import cycle here); it only
//! needs these three mutations, injected at startup.

use async_trait::async_trait;
use fm_core::LogValue;

#[async_trait]
pub trait JobSink: Send + Sync {
    /// Set job progress (moves Pending jobs to Running).
    async fn progress(&self, job_id: i64, percent: u8);
    /// Store a RESULT= payload (completes non-terminal jobs).
    async fn result(&self, job_id: i64, value: LogValue);
    /// Record an ERROR= payload: fail the job, keeping any earlier error.
    async fn error(&self, job_id: i64, message: String);
}
