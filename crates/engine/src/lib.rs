// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fm-engine: the dispatch and execution pipeline.
//!
//! Composes the job service, the queue engine and its dispatcher loop, the
//! worker manager (local subprocesses and SSH-provisioned remote hosts),
//! and the log ingestion service that turns broker traffic into per-job
//! files and state mutations.

pub mod callbacks;
pub mod client;
pub mod dispatch;
pub mod ingest;
pub mod jobs;
pub mod monitor;
pub mod provision;
pub mod queue;
pub mod sink;
pub mod specs;
pub mod workers;

pub use callbacks::handle_status_callback;
pub use client::WorkerClient;
pub use dispatch::{DispatchFailure, Dispatcher};
pub use ingest::LogIngestor;
pub use jobs::{JobError, JobService, StatusFields};
pub use queue::{QueueEngine, QueueError};
pub use sink::JobSink;
pub use specs::SpecRegistry;
pub use workers::{WorkerError, WorkerManager};
