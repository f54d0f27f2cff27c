// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker classification, reachability status and operator state.

use serde::{Deserialize, Serialize};

/// Where a worker's agent process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerType {
    /// Subprocess of the dispatcher on the same host.
    Local,
    /// Separate host reached over SSH.
    Remote,
}

crate::simple_display! {
    WorkerType {
        Local => "local",
        Remote => "remote",
    }
}

crate::simple_from_str! {
    WorkerType ("unknown worker type") {
        "local" => Local,
        "remote" => Remote,
    }
}

/// Reachability as observed by the health monitor.
///
/// Orthogonal to [`WorkerState`]: a paused worker stays `Online` as long as
/// its agent answers health probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Online,
    Offline,
    Provisioning,
    Error,
}

crate::simple_display! {
    WorkerStatus {
        Online => "online",
        Offline => "offline",
        Provisioning => "provisioning",
        Error => "error",
    }
}

crate::simple_from_str! {
    WorkerStatus ("unknown worker status") {
        "online" => Online,
        "offline" => Offline,
        "provisioning" => Provisioning,
        "error" => Error,
    }
}

/// Operator-controlled lifecycle state.
///
/// `Failed` marks a failed start attempt and is cleared only by an explicit
/// Start; the health monitor never writes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Started,
    Stopped,
    Paused,
    Failed,
}

crate::simple_display! {
    WorkerState {
        Started => "started",
        Stopped => "stopped",
        Paused => "paused",
        Failed => "failed",
    }
}

crate::simple_from_str! {
    WorkerState ("unknown worker state") {
        "started" => Started,
        "stopped" => Stopped,
        "paused" => Paused,
        "failed" => Failed,
    }
}

/// SSH authentication method for remote workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    Key,
    Password,
}

crate::simple_display! {
    AuthMethod {
        Key => "key",
        Password => "password",
    }
}

crate::simple_from_str! {
    AuthMethod ("unknown auth method") {
        "key" => Key,
        "password" => Password,
    }
}

/// A worker is eligible for dispatch only when started by the operator AND
/// currently reachable. Paused or offline workers are skipped.
pub fn dispatch_eligible(state: WorkerState, status: WorkerStatus) -> bool {
    state == WorkerState::Started && status == WorkerStatus::Online
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
