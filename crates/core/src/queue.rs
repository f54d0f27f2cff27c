// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue state machine and priority ordering.

use serde::{Deserialize, Serialize};

/// Operator-controlled queue state.
///
/// `Started` admits jobs and is eligible for dispatch. `Paused` keeps queued
/// jobs but refuses new submissions and dispatch. `Stopped` refuses
/// submissions. Transitions are explicit operator actions only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueState {
    Started,
    Stopped,
    Paused,
}

crate::simple_display! {
    QueueState {
        Started => "started",
        Stopped => "stopped",
        Paused => "paused",
    }
}

crate::simple_from_str! {
    QueueState ("unknown queue state") {
        "started" => Started,
        "stopped" => Stopped,
        "paused" => Paused,
    }
}

impl QueueState {
    /// Whether the queue accepts new job submissions.
    pub fn accepts_jobs(self) -> bool {
        self == QueueState::Started
    }

    /// Whether the dispatcher may drain this queue.
    pub fn dispatchable(self) -> bool {
        self == QueueState::Started
    }
}

/// Dispatch ordering between queues: critical drains before high, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueuePriority {
    Critical,
    High,
    Normal,
    Low,
}

crate::simple_display! {
    QueuePriority {
        Critical => "critical",
        High => "high",
        Normal => "normal",
        Low => "low",
    }
}

crate::simple_from_str! {
    QueuePriority ("unknown queue priority") {
        "critical" => Critical,
        "high" => High,
        "normal" => Normal,
        "low" => Low,
    }
}

impl QueuePriority {
    /// Numeric rank used for dispatch ordering; lower drains first.
    pub fn rank(self) -> u8 {
        match self {
            QueuePriority::Critical => 0,
            QueuePriority::High => 1,
            QueuePriority::Normal => 2,
            QueuePriority::Low => 3,
        }
    }
}

impl Default for QueuePriority {
    fn default() -> Self {
        QueuePriority::Normal
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
