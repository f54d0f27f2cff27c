// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job status state machine.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a job.
///
/// Transitions:
///
/// | from     | allowed to                   |
/// |----------|------------------------------|
/// | Pending  | Running, Cancelled           |
/// | Running  | Completed, Failed, Cancelled |
/// | Failed   | (retry creates a new row)    |
///
/// Completed, Failed and Cancelled are terminal. Failed is the only
/// retryable status; retrying clones the job instead of re-entering Pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

crate::simple_display! {
    JobStatus {
        Pending => "Pending",
        Running => "Running",
        Completed => "Completed",
        Failed => "Failed",
        Cancelled => "Cancelled",
    }
}

crate::simple_from_str! {
    JobStatus ("unknown job status") {
        "Pending" => Pending,
        "Running" => Running,
        "Completed" => Completed,
        "Failed" => Failed,
        "Cancelled" => Cancelled,
    }
}

impl JobStatus {
    /// Check whether moving from `self` to `to` is a legal transition.
    ///
    /// Same-status writes are not transitions and are judged elsewhere;
    /// this answers only for `self != to`.
    pub fn can_transition_to(self, to: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, to),
            (Pending, Running) | (Pending, Cancelled) | (Running, Completed) | (Running, Failed) | (Running, Cancelled)
        )
    }

    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
    }

    /// Active statuses describe a job that still needs work.
    pub fn is_active(self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Running)
    }

    /// Only Failed jobs can be retried (by cloning, see the job service).
    pub fn is_retryable(self) -> bool {
        self == JobStatus::Failed
    }

    /// All statuses, for statistics bucketing.
    pub fn all() -> [JobStatus; 5] {
        [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Cancelled,
        ]
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
