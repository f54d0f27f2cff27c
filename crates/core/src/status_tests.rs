// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    pending_running = { JobStatus::Pending, JobStatus::Running, true },
    pending_cancelled = { JobStatus::Pending, JobStatus::Cancelled, true },
    pending_completed = { JobStatus::Pending, JobStatus::Completed, false },
    pending_failed = { JobStatus::Pending, JobStatus::Failed, false },
    running_completed = { JobStatus::Running, JobStatus::Completed, true },
    running_failed = { JobStatus::Running, JobStatus::Failed, true },
    running_cancelled = { JobStatus::Running, JobStatus::Cancelled, true },
    running_pending = { JobStatus::Running, JobStatus::Pending, false },
    completed_running = { JobStatus::Completed, JobStatus::Running, false },
    failed_pending = { JobStatus::Failed, JobStatus::Pending, false },
    failed_running = { JobStatus::Failed, JobStatus::Running, false },
    cancelled_running = { JobStatus::Cancelled, JobStatus::Running, false },
)]
fn transition_table(from: JobStatus, to: JobStatus, allowed: bool) {
    assert_eq!(from.can_transition_to(to), allowed, "{from} -> {to}");
}

#[test]
fn terminal_statuses_admit_nothing() {
    for from in [JobStatus::Completed, JobStatus::Failed, JobStatus::Cancelled] {
        for to in JobStatus::all() {
            if from != to {
                assert!(!from.can_transition_to(to), "{from} -> {to} must be refused");
            }
        }
    }
}

#[test]
fn terminal_and_active_partition() {
    for status in JobStatus::all() {
        assert_ne!(status.is_terminal(), status.is_active(), "{status}");
    }
}

#[test]
fn only_failed_is_retryable() {
    for status in JobStatus::all() {
        assert_eq!(status.is_retryable(), status == JobStatus::Failed);
    }
}

#[test]
fn display_round_trips_through_from_str() {
    for status in JobStatus::all() {
        let parsed: JobStatus = status.to_string().parse().unwrap();
        assert_eq!(parsed, status);
    }
    assert!("Bogus".parse::<JobStatus>().is_err());
}
