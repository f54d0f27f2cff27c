// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn formats_as_queue_colon_job() {
    let id = ExecutionId::new("default", 42);
    assert_eq!(id.to_string(), "default:42");
    assert_eq!(id.queue(), "default");
    assert_eq!(id.job_id(), 42);
}

#[test]
fn parses_valid_ids() {
    let id: ExecutionId = "builds:7".parse().unwrap();
    assert_eq!(id, ExecutionId::new("builds", 7));
}

#[test]
fn splits_on_first_colon_only() {
    // A pathological queue name containing a colon loses the prefix; the
    // job id is still everything after the first colon, so this is refused
    // because "a:3" is not an integer.
    assert!("q:a:3".parse::<ExecutionId>().is_err());
}

#[test]
fn rejects_malformed_ids() {
    for bad in ["", "noseparator", ":7", "q:", "q:notanumber"] {
        assert!(bad.parse::<ExecutionId>().is_err(), "{bad:?} should be rejected");
    }
}

#[test]
fn serde_round_trip_as_string() {
    let id = ExecutionId::new("default", 3);
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"default:3\"");
    let back: ExecutionId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}
