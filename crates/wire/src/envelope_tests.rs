// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn job_envelope_survives_the_wire() {
    let envelope = LogEnvelope::for_job(
        "default:7",
        "2026-01-30T08:14:09.000123".to_string(),
        "hello world".to_string(),
    );
    let wire = envelope.encode().unwrap();
    let back = LogEnvelope::decode(wire.as_bytes()).unwrap();
    assert_eq!(back, envelope);
    assert_eq!(back.execution_id.as_deref(), Some("default:7"));
    assert!(back.worker_name.is_none());
}

#[test]
fn worker_envelope_routes_by_name() {
    let envelope = LogEnvelope::for_worker("System", "ts".to_string(), "agent ready".to_string());
    let back = LogEnvelope::decode(envelope.encode().unwrap().as_bytes()).unwrap();
    assert_eq!(back.worker_name.as_deref(), Some("System"));
}

#[test]
fn routeless_envelopes_are_refused() {
    let routeless = LogEnvelope {
        execution_id: None,
        worker_name: None,
        timestamp: "ts".to_string(),
        message: "orphan".to_string(),
    };
    let wire = routeless.encode().unwrap();
    assert_eq!(LogEnvelope::decode(wire.as_bytes()), Err(ProtocolError::MissingRoute));
}

#[test]
fn garbage_is_rejected_not_panicked() {
    assert!(matches!(LogEnvelope::decode(b"!!!not-base64!!!"), Err(ProtocolError::Base64(_))));
    let bad_json = B64.encode(b"{nope");
    assert!(matches!(LogEnvelope::decode(bad_json.as_bytes()), Err(ProtocolError::Json(_))));
}

#[test]
fn message_content_is_preserved_exactly() {
    // Shell metacharacters and embedded JSON must round-trip untouched.
    let message = r#"ERROR={"message":"nope"} && $HOME 'quoted'"#;
    let envelope = LogEnvelope::for_job("q:1", "ts".to_string(), message.to_string());
    let back = LogEnvelope::decode(envelope.encode().unwrap().as_bytes()).unwrap();
    assert_eq!(back.message, message);
}
