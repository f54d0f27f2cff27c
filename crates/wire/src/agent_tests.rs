// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn execute_request_round_trips_command_and_args() {
    let args = vec![r#"{"input":"a.csv"}"#.to_string()];
    let req = ExecuteRequest::encode("default:3", "echo hello world", &args);
    assert_eq!(req.execution_id, "default:3");
    // Encoded fields are not the plain text.
    assert_ne!(req.command, "echo hello world");

    let (command, decoded_args) = req.decode().unwrap();
    assert_eq!(command, "echo hello world");
    assert_eq!(decoded_args, args);
}

#[test]
fn decode_rejects_invalid_base64() {
    let req = ExecuteRequest {
        execution_id: "q:1".to_string(),
        command: "%%%".to_string(),
        args: vec![],
    };
    assert!(req.decode().is_err());
}

#[test]
fn args_default_to_empty_on_deserialize() {
    let req: ExecuteRequest =
        serde_json::from_str(r#"{"execution_id":"q:1","command":"ZWNobw=="}"#).unwrap();
    assert!(req.args.is_empty());
}

#[test]
fn health_response_shape() {
    let health = HealthResponse::healthy(2, 4);
    assert!(health.is_healthy());
    let json = serde_json::to_value(&health).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["running_jobs"], 2);
    assert_eq!(json["max_jobs"], 4);
}

#[test]
fn exec_result_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&ExecResult::Cancelled).unwrap(), "\"cancelled\"");
    assert_eq!(ExecResult::Completed.to_string(), "completed");
}
