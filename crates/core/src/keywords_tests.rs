// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[yare::parameterized(
    zero = { "PROGRESS=0", Some(0) },
    mid = { "PROGRESS=42", Some(42) },
    full = { "PROGRESS=100", Some(100) },
    over = { "PROGRESS=101", None },
    way_over = { "PROGRESS=1000", None },
)]
fn progress_bounds(line: &str, expected: Option<u8>) {
    let keywords = parse_keywords(line);
    match expected {
        Some(v) => assert_eq!(keywords, vec![Keyword::Progress(v)]),
        None => assert!(keywords.is_empty(), "out-of-range progress must be dropped"),
    }
}

#[test]
fn progress_embedded_in_output_line() {
    let keywords = parse_keywords("step 3/10 done PROGRESS=30 continuing");
    assert_eq!(keywords, vec![Keyword::Progress(30)]);
}

#[test]
fn result_unquoted_json() {
    let keywords = parse_keywords(r#"RESULT={"rows": 10}"#);
    assert_eq!(keywords, vec![Keyword::Result(LogValue::Structured(json!({"rows": 10})))]);
}

#[test]
fn result_quoted_json_string() {
    let keywords = parse_keywords(r#"RESULT='{"ok": true}'"#);
    assert_eq!(keywords, vec![Keyword::Result(LogValue::Structured(json!({"ok": true})))]);
}

#[test]
fn result_invalid_unquoted_json_is_dropped() {
    assert!(parse_keywords("RESULT={not json").is_empty());
}

#[test]
fn result_invalid_quoted_json_is_dropped() {
    // No plain-string fallback for RESULT; that is ERROR-only behavior.
    assert!(parse_keywords("RESULT='not json'").is_empty());
}

#[test]
fn error_with_message_field() {
    let keywords = parse_keywords(r#"ERROR={"message":"nope"}"#);
    assert_eq!(keywords.len(), 1);
    match &keywords[0] {
        Keyword::Error(value) => assert_eq!(value.error_message(), "nope"),
        other => panic!("unexpected keyword {other:?}"),
    }
}

#[test]
fn error_object_without_message_serializes_whole() {
    let keywords = parse_keywords(r#"ERROR={"code":7}"#);
    match &keywords[0] {
        Keyword::Error(value) => assert_eq!(value.error_message(), r#"{"code":7}"#),
        other => panic!("unexpected keyword {other:?}"),
    }
}

#[test]
fn error_quoted_plain_string() {
    let keywords = parse_keywords("ERROR='disk full'");
    assert_eq!(keywords, vec![Keyword::Error(LogValue::Plain("disk full".into()))]);
    match &keywords[0] {
        Keyword::Error(value) => assert_eq!(value.error_message(), "disk full"),
        other => panic!("unexpected keyword {other:?}"),
    }
}

#[test]
fn plain_result_wraps_as_value() {
    let value = LogValue::Plain("done".into());
    assert_eq!(value.result_value(), json!({"value": "done"}));
    let structured = LogValue::Structured(json!({"n": 1}));
    assert_eq!(structured.result_value(), json!({"n": 1}));
}

#[test]
fn multiple_keywords_on_one_line() {
    let keywords = parse_keywords(r#"PROGRESS=100 RESULT={"done":true}"#);
    assert_eq!(keywords.len(), 2);
}

#[test]
fn ordinary_lines_yield_nothing() {
    assert!(parse_keywords("hello world").is_empty());
    assert!(parse_keywords("").is_empty());
}
