// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-band log keyword grammar.
//!
//! Worker output may carry `PROGRESS=<int>`, `RESULT={json}` /
//! `RESULT='<json>'` and `ERROR={json}` / `ERROR='<string>'` markers that the
//! log ingestor turns into job state mutations. Parsing is line-local: a
//! payload never spans lines.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static PROGRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"PROGRESS=(\d+)").expect("constant regex pattern is valid"));

#[allow(clippy::expect_used)]
static RESULT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"RESULT=(?:'([^']*)'|(\{.*\}))").expect("constant regex pattern is valid"));

#[allow(clippy::expect_used)]
static ERROR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ERROR=(?:'([^']*)'|(\{.*\}))").expect("constant regex pattern is valid"));

/// Payload of a RESULT= or ERROR= marker.
///
/// The wire allows either a JSON body or a bare quoted string; downstream
/// code needs to know which it got, so the distinction is kept explicit
/// instead of stringly-typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogValue {
    Structured(Value),
    Plain(String),
}

impl LogValue {
    /// Parse a payload string: valid JSON becomes `Structured`, anything
    /// else is carried verbatim as `Plain`.
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(v) => LogValue::Structured(v),
            Err(_) => LogValue::Plain(raw.to_string()),
        }
    }

    /// The error message for ERROR= payloads: a structured object's
    /// `message` field when present, otherwise the serialized whole.
    pub fn error_message(&self) -> String {
        match self {
            LogValue::Structured(Value::Object(map)) => match map.get("message") {
                Some(Value::String(s)) => s.clone(),
                _ => Value::Object(map.clone()).to_string(),
            },
            LogValue::Structured(other) => other.to_string(),
            LogValue::Plain(s) => s.clone(),
        }
    }

    /// The result blob for RESULT= payloads: structured values pass
    /// through, plain strings are wrapped as `{"value": <string>}`.
    pub fn result_value(&self) -> Value {
        match self {
            LogValue::Structured(v) => v.clone(),
            LogValue::Plain(s) => serde_json::json!({ "value": s }),
        }
    }
}

/// One recognized keyword in a log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyword {
    Progress(u8),
    Result(LogValue),
    Error(LogValue),
}

/// Extract all recognized keywords from one log line.
///
/// Progress values outside 0–100 are dropped with a warning. RESULT
/// bodies, quoted or not, must parse as JSON or they are dropped with a
/// warning; only ERROR payloads fall back to plain strings.
pub fn parse_keywords(line: &str) -> Vec<Keyword> {
    let mut found = Vec::new();

    if let Some(caps) = PROGRESS.captures(line) {
        match caps[1].parse::<u64>() {
            Ok(v) if v <= 100 => found.push(Keyword::Progress(v as u8)),
            Ok(v) => tracing::warn!(value = v, "ignoring out-of-range progress value"),
            Err(_) => tracing::warn!(raw = &caps[1], "ignoring unparseable progress value"),
        }
    }

    if let Some(caps) = RESULT.captures(line) {
        // Both RESULT forms carry JSON; unparseable bodies are dropped,
        // never demoted to plain strings (unlike ERROR below).
        if let Some(body) = caps.get(1).or_else(|| caps.get(2)) {
            match serde_json::from_str::<Value>(body.as_str()) {
                Ok(v) => found.push(Keyword::Result(LogValue::Structured(v))),
                Err(_) => tracing::warn!(body = body.as_str(), "ignoring invalid RESULT JSON"),
            }
        }
    }

    if let Some(caps) = ERROR.captures(line) {
        let raw = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()).unwrap_or_default();
        found.push(Keyword::Error(LogValue::parse(raw)));
    }

    found
}

#[cfg(test)]
#[path = "keywords_tests.rs"]
mod tests;
