// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command template rendering for specifications.
//!
//! A spec command may contain `{{key}}` placeholders that are substituted
//! from a job's runtime arguments. Commands without placeholders receive the
//! runtime arguments as a single JSON-encoded trailing argument instead.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("constant regex pattern is valid"));

/// Result of building the command line for one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCommand {
    /// The command string, with placeholders substituted when present.
    pub command: String,
    /// Extra arguments appended after shell tokenization on the agent side.
    pub args: Vec<String>,
    /// Placeholder keys that had no value and were left literal.
    pub missing_keys: Vec<String>,
}

/// Render a spec command against a job's runtime arguments.
///
/// Placeholders with no matching key are left literal so the failure is
/// visible in the executed command rather than silently blanked. When the
/// template has no placeholders and `runtime_args` is non-empty, the whole
/// map is passed as one JSON argument.
pub fn render_command(template: &str, runtime_args: &Map<String, Value>) -> RenderedCommand {
    if PLACEHOLDER.is_match(template) {
        let mut missing = Vec::new();
        let command = PLACEHOLDER
            .replace_all(template, |caps: &regex::Captures<'_>| {
                let key = &caps[1];
                match runtime_args.get(key) {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => {
                        missing.push(key.to_string());
                        caps[0].to_string()
                    }
                }
            })
            .into_owned();
        return RenderedCommand { command, args: Vec::new(), missing_keys: missing };
    }

    let args = if runtime_args.is_empty() {
        Vec::new()
    } else {
        vec![Value::Object(runtime_args.clone()).to_string()]
    };
    RenderedCommand { command: template.to_string(), args, missing_keys: Vec::new() }
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
