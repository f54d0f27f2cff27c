// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use serde_json::json;

fn args(pairs: &[(&str, &str)]) -> Map<String, Value> {
    pairs.iter().map(|(k, v)| (k.to_string(), Value::String(v.to_string()))).collect()
}

#[test]
fn substitutes_all_placeholders() {
    let rendered = render_command("echo hello {{who}}", &args(&[("who", "world")]));
    assert_eq!(rendered.command, "echo hello world");
    assert!(rendered.args.is_empty());
    assert!(rendered.missing_keys.is_empty());
}

#[test]
fn missing_keys_stay_literal() {
    let rendered = render_command("run {{a}} {{b}}", &args(&[("a", "x")]));
    assert_eq!(rendered.command, "run x {{b}}");
    assert_eq!(rendered.missing_keys, vec!["b".to_string()]);
}

#[test]
fn non_string_values_render_as_json() {
    let mut runtime = Map::new();
    runtime.insert("count".to_string(), json!(3));
    let rendered = render_command("repeat {{count}}", &runtime);
    assert_eq!(rendered.command, "repeat 3");
}

#[test]
fn no_placeholders_and_args_appends_json_argument() {
    let rendered = render_command("process-data", &args(&[("input", "a.csv")]));
    assert_eq!(rendered.command, "process-data");
    assert_eq!(rendered.args.len(), 1);
    let parsed: Value = serde_json::from_str(&rendered.args[0]).unwrap();
    assert_eq!(parsed, json!({"input": "a.csv"}));
}

#[test]
fn no_placeholders_and_no_args_is_bare() {
    let rendered = render_command("uptime", &Map::new());
    assert_eq!(rendered.command, "uptime");
    assert!(rendered.args.is_empty());
}

proptest! {
    // When every placeholder key is covered, no {{...}} residue survives.
    #[test]
    fn covered_templates_leave_no_residue(
        keys in proptest::collection::hash_set("[a-z][a-z0-9_]{0,8}", 1..5),
        values in proptest::collection::vec("[a-zA-Z0-9 ]{0,12}", 5),
    ) {
        let keys: Vec<String> = keys.into_iter().collect();
        let template = keys
            .iter()
            .map(|k| format!("{{{{{k}}}}}"))
            .collect::<Vec<_>>()
            .join(" ");
        let runtime: Map<String, Value> = keys
            .iter()
            .zip(values.iter().cycle())
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();

        let rendered = render_command(&template, &runtime);
        prop_assert!(rendered.missing_keys.is_empty());
        prop_assert!(!rendered.command.contains("{{"), "residue in {}", rendered.command);
    }
}
