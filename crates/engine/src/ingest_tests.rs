// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use async_trait::async_trait;
use fm_core::LogValue;
use serde_json::json;
use tempfile::TempDir;

#[derive(Debug, PartialEq)]
enum SinkCall {
    Progress(i64, u8),
    Result(i64, serde_json::Value),
    Error(i64, String),
}

#[derive(Default)]
struct RecordingSink {
    calls: Mutex<Vec<SinkCall>>,
}

#[async_trait]
impl JobSink for RecordingSink {
    async fn progress(&self, job_id: i64, percent: u8) {
        self.calls.lock().push(SinkCall::Progress(job_id, percent));
    }
    async fn result(&self, job_id: i64, value: LogValue) {
        self.calls.lock().push(SinkCall::Result(job_id, value.result_value()));
    }
    async fn error(&self, job_id: i64, message: String) {
        self.calls.lock().push(SinkCall::Error(job_id, message));
    }
}

struct Fixture {
    ingestor: LogIngestor,
    sink: Arc<RecordingSink>,
    paths: PrefixPaths,
    store: Store,
    _dir: TempDir,
}

async fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let paths = PrefixPaths::new(dir.path());
    paths.ensure_layout().unwrap();
    let store = Store::open_in_memory().await.unwrap();
    let sink = Arc::new(RecordingSink::default());
    let ingestor = LogIngestor::new(store.clone(), paths.clone(), sink.clone(), 6379);
    Fixture { ingestor, sink, paths, store, _dir: dir }
}

async fn make_job(fx: &Fixture) -> i64 {
    let mut job = fx
        .store
        .create_job("spec", &json!({"spec_name": "spec", "runtime_args": {}}), "t", None)
        .await
        .unwrap();
    job.log_file_path = Some(fx.paths.job_log(job.id).display().to_string());
    fx.store.persist_job(&job).await.unwrap();
    job.id
}

fn job_envelope(job_id: i64, message: &str) -> Vec<u8> {
    LogEnvelope::for_job(format!("default:{job_id}"), "ts".to_string(), message.to_string())
        .encode()
        .unwrap()
        .into_bytes()
}

#[tokio::test]
async fn job_lines_land_in_the_job_file_verbatim() {
    let fx = fixture().await;
    let job_id = make_job(&fx).await;

    fx.ingestor.handle_element(&job_envelope(job_id, "hello world")).await;
    fx.ingestor.handle_element(&job_envelope(job_id, "second line")).await;

    let content = std::fs::read_to_string(fx.paths.job_log(job_id)).unwrap();
    assert_eq!(content, "hello world\nsecond line\n");
}

#[tokio::test]
async fn close_then_append_reopens_the_handle() {
    let fx = fixture().await;
    let job_id = make_job(&fx).await;
    let execution_id = format!("default:{job_id}");

    fx.ingestor.handle_element(&job_envelope(job_id, "before close")).await;
    fx.ingestor.close_log(&execution_id);
    // Closing twice is a no-op.
    fx.ingestor.close_log(&execution_id);
    fx.ingestor.handle_element(&job_envelope(job_id, "after close")).await;

    let content = std::fs::read_to_string(fx.paths.job_log(job_id)).unwrap();
    assert_eq!(content, "before close\nafter close\n");
}

#[tokio::test]
async fn progress_keyword_reaches_the_sink() {
    let fx = fixture().await;
    let job_id = make_job(&fx).await;

    fx.ingestor.handle_element(&job_envelope(job_id, "PROGRESS=42")).await;
    fx.ingestor.handle_element(&job_envelope(job_id, "PROGRESS=250")).await;

    // Out-of-range progress is dropped before the sink.
    assert_eq!(*fx.sink.calls.lock(), vec![SinkCall::Progress(job_id, 42)]);
    // The raw line is still written to the log either way.
    let content = std::fs::read_to_string(fx.paths.job_log(job_id)).unwrap();
    assert!(content.contains("PROGRESS=250"));
}

#[tokio::test]
async fn result_and_error_keywords_mutate_state() {
    let fx = fixture().await;
    let job_id = make_job(&fx).await;

    fx.ingestor
        .handle_element(&job_envelope(job_id, r#"RESULT={"rows": 10}"#))
        .await;
    fx.ingestor
        .handle_element(&job_envelope(job_id, r#"ERROR={"message":"nope"}"#))
        .await;

    let calls = fx.sink.calls.lock();
    assert_eq!(calls[0], SinkCall::Result(job_id, json!({"rows": 10})));
    assert_eq!(calls[1], SinkCall::Error(job_id, "nope".to_string()));
}

#[tokio::test]
async fn worker_lines_get_a_timestamp_prefix() {
    let fx = fixture().await;
    let envelope = LogEnvelope::for_worker("System", "ts".to_string(), "agent ready".to_string())
        .encode()
        .unwrap();

    fx.ingestor.handle_element(envelope.as_bytes()).await;

    let content = std::fs::read_to_string(fx.paths.worker_log("System")).unwrap();
    assert!(content.starts_with('['));
    assert!(content.trim_end().ends_with("agent ready"));
}

#[tokio::test]
async fn malformed_elements_are_dropped_quietly() {
    let fx = fixture().await;
    // Not base64, bad JSON, and routeless: none may panic or write files.
    fx.ingestor.handle_element(b"!!!").await;
    let routeless = LogEnvelope {
        execution_id: None,
        worker_name: None,
        timestamp: "ts".to_string(),
        message: "orphan".to_string(),
    };
    fx.ingestor.handle_element(routeless.encode().unwrap().as_bytes()).await;
    assert!(fx.sink.calls.lock().is_empty());
}

#[tokio::test]
async fn unknown_job_falls_back_to_generated_path() {
    let fx = fixture().await;
    // No job row exists; the writer still lands the line under logs/jobs.
    fx.ingestor.handle_element(&job_envelope(777, "orphan line")).await;
    let content = std::fs::read_to_string(fx.paths.job_log(777)).unwrap();
    assert_eq!(content, "orphan line\n");
}

#[tokio::test]
async fn secret_is_generated_once_with_stable_value() {
    let fx = fixture().await;
    let first = fx.ingestor.ensure_secret().unwrap().unwrap();
    let second = fx.ingestor.ensure_secret().unwrap().unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 32);
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(fx.paths.broker_secret()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
