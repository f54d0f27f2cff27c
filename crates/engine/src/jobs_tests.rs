// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

async fn service() -> (JobService, TempDir) {
    let dir = TempDir::new().unwrap();
    let paths = PrefixPaths::new(dir.path());
    paths.ensure_layout().unwrap();
    let store = Store::open_in_memory().await.unwrap();
    (JobService::new(store, paths), dir)
}

fn args(pairs: &[(&str, &str)]) -> Map<String, Value> {
    pairs.iter().map(|(k, v)| (k.to_string(), Value::String(v.to_string()))).collect()
}

#[tokio::test]
async fn create_writes_header_and_log_path() {
    let (service, _dir) = service().await;
    let job =
        service.create("greet", args(&[("who", "world")]), "tester", Some("default")).await.unwrap();

    assert_eq!(job.status, JobStatus::Pending);
    let log_path = job.log_file_path.as_deref().unwrap();
    let content = std::fs::read_to_string(log_path).unwrap();
    assert!(content.contains(&format!("=== Job {} Log ===", job.id)));
    assert!(content.contains("Job Name: greet"));
    assert!(content.contains("Queue: default"));
    assert!(content.contains("who"));
}

#[tokio::test]
async fn status_transitions_follow_the_table() {
    let (service, _dir) = service().await;
    let job = service.create("j", Map::new(), "t", None).await.unwrap();

    // Pending -> Completed is illegal: no-op returning the current row.
    let unchanged =
        service.update_status(job.id, JobStatus::Completed, StatusFields::default()).await.unwrap();
    assert_eq!(unchanged.status, JobStatus::Pending);
    assert!(unchanged.completed_at.is_none());

    let running =
        service.update_status(job.id, JobStatus::Running, StatusFields::default()).await.unwrap();
    assert_eq!(running.status, JobStatus::Running);
    assert!(running.started_at.is_some());
    assert!(running.completed_at.is_none());

    let done = service
        .update_status(
            job.id,
            JobStatus::Completed,
            StatusFields { progress: Some(100), ..Default::default() },
        )
        .await
        .unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.progress, 100);
    assert!(done.completed_at.is_some());

    // Terminal rows never move again.
    let stuck =
        service.update_status(job.id, JobStatus::Running, StatusFields::default()).await.unwrap();
    assert_eq!(stuck.status, JobStatus::Completed);
}

#[tokio::test]
async fn started_at_is_set_once() {
    let (service, _dir) = service().await;
    let job = service.create("j", Map::new(), "t", None).await.unwrap();

    let first =
        service.update_status(job.id, JobStatus::Running, StatusFields::default()).await.unwrap();
    let started = first.started_at.unwrap();

    // A same-status write with fields does not move the start time.
    let second = service
        .update_status(
            job.id,
            JobStatus::Running,
            StatusFields { progress: Some(50), ..Default::default() },
        )
        .await
        .unwrap();
    assert_eq!(second.started_at.unwrap(), started);
    assert_eq!(second.progress, 50);
}

#[tokio::test]
async fn failed_write_preserves_existing_error_message() {
    let (service, _dir) = service().await;
    let job = service.create("j", Map::new(), "t", None).await.unwrap();
    service.update_status(job.id, JobStatus::Running, StatusFields::default()).await.unwrap();

    // Log parser records the first error.
    service.update_error(job.id, "nope").await.unwrap();

    // Worker-reported error must not replace it.
    let after = service
        .update_status(
            job.id,
            JobStatus::Failed,
            StatusFields {
                error_message: Some("Process exited with code 1".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(after.error_message.as_deref(), Some("nope"));
}

#[tokio::test]
async fn error_forces_failed_and_appends_synthetic_line() {
    let (service, _dir) = service().await;
    let job = service.create("j", Map::new(), "t", None).await.unwrap();

    service.update_error(job.id, "disk full").await.unwrap();
    let failed = service.get(job.id).await.unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.error_message.as_deref(), Some("disk full"));
    assert!(failed.completed_at.is_some());

    let log = service.get_log(job.id).await.unwrap();
    assert!(log.contains("Job failed with error: disk full"));
}

#[tokio::test]
async fn cancel_only_from_active_states() {
    let (service, _dir) = service().await;
    let job = service.create("j", Map::new(), "t", None).await.unwrap();

    assert!(service.cancel(job.id).await.unwrap());
    let cancelled = service.get(job.id).await.unwrap();
    assert_eq!(cancelled.status, JobStatus::Cancelled);
    assert!(cancelled.completed_at.is_some());

    // Cancelling again is refused.
    assert!(!service.cancel(job.id).await.unwrap());
}

#[tokio::test]
async fn retry_clones_failed_jobs_only() {
    let (service, _dir) = service().await;
    let job =
        service.create("greet", args(&[("who", "x")]), "tester", Some("default")).await.unwrap();

    // Not retryable while Pending.
    assert!(service.retry(job.id, "tester").await.unwrap().is_none());

    service.update_status(job.id, JobStatus::Running, StatusFields::default()).await.unwrap();
    service.update_error(job.id, "boom").await.unwrap();

    let clone = service.retry(job.id, "retrier").await.unwrap().unwrap();
    assert_ne!(clone.id, job.id);
    assert_eq!(clone.name, "greet");
    assert_eq!(clone.status, JobStatus::Pending);
    assert_eq!(clone.runtime_args(), job.runtime_args());
    assert_eq!(clone.queue_name.as_deref(), Some("default"));

    let original = service.get(job.id).await.unwrap();
    assert_eq!(original.retries, 1);
    assert_eq!(original.status, JobStatus::Failed);
}

#[tokio::test]
async fn progress_clamps_and_starts_pending_jobs() {
    let (service, _dir) = service().await;
    let job = service.create("j", Map::new(), "t", None).await.unwrap();

    service.update_progress(job.id, 250).await.unwrap();
    let running = service.get(job.id).await.unwrap();
    assert_eq!(running.status, JobStatus::Running);
    assert_eq!(running.progress, 100);

    service.update_progress(job.id, -5).await.unwrap();
    assert_eq!(service.get(job.id).await.unwrap().progress, 0);
}

#[tokio::test]
async fn result_completes_non_terminal_jobs() {
    let (service, _dir) = service().await;
    let job = service.create("j", Map::new(), "t", None).await.unwrap();
    service.update_status(job.id, JobStatus::Running, StatusFields::default()).await.unwrap();

    service.update_result(job.id, serde_json::json!({"rows": 3})).await.unwrap();
    let done = service.get(job.id).await.unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.result, Some(serde_json::json!({"rows": 3})));
}

#[tokio::test]
async fn result_after_failure_keeps_failed_status() {
    let (service, _dir) = service().await;
    let job = service.create("j", Map::new(), "t", None).await.unwrap();
    service.update_status(job.id, JobStatus::Running, StatusFields::default()).await.unwrap();
    service.update_error(job.id, "nope").await.unwrap();

    service.update_result(job.id, serde_json::json!({"partial": true})).await.unwrap();
    let still_failed = service.get(job.id).await.unwrap();
    assert_eq!(still_failed.status, JobStatus::Failed);
    assert_eq!(still_failed.result, Some(serde_json::json!({"partial": true})));
}

#[tokio::test]
async fn delete_removes_row_and_log_file() {
    let (service, _dir) = service().await;
    let job = service.create("j", Map::new(), "t", None).await.unwrap();
    let log_path = job.log_file_path.clone().unwrap();
    assert!(std::path::Path::new(&log_path).exists());

    assert!(service.delete(job.id).await.unwrap());
    assert!(!std::path::Path::new(&log_path).exists());
    assert!(service.get(job.id).await.is_err());
    assert!(!service.delete(job.id).await.unwrap());
}

#[tokio::test]
async fn sink_routes_keywords_into_state() {
    let (service, _dir) = service().await;
    let job = service.create("j", Map::new(), "t", None).await.unwrap();

    JobSink::progress(&service, job.id, 30).await;
    assert_eq!(service.get(job.id).await.unwrap().progress, 30);

    JobSink::result(&service, job.id, LogValue::Plain("done".to_string())).await;
    let done = service.get(job.id).await.unwrap();
    assert_eq!(done.result, Some(serde_json::json!({"value": "done"})));
    assert_eq!(done.status, JobStatus::Completed);
}
