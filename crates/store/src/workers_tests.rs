// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

async fn store() -> Store {
    Store::open_in_memory().await.unwrap()
}

#[tokio::test]
async fn ports_default_above_8500_and_stay_unique() {
    let store = store().await;
    let a = store.create_worker(&NewWorker::named("a", WorkerType::Local)).await.unwrap();
    let b = store.create_worker(&NewWorker::named("b", WorkerType::Remote)).await.unwrap();
    assert_eq!(a.port, 8501);
    assert_eq!(b.port, 8502);

    let mut clash = NewWorker::named("c", WorkerType::Local);
    clash.port = Some(8501);
    assert!(store.create_worker(&clash).await.is_err());
}

#[tokio::test]
async fn max_jobs_must_be_positive() {
    let store = store().await;
    let mut new = NewWorker::named("w", WorkerType::Local);
    new.max_jobs = 0;
    let err = store.create_worker(&new).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidValue(_)));
}

#[tokio::test]
async fn new_workers_start_offline_and_stopped() {
    let store = store().await;
    let worker = store.create_worker(&NewWorker::named("w", WorkerType::Local)).await.unwrap();
    assert_eq!(worker.status, WorkerStatus::Offline);
    assert_eq!(worker.state, WorkerState::Stopped);
    assert!(!worker.provision);
}

#[tokio::test]
async fn status_and_state_updates() {
    let store = store().await;
    let worker = store.create_worker(&NewWorker::named("w", WorkerType::Local)).await.unwrap();

    store.set_worker_status(worker.id, WorkerStatus::Online, None).await.unwrap();
    store.set_worker_state(worker.id, WorkerState::Started).await.unwrap();
    let reloaded = store.get_worker(worker.id).await.unwrap().unwrap();
    assert_eq!(reloaded.status, WorkerStatus::Online);
    assert_eq!(reloaded.state, WorkerState::Started);
    assert!(reloaded.last_seen.is_some());

    store
        .set_worker_status(worker.id, WorkerStatus::Error, Some("agent crashed"))
        .await
        .unwrap();
    let reloaded = store.get_worker(worker.id).await.unwrap().unwrap();
    assert_eq!(reloaded.status, WorkerStatus::Error);
    assert_eq!(reloaded.error_message.as_deref(), Some("agent crashed"));
}

#[tokio::test]
async fn system_worker_is_seeded_once_and_protected() {
    let store = store().await;
    let system = store.ensure_system_worker("/p/logs/workers/system.log").await.unwrap();
    assert_eq!(system.name, SYSTEM_WORKER);
    assert_eq!(system.worker_type, WorkerType::Local);
    assert_eq!(system.max_jobs, 4);

    // Idempotent.
    let again = store.ensure_system_worker("/p/logs/workers/system.log").await.unwrap();
    assert_eq!(again.id, system.id);

    let err = store.delete_worker(system.id).await.unwrap_err();
    assert!(matches!(err, StoreError::Protected(_)));
}

#[tokio::test]
async fn endpoint_prefers_ip_for_remote_and_loopback_for_local() {
    let store = store().await;
    let mut remote = NewWorker::named("r", WorkerType::Remote);
    remote.hostname = Some("web01.example.com".to_string());
    remote.ip_address = Some("10.0.0.4".to_string());
    remote.port = Some(9001);
    let remote = store.create_worker(&remote).await.unwrap();
    assert_eq!(remote.endpoint(), "http://10.0.0.4:9001");

    let local = store.create_worker(&NewWorker::named("l", WorkerType::Local)).await.unwrap();
    assert!(local.endpoint().starts_with("http://127.0.0.1:"));
}

#[tokio::test]
async fn duplicate_worker_names_refused() {
    let store = store().await;
    store.create_worker(&NewWorker::named("w", WorkerType::Local)).await.unwrap();
    let err = store.create_worker(&NewWorker::named("W", WorkerType::Local)).await.unwrap_err();
    assert!(matches!(err, StoreError::Duplicate(_)));
}
