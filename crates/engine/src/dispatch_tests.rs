// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fm_core::{JobStatus, PrefixPaths, QueueState, WorkerState, WorkerStatus, WorkerType};
use fm_store::{NewQueue, NewWorker};
use serde_json::json;
use tempfile::TempDir;

#[yare::parameterized(
    no_workers = { "No workers assigned", false },
    none_online = { "No started and online workers available", false },
    no_capacity = { "No workers with available capacity", false },
    rejected = { "Worker rejected job (429): capacity", true },
    server_error = { "Server error from worker agent: boom", true },
    internal = { "Internal Server Error", true },
    failed_start = { "Failed to start command: no such file", true },
    refused = { "Connection refused by worker agent: tcp error", true },
    timed_out = { "timeout contacting worker agent", true },
    unknown = { "some novel condition", false },
)]
fn classification(reason: &str, permanent: bool) {
    match classify_failure(reason) {
        DispatchFailure::Permanent(_) => assert!(permanent, "{reason} should be temporary"),
        DispatchFailure::Temporary(_) => assert!(!permanent, "{reason} should be permanent"),
    }
}

fn worker(id: i64, name: &str) -> WorkerRecord {
    let now = chrono::Utc::now();
    WorkerRecord {
        id,
        name: name.to_string(),
        worker_type: WorkerType::Local,
        hostname: None,
        ip_address: None,
        port: 8500 + id,
        ssh_user: None,
        auth_method: fm_core::AuthMethod::Key,
        ssh_private_key: None,
        password: None,
        provision: false,
        max_jobs: 4,
        log_file_path: None,
        status: WorkerStatus::Online,
        state: WorkerState::Started,
        last_seen: None,
        error_message: None,
        created_at: now,
        updated_at: now,
    }
}

#[test]
fn round_robin_rotates_in_id_order() {
    let candidates = vec![(worker(1, "a"), 0), (worker(2, "b"), 0), (worker(3, "c"), 0)];
    let mut cursor = 0;
    let picks: Vec<usize> = (0..5)
        .map(|_| select_index(DispatchStrategy::RoundRobin, &candidates, &mut cursor))
        .collect();
    assert_eq!(picks, vec![0, 1, 2, 0, 1]);
}

#[test]
fn least_loaded_breaks_ties_by_id() {
    let candidates = vec![(worker(1, "a"), 2), (worker(2, "b"), 1), (worker(3, "c"), 1)];
    let mut cursor = 0;
    let index = select_index(DispatchStrategy::LeastLoaded, &candidates, &mut cursor);
    assert_eq!(candidates[index].0.id, 2);
}

#[test]
fn priority_takes_lowest_id() {
    let candidates = vec![(worker(5, "e"), 0), (worker(9, "f"), 0)];
    let mut cursor = 7;
    assert_eq!(select_index(DispatchStrategy::Priority, &candidates, &mut cursor), 0);
}

#[test]
fn random_stays_in_bounds() {
    let candidates = vec![(worker(1, "a"), 0), (worker(2, "b"), 0)];
    let mut cursor = 0;
    for _ in 0..32 {
        let index = select_index(DispatchStrategy::Random, &candidates, &mut cursor);
        assert!(index < candidates.len());
    }
}

struct Fixture {
    dispatcher: Dispatcher,
    store: Store,
    engine: Arc<QueueEngine>,
    jobs: JobService,
    _dir: TempDir,
}

async fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let paths = PrefixPaths::new(dir.path());
    paths.ensure_layout().unwrap();
    let store = Store::open_in_memory().await.unwrap();

    let mut queue = NewQueue::named("default");
    queue.state = QueueState::Started;
    queue.is_default = true;
    store.create_queue(&queue).await.unwrap();

    let jobs = JobService::new(store.clone(), paths.clone());
    let engine = Arc::new(QueueEngine::new(store.clone(), paths.clone()));
    let dispatcher = Dispatcher::new(
        store.clone(),
        jobs.clone(),
        engine.clone(),
        WorkerClient::new(),
        Duration::from_secs(5),
    );
    Fixture { dispatcher, store, engine, jobs, _dir: dir }
}

async fn submit(fx: &Fixture, spec: &str) -> i64 {
    let job = fx
        .jobs
        .create(spec, serde_json::Map::new(), "tester", Some("default"))
        .await
        .unwrap();
    fx.engine.add_job("default", job.id).await.unwrap();
    job.id
}

async fn add_worker(fx: &Fixture, name: &str, state: WorkerState, status: WorkerStatus) -> i64 {
    // Low ports never have a listener in CI, so execute() sees a fast
    // connection-refused instead of a 30 s timeout.
    let mut new = NewWorker::named(name, WorkerType::Local);
    new.port = Some(2 + fx.store.list_workers().await.unwrap().len() as i64);
    let record = fx.store.create_worker(&new).await.unwrap();
    let mut record = record;
    record.state = state;
    record.status = status;
    record.max_jobs = 4;
    fx.store.persist_worker(&record).await.unwrap();
    let queue = fx.store.get_queue_by_name("default").await.unwrap().unwrap();
    fx.store.assign_worker_to_queue(record.id, queue.id).await.unwrap();
    record.id
}

#[tokio::test]
async fn no_assigned_workers_requeues_at_tail() {
    let fx = fixture().await;
    let job_id = submit(&fx, "greet").await;

    fx.dispatcher.cycle().await;

    // Still queued, still Pending, with the failure visible in the job log.
    assert_eq!(fx.engine.queue_jobs("default"), vec![job_id]);
    let job = fx.store.get_job(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    let log = fx.jobs.get_log(job_id).await.unwrap();
    assert!(log.contains("[DISPATCH] Dispatch failed: No workers assigned"));
}

#[tokio::test]
async fn paused_or_offline_workers_are_skipped() {
    let fx = fixture().await;
    let job_id = submit(&fx, "greet").await;
    add_worker(&fx, "paused", WorkerState::Paused, WorkerStatus::Online).await;
    add_worker(&fx, "offline", WorkerState::Started, WorkerStatus::Offline).await;

    fx.dispatcher.cycle().await;

    assert_eq!(fx.engine.queue_jobs("default"), vec![job_id]);
    let log = fx.jobs.get_log(job_id).await.unwrap();
    assert!(log.contains("No started and online workers available"));
}

#[tokio::test]
async fn capacity_exhaustion_is_temporary() {
    let fx = fixture().await;
    let job_id = submit(&fx, "greet").await;
    add_worker(&fx, "busy", WorkerState::Started, WorkerStatus::Online).await;

    // Fill the worker's four slots with running jobs.
    for _ in 0..4 {
        let mut running = fx
            .store
            .create_job("x", &json!({"spec_name": "x", "runtime_args": {}}), "t", None)
            .await
            .unwrap();
        running.status = JobStatus::Running;
        running.assigned_worker_name = Some("busy".to_string());
        fx.store.persist_job(&running).await.unwrap();
    }

    fx.dispatcher.cycle().await;

    assert_eq!(fx.engine.queue_jobs("default"), vec![job_id]);
    let log = fx.jobs.get_log(job_id).await.unwrap();
    assert!(log.contains("No workers with available capacity"));
}

#[tokio::test]
async fn missing_spec_fails_the_job_permanently() {
    let fx = fixture().await;
    let job_id = submit(&fx, "ghost-spec").await;
    add_worker(&fx, "ready", WorkerState::Started, WorkerStatus::Online).await;

    fx.dispatcher.cycle().await;

    // Not requeued: the job is Failed with the spec named in the error.
    assert!(fx.engine.queue_jobs("default").is_empty());
    let job = fx.store.get_job(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    let message = job.error_message.unwrap();
    assert!(message.contains("Spec 'ghost-spec' not found"), "{message}");
}

#[tokio::test]
async fn unreachable_agent_is_a_permanent_failure() {
    let fx = fixture().await;
    let job_id = submit(&fx, "greet").await;
    fx.store.create_spec("greet", "echo hello", None, "t").await.unwrap();
    // Worker claims online but nothing listens on its port.
    add_worker(&fx, "dead", WorkerState::Started, WorkerStatus::Online).await;

    fx.dispatcher.cycle().await;

    assert!(fx.engine.queue_jobs("default").is_empty());
    let job = fx.store.get_job(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error_message.unwrap().contains("dispatch failed permanently"));
}

#[tokio::test]
async fn stopped_queue_is_never_drained() {
    let fx = fixture().await;
    let job_id = submit(&fx, "greet").await;
    let queue = fx.store.get_queue_by_name("default").await.unwrap().unwrap();
    fx.store.set_queue_state(queue.id, QueueState::Paused).await.unwrap();

    fx.dispatcher.cycle().await;

    // Jobs stay queued while the queue is paused.
    assert_eq!(fx.engine.queue_jobs("default"), vec![job_id]);
    let log = fx.jobs.get_log(job_id).await.unwrap();
    assert!(!log.contains("[DISPATCH]"));
}
