// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::{NewQueue, NewWorker};
use fm_core::WorkerType;

async fn store() -> Store {
    Store::open_in_memory().await.unwrap()
}

#[tokio::test]
async fn assignment_is_idempotent_per_pair() {
    let store = store().await;
    let queue = store.create_queue(&NewQueue::named("q")).await.unwrap();
    let worker = store.create_worker(&NewWorker::named("w", WorkerType::Local)).await.unwrap();

    assert!(store.assign_worker_to_queue(worker.id, queue.id).await.unwrap());
    assert!(store.assign_worker_to_queue(worker.id, queue.id).await.unwrap());

    let workers = store.workers_for_queue(queue.id).await.unwrap();
    assert_eq!(workers.len(), 1);
    assert_eq!(workers[0].id, worker.id);
}

#[tokio::test]
async fn missing_sides_refuse_assignment() {
    let store = store().await;
    let queue = store.create_queue(&NewQueue::named("q")).await.unwrap();
    assert!(!store.assign_worker_to_queue(999, queue.id).await.unwrap());
    assert!(!store.assign_worker_to_queue(1, 999).await.unwrap());
}

#[tokio::test]
async fn workers_come_back_in_id_order() {
    let store = store().await;
    let queue = store.create_queue(&NewQueue::named("q")).await.unwrap();
    let mut ids = Vec::new();
    for name in ["c", "a", "b"] {
        let worker = store.create_worker(&NewWorker::named(name, WorkerType::Local)).await.unwrap();
        ids.push(worker.id);
    }
    // Assign out of order; retrieval is id ascending regardless.
    for id in ids.iter().rev() {
        store.assign_worker_to_queue(*id, queue.id).await.unwrap();
    }
    let got: Vec<i64> =
        store.workers_for_queue(queue.id).await.unwrap().iter().map(|w| w.id).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(got, sorted);
}

#[tokio::test]
async fn unassign_and_cascade_on_delete() {
    let store = store().await;
    let queue = store.create_queue(&NewQueue::named("q")).await.unwrap();
    let worker = store.create_worker(&NewWorker::named("w", WorkerType::Local)).await.unwrap();
    store.assign_worker_to_queue(worker.id, queue.id).await.unwrap();

    assert!(store.unassign_worker_from_queue(worker.id, queue.id).await.unwrap());
    assert!(!store.unassign_worker_from_queue(worker.id, queue.id).await.unwrap());

    // Re-assign, then delete the queue: the pair row must disappear.
    store.assign_worker_to_queue(worker.id, queue.id).await.unwrap();
    store.delete_queue(queue.id).await.unwrap();
    let queues = store.queues_for_worker(worker.id).await.unwrap();
    assert!(queues.is_empty());
}

#[tokio::test]
async fn lookup_by_queue_name_uses_canonical_resolution() {
    let store = store().await;
    let queue = store.create_queue(&NewQueue::named("Main")).await.unwrap();
    let worker = store.create_worker(&NewWorker::named("w", WorkerType::Local)).await.unwrap();
    store.assign_worker_to_queue(worker.id, queue.id).await.unwrap();

    let found = store.workers_for_queue_name("main").await.unwrap();
    assert_eq!(found.len(), 1);
    assert!(store.workers_for_queue_name("ghost").await.unwrap().is_empty());
}
