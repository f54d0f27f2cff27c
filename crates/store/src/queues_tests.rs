// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::Store;

async fn store() -> Store {
    Store::open_in_memory().await.unwrap()
}

#[tokio::test]
async fn create_and_lookup_case_insensitively() {
    let store = store().await;
    let created = store.create_queue(&NewQueue::named("Builds")).await.unwrap();
    assert_eq!(created.state, QueueState::Stopped);
    assert_eq!(created.priority, QueuePriority::Normal);

    // Lookup with different casing resolves to the stored canonical name.
    let found = store.get_queue_by_name("builds").await.unwrap().unwrap();
    assert_eq!(found.name, "Builds");
    assert_eq!(found.id, created.id);
}

#[tokio::test]
async fn duplicate_names_are_refused_even_across_case() {
    let store = store().await;
    store.create_queue(&NewQueue::named("builds")).await.unwrap();
    let err = store.create_queue(&NewQueue::named("BUILDS")).await.unwrap_err();
    assert!(matches!(err, StoreError::Duplicate(_)));
}

#[tokio::test]
async fn at_most_one_default_queue() {
    let store = store().await;
    let mut first = NewQueue::named("one");
    first.is_default = true;
    let first = store.create_queue(&first).await.unwrap();
    assert!(first.is_default);

    let mut second = NewQueue::named("two");
    second.is_default = true;
    let second = store.create_queue(&second).await.unwrap();
    assert!(second.is_default);

    // The first queue lost the flag in the same transaction.
    let first = store.get_queue(first.id).await.unwrap().unwrap();
    assert!(!first.is_default);

    let default = store.default_queue().await.unwrap().unwrap();
    assert_eq!(default.id, second.id);

    // Promoting via update clears the other row too.
    let update = QueueUpdate { is_default: Some(true), ..Default::default() };
    store.update_queue(first.id, &update).await.unwrap();
    let defaults: Vec<_> = store
        .list_queues()
        .await
        .unwrap()
        .into_iter()
        .filter(|q| q.is_default)
        .collect();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].id, first.id);
}

#[tokio::test]
async fn started_queues_order_by_priority() {
    let store = store().await;
    for (name, priority) in [
        ("low", QueuePriority::Low),
        ("crit", QueuePriority::Critical),
        ("norm", QueuePriority::Normal),
        ("high", QueuePriority::High),
    ] {
        let mut queue = NewQueue::named(name);
        queue.state = QueueState::Started;
        queue.priority = priority;
        store.create_queue(&queue).await.unwrap();
    }
    let mut stopped = NewQueue::named("idle");
    stopped.priority = QueuePriority::Critical;
    store.create_queue(&stopped).await.unwrap();

    let names: Vec<String> =
        store.list_started_queues().await.unwrap().into_iter().map(|q| q.name).collect();
    assert_eq!(names, vec!["crit", "high", "norm", "low"]);
}

#[tokio::test]
async fn state_changes_and_default_protection() {
    let store = store().await;
    let mut new = NewQueue::named("main");
    new.is_default = true;
    let queue = store.create_queue(&new).await.unwrap();

    let updated = store.set_queue_state(queue.id, QueueState::Started).await.unwrap().unwrap();
    assert_eq!(updated.state, QueueState::Started);

    let err = store.delete_queue(queue.id).await.unwrap_err();
    assert!(matches!(err, StoreError::Protected(_)));

    let other = store.create_queue(&NewQueue::named("scratch")).await.unwrap();
    assert!(store.delete_queue(other.id).await.unwrap());
    assert!(store.get_queue(other.id).await.unwrap().is_none());
}
