// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

async fn built_context() -> (AppContext, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = Config {
        prefix: dir.path().to_path_buf(),
        http_port: 8000,
        broker_port: 6379,
        dispatch_interval: std::time::Duration::from_secs(5),
        monitor_interval: std::time::Duration::from_secs(30),
    };
    config.paths().ensure_layout().unwrap();
    let store = Store::open_in_memory().await.unwrap();
    (AppContext::build(config, store), dir)
}

#[tokio::test]
async fn seed_creates_system_worker_and_default_queue() {
    let (context, dir) = built_context().await;
    let paths = PrefixPaths::new(dir.path());

    context.seed(&paths).await.unwrap();

    let system = context.store.get_worker_by_name(fm_store::SYSTEM_WORKER).await.unwrap().unwrap();
    assert_eq!(system.max_jobs, 4);

    let default = context.store.default_queue().await.unwrap().unwrap();
    assert_eq!(default.name, "default");
    assert_eq!(default.state, QueueState::Started);
    assert!(default.is_default);

    // Seeding twice changes nothing.
    context.seed(&paths).await.unwrap();
    let queues = context.store.list_queues().await.unwrap();
    assert_eq!(queues.len(), 1);
}

#[tokio::test]
async fn seed_respects_an_existing_default_queue() {
    let (context, dir) = built_context().await;
    let paths = PrefixPaths::new(dir.path());
    let mut custom = NewQueue::named("mainline");
    custom.is_default = true;
    context.store.create_queue(&custom).await.unwrap();

    context.seed(&paths).await.unwrap();

    let default = context.store.default_queue().await.unwrap().unwrap();
    assert_eq!(default.name, "mainline");
    assert!(context.store.get_queue_by_name("default").await.unwrap().is_none());
}
