// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Table definitions. Executed idempotently at every startup.

use crate::{Store, StoreError};

// Spec names are intentionally NOT declared UNIQUE: uniqueness holds only
// across active rows (soft delete keeps the old row around), enforced in
// the create path. Queue and worker names collate case-insensitively so a
// name differing only in case cannot coexist and lookups match either way.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS jobs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'Pending',
        progress INTEGER NOT NULL DEFAULT 0,
        created_by TEXT,
        created_at TEXT NOT NULL,
        started_at TEXT,
        completed_at TEXT,
        parameters TEXT,
        result TEXT,
        error_message TEXT,
        log_file_path TEXT,
        worker_name TEXT,
        queue_name TEXT,
        assigned_worker_name TEXT,
        retries INTEGER NOT NULL DEFAULT 0,
        max_retries INTEGER NOT NULL DEFAULT 3
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs (status)",
    "CREATE INDEX IF NOT EXISTS idx_jobs_assigned_worker ON jobs (assigned_worker_name)",
    r#"
    CREATE TABLE IF NOT EXISTS specs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT,
        command TEXT NOT NULL,
        created_by TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_specs_name ON specs (name)",
    r#"
    CREATE TABLE IF NOT EXISTS queues (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE COLLATE NOCASE,
        state TEXT NOT NULL DEFAULT 'stopped',
        time_limit INTEGER NOT NULL DEFAULT 1200,
        priority TEXT NOT NULL DEFAULT 'normal',
        strategy TEXT NOT NULL DEFAULT 'round_robin',
        description TEXT,
        log_file_path TEXT,
        is_default INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS workers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE COLLATE NOCASE,
        worker_type TEXT NOT NULL DEFAULT 'remote',
        hostname TEXT,
        ip_address TEXT,
        port INTEGER NOT NULL UNIQUE,
        ssh_user TEXT,
        auth_method TEXT NOT NULL DEFAULT 'key',
        ssh_private_key TEXT,
        password TEXT,
        provision INTEGER NOT NULL DEFAULT 0,
        max_jobs INTEGER NOT NULL DEFAULT 10,
        log_file_path TEXT,
        status TEXT NOT NULL DEFAULT 'offline',
        state TEXT NOT NULL DEFAULT 'stopped',
        last_seen TEXT,
        error_message TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS queue_workers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        queue_id INTEGER NOT NULL REFERENCES queues(id) ON DELETE CASCADE,
        worker_id INTEGER NOT NULL REFERENCES workers(id) ON DELETE CASCADE,
        created_at TEXT NOT NULL,
        UNIQUE (queue_id, worker_id)
    )
    "#,
];

impl Store {
    pub(crate) async fn init_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(self.pool()).await?;
        }
        Ok(())
    }
}
