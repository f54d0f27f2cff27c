// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn layout_is_rooted_at_prefix() {
    let paths = PrefixPaths::new("/opt/foreman");
    assert_eq!(paths.database(), PathBuf::from("/opt/foreman/lib/foreman.db"));
    assert_eq!(paths.broker_secret(), PathBuf::from("/opt/foreman/etc/.redis_password"));
    assert_eq!(paths.job_log(17), PathBuf::from("/opt/foreman/logs/jobs/17.log"));
    assert_eq!(paths.broker_pidfile(), PathBuf::from("/opt/foreman/tmp/redis.pid"));
}

#[test]
fn worker_and_queue_logs_lowercase_names() {
    let paths = PrefixPaths::new("/p");
    assert_eq!(paths.worker_log("System"), PathBuf::from("/p/logs/workers/system.log"));
    assert_eq!(paths.queue_log("Builds"), PathBuf::from("/p/logs/queues/builds.log"));
}

#[yare::parameterized(
    fqdn = { "web01.example.com", "deploy", "web01-deploy" },
    short = { "web01", "deploy", "web01-deploy" },
    ip = { "10.0.0.4", "root", "10-root" },
    empty = { "", "ops", "unknown-ops" },
)]
fn ssh_key_id_uses_short_hostname(hostname: &str, user: &str, expected: &str) {
    assert_eq!(PrefixPaths::ssh_key_id(hostname, user), expected);
}

#[test]
fn ssh_key_paths_pair_up() {
    let paths = PrefixPaths::new("/p");
    assert_eq!(
        paths.ssh_private_key("web01.example.com", "deploy"),
        PathBuf::from("/p/etc/ssh_keys/web01-deploy.id")
    );
    assert_eq!(
        paths.ssh_public_key("web01.example.com", "deploy"),
        PathBuf::from("/p/etc/ssh_keys/web01-deploy.pub")
    );
}
