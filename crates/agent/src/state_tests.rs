// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn broker_host_falls_back_to_backend_host() {
    std::env::remove_var("REDIS_HOST");
    std::env::remove_var("REDIS_PORT");
    std::env::remove_var("REDIS_PASSWORD");

    let settings = BrokerSettings::from_env("http://10.1.2.3:8000");
    assert_eq!(settings.host, "10.1.2.3");
    assert_eq!(settings.port, 6379);
    assert!(settings.password.is_none());
    assert_eq!(settings.url(), "redis://10.1.2.3:6379/0");
}

#[test]
#[serial]
fn env_overrides_win_and_password_lands_in_url() {
    std::env::set_var("REDIS_HOST", "broker.internal");
    std::env::set_var("REDIS_PORT", "6380");
    std::env::set_var("REDIS_PASSWORD", "s3cret");

    let settings = BrokerSettings::from_env("http://backend:8000");
    assert_eq!(settings.host, "broker.internal");
    assert_eq!(settings.port, 6380);
    assert_eq!(settings.url(), "redis://:s3cret@broker.internal:6380/0");

    std::env::remove_var("REDIS_HOST");
    std::env::remove_var("REDIS_PORT");
    std::env::remove_var("REDIS_PASSWORD");
}

#[test]
#[serial]
fn https_and_pathless_urls_parse() {
    std::env::remove_var("REDIS_HOST");
    let settings = BrokerSettings::from_env("https://orchestrator.example.com:8443/api");
    assert_eq!(settings.host, "orchestrator.example.com");
}
