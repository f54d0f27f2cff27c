// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

fn clear_env() {
    for key in [
        "FM_PREFIX",
        "FM_HTTP_PORT",
        "FM_BROKER_PORT",
        "FM_DISPATCH_INTERVAL_SECS",
        "FM_MONITOR_INTERVAL_SECS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn defaults_apply_without_env() {
    clear_env();
    let config = Config::load().unwrap();
    assert!(config.prefix.ends_with(".foreman"));
    assert_eq!(config.http_port, 8000);
    assert_eq!(config.broker_port, 6379);
    assert_eq!(config.dispatch_interval, Duration::from_secs(5));
    assert_eq!(config.monitor_interval, Duration::from_secs(30));
}

#[test]
#[serial]
fn env_overrides_and_monitor_clamp() {
    clear_env();
    std::env::set_var("FM_PREFIX", "/srv/foreman");
    std::env::set_var("FM_HTTP_PORT", "9000");
    std::env::set_var("FM_MONITOR_INTERVAL_SECS", "2");

    let config = Config::load().unwrap();
    assert_eq!(config.prefix, PathBuf::from("/srv/foreman"));
    assert_eq!(config.http_port, 9000);
    // Below the floor: clamped up to 5 seconds.
    assert_eq!(config.monitor_interval, Duration::from_secs(5));

    std::env::set_var("FM_MONITOR_INTERVAL_SECS", "1000");
    let config = Config::load().unwrap();
    assert_eq!(config.monitor_interval, Duration::from_secs(300));

    clear_env();
}

#[test]
#[serial]
fn backend_url_carries_http_port() {
    clear_env();
    std::env::set_var("FM_HTTP_PORT", "8123");
    let config = Config::load().unwrap();
    assert!(config.backend_url().starts_with("http://"));
    assert!(config.backend_url().ends_with(":8123"));
    clear_env();
}
