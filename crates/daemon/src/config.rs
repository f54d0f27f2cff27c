// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon.

use fm_core::PrefixPaths;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot resolve a home directory; set FM_PREFIX")]
    NoPrefix,
}

/// Daemon configuration resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub prefix: PathBuf,
    pub http_port: u16,
    pub broker_port: u16,
    pub dispatch_interval: Duration,
    pub monitor_interval: Duration,
}

impl Config {
    /// Resolve configuration: `FM_PREFIX` > `~/.foreman`, ports and
    /// intervals from their env vars with documented defaults. The monitor
    /// interval is clamped to 5–300 seconds.
    pub fn load() -> Result<Self, ConfigError> {
        let prefix = match std::env::var("FM_PREFIX") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::home_dir().ok_or(ConfigError::NoPrefix)?.join(".foreman"),
        };

        Ok(Self {
            prefix,
            http_port: env_parse("FM_HTTP_PORT").unwrap_or(8000),
            broker_port: env_parse("FM_BROKER_PORT").unwrap_or(6379),
            dispatch_interval: Duration::from_secs(
                env_parse("FM_DISPATCH_INTERVAL_SECS").unwrap_or(5),
            ),
            monitor_interval: Duration::from_secs(
                env_parse::<u64>("FM_MONITOR_INTERVAL_SECS").unwrap_or(30).clamp(5, 300),
            ),
        })
    }

    pub fn paths(&self) -> PrefixPaths {
        PrefixPaths::new(&self.prefix)
    }

    /// The URL agents use to reach this daemon: the host's outbound
    /// interface address so remote workers can connect back.
    pub fn backend_url(&self) -> String {
        format!("http://{}:{}", local_ip(), self.http_port)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Best-effort outbound interface discovery: a connected UDP socket never
/// sends a packet but reveals the local address routing would pick.
pub fn local_ip() -> String {
    std::net::UdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| {
            socket.connect("8.8.8.8:80")?;
            socket.local_addr()
        })
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|_| "127.0.0.1".to_string())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
