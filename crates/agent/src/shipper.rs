// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log shipping into the broker's shared `logs` list.
//!
//! The PTY reader thread owns a blocking broker connection so line order
//! within one execution is preserved end to end.

use fm_wire::LogEnvelope;
use redis::Commands;

use crate::state::BrokerSettings;

/// Destination for assembled output lines. The broker implementation is the
/// production path; tests substitute a channel.
pub trait LogShipper: Send + 'static {
    fn ship(&mut self, envelope: &LogEnvelope);
}

/// Ships envelopes with LPUSH onto the shared `logs` list, reconnecting
/// lazily. A line is dropped (with a warning) only when a reconnect attempt
/// fails too; execution is never blocked on the broker.
pub struct BrokerShipper {
    settings: BrokerSettings,
    conn: Option<redis::Connection>,
}

impl BrokerShipper {
    pub fn new(settings: BrokerSettings) -> Self {
        Self { settings, conn: None }
    }

    fn connect(&mut self) -> bool {
        match redis::Client::open(self.settings.url()) {
            Ok(client) => match client.get_connection() {
                Ok(conn) => {
                    self.conn = Some(conn);
                    true
                }
                Err(e) => {
                    tracing::warn!(error = %e, "broker connection failed");
                    false
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "invalid broker settings");
                false
            }
        }
    }

    fn push(&mut self, payload: &str) -> redis::RedisResult<()> {
        match self.conn.as_mut() {
            Some(conn) => {
                let _: i64 = conn.lpush("logs", payload)?;
                Ok(())
            }
            None => Err(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "not connected",
            ))),
        }
    }
}

impl LogShipper for BrokerShipper {
    fn ship(&mut self, envelope: &LogEnvelope) {
        let payload = match envelope.encode() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode log envelope");
                return;
            }
        };

        if self.conn.is_none() && !self.connect() {
            tracing::warn!("broker unavailable, dropping log line");
            return;
        }

        if let Err(e) = self.push(&payload) {
            // One reconnect attempt, then give up on this line.
            tracing::warn!(error = %e, "broker push failed, reconnecting");
            self.conn = None;
            if self.connect() {
                if let Err(e) = self.push(&payload) {
                    tracing::warn!(error = %e, "broker push failed after reconnect, dropping line");
                }
            }
        }
    }
}
