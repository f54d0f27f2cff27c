// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timestamp formatting shared by log writers and the worker agent.

use chrono::Utc;

/// `YYYY-MM-DD HH:MM:SS` stamp for bracketed log prefixes.
pub fn format_local_stamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// ISO-8601 with microseconds, as carried inside broker log envelopes.
pub fn format_micro_stamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}
