// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status callbacks to the dispatcher.

use fm_wire::StatusCallback;
use std::time::Duration;

/// POST a status callback to `{backend}/api/node/status`. Failures are
/// logged and swallowed: losing a callback must never take down the agent
/// or the execution.
pub async fn post_status(client: &reqwest::Client, backend_url: &str, callback: &StatusCallback) {
    let url = format!("{}/api/node/status", backend_url.trim_end_matches('/'));
    let result = client
        .post(&url)
        .json(callback)
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .and_then(|r| r.error_for_status());

    if let Err(e) = result {
        tracing::error!(
            execution_id = %callback.execution_id,
            status = %callback.status,
            error = %e,
            "failed to notify backend"
        );
    }
}
