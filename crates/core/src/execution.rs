// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution id: the `<queue_name>:<job_id>` correlation key shared by the
//! dispatcher, the worker agent and the log broker.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid execution id '{0}', expected queue_name:job_id")]
pub struct ExecutionIdError(pub String);

/// Correlation key for one dispatched job execution.
///
/// The queue name may itself contain colons only in theory; the job id is
/// always the segment after the first colon, mirroring how the original
/// wire format is split.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExecutionId {
    queue: String,
    job_id: i64,
}

impl ExecutionId {
    pub fn new(queue: impl Into<String>, job_id: i64) -> Self {
        Self { queue: queue.into(), job_id }
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn job_id(&self) -> i64 {
        self.job_id
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.queue, self.job_id)
    }
}

impl FromStr for ExecutionId {
    type Err = ExecutionIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (queue, id) = s.split_once(':').ok_or_else(|| ExecutionIdError(s.to_string()))?;
        if queue.is_empty() {
            return Err(ExecutionIdError(s.to_string()));
        }
        let job_id = id.parse::<i64>().map_err(|_| ExecutionIdError(s.to_string()))?;
        Ok(Self { queue: queue.to_string(), job_id })
    }
}

impl TryFrom<String> for ExecutionId {
    type Error = ExecutionIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ExecutionId> for String {
    fn from(id: ExecutionId) -> Self {
        id.to_string()
    }
}

#[cfg(test)]
#[path = "execution_tests.rs"]
mod tests;
