// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker selection strategies for queue dispatch.

use serde::{Deserialize, Serialize};

/// How a queue picks among its eligible workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStrategy {
    /// Rotate through workers in id order.
    RoundRobin,
    /// Pick the worker with the fewest running jobs.
    LeastLoaded,
    /// Pick a worker at random.
    Random,
    /// Pick the highest-priority worker (lowest id).
    Priority,
}

crate::simple_display! {
    DispatchStrategy {
        RoundRobin => "round_robin",
        LeastLoaded => "least_loaded",
        Random => "random",
        Priority => "priority",
    }
}

crate::simple_from_str! {
    DispatchStrategy ("unknown dispatch strategy") {
        "round_robin" => RoundRobin,
        "least_loaded" => LeastLoaded,
        "random" => Random,
        "priority" => Priority,
    }
}

impl DispatchStrategy {
    /// Human-readable description, surfaced by the queue API.
    pub fn description(self) -> &'static str {
        match self {
            DispatchStrategy::RoundRobin => "Distribute jobs evenly across workers in rotation",
            DispatchStrategy::LeastLoaded => "Send jobs to the worker with the least current load",
            DispatchStrategy::Random => "Randomly select a worker for each job",
            DispatchStrategy::Priority => "Select workers based on priority assignment",
        }
    }

    pub fn all() -> [DispatchStrategy; 4] {
        [
            DispatchStrategy::RoundRobin,
            DispatchStrategy::LeastLoaded,
            DispatchStrategy::Random,
            DispatchStrategy::Priority,
        ]
    }
}

impl Default for DispatchStrategy {
    fn default() -> Self {
        DispatchStrategy::RoundRobin
    }
}
