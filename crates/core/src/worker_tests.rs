// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    started_online = { WorkerState::Started, WorkerStatus::Online, true },
    started_offline = { WorkerState::Started, WorkerStatus::Offline, false },
    paused_online = { WorkerState::Paused, WorkerStatus::Online, false },
    stopped_online = { WorkerState::Stopped, WorkerStatus::Online, false },
    failed_online = { WorkerState::Failed, WorkerStatus::Online, false },
    started_provisioning = { WorkerState::Started, WorkerStatus::Provisioning, false },
)]
fn dispatch_eligibility(state: WorkerState, status: WorkerStatus, eligible: bool) {
    assert_eq!(dispatch_eligible(state, status), eligible);
}

#[test]
fn enums_round_trip() {
    assert_eq!("remote".parse::<WorkerType>().unwrap(), WorkerType::Remote);
    assert_eq!("paused".parse::<WorkerState>().unwrap(), WorkerState::Paused);
    assert_eq!("provisioning".parse::<WorkerStatus>().unwrap(), WorkerStatus::Provisioning);
    assert_eq!("password".parse::<AuthMethod>().unwrap(), AuthMethod::Password);
    assert!("ssh".parse::<AuthMethod>().is_err());
}
