// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command execution under a pseudo-terminal.
//!
//! The PTY is what defeats child-side stdio buffering: programs see an
//! interactive terminal and flush line by line. Each child gets one reader
//! thread that drains the master side until EOF, ships every completed line
//! to the broker, then reports the exit code.

use fm_core::time_fmt::format_micro_stamp;
use fm_wire::{ExecResult, LogEnvelope};
use portable_pty::{native_pty_system, CommandBuilder, PtySize};
use std::io::Read;
use std::sync::Arc;

use crate::lines::LineAssembler;
use crate::shipper::LogShipper;
use crate::state::{AgentState, ExecEvent, Execution};

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("empty or unparseable command")]
    BadCommand,
    #[error("Failed to start command: {0}")]
    Spawn(String),
}

/// Spawn `command` (shell-tokenized) plus `args` under a fresh PTY and
/// start its reader thread. Returns the child pid.
pub fn spawn_execution(
    state: &Arc<AgentState>,
    shipper: Box<dyn LogShipper>,
    execution_id: &str,
    command: &str,
    args: &[String],
) -> Result<u32, ExecError> {
    let mut argv = shlex::split(command).ok_or(ExecError::BadCommand)?;
    if argv.is_empty() {
        return Err(ExecError::BadCommand);
    }
    argv.extend(args.iter().cloned());

    tracing::info!(execution_id, command = %argv.join(" "), "executing job");

    let pty_system = native_pty_system();
    let pair = pty_system
        .openpty(PtySize { rows: 24, cols: 80, pixel_width: 0, pixel_height: 0 })
        .map_err(|e| ExecError::Spawn(e.to_string()))?;

    let mut builder = CommandBuilder::new(&argv[0]);
    builder.args(&argv[1..]);

    // The slave becomes the child's controlling TTY in a new session;
    // stdin, stdout and stderr all point at it.
    let mut child = pair.slave.spawn_command(builder).map_err(|e| ExecError::Spawn(e.to_string()))?;
    // Drop our slave handle so the master sees EOF once the child exits.
    drop(pair.slave);

    let reader =
        pair.master.try_clone_reader().map_err(|e| ExecError::Spawn(e.to_string()))?;
    let pid = child.process_id().unwrap_or(0);
    let killer = child.clone_killer();

    state.executions.lock().insert(
        execution_id.to_string(),
        Execution { pid, status: ExecResult::Running, exit_code: None, killer: Some(killer) },
    );

    let events = state.events.clone();
    let execution_id = execution_id.to_string();
    let master = pair.master;
    std::thread::spawn(move || {
        let exit_code = pump_output(execution_id.as_str(), reader, shipper, &mut child);
        drop(master);
        if events.send(ExecEvent::Exited { execution_id, exit_code }).is_err() {
            tracing::warn!("agent event loop gone, dropping exit notification");
        }
    });

    Ok(pid)
}

/// Drain the PTY until EOF, shipping each completed line, then reap the
/// child. Reading to EOF naturally covers the post-exit residue; the final
/// partial line (no trailing newline) is flushed afterwards.
fn pump_output(
    execution_id: &str,
    mut reader: Box<dyn Read + Send>,
    mut shipper: Box<dyn LogShipper>,
    child: &mut Box<dyn portable_pty::Child + Send + Sync>,
) -> i32 {
    let mut assembler = LineAssembler::new();
    let mut chunk = [0u8; 1024];

    loop {
        match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                for line in assembler.push(&chunk[..n]) {
                    ship_line(&mut shipper, execution_id, line);
                }
            }
            // On Linux the master read fails with EIO once the child exits
            // and the last slave handle closes; that is EOF for us.
            Err(_) => break,
        }
    }
    if let Some(line) = assembler.flush() {
        ship_line(&mut shipper, execution_id, line);
    }

    match child.wait() {
        Ok(status) => status.exit_code() as i32,
        Err(e) => {
            tracing::warn!(execution_id, error = %e, "failed to reap child");
            -1
        }
    }
}

fn ship_line(shipper: &mut Box<dyn LogShipper>, execution_id: &str, line: String) {
    let envelope = LogEnvelope::for_job(execution_id, format_micro_stamp(), line);
    shipper.ship(&envelope);
}

#[cfg(test)]
#[path = "exec_tests.rs"]
mod tests;
