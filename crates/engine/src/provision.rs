// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote host provisioning over SSH.
//!
//! Bootstraps a remote worker: a fresh ED25519 key pair deployed with
//! password auth, the `~/foreman` tree, and the agent binary uploaded and
//! verified. The deployment runs in the background with a step-numbered
//! tracker the HTTP layer polls.

use fm_core::{Clock, PrefixPaths, SystemClock};
use fm_store::{NewWorker, WorkerRecord};
use parking_lot::Mutex;
use serde::Serialize;
use ssh2::Session;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::workers::{WorkerError, WorkerManager};

/// Remote application directory name (under the SSH user's home).
pub const REMOTE_APP_DIR: &str = "foreman";

const TOTAL_STEPS: u32 = 7;
const SSH_TIMEOUT_MS: u32 = 30_000;
const DEPLOYMENT_IDLE_TIMEOUT_MS: u64 = 120_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentState {
    Running,
    Completed,
    Failed,
    Timeout,
}

fm_core::simple_display! {
    DeploymentState {
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Timeout => "timeout",
    }
}

/// Snapshot of one deployment's progress.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentStatus {
    pub worker_name: String,
    pub current_step: String,
    pub step_number: u32,
    pub total_steps: u32,
    pub status: DeploymentState,
    pub started_at: u64,
    pub last_updated: u64,
    pub error: Option<String>,
}

/// In-memory registry of deployments keyed by `<worker>_<epoch-secs>`.
pub struct DeploymentTracker {
    clock: SystemClock,
    entries: Mutex<HashMap<String, DeploymentStatus>>,
}

impl DeploymentTracker {
    pub fn new() -> Self {
        Self { clock: SystemClock, entries: Mutex::new(HashMap::new()) }
    }

    pub fn start(&self, worker_name: &str) -> String {
        let now = self.clock.epoch_ms();
        let id = format!("{}_{}", worker_name, now / 1000);
        self.entries.lock().insert(
            id.clone(),
            DeploymentStatus {
                worker_name: worker_name.to_string(),
                current_step: "Starting deployment...".to_string(),
                step_number: 0,
                total_steps: TOTAL_STEPS,
                status: DeploymentState::Running,
                started_at: now,
                last_updated: now,
                error: None,
            },
        );
        id
    }

    pub fn update_step(&self, id: &str, step: &str, step_number: u32) {
        let now = self.clock.epoch_ms();
        if let Some(entry) = self.entries.lock().get_mut(id) {
            entry.current_step = step.to_string();
            entry.step_number = step_number;
            entry.last_updated = now;
        }
        tracing::info!(deployment = id, step_number, step, "deployment progress");
    }

    pub fn complete(&self, id: &str, success: bool, error: Option<String>) {
        let now = self.clock.epoch_ms();
        if let Some(entry) = self.entries.lock().get_mut(id) {
            entry.status = if success { DeploymentState::Completed } else { DeploymentState::Failed };
            entry.error = error;
            entry.last_updated = now;
        }
    }

    /// Read one deployment, reporting `timeout` when a running entry has
    /// not progressed for two minutes.
    pub fn get(&self, id: &str) -> Option<DeploymentStatus> {
        self.get_at(id, self.clock.epoch_ms())
    }

    pub(crate) fn get_at(&self, id: &str, now_ms: u64) -> Option<DeploymentStatus> {
        let mut entry = self.entries.lock().get(id).cloned()?;
        if entry.status == DeploymentState::Running
            && now_ms.saturating_sub(entry.last_updated) > DEPLOYMENT_IDLE_TIMEOUT_MS
        {
            entry.status = DeploymentState::Timeout;
        }
        Some(entry)
    }

    pub fn remove(&self, id: &str) {
        self.entries.lock().remove(id);
    }

    #[cfg(test)]
    pub(crate) fn backdate(&self, id: &str, last_updated: u64) {
        if let Some(entry) = self.entries.lock().get_mut(id) {
            entry.last_updated = last_updated;
        }
    }
}

impl Default for DeploymentTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Generated key pair on the local filesystem.
pub struct SshKeyPair {
    pub private_key_path: PathBuf,
    pub public_key_path: PathBuf,
    pub public_key: String,
}

/// Generate a fresh ED25519 key pair for a remote worker via ssh-keygen.
///
/// Files land at `<prefix>/etc/ssh_keys/<short-host>-<user>.{id,pub}` with
/// 0600/0644 permissions and a `foreman-worker-...` comment that the
/// deletion path greps out of authorized_keys.
pub fn generate_worker_ssh_key(
    paths: &PrefixPaths,
    hostname: &str,
    ssh_user: &str,
) -> Result<SshKeyPair, WorkerError> {
    let keys_dir = paths.ssh_keys_dir();
    std::fs::create_dir_all(&keys_dir)?;

    let key_id = PrefixPaths::ssh_key_id(hostname, ssh_user);
    let private_key_path = paths.ssh_private_key(hostname, ssh_user);
    let public_key_path = paths.ssh_public_key(hostname, ssh_user);
    // ssh-keygen refuses to overwrite; clear any stale pair first.
    let _ = std::fs::remove_file(&private_key_path);
    let _ = std::fs::remove_file(&public_key_path);

    let output = std::process::Command::new("ssh-keygen")
        .arg("-q")
        .arg("-t")
        .arg("ed25519")
        .arg("-N")
        .arg("")
        .arg("-C")
        .arg(format!("foreman-worker-{key_id}"))
        .arg("-f")
        .arg(&private_key_path)
        .output()
        .map_err(|e| WorkerError::Ssh(format!("ssh-keygen failed to run: {e}")))?;
    if !output.status.success() {
        return Err(WorkerError::Ssh(format!(
            "ssh-keygen failed: {}",
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    // ssh-keygen writes `<file>` and `<file>.pub`; move the latter to our
    // `.pub` naming next to the `.id` private key.
    let generated_pub = PathBuf::from(format!("{}.pub", private_key_path.display()));
    std::fs::rename(&generated_pub, &public_key_path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&private_key_path, std::fs::Permissions::from_mode(0o600))?;
        std::fs::set_permissions(&public_key_path, std::fs::Permissions::from_mode(0o644))?;
    }

    let public_key = std::fs::read_to_string(&public_key_path)?.trim().to_string();
    tracing::info!(host = hostname, user = ssh_user, "generated worker SSH key pair");
    Ok(SshKeyPair { private_key_path, public_key_path, public_key })
}

/// Remove the locally generated key pair; used on deployment failure and
/// worker deletion.
pub fn cleanup_local_keys(paths: &PrefixPaths, hostname: &str, ssh_user: &str) {
    for path in [paths.ssh_private_key(hostname, ssh_user), paths.ssh_public_key(hostname, ssh_user)]
    {
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove SSH key");
            }
        }
    }
}

fn resolve_target(worker_host: Option<&str>, ip: Option<&str>) -> Result<String, WorkerError> {
    if let Some(ip) = ip.filter(|s| !s.is_empty()) {
        return Ok(ip.to_string());
    }
    let hostname =
        worker_host.filter(|s| !s.is_empty()).ok_or_else(|| {
            WorkerError::Validation("no hostname or IP address configured".to_string())
        })?;
    let addr = format!("{hostname}:22")
        .to_socket_addrs()
        .map_err(|e| WorkerError::Ssh(format!("Failed to resolve hostname '{hostname}': {e}")))?
        .next()
        .ok_or_else(|| WorkerError::Ssh(format!("Failed to resolve hostname '{hostname}'")))?;
    Ok(addr.ip().to_string())
}

fn ssh_session(target: &str) -> Result<Session, WorkerError> {
    let tcp = TcpStream::connect((target, 22))
        .map_err(|e| WorkerError::Ssh(format!("could not connect to {target}:22: {e}")))?;
    let mut session = Session::new().map_err(|e| WorkerError::Ssh(e.to_string()))?;
    session.set_timeout(SSH_TIMEOUT_MS);
    session.set_tcp_stream(tcp);
    session.handshake().map_err(|e| WorkerError::Ssh(format!("SSH handshake failed: {e}")))?;
    Ok(session)
}

fn connect_with_password(target: &str, user: &str, password: &str) -> Result<Session, WorkerError> {
    let session = ssh_session(target)?;
    session
        .userauth_password(user, password)
        .map_err(|e| WorkerError::Ssh(format!("SSH authentication failed for {user}@{target}: {e}")))?;
    Ok(session)
}

fn connect_with_key(target: &str, user: &str, key_path: &Path) -> Result<Session, WorkerError> {
    if !key_path.exists() {
        return Err(WorkerError::Ssh(format!(
            "SSH private key not found: {}",
            key_path.display()
        )));
    }
    let session = ssh_session(target)?;
    session.userauth_pubkey_file(user, None, key_path, None).map_err(|e| {
        WorkerError::Ssh(format!("SSH key authentication failed for {user}@{target}: {e}"))
    })?;
    Ok(session)
}

fn exec(session: &Session, command: &str) -> Result<(i32, String), WorkerError> {
    let mut channel =
        session.channel_session().map_err(|e| WorkerError::Ssh(e.to_string()))?;
    channel.exec(command).map_err(|e| WorkerError::Ssh(e.to_string()))?;
    let mut stdout = String::new();
    let mut stderr = String::new();
    channel.read_to_string(&mut stdout).map_err(|e| WorkerError::Ssh(e.to_string()))?;
    channel.stderr().read_to_string(&mut stderr).map_err(|e| WorkerError::Ssh(e.to_string()))?;
    channel.wait_close().map_err(|e| WorkerError::Ssh(e.to_string()))?;
    let status = channel.exit_status().map_err(|e| WorkerError::Ssh(e.to_string()))?;
    if status != 0 && !stderr.is_empty() {
        tracing::debug!(command, status, stderr = stderr.trim(), "remote command failed");
    }
    Ok((status, stdout))
}

fn exec_ok(session: &Session, command: &str, what: &str) -> Result<(), WorkerError> {
    let (status, _) = exec(session, command)?;
    if status != 0 {
        return Err(WorkerError::Ssh(format!("{what} failed with exit code {status}")));
    }
    Ok(())
}

/// Locate the agent distributable: the `fm-agent` binary installed next to
/// the running daemon.
pub fn locate_agent_binary() -> Result<PathBuf, WorkerError> {
    let exe = std::env::current_exe()?;
    let dir = exe
        .parent()
        .ok_or_else(|| WorkerError::Validation("cannot locate executable directory".to_string()))?;
    let candidate = dir.join("fm-agent");
    if candidate.exists() {
        Ok(candidate)
    } else {
        Err(WorkerError::Validation(format!(
            "agent binary not found at {}",
            candidate.display()
        )))
    }
}

/// Run the 7-step deployment for a provisionable remote worker, persisting
/// the record only after everything succeeded.
pub async fn run_deployment(manager: Arc<WorkerManager>, deployment_id: String, new: NewWorker) {
    let result = deploy_inner(&manager, &deployment_id, &new).await;
    match result {
        Ok(record) => {
            manager.deployments().complete(&deployment_id, true, None);
            tracing::info!(worker = %record.name, "remote worker deployed");
        }
        Err(e) => {
            tracing::error!(worker = %new.name, error = %e, "remote deployment failed");
            manager.deployments().complete(&deployment_id, false, Some(e.to_string()));
            let host = new.hostname.as_deref().or(new.ip_address.as_deref());
            if let (Some(host), Some(user)) = (host, new.ssh_user.as_deref()) {
                cleanup_local_keys(manager.paths(), host, user);
            }
        }
    }
}

async fn deploy_inner(
    manager: &Arc<WorkerManager>,
    deployment_id: &str,
    new: &NewWorker,
) -> Result<WorkerRecord, WorkerError> {
    let tracker = manager.deployments();
    let paths = manager.paths().clone();

    tracker.update_step(deployment_id, "Validating connection parameters...", 1);
    let hostname = new
        .hostname
        .clone()
        .or_else(|| new.ip_address.clone())
        .ok_or_else(|| WorkerError::Validation("hostname or IP address required".to_string()))?;
    let ssh_user = new
        .ssh_user
        .clone()
        .ok_or_else(|| WorkerError::Validation("ssh_user required".to_string()))?;
    let password = new
        .password
        .clone()
        .ok_or_else(|| WorkerError::Validation("password required for provisioning".to_string()))?;
    let target = resolve_target(Some(&hostname), new.ip_address.as_deref())?;

    tracker.update_step(deployment_id, "Locating worker agent binary...", 2);
    let agent_binary = locate_agent_binary()?;

    tracker.update_step(deployment_id, "Deploying SSH key...", 3);
    let keys = generate_worker_ssh_key(&paths, &hostname, &ssh_user)?;
    let public_key = keys.public_key.clone();
    let target_for_key = target.clone();
    let user_for_key = ssh_user.clone();
    tokio::task::spawn_blocking(move || {
        let session = connect_with_password(&target_for_key, &user_for_key, &password)?;
        exec_ok(&session, "mkdir -p ~/.ssh && chmod 700 ~/.ssh", "prepare ~/.ssh")?;
        exec_ok(
            &session,
            &format!("echo \"{public_key}\" >> ~/.ssh/authorized_keys && chmod 600 ~/.ssh/authorized_keys"),
            "deploy public key",
        )
    })
    .await
    .map_err(|e| WorkerError::Ssh(e.to_string()))??;

    tracker.update_step(deployment_id, "Setting up remote environment...", 4);
    let key_path = keys.private_key_path.clone();
    let target_env = target.clone();
    let user_env = ssh_user.clone();
    tokio::task::spawn_blocking(move || {
        let session = connect_with_key(&target_env, &user_env, &key_path)?;
        exec_ok(
            &session,
            &format!(
                "mkdir -p ~/{REMOTE_APP_DIR}/bin ~/{REMOTE_APP_DIR}/etc ~/{REMOTE_APP_DIR}/lib ~/{REMOTE_APP_DIR}/logs/workers"
            ),
            "create remote directories",
        )
    })
    .await
    .map_err(|e| WorkerError::Ssh(e.to_string()))??;

    tracker.update_step(deployment_id, "Installing worker agent...", 5);
    let key_path = keys.private_key_path.clone();
    let target_install = target.clone();
    let user_install = ssh_user.clone();
    tokio::task::spawn_blocking(move || {
        let session = connect_with_key(&target_install, &user_install, &key_path)?;
        let data = std::fs::read(&agent_binary)?;
        let remote_path = format!("{REMOTE_APP_DIR}/bin/fm-agent");
        let mut remote = session
            .scp_send(Path::new(&remote_path), 0o755, data.len() as u64, None)
            .map_err(|e| WorkerError::Ssh(format!("upload failed: {e}")))?;
        remote.write_all(&data)?;
        remote.send_eof().map_err(|e| WorkerError::Ssh(e.to_string()))?;
        remote.wait_eof().map_err(|e| WorkerError::Ssh(e.to_string()))?;
        remote.close().map_err(|e| WorkerError::Ssh(e.to_string()))?;
        remote.wait_close().map_err(|e| WorkerError::Ssh(e.to_string()))?;

        exec_ok(
            &session,
            &format!("~/{REMOTE_APP_DIR}/bin/fm-agent --version"),
            "verify agent install",
        )
    })
    .await
    .map_err(|e| WorkerError::Ssh(e.to_string()))??;

    tracker.update_step(deployment_id, "Verifying deployment...", 6);
    let record = manager.store().create_worker(new).await?;

    tracker.update_step(deployment_id, "Deployment completed successfully!", 7);
    Ok(record)
}

/// Launch the agent on the remote host in the background.
pub async fn start_remote_agent(
    paths: &PrefixPaths,
    worker: &WorkerRecord,
    backend_url: &str,
    broker_secret: &str,
) -> Result<(), WorkerError> {
    let hostname = worker.hostname.clone().unwrap_or_default();
    let ssh_user = worker
        .ssh_user
        .clone()
        .ok_or_else(|| WorkerError::Validation("no SSH user configured".to_string()))?;
    let target = resolve_target(Some(&hostname), worker.ip_address.as_deref())?;
    let key_path = paths.ssh_private_key(&hostname, &ssh_user);

    let command = format!(
        "cd ~/{REMOTE_APP_DIR} && REDIS_PASSWORD='{broker_secret}' nohup bin/fm-agent \
         --backend-url {backend_url} --worker-name '{name}' --port {port} --max-jobs {max_jobs} \
         >> logs/workers/{log_name}.log 2>&1 &",
        name = worker.name,
        port = worker.port,
        max_jobs = worker.max_jobs,
        log_name = worker.name.to_lowercase(),
    );

    let user = ssh_user.clone();
    tokio::task::spawn_blocking(move || {
        let session = connect_with_key(&target, &user, &key_path)?;
        exec_ok(&session, &command, "start remote agent")
    })
    .await
    .map_err(|e| WorkerError::Ssh(e.to_string()))?
}

/// Kill the remote agent by its command-line signature.
pub async fn stop_remote_agent(paths: &PrefixPaths, worker: &WorkerRecord) -> Result<(), WorkerError> {
    let hostname = worker.hostname.clone().unwrap_or_default();
    let ssh_user = worker
        .ssh_user
        .clone()
        .ok_or_else(|| WorkerError::Validation("no SSH user configured".to_string()))?;
    let target = resolve_target(Some(&hostname), worker.ip_address.as_deref())?;
    let key_path = paths.ssh_private_key(&hostname, &ssh_user);
    let command = format!("pkill -f 'fm-agent.*--worker-name {}' || true", worker.name);

    tokio::task::spawn_blocking(move || {
        let session = connect_with_key(&target, &ssh_user, &key_path)?;
        exec_ok(&session, &command, "stop remote agent")
    })
    .await
    .map_err(|e| WorkerError::Ssh(e.to_string()))?
}

/// Tear down a deleted remote worker: remove the installed tree and the
/// deployed authorized_keys line, then the local key files. Each step is
/// best-effort; the record is deleted regardless.
pub async fn teardown_remote(paths: &PrefixPaths, worker: &WorkerRecord) -> Result<(), WorkerError> {
    let hostname = worker.hostname.clone().unwrap_or_default();
    let Some(ssh_user) = worker.ssh_user.clone() else {
        return Ok(());
    };
    let target = resolve_target(Some(&hostname), worker.ip_address.as_deref())?;
    let key_path = paths.ssh_private_key(&hostname, &ssh_user);
    let key_id = PrefixPaths::ssh_key_id(&hostname, &ssh_user);

    if key_path.exists() {
        let user = ssh_user.clone();
        let patterns = [
            format!("foreman-worker-{key_id}$"),
            format!("foreman-worker-.*-{user}$"),
        ];
        let result = tokio::task::spawn_blocking(move || {
            let session = connect_with_key(&target, &user, &key_path)?;
            let _ = exec(&session, &format!("rm -rf ~/{REMOTE_APP_DIR}"));
            for pattern in &patterns {
                let _ = exec(
                    &session,
                    &format!("sed -i '/{pattern}/d' ~/.ssh/authorized_keys"),
                );
            }
            Ok::<(), WorkerError>(())
        })
        .await
        .map_err(|e| WorkerError::Ssh(e.to_string()))?;
        if let Err(e) = result {
            tracing::warn!(worker = %worker.name, error = %e, "remote teardown incomplete");
        }
    }

    cleanup_local_keys(paths, &hostname, &ssh_user);
    Ok(())
}

#[cfg(test)]
#[path = "provision_tests.rs"]
mod tests;
