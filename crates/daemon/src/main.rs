// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Foreman daemon (fmd)
//!
//! Background process that owns the dispatch pipeline: the persistent
//! store, the queue engine and dispatcher loop, the worker manager with
//! its health monitor, the log broker and its consumer, and the HTTP API.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;
mod context;
mod http;

use fs2::FileExt;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::context::AppContext;

#[tokio::main]
async fn main() {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("fmd {}", env!("CARGO_PKG_VERSION"));
                return;
            }
            "--help" | "-h" | "help" => {
                println!("fmd {}", env!("CARGO_PKG_VERSION"));
                println!("Foreman daemon - persists jobs, assigns them to queues and");
                println!("dispatches them to worker agents.");
                println!();
                println!("USAGE:");
                println!("    fmd");
                println!();
                println!("Configuration comes from the environment:");
                println!("    FM_PREFIX                  state directory (default ~/.foreman)");
                println!("    FM_HTTP_PORT               HTTP API port (default 8000)");
                println!("    FM_BROKER_PORT             log broker port (default 6379)");
                println!("    FM_DISPATCH_INTERVAL_SECS  dispatcher poll interval (default 5)");
                println!("    FM_MONITOR_INTERVAL_SECS   health monitor interval (default 30)");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return;
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: fmd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };
    let paths = config.paths();
    if let Err(e) = paths.ensure_layout() {
        eprintln!("error: cannot create state directories under {}: {e}", config.prefix.display());
        std::process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("FM_LOG")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // One dispatcher per prefix: hold an exclusive lock for our lifetime.
    let lock_file = match std::fs::OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(paths.daemon_lock())
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("error: cannot open lock file: {e}");
            std::process::exit(1);
        }
    };
    if lock_file.try_lock_exclusive().is_err() {
        eprintln!("fmd is already running (lock held on {})", paths.daemon_lock().display());
        std::process::exit(1);
    }
    {
        use std::io::Write;
        let _ = writeln!(&lock_file, "{}", std::process::id());
    }

    info!(prefix = %config.prefix.display(), port = config.http_port, "starting foreman daemon");

    if let Err(e) = run(config).await {
        error!(error = %e, "daemon failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
    info!("shutdown complete");
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let paths = config.paths();
    let store = fm_store::Store::open(&paths.database()).await?;
    let context = AppContext::build(config.clone(), store);
    context.seed(&paths).await?;

    // The broker is best-effort at startup: without it, agents buffer
    // nothing and log lines are lost, but dispatch still works.
    if let Err(e) = context.ingestor.start_broker() {
        error!(error = %e, "log broker unavailable, continuing without it");
    }

    let shutdown = CancellationToken::new();
    let consumer = tokio::spawn(context.ingestor.clone().run_consumer(shutdown.clone()));
    let monitor = tokio::spawn(fm_engine::monitor::run_health_monitor(
        context.workers.clone(),
        config.monitor_interval,
        shutdown.clone(),
    ));

    let restored = context.queues.restore().await?;
    info!(restored = restored.restored, reset = restored.reset_from_running, "queues restored");

    context.workers.start_all().await;

    let dispatcher = tokio::spawn(context.dispatcher.clone().run(shutdown.clone()));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.http_port)).await?;
    info!(port = config.http_port, "HTTP API listening");
    let app = http::router(context.clone());
    let server_token = shutdown.clone();
    let server = async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_token.cancelled().await })
            .await
    };
    tokio::pin!(server);

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::select! {
        result = &mut server => result?,
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = sigint.recv() => info!("received SIGINT"),
    }

    shutdown.cancel();
    for (name, handle) in [("dispatcher", dispatcher), ("monitor", monitor), ("consumer", consumer)]
    {
        if tokio::time::timeout(Duration::from_secs(10), handle).await.is_err() {
            warn!(task = name, "background task did not stop in time");
        }
    }
    context.workers.shutdown();
    Ok(())
}
