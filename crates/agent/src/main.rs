// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker agent entry point.
//!
//! Launched by the worker manager (locally as a subprocess, remotely over
//! SSH). Executes commands under a PTY and streams their output into the
//! shared log broker.

use clap::Parser;
use fm_agent::{run_server, AgentConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fm-agent", version, about = "Foreman worker agent - HTTP command executor")]
struct Args {
    /// Dispatcher base URL, e.g. http://10.0.0.1:8000
    #[arg(long)]
    backend_url: String,

    /// Worker name this agent represents
    #[arg(long)]
    worker_name: String,

    /// HTTP bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// HTTP server port
    #[arg(long)]
    port: u16,

    /// Maximum concurrent jobs
    #[arg(long, default_value_t = 10)]
    max_jobs: usize,
}

fn port_available(host: &str, port: u16) -> bool {
    std::net::TcpListener::bind((host, port)).is_ok()
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    if !args.backend_url.starts_with("http://") && !args.backend_url.starts_with("https://") {
        eprintln!("error: backend URL must start with http:// or https://");
        std::process::exit(1);
    }
    if args.max_jobs < 1 {
        eprintln!("error: max-jobs must be at least 1");
        std::process::exit(1);
    }
    if !port_available(&args.host, args.port) {
        eprintln!("error: port {} is not available on {}", args.port, args.host);
        std::process::exit(1);
    }

    let config = AgentConfig {
        backend_url: args.backend_url,
        worker_name: args.worker_name,
        host: args.host,
        port: args.port,
        max_jobs: args.max_jobs,
    };

    if let Err(e) = run_server(config).await {
        eprintln!("error: worker agent failed: {e}");
        std::process::exit(1);
    }
}
