//! Edge security gate.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request      ┌──────────────────────────────────────────────────┐
//!     ────────────────────┼─▶ request id ─▶ trace ─▶ edge gate ─▶ timeout    │
//!                         │                            │                     │
//!                         │              reject / redirect       forward ────┼──▶ Upstream
//!                         │                                                  │
//!                         │  ┌──────────────────── SecurityCore ───────────┐ │
//!                         │  │ rate limiter │ suspicion │ login │ csrf     │ │
//!                         │  └─────────────────────────────────────────────┘ │
//!                         │        ▲                        ▲                │
//!                         │     sweeper                 admin API            │
//!                         └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use reagent_gate::admin::{serve_admin, AdminState};
use reagent_gate::config::load_config;
use reagent_gate::lifecycle::{Shutdown, Sweeper};
use reagent_gate::observability::{logging, metrics};
use reagent_gate::security::clock::MonotonicClock;
use reagent_gate::{HttpServer, SecurityCore};

#[derive(Parser)]
#[command(name = "reagent-gate")]
#[command(about = "Edge security gate for web applications", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "reagent-gate starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        api_limit = config.rate_limit.api_limit,
        suspicion_threshold = config.suspicion.threshold,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let core = SecurityCore::new(&config, Arc::new(MonotonicClock::new()))?;
    let shutdown = Shutdown::new();

    let sweeper = Sweeper::new(
        core.clone(),
        Duration::from_secs(config.csrf.sweep_interval_secs),
    );
    let sweeper_task = tokio::spawn(sweeper.run(shutdown.subscribe()));

    let admin_task = if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        let state = AdminState::new(core.clone(), &config.admin.api_key);
        Some(tokio::spawn(serve_admin(listener, state, shutdown.subscribe())))
    } else {
        None
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tokio::spawn(shutdown.clone().trigger_on_signal());

    let server = HttpServer::new(config, core);
    server.run(listener, shutdown.subscribe()).await?;

    // The server returns on its own only after shutdown; make sure the rest follow
    shutdown.trigger();
    if let Some(task) = admin_task {
        if let Ok(Err(e)) = task.await {
            tracing::error!(error = %e, "Admin API failed");
        }
    }
    let _ = sweeper_task.await;

    tracing::info!("Shutdown complete");
    Ok(())
}
