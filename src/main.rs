// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::Context;
use std::env;
use std::sync::Arc;
use tokio::net::TcpListener;

use the_switchboard::backends::{BackendRegistry, ProviderCatalog};
use the_switchboard::config::load_and_validate_config;
use the_switchboard::discovery::{discover, UnitCatalog};
use the_switchboard::engine::{ExecutionEngine, WorkerPool};
use the_switchboard::gateway::{GatewayCatalog, GatewayRouter};
use the_switchboard::logs::LogWriter;
use the_switchboard::observability::init_tracing;
use the_switchboard::scheduler::Scheduler;
use the_switchboard::server::{build_router, AppState};

const DEFAULT_CONFIG_FILE: &str = "switchboard.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");

    let config_file = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());
    let config = load_and_validate_config(&config_file)
        .with_context(|| format!("failed to load {}", config_file))?;
    tracing::info!(app_id = %config.app_id, config = %config_file, "configuration loaded");

    let registry = discover(&config.units_dir, &UnitCatalog::with_builtins())
        .context("unit discovery failed")?;
    let backends = BackendRegistry::from_config(
        &config.models,
        &config.program_models,
        &ProviderCatalog::with_builtins(),
    );
    let plan = GatewayRouter::new(GatewayCatalog::with_builtins())
        .plan(&registry)
        .context("route planning failed")?;

    let pool = match config.server.sync_worker_threads {
        Some(size) => WorkerPool::new(size),
        None => WorkerPool::with_cpu_count(),
    };
    let pool = Arc::new(pool);
    let log_writer = LogWriter::start().context("failed to start the log writer")?;
    let backends = Arc::new(backends);
    let engine = Arc::new(
        ExecutionEngine::new(&config.logs_dir)
            .with_pool(Arc::clone(&pool))
            .with_backends(Arc::clone(&backends))
            .with_log_writer(log_writer.clone()),
    );

    let scheduler = config.scheduler.enabled.then(|| {
        let scheduler = Scheduler::with_jobs(Arc::clone(&engine), &plan.cron_jobs);
        scheduler.start();
        scheduler
    });

    let state = AppState {
        engine,
        registry: Arc::new(registry),
        plan: Arc::new(plan),
        backends,
        trace_max_depth: config.tracing.max_depth,
    };
    let app = build_router(state).context("failed to build routes")?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(%addr, "switchboard listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failure")?;

    if let Some(scheduler) = &scheduler {
        scheduler.shutdown().await;
    }
    pool.close();
    log_writer.shutdown().await;
    tracing::info!("switchboard stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
