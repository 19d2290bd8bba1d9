//! # IDV Node
//!
//! ```text
//! IDV_MODE=standalone  queue + gate + delivery, tasks run in-process
//! IDV_MODE=master      same, tasks run on workers connected to IDV_WORKER_LISTEN
//! IDV_MODE=worker      connects to IDV_MASTER_ADDR and runs delegated tasks
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use idv_01_task_queue::CompletionRegistry;
use idv_04_callback_delivery::{PredicateRegistry, ReqwestTransport, ResponseHandlerRegistry};
use idv_telemetry::{init_logging, PrometheusObserver};
use node_runtime::adapters::{admin_router, open_store, serve_admin, InMemoryLedger};
use node_runtime::container::{Collaborators, NodeConfig, NodeRole};
use node_runtime::handlers::builtin_functions;
use node_runtime::wiring::{accept_workers, run_worker};
use node_runtime::NodeRuntime;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = NodeConfig::from_env().context("invalid configuration")?;
    init_logging(&config.telemetry)?;

    match config.role {
        NodeRole::Worker => run_worker_role(config).await,
        NodeRole::Standalone | NodeRole::Master => run_node(config).await,
    }
}

async fn run_node(config: NodeConfig) -> Result<()> {
    let metrics = Arc::new(PrometheusObserver::new(&config.telemetry.metrics_prefix)?);
    let store = open_store(&config.storage)?;
    let ledger = Arc::new(InMemoryLedger::new(&config.chain_id, 0));
    let transport = Arc::new(ReqwestTransport::from_config(&config.delivery)?);
    let functions = Arc::new(builtin_functions(&config.message_handler));

    let collaborators = Collaborators {
        store,
        ledger: ledger.clone(),
        transport,
        metrics: metrics.clone(),
        functions,
        predicates: Arc::new(PredicateRegistry::new()),
        response_handlers: Arc::new(ResponseHandlerRegistry::new()),
        completions: Arc::new(CompletionRegistry::new()),
    };
    let admin_addr = SocketAddr::from(([0, 0, 0, 0], config.telemetry.metrics_port));
    let node_id = config.node_id.clone();
    let worker_listen = config.worker_listen;

    let runtime = NodeRuntime::new(config, collaborators, ledger.subscribe());
    runtime.start().await?;

    if let Some(executor) = runtime.container().workers.clone() {
        let listener = TcpListener::bind(worker_listen)
            .await
            .with_context(|| format!("binding worker listener on {}", worker_listen))?;
        tokio::spawn(accept_workers(listener, executor, runtime.shutdown_signal()));
    }

    let admin = admin_router(node_id, metrics);
    let shutdown = runtime.shutdown_signal();
    tokio::spawn(async move {
        if let Err(e) = serve_admin(admin_addr, admin, shutdown).await {
            error!("[node] Admin endpoint failed: {}", e);
        }
    });

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;
    Ok(())
}

async fn run_worker_role(config: NodeConfig) -> Result<()> {
    let functions = Arc::new(builtin_functions(&config.message_handler));
    let (stop, stopped) = watch::channel(false);
    let worker = tokio::spawn(run_worker(config.master_addr, functions, stopped));

    info!(master = %config.master_addr, "Worker is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    stop.send_replace(true);
    worker.await?;
    Ok(())
}
