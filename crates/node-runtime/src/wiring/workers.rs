//! Master/worker TCP links.

use idv_03_delegation::{DelegatedExecutor, FunctionRegistry, WorkerRuntime};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{info, warn};

const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Master side: attach every worker that connects to `listener`.
pub async fn accept_workers(
    listener: TcpListener,
    executor: DelegatedExecutor,
    mut shutdown: watch::Receiver<bool>,
) {
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "[node] Accepting worker connections");
    }
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        warn!(peer = %peer, "[node] set_nodelay failed: {}", e);
                    }
                    let (reader, writer) = stream.into_split();
                    let worker = executor.attach(reader, writer);
                    info!(peer = %peer, worker = %worker, workers = executor.worker_count(), "[node] Worker connected");
                }
                Err(e) => warn!("[node] Accept failed: {}", e),
            },
            _ = shutdown.changed() => break,
        }
    }
    info!("[node] Worker listener stopped");
}

/// Worker side: serve the master at `master`, reconnecting until shutdown.
pub async fn run_worker(
    master: SocketAddr,
    functions: Arc<FunctionRegistry>,
    mut shutdown: watch::Receiver<bool>,
) {
    let runtime = WorkerRuntime::new(functions);
    loop {
        let stopping = *shutdown.borrow();
        if stopping {
            break;
        }
        let served = tokio::select! {
            result = serve_once(master, &runtime) => result,
            _ = shutdown.changed() => break,
        };
        match served {
            Ok(requests) => info!(master = %master, requests, "[node] Master link closed"),
            Err(e) => warn!(master = %master, "[node] Master link failed: {}", e),
        }
        tokio::select! {
            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
            _ = shutdown.changed() => break,
        }
    }
    info!("[node] Worker stopped");
}

async fn serve_once(master: SocketAddr, runtime: &WorkerRuntime) -> anyhow::Result<usize> {
    let stream = TcpStream::connect(master).await?;
    stream.set_nodelay(true)?;
    info!(master = %master, "[node] Connected to master");
    let (reader, writer) = stream.into_split();
    Ok(runtime.serve(reader, writer).await?)
}
