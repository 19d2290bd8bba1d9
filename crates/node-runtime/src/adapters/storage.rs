//! Store selection.

use anyhow::Result;
use shared_store::{DurableStore, InMemoryStore};
use std::sync::Arc;
use tracing::{info, warn};

use crate::container::{StorageBackend, StorageConfig};

/// Open the configured durable store.
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn DurableStore>> {
    match config.backend {
        StorageBackend::Memory => {
            warn!("[node] Using in-memory store: queued tasks and callbacks do not survive restarts");
            Ok(Arc::new(InMemoryStore::new()))
        }
        StorageBackend::RocksDb => open_rocksdb(config),
    }
}

#[cfg(feature = "rocksdb")]
fn open_rocksdb(config: &StorageConfig) -> Result<Arc<dyn DurableStore>> {
    use anyhow::Context;

    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating {}", config.data_dir.display()))?;
    let store = shared_store::RocksDbStore::open_default(&config.data_dir)
        .with_context(|| format!("opening RocksDB at {}", config.data_dir.display()))?;
    info!(path = %config.data_dir.display(), "[node] RocksDB store opened");
    Ok(Arc::new(store))
}

#[cfg(not(feature = "rocksdb"))]
fn open_rocksdb(config: &StorageConfig) -> Result<Arc<dyn DurableStore>> {
    info!(path = %config.data_dir.display(), "[node] RocksDB requested");
    anyhow::bail!("built without the `rocksdb` feature; unset IDV_DATA_DIR or rebuild with it")
}
