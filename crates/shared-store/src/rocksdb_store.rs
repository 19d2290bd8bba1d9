//! # RocksDB Storage Adapter
//!
//! Production implementation of `DurableStore`.
//!
//! ## Features
//!
//! - Snappy compression
//! - Bloom filters for point lookups
//! - fsync on write (configurable) so a persisted task or retry record
//!   survives a crash the moment `put` returns
//!
//! ## Key Encoding
//!
//! Namespaces share the default column family. A physical key is
//! `{namespace}\0{key}`; the NUL separator keeps one namespace's keys
//! contiguous and ordered.

use async_trait::async_trait;
use parking_lot::RwLock;
use rocksdb::{Direction, IteratorMode, Options, WriteOptions, DB};
use std::path::Path;
use std::sync::Arc;

use crate::namespace::Namespace;
use crate::store::{DurableStore, StoreError};

const SEPARATOR: u8 = 0;

/// RocksDB configuration
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Path to the database directory
    pub path: String,
    /// Block cache size in bytes (default: 64MB)
    pub block_cache_size: usize,
    /// Write buffer size in bytes (default: 16MB)
    pub write_buffer_size: usize,
    /// Enable fsync after each write (default: true for durability)
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "./data/rocksdb".to_string(),
            block_cache_size: 64 * 1024 * 1024,
            write_buffer_size: 16 * 1024 * 1024,
            sync_writes: true,
        }
    }
}

impl RocksDbConfig {
    /// Create config for testing (smaller buffers, no sync)
    pub fn for_testing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 8 * 1024 * 1024,
            write_buffer_size: 4 * 1024 * 1024,
            sync_writes: false,
        }
    }
}

/// RocksDB-backed durable store
pub struct RocksDbStore {
    db: Arc<RwLock<DB>>,
    config: RocksDbConfig,
}

impl RocksDbStore {
    /// Open or create a RocksDB database
    pub fn open(config: RocksDbConfig) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&rocksdb::Cache::new_lru_cache(config.block_cache_size));
        opts.set_block_based_table_factory(&block_opts);

        let db = DB::open(&opts, &config.path).map_err(|e| StoreError::Io {
            message: format!("Failed to open RocksDB at {}: {}", config.path, e),
        })?;

        tracing::info!(path = %config.path, "[store] RocksDB opened");

        Ok(Self {
            db: Arc::new(RwLock::new(db)),
            config,
        })
    }

    /// Open with default settings at `path`.
    pub fn open_default(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open(RocksDbConfig {
            path: path.as_ref().to_string_lossy().to_string(),
            ..Default::default()
        })
    }

    fn physical_key(ns: &Namespace, key: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(ns.as_str().len() + 1 + key.len());
        out.extend_from_slice(ns.as_str().as_bytes());
        out.push(SEPARATOR);
        out.extend_from_slice(key.as_bytes());
        out
    }

    fn write_opts(&self) -> WriteOptions {
        let mut opts = WriteOptions::default();
        opts.set_sync(self.config.sync_writes);
        opts
    }
}

#[async_trait]
impl DurableStore for RocksDbStore {
    async fn put(&self, ns: &Namespace, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let db = self.db.read();
        db.put_opt(Self::physical_key(ns, key), value, &self.write_opts())
            .map_err(|e| StoreError::Io {
                message: format!("RocksDB put failed: {}", e),
            })
    }

    async fn get(&self, ns: &Namespace, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let db = self.db.read();
        db.get(Self::physical_key(ns, key))
            .map_err(|e| StoreError::Io {
                message: format!("RocksDB get failed: {}", e),
            })
    }

    async fn delete(&self, ns: &Namespace, key: &str) -> Result<(), StoreError> {
        let db = self.db.read();
        db.delete_opt(Self::physical_key(ns, key), &self.write_opts())
            .map_err(|e| StoreError::Io {
                message: format!("RocksDB delete failed: {}", e),
            })
    }

    async fn list_range(
        &self,
        ns: &Namespace,
        start: &str,
        end: &str,
    ) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        let lower = Self::physical_key(ns, start);
        let upper = Self::physical_key(ns, end);
        let prefix_len = ns.as_str().len() + 1;

        let db = self.db.read();
        let mut results = Vec::new();
        for item in db.iterator(IteratorMode::From(&lower, Direction::Forward)) {
            let (key, value) = item.map_err(|e| StoreError::Io {
                message: format!("RocksDB scan failed: {}", e),
            })?;
            if key.as_ref() >= upper.as_slice() {
                break;
            }
            let logical = String::from_utf8_lossy(&key[prefix_len..]).into_owned();
            results.push((logical, value.to_vec()));
        }
        Ok(results)
    }
}
