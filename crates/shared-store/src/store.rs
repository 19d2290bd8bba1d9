//! # Durable Store Port
//!
//! Outbound port implemented by every storage backend, plus typed helpers
//! that encode records as JSON.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::{decode_record, encode_record, CodecError};
use thiserror::Error;

use crate::namespace::Namespace;

/// Upper bound used to turn a prefix into a half-open range.
const KEY_RANGE_END: char = char::MAX;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend I/O failure.
    #[error("Storage I/O error: {message}")]
    Io { message: String },

    /// Record (de)serialization failure.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Key-value persistence with per-node namespacing.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Write `value` under `key`.
    async fn put(&self, ns: &Namespace, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    /// Read the value under `key`.
    async fn get(&self, ns: &Namespace, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn delete(&self, ns: &Namespace, key: &str) -> Result<(), StoreError>;

    /// All entries with `start <= key < end`, in key order.
    async fn list_range(
        &self,
        ns: &Namespace,
        start: &str,
        end: &str,
    ) -> Result<Vec<(String, Vec<u8>)>, StoreError>;

    /// All entries whose key starts with `prefix`, in key order.
    async fn list_prefix(
        &self,
        ns: &Namespace,
        prefix: &str,
    ) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        let end = format!("{}{}", prefix, KEY_RANGE_END);
        self.list_range(ns, prefix, &end).await
    }

    /// Every entry in the namespace, in key order.
    async fn list_all(&self, ns: &Namespace) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        self.list_prefix(ns, "").await
    }
}

/// Encode and store a record.
pub async fn put_record<T: Serialize + Sync>(
    store: &dyn DurableStore,
    ns: &Namespace,
    key: &str,
    kind: &'static str,
    value: &T,
) -> Result<(), StoreError> {
    let bytes = encode_record(kind, value)?;
    store.put(ns, key, bytes).await
}

/// Load and decode a record.
pub async fn get_record<T: DeserializeOwned>(
    store: &dyn DurableStore,
    ns: &Namespace,
    key: &str,
    kind: &'static str,
) -> Result<Option<T>, StoreError> {
    match store.get(ns, key).await? {
        Some(bytes) => Ok(Some(decode_record(kind, &bytes)?)),
        None => Ok(None),
    }
}

/// Load and decode every record in a namespace.
///
/// Undecodable entries are skipped with a warning so one corrupt record
/// cannot block recovery of the rest.
pub async fn list_records<T: DeserializeOwned>(
    store: &dyn DurableStore,
    ns: &Namespace,
    kind: &'static str,
) -> Result<Vec<(String, T)>, StoreError> {
    let entries = store.list_all(ns).await?;
    let mut records = Vec::with_capacity(entries.len());
    for (key, bytes) in entries {
        match decode_record(kind, &bytes) {
            Ok(record) => records.push((key, record)),
            Err(e) => tracing::warn!(namespace = %ns, key = %key, "Skipping undecodable record: {}", e),
        }
    }
    Ok(records)
}

/// Load and decode the records with `start <= key < end`.
pub async fn list_range_records<T: DeserializeOwned>(
    store: &dyn DurableStore,
    ns: &Namespace,
    start: &str,
    end: &str,
    kind: &'static str,
) -> Result<Vec<(String, T)>, StoreError> {
    let entries = store.list_range(ns, start, end).await?;
    let mut records = Vec::with_capacity(entries.len());
    for (key, bytes) in entries {
        match decode_record(kind, &bytes) {
            Ok(record) => records.push((key, record)),
            Err(e) => tracing::warn!(namespace = %ns, key = %key, "Skipping undecodable record: {}", e),
        }
    }
    Ok(records)
}

/// Delete several keys from one namespace.
pub async fn delete_many(
    store: &dyn DurableStore,
    ns: &Namespace,
    keys: &[String],
) -> Result<(), StoreError> {
    for key in keys {
        store.delete(ns, key).await?;
    }
    Ok(())
}
