//! In-memory durable store for tests and ephemeral nodes.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

use crate::namespace::Namespace;
use crate::store::{DurableStore, StoreError};

/// `BTreeMap`-backed store. Survives "restarts" as long as the same
/// instance is handed to the new engine, which is how recovery is tested.
#[derive(Default)]
pub struct InMemoryStore {
    data: RwLock<HashMap<String, BTreeMap<String, Vec<u8>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys in a namespace.
    pub fn len(&self, ns: &Namespace) -> usize {
        self.data.read().get(ns.as_str()).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, ns: &Namespace) -> bool {
        self.len(ns) == 0
    }

    /// Keys in a namespace, in order.
    pub fn keys(&self, ns: &Namespace) -> Vec<String> {
        self.data
            .read()
            .get(ns.as_str())
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DurableStore for InMemoryStore {
    async fn put(&self, ns: &Namespace, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.data
            .write()
            .entry(ns.as_str().to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, ns: &Namespace, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .data
            .read()
            .get(ns.as_str())
            .and_then(|m| m.get(key).cloned()))
    }

    async fn delete(&self, ns: &Namespace, key: &str) -> Result<(), StoreError> {
        let mut data = self.data.write();
        if let Some(map) = data.get_mut(ns.as_str()) {
            map.remove(key);
            if map.is_empty() {
                data.remove(ns.as_str());
            }
        }
        Ok(())
    }

    async fn list_range(
        &self,
        ns: &Namespace,
        start: &str,
        end: &str,
    ) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        if start >= end {
            return Ok(Vec::new());
        }
        let data = self.data.read();
        Ok(data
            .get(ns.as_str())
            .map(|m| {
                m.range(start.to_string()..end.to_string())
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }
}
