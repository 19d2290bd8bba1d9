//! # Shared Store - Durable Key-Value Port
//!
//! The durable store is the single source of truth for recovery. In-memory
//! queues and maps held by the engine are a cache of what lives here and
//! must always be reconcilable from it.
//!
//! ## Layout
//!
//! Every record lives in a `Namespace` scoped by node id:
//!
//! | Kind | Key | Value |
//! |------|-----|-------|
//! | `tasks` | `{request_id}/{seq:020}` | `Task` |
//! | `deferred_messages` | `{message_id}` | `DeferredMessage` |
//! | `deferred_index` | `{height:020}/{message_id}` | `MessageId` |
//! | `callback_retries` | `{cb_id}` | `RetryRecord` |
//! | `pending_callbacks` | `{cb_id}` | `PendingCallback` |
//!
//! Keys are ordered lexicographically; zero-padded numbers keep range scans
//! in numeric order.
//!
//! ## Backends
//!
//! - `InMemoryStore` - tests and ephemeral standalone nodes
//! - `RocksDbStore` - production (feature `rocksdb`)

pub mod memory;
pub mod namespace;
#[cfg(feature = "rocksdb")]
pub mod rocksdb_store;
pub mod store;

pub use memory::InMemoryStore;
pub use namespace::{
    height_key, Namespace, CALLBACK_RETRIES, DEFERRED_INDEX, DEFERRED_MESSAGES, PENDING_CALLBACKS,
    TASKS,
};
#[cfg(feature = "rocksdb")]
pub use rocksdb_store::{RocksDbConfig, RocksDbStore};
pub use store::{
    delete_many, get_record, list_range_records, list_records, put_record, DurableStore,
    StoreError,
};
