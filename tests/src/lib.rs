//! # IDV Node Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/integration/
//! │   ├── harness.rs        # TestNode: NodeRuntime over in-memory collaborators
//! │   ├── scenarios.rs      # Ordering, deferral, retry and veto flows end to end
//! │   ├── recovery.rs       # Restart on a shared store, resume idempotence
//! │   ├── delegation.rs     # Master/worker execution and worker loss
//! │   └── http_delivery.rs  # reqwest transport against a local axum endpoint
//! └── benches/
//!     └── engine_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p idv-tests
//! cargo test -p idv-tests integration::recovery
//! cargo bench -p idv-tests
//! ```

pub mod integration;
