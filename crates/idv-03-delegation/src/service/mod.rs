//! # Executors
//!
//! | Type | Mode | Runs functions |
//! |------|------|----------------|
//! | `LocalExecutor` | `Local` | in this process |
//! | `DelegatedExecutor` | `Delegated` | on attached workers, round-robin |
//! | `WorkerRuntime` | - | worker side of a link |

pub mod delegated;
pub mod local;
pub mod worker;

pub use delegated::DelegatedExecutor;
pub use local::{invoke, LocalExecutor};
pub use worker::WorkerRuntime;
