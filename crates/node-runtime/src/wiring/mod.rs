//! # Runtime Wiring
//!
//! Long-running loops the runtime spawns next to the engine:
//!
//! ```text
//! ledger ──HeightAdvanced──→ ledger_events ──on_height_advanced──→ BlockGate
//!
//! master: TcpListener ──accept──→ DelegatedExecutor::attach
//! worker: TcpStream ──connect──→ WorkerRuntime::serve (reconnects)
//! ```
//!
//! Every loop exits when the shutdown flag is raised.

pub mod ledger_events;
pub mod workers;

pub use ledger_events::run_ledger_events;
pub use workers::{accept_workers, run_worker};
