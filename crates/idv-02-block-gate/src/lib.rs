//! # IDV-02 Block-Gate
//!
//! Holds back inbound peer messages that reference a ledger height this
//! node has not observed yet, and admits them exactly once when it has.
//!
//! **Subsystem ID:** 2
//! **Architecture:** Hexagonal (Domain + Ports/Adapters)
//!
//! ## Admission Flow
//!
//! ```text
//! message ──→ chain_status ──Unknown──→ Err(UnrecognizedChain)
//!                 │
//!                 ├──Historical──────────────────────────→ admit
//!                 │
//!                 └──Current── height <= observed? ──yes──→ admit
//!                                    │
//!                                    no
//!                                    ↓
//!                       persist {message, index(height)}
//!                                    │
//!                  on_height_advanced(from, to) ──lock──→ admit, clear records
//! ```
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement Location |
//! |----|-----------|---------------------|
//! | INVARIANT-1 | Deferred messages are not admitted before the observed height covers them | `service.rs` - `defer`, `on_height_advanced` |
//! | INVARIANT-2 | A message id is admitted at most once while its task is live | `domain/locks.rs` - `AdmissionLocks` |
//! | INVARIANT-3 | Admitted deferred messages leave no persisted record | `service.rs` - `admit_deferred` |

pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use config::BlockGateConfig;
pub use domain::{index_key, index_range, AdmissionDecision, AdmissionLocks, ChainStatus};
pub use error::{BlockGateError, BlockGateResult};
pub use ports::{BlockGateApi, LedgerView, MessageAdmission, MockLedger, RecordingAdmission};
pub use service::BlockGate;
