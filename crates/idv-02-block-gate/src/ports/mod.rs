//! # Ports Layer

pub mod inbound;
pub mod outbound;

pub use inbound::BlockGateApi;
pub use outbound::{LedgerView, MessageAdmission, MockLedger, RecordingAdmission};
