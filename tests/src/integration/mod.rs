//! Cross-subsystem tests. Every flow goes through `NodeRuntime` with the
//! production adapters; only the ledger, store and HTTP transport are
//! in-memory stand-ins.

pub mod harness;

mod delegation;
mod http_delivery;
mod recovery;
mod scenarios;
