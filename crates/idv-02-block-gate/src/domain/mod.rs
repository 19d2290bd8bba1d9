//! # Domain Layer
//!
//! Admission decisions, deferred-index keys and the per-message admission
//! lock.

pub mod entities;
pub mod locks;

pub use entities::*;
pub use locks::AdmissionLocks;
