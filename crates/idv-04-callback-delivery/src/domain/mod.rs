//! # Domain Layer

pub mod backoff;
pub mod entities;

pub use backoff::BackoffPolicy;
pub use entities::*;
