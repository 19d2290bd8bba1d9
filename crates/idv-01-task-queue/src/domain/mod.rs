//! # Domain Layer
//!
//! Pure queue structures and the execution outcome type.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
