//! # Adapters
//!
//! - `framing.rs`: newline-delimited JSON frames over any byte stream

pub mod framing;

pub use framing::{FrameReader, FrameWriter};
