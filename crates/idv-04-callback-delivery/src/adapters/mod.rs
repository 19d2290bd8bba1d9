//! # Adapters

pub mod http;

pub use http::ReqwestTransport;
