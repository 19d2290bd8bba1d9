//! # IDV-04 Callback Delivery
//!
//! At-least-once delivery of JSON callbacks to client applications.
//!
//! **Subsystem ID:** 4
//! **Architecture:** Hexagonal (Domain + Ports/Adapters)
//!
//! ## Terminal Outcomes
//!
//! | Outcome | Record | Response handler |
//! |---------|--------|------------------|
//! | Attempt returned a response (any status) | deleted | `Ok(response)` |
//! | Body over `max_response_bytes` | deleted | `Err(BodyTooLarge)` |
//! | Predicate returned false | deleted | `Err(RetryVetoed)` |
//! | No predicate, next wait past timeout or deadline | deleted | `Err(TimedOut)` |
//! | `stop_all()` | **kept** | not called |
//!
//! ## Backoff
//!
//! 5s initial, doubling, capped at 180s, ±20% jitter per wait. Waits are
//! interruptible by the halt flag; an attempt already on the wire is not.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::ReqwestTransport;
pub use config::{DeliveryConfig, MAX_RESPONSE_BYTES};
pub use domain::{
    AttemptError, BackoffPolicy, CallbackRequest, CallbackResponse, DeliveryOutcome,
    DeliveryResult,
};
pub use error::{DeliveryError, DeliveryFailure};
pub use ports::{
    CallbackDeliveryApi, CallbackTransport, DeliveryHandle, FixedPredicate, PredicateRegistry,
    RecordingResponseHandler, ResponseHandler, ResponseHandlerRegistry, RetryPredicate,
    ScriptedTransport,
};
pub use service::DeliveryEngine;
