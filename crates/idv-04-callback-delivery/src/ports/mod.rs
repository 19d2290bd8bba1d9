//! # Ports Layer

pub mod inbound;
pub mod outbound;

pub use inbound::{CallbackDeliveryApi, DeliveryHandle};
pub use outbound::{
    CallbackTransport, FixedPredicate, PredicateRegistry, RecordingResponseHandler,
    ResponseHandler, ResponseHandlerRegistry, RetryPredicate, ScriptedTransport,
};
