//! Delivery error types.
//!
//! `DeliveryError` is returned to the caller of `deliver` and only covers
//! problems before the delivery starts. How a delivery ended is reported
//! as a `DeliveryFailure` through the response handler.

use shared_store::StoreError;
use shared_types::CallbackId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A delivery with this id is already running in this process.
    #[error("Callback {cb_id} already in flight")]
    AlreadyInFlight { cb_id: CallbackId },

    /// HTTP client construction failed.
    #[error("HTTP client error: {0}")]
    Client(String),
}

/// Terminal outcome of a delivery that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryFailure {
    /// The response body exceeded the size ceiling. Never retried.
    #[error("Response body larger than {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// Single-attempt delivery failed at the transport level.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The retry predicate said no.
    #[error("Retry vetoed after {attempts} attempt(s)")]
    RetryVetoed { attempts: u32 },

    /// Timeout or deadline reached.
    #[error("Timed out after {attempts} attempt(s)")]
    TimedOut { attempts: u32 },
}
