//! # Domain Entities

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{CallbackId, HandlerId};

use crate::error::DeliveryFailure;

/// A callback the business layer wants delivered.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackRequest {
    /// Generated (UUID v4) when absent.
    pub cb_id: Option<CallbackId>,
    pub endpoint: String,
    pub body: Value,
    /// Persist and retry with backoff, instead of one best-effort attempt.
    pub retry: bool,
    pub should_retry: Option<HandlerId>,
    pub response_handler: Option<HandlerId>,
    /// Absolute deadline (ms since epoch).
    pub deadline: Option<u64>,
}

impl CallbackRequest {
    /// Single best-effort attempt.
    pub fn new(endpoint: impl Into<String>, body: Value) -> Self {
        Self {
            cb_id: None,
            endpoint: endpoint.into(),
            body,
            retry: false,
            should_retry: None,
            response_handler: None,
            deadline: None,
        }
    }

    #[must_use]
    pub fn with_retry(mut self) -> Self {
        self.retry = true;
        self
    }

    #[must_use]
    pub fn with_cb_id(mut self, cb_id: impl Into<CallbackId>) -> Self {
        self.cb_id = Some(cb_id.into());
        self
    }

    #[must_use]
    pub fn with_should_retry(mut self, predicate: impl Into<HandlerId>) -> Self {
        self.should_retry = Some(predicate.into());
        self
    }

    #[must_use]
    pub fn with_response_handler(mut self, handler: impl Into<HandlerId>) -> Self {
        self.response_handler = Some(handler.into());
        self
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline_ms: u64) -> Self {
        self.deadline = Some(deadline_ms);
        self
    }
}

/// What the endpoint answered. Any status counts as a delivered attempt;
/// interpreting it is up to the response handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackResponse {
    pub status: u16,
    pub body: String,
}

impl CallbackResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Why a single attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    /// Network, TLS, timeout, or body read failure.
    Transport(String),
    /// Response larger than the ceiling.
    BodyTooLarge { limit: usize },
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(cause) => write!(f, "{}", cause),
            Self::BodyTooLarge { limit } => write!(f, "response body larger than {} bytes", limit),
        }
    }
}

/// What the response handler is told.
pub type DeliveryResult = Result<CallbackResponse, DeliveryFailure>;

/// How a delivery task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered(CallbackResponse),
    Failed(DeliveryFailure),
    /// Stopped by `stop_all`; the retry record is kept for resumption.
    Halted,
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered(_))
    }
}
