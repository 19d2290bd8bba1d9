//! # Outbound Ports
//!
//! The HTTP transport, plus the two kinds of business callbacks a record
//! references by `HandlerId`: retry predicates and response handlers.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use shared_types::{CallbackId, HandlerRegistry, RetryRecord};
use std::collections::VecDeque;

use crate::domain::{AttemptError, CallbackResponse, DeliveryResult};

/// Sends one callback attempt - outbound port.
#[async_trait]
pub trait CallbackTransport: Send + Sync {
    /// POST `body` as JSON to `endpoint`.
    async fn post(&self, endpoint: &str, body: &Value) -> Result<CallbackResponse, AttemptError>;
}

/// Decides whether a failed delivery keeps retrying.
#[async_trait]
pub trait RetryPredicate: Send + Sync {
    /// `attempts` counts attempts made so far, including the failed one.
    async fn should_retry(&self, record: &RetryRecord, attempts: u32, error: &AttemptError)
        -> bool;
}

/// Told about the terminal outcome of a delivery.
#[async_trait]
pub trait ResponseHandler: Send + Sync {
    async fn on_response(&self, cb_id: &CallbackId, result: &DeliveryResult);
}

pub type PredicateRegistry = HandlerRegistry<dyn RetryPredicate>;
pub type ResponseHandlerRegistry = HandlerRegistry<dyn ResponseHandler>;

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Transport that replays a script, then answers `200 ok` (or keeps
/// failing, see [`ScriptedTransport::always_fail`]).
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<CallbackResponse, AttemptError>>>,
    exhausted: Option<AttemptError>,
    requests: Mutex<Vec<(String, Value)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` attempts with a transport error.
    pub fn fail_times(self, n: usize) -> Self {
        {
            let mut script = self.script.lock();
            for i in 0..n {
                script.push_back(Err(AttemptError::Transport(format!(
                    "connection refused ({})",
                    i + 1
                ))));
            }
        }
        self
    }

    /// Queue one scripted answer.
    pub fn then(self, answer: Result<CallbackResponse, AttemptError>) -> Self {
        self.script.lock().push_back(answer);
        self
    }

    /// Fail every attempt once the script is used up.
    pub fn always_fail() -> Self {
        Self {
            exhausted: Some(AttemptError::Transport("connection refused".into())),
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> usize {
        self.requests.lock().len()
    }

    /// `(endpoint, body)` per attempt.
    pub fn requests(&self) -> Vec<(String, Value)> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl CallbackTransport for ScriptedTransport {
    async fn post(&self, endpoint: &str, body: &Value) -> Result<CallbackResponse, AttemptError> {
        self.requests
            .lock()
            .push((endpoint.to_string(), body.clone()));
        if let Some(answer) = self.script.lock().pop_front() {
            return answer;
        }
        match &self.exhausted {
            Some(error) => Err(error.clone()),
            None => Ok(CallbackResponse::new(200, "ok")),
        }
    }
}

/// Predicate with a fixed answer that counts how often it was asked.
pub struct FixedPredicate {
    answer: bool,
    asked: Mutex<u32>,
}

impl FixedPredicate {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            asked: Mutex::new(0),
        }
    }

    pub fn asked(&self) -> u32 {
        *self.asked.lock()
    }
}

#[async_trait]
impl RetryPredicate for FixedPredicate {
    async fn should_retry(&self, _record: &RetryRecord, _attempts: u32, _error: &AttemptError) -> bool {
        *self.asked.lock() += 1;
        self.answer
    }
}

/// Response handler that records every call.
#[derive(Default)]
pub struct RecordingResponseHandler {
    calls: Mutex<Vec<(CallbackId, DeliveryResult)>>,
}

impl RecordingResponseHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(CallbackId, DeliveryResult)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ResponseHandler for RecordingResponseHandler {
    async fn on_response(&self, cb_id: &CallbackId, result: &DeliveryResult) {
        self.calls.lock().push((cb_id.clone(), result.clone()));
    }
}
