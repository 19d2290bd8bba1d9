//! # Delegation Wire Protocol
//!
//! ```text
//! master ──DelegationRequest{correlation_id, function, args}──→ worker
//! master ←──DelegationResponse{correlation_id, result?, error?}── worker
//! ```
//!
//! Responses may arrive in any order; the correlation id pairs them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::HandlerId;
use std::fmt;
use uuid::Uuid;

/// Pairs a response with its request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(pub Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Master-local handle of a connected worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// Run `function` with `args` on the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegationRequest {
    pub correlation_id: CorrelationId,
    pub function: HandlerId,
    pub args: Value,
}

/// Outcome of a [`DelegationRequest`]. Exactly one of `result` and `error`
/// is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegationResponse {
    pub correlation_id: CorrelationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DelegationResponse {
    pub fn ok(correlation_id: CorrelationId, result: Value) -> Self {
        Self {
            correlation_id,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(correlation_id: CorrelationId, error: impl Into<String>) -> Self {
        Self {
            correlation_id,
            result: None,
            error: Some(error.into()),
        }
    }

    /// `Err` if the worker reported an error, otherwise the result
    /// (`null` if the worker sent neither field).
    pub fn into_result(self) -> Result<Value, String> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_wire_shape() {
        let id = CorrelationId::new();
        let ok = serde_json::to_value(DelegationResponse::ok(id, json!(1))).unwrap();
        assert!(ok.get("error").is_none());
        assert_eq!(ok["result"], json!(1));

        let err = serde_json::to_value(DelegationResponse::err(id, "boom")).unwrap();
        assert!(err.get("result").is_none());
        assert_eq!(err["error"], json!("boom"));
    }

    #[test]
    fn test_into_result() {
        let id = CorrelationId::new();
        assert_eq!(DelegationResponse::ok(id, json!("x")).into_result(), Ok(json!("x")));
        assert_eq!(
            DelegationResponse::err(id, "bad").into_result(),
            Err("bad".to_string())
        );

        let bare: DelegationResponse =
            serde_json::from_value(json!({ "correlation_id": id })).unwrap();
        assert_eq!(bare.into_result(), Ok(Value::Null));
    }

    #[test]
    fn test_correlation_ids_unique() {
        assert_ne!(CorrelationId::new(), CorrelationId::new());
    }
}
