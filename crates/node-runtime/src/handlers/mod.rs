//! # Built-in Task Functions
//!
//! The identity protocol registers its own functions; the binary ships a
//! message handler that acknowledges each admitted message so a bare node
//! drains its queue.

use idv_03_delegation::{function, FunctionRegistry};
use serde_json::{json, Value};
use shared_types::HandlerId;
use tracing::info;

/// Registry with the acknowledging handler under `message_handler`.
pub fn builtin_functions(message_handler: &HandlerId) -> FunctionRegistry {
    let functions = FunctionRegistry::new();
    functions.register(message_handler.clone(), function(acknowledge));
    functions
}

async fn acknowledge(message: Value) -> Result<Value, String> {
    let message_id = message
        .get("message_id")
        .and_then(Value::as_str)
        .ok_or_else(|| "admitted message without message_id".to_string())?;
    info!(
        message_id,
        request_id = message.get("request_id").and_then(serde_json::Value::as_str).unwrap_or("?"),
        "[node] Message processed"
    );
    Ok(json!({ "acknowledged": message_id }))
}
