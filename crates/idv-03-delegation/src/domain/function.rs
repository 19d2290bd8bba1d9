//! Task functions.
//!
//! The master and every worker populate a [`FunctionRegistry`] with the same
//! ids at start-up; tasks and delegation requests only carry the id.

use async_trait::async_trait;
use serde_json::Value;
use shared_types::HandlerRegistry;
use std::future::Future;
use std::sync::Arc;

/// Business logic run for a task.
#[async_trait]
pub trait TaskFunction: Send + Sync {
    /// Run with the task's arguments. `Err` carries a human readable cause.
    async fn call(&self, args: Value) -> Result<Value, String>;
}

pub type FunctionRegistry = HandlerRegistry<dyn TaskFunction>;

/// [`TaskFunction`] backed by an async closure.
pub struct FnFunction<F>(pub F);

#[async_trait]
impl<F, Fut> TaskFunction for FnFunction<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, String>> + Send,
{
    async fn call(&self, args: Value) -> Result<Value, String> {
        (self.0)(args).await
    }
}

/// Wrap an async closure for registration.
pub fn function<F, Fut>(f: F) -> Arc<dyn TaskFunction>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, String>> + Send + 'static,
{
    Arc::new(FnFunction(f))
}
