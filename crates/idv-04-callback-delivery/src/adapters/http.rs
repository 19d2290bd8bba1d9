//! HTTP callback transport (reqwest).
//!
//! The response body is read chunk by chunk and the read is abandoned as
//! soon as it passes `max_response_bytes`, so an oversized answer never
//! sits in memory whole.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::config::DeliveryConfig;
use crate::domain::{AttemptError, CallbackResponse};
use crate::error::DeliveryError;
use crate::ports::CallbackTransport;

pub struct ReqwestTransport {
    client: reqwest::Client,
    max_response_bytes: usize,
}

impl ReqwestTransport {
    pub fn new(request_timeout: Duration, max_response_bytes: usize) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| DeliveryError::Client(e.to_string()))?;
        Ok(Self {
            client,
            max_response_bytes,
        })
    }

    pub fn from_config(config: &DeliveryConfig) -> Result<Self, DeliveryError> {
        Self::new(config.request_timeout, config.max_response_bytes)
    }
}

#[async_trait]
impl CallbackTransport for ReqwestTransport {
    async fn post(&self, endpoint: &str, body: &Value) -> Result<CallbackResponse, AttemptError> {
        let limit = self.max_response_bytes;
        let mut response = self
            .client
            .post(endpoint)
            .json(body)
            .send()
            .await
            .map_err(|e| AttemptError::Transport(e.to_string()))?;

        if response
            .content_length()
            .is_some_and(|len| len > limit as u64)
        {
            return Err(AttemptError::BodyTooLarge { limit });
        }

        let status = response.status().as_u16();
        let mut buffer: Vec<u8> = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| AttemptError::Transport(e.to_string()))?
        {
            if buffer.len() + chunk.len() > limit {
                return Err(AttemptError::BodyTooLarge { limit });
            }
            buffer.extend_from_slice(&chunk);
        }

        Ok(CallbackResponse {
            status,
            body: String::from_utf8_lossy(&buffer).into_owned(),
        })
    }
}
