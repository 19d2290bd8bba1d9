//! # Error Types
//!
//! Errors shared across subsystems.

use thiserror::Error;

/// Failure to encode or decode a persisted record.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The value could not be serialized.
    #[error("Failed to encode {kind}: {source}")]
    Encode {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Stored bytes are not a valid record.
    #[error("Failed to decode {kind}: {source}")]
    Decode {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Serialize a record for the durable store.
pub fn encode_record<T: serde::Serialize>(
    kind: &'static str,
    value: &T,
) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(value).map_err(|source| CodecError::Encode { kind, source })
}

/// Deserialize a record read from the durable store.
pub fn decode_record<T: serde::de::DeserializeOwned>(
    kind: &'static str,
    bytes: &[u8],
) -> Result<T, CodecError> {
    serde_json::from_slice(bytes).map_err(|source| CodecError::Decode { kind, source })
}
