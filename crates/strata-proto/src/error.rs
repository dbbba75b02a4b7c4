//! Protocol encode/decode errors.

/// Errors from serializing or deserializing wire messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtoError {
    /// A message failed to serialize.
    #[error("encode error: {0}")]
    Encode(#[source] serde_json::Error),

    /// An inbound frame failed to deserialize.
    #[error("decode error: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Result type for protocol operations.
pub type ProtoResult<T> = Result<T, ProtoError>;
