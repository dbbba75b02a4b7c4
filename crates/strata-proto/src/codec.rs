//! Frame payload encoding.
//!
//! Frames on the wire are opaque byte blobs; this module maps outer messages
//! onto those blobs. The transport layer handles length prefixes and knows
//! nothing about message contents.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{ProtoError, ProtoResult};

/// Serialize an outer message into a frame payload.
///
/// # Errors
///
/// Returns [`ProtoError::Encode`] if serialization fails (only possible for
/// non-string map keys, which no wire type has).
pub fn encode<T: Serialize>(message: &T) -> ProtoResult<Vec<u8>> {
    serde_json::to_vec(message).map_err(ProtoError::Encode)
}

/// Deserialize a frame payload into an outer message.
///
/// # Errors
///
/// Returns [`ProtoError::Decode`] for malformed frames; callers skip the
/// frame and keep the stream alive.
pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> ProtoResult<T> {
    serde_json::from_slice(payload).map_err(ProtoError::Decode)
}
