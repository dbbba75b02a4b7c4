//! Bus error types.

use strata_core::PluginId;

use crate::transport::TransportError;

/// Errors surfaced by the plugin bus.
///
/// Only boot-time errors propagate out of the bus. Anything that happens on
/// a live session (transport failures, malformed frames, bad action
/// arguments) is contained within that session and never reaches the
/// engine.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// The configured listen address could not be parsed.
    #[error("invalid listen address: {0}")]
    InvalidAddress(String),

    /// A configured plugin id failed validation.
    #[error(transparent)]
    InvalidPluginId(#[from] strata_core::CoreError),

    /// A transport-level failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A wire message failed to encode or decode.
    #[error(transparent)]
    Proto(#[from] strata_proto::ProtoError),

    /// A connection's first frame referenced a plugin id that is not
    /// configured.
    #[error("unknown plugin id: {0}")]
    UnknownPlugin(PluginId),
}

/// Result type for bus operations.
pub type BusResult<T> = Result<T, BusError>;
