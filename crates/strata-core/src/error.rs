//! Error types for core identifiers and value parsing.

/// Errors from constructing or parsing core value types.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A plugin identifier failed validation.
    #[error("invalid plugin id: {0}")]
    InvalidPluginId(String),

    /// An integer did not map onto a known game mode.
    #[error("unknown game mode: {0}")]
    UnknownGameMode(i32),

    /// An integer did not map onto a known difficulty.
    #[error("unknown difficulty: {0}")]
    UnknownDifficulty(i32),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
