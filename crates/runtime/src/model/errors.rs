use thiserror::Error;

/// Errors from LLM provider calls.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModelError {
    /// A network error occurred during the API call.
    #[error("network: {0}")]
    Network(String),

    /// The LLM provider returned a non-success status.
    #[error("provider api ({status}): {message}")]
    Api { status: u16, message: String },

    /// The provider response could not be parsed.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    /// The request did not complete within the configured timeout.
    #[error("model request timed out after {0}ms")]
    Timeout(u64),
}
