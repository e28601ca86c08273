use thiserror::Error;

/// Meme service errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MemeError {
    #[error("no API key configured. Please set the RAPID_API_KEY environment variable.")]
    MissingApiKey,

    #[error("Invalid API key. Please check your RAPID_API_KEY environment variable.")]
    InvalidCredentials,

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("Meme generator service is experiencing internal issues. Please try again later.")]
    ServiceUnavailable,

    #[error("meme service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request timed out after {0}ms. The service might be slow or unresponsive.")]
    Timeout(u64),

    #[error("Unexpected response type: {0}. Expected image data.")]
    UnexpectedContentType(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MemeError>;
