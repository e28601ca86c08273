//! MCP error types.

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("transport I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode or decode message: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("message exceeds {max} bytes")]
    OutputTooLarge { max: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
