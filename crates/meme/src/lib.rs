//! Meme generation over the RapidAPI meme-generator service.
//!
//! [`MemeClient`] talks to the REST API; [`MemeTools`] exposes it (plus a
//! trivial `add`) as an MCP tool set. The `meme-server` binary serves
//! [`MemeTools`] over stdio.

mod client;
mod error;
mod tools;

pub use client::{
    DEFAULT_BASE_URL, DEFAULT_FONT, DEFAULT_FONT_SIZE, DEFAULT_HOST, DEFAULT_OUTPUT_DIR,
    MemeClient, MemeConcept, MemeConfig, next_available_path,
};
pub use error::{MemeError, Result};
pub use tools::MemeTools;
