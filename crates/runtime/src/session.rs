//! Session management.

use crate::conversation::{ConversationLoop, LoopOptions, QueryOutcome};
use crate::model::Backend;
use crate::tools::ToolHost;
use crate::Result;

/// A connected session: one model backend, one tool provider.
///
/// Queries are independent. No history survives from one query to the next.
pub struct Session<B, H> {
    backend: B,
    host: H,
    options: LoopOptions,
}

impl<B: Backend, H: ToolHost> Session<B, H> {
    pub fn new(backend: B, host: H) -> Self {
        Self {
            backend,
            host,
            options: LoopOptions::default(),
        }
    }

    pub fn with_options(mut self, options: LoopOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> LoopOptions {
        self.options
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Resolve one user query.
    pub async fn process_query(&self, query: &str) -> Result<QueryOutcome> {
        tracing::debug!(query_len = query.len(), "processing query");
        ConversationLoop::new(&self.backend, &self.host, self.options)
            .run(query)
            .await
    }

    /// Release the tool provider.
    pub async fn close(&self) {
        self.host.close().await;
    }
}
