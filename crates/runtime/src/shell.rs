//! Interactive read-eval loop over a [`Session`].

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::model::Backend;
use crate::session::Session;
use crate::tools::ToolHost;
use crate::Result;

const BANNER: &str = "\nrelay started!\nType your queries or 'quit' to exit.\n";
const PROMPT: &str = "\nQuery: ";

pub struct Shell<'a, B, H> {
    session: &'a Session<B, H>,
    show_tool_results: bool,
}

impl<'a, B: Backend, H: ToolHost> Shell<'a, B, H> {
    pub fn new(session: &'a Session<B, H>) -> Self {
        Self {
            session,
            show_tool_results: true,
        }
    }

    /// Print `[Tool <name> result: ...]` lines ahead of each answer.
    pub fn show_tool_results(mut self, show: bool) -> Self {
        self.show_tool_results = show;
        self
    }

    /// Read queries from `input` until EOF or `quit`/`exit`.
    ///
    /// A failed query is reported on `output` and the loop keeps going.
    /// Only I/O errors on the streams themselves end it early.
    pub async fn run<R, W>(&self, input: R, mut output: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        output.write_all(BANNER.as_bytes()).await?;
        let mut lines = input.lines();

        loop {
            output.write_all(PROMPT.as_bytes()).await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let query = line.trim();
            if query.is_empty() {
                continue;
            }
            if query.eq_ignore_ascii_case("quit") || query.eq_ignore_ascii_case("exit") {
                break;
            }

            let rendered = match self.session.process_query(query).await {
                Ok(outcome) => {
                    let mut text = String::new();
                    if self.show_tool_results {
                        for invocation in &outcome.invocations {
                            text.push_str(&invocation.result_text());
                            text.push('\n');
                        }
                    }
                    text.push_str(&outcome.answer);
                    text
                }
                Err(e) => {
                    tracing::warn!(error = %e, "query failed");
                    format!("Error: {e}")
                }
            };
            output.write_all(format!("\n{rendered}\n").as_bytes()).await?;
        }

        output.flush().await?;
        Ok(())
    }
}
