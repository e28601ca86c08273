mod config;
mod error;

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use runtime::{AnthropicBackend, Backend, McpToolHost, Session, Shell, ToolHost};
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use error::Result;

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Chat with a model that can call MCP tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Tool provider script (.py or .js)
    script: PathBuf,

    /// Config file (defaults to relay.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Model to use, overriding config and RELAY_MODEL
    #[arg(long)]
    model: Option<String>,

    /// Maximum model calls per query
    #[arg(long)]
    max_rounds: Option<usize>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let env = |key: &str| std::env::var(key).ok();

    let mut config = Config::discover(cli.config.as_deref())?;
    config.apply_env(env);
    if let Some(model) = cli.model {
        config.model.id = model;
    }
    if let Some(max_rounds) = cli.max_rounds {
        config.conversation.max_rounds = max_rounds;
    }
    config.validate()?;

    let mut builder = AnthropicBackend::builder(config.api_key(env)?, &config.model.id)
        .max_tokens(config.model.max_tokens)
        .base_url(&config.model.base_url);
    if let Some(secs) = config.model.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    let backend = builder.build()?;

    println!("Starting client with server script: {}", cli.script.display());
    let host = McpToolHost::connect(
        &cli.script,
        &config.launchers,
        config.conversation.startup_timeout(),
    )
    .await?;

    println!(
        "\nConnected to {} with tools: {:?}",
        host.server_name(),
        host.tool_names().await
    );
    tracing::info!(model = %backend, "session ready");

    let session = Session::new(backend, host).with_options(config.conversation.loop_options());
    run_until_interrupted(
        &session,
        config.conversation.show_tool_results,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        ctrl_c(),
    )
    .await
}

/// Run the shell until input ends or `interrupt` resolves. The session is
/// closed on every path out.
async fn run_until_interrupted<B: Backend, H: ToolHost>(
    session: &Session<B, H>,
    show_tool_results: bool,
    input: impl AsyncBufRead + Unpin,
    mut output: impl AsyncWrite + Unpin,
    interrupt: impl Future<Output = ()>,
) -> Result<()> {
    let shell = Shell::new(session).show_tool_results(show_tool_results);

    let finished = tokio::select! {
        result = shell.run(input, &mut output) => Some(result),
        () = interrupt => None,
    };
    let outcome = match finished {
        Some(result) => result.map_err(Into::into),
        None => {
            tracing::info!("interrupted");
            output
                .write_all(b"\nShutting down...\n")
                .await
                .map_err(Into::into)
        }
    };

    session.close().await;
    outcome
}

/// Resolves on Ctrl-C. Never resolves if the signal cannot be watched.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
