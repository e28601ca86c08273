//! Connect to a tool provider script, list its tools and optionally call one.
//!
//! Run with: cargo run --example inspect_provider -- server.py [tool] [json-args]

use std::path::PathBuf;

use runtime::{DEFAULT_STARTUP_TIMEOUT, Launchers, McpToolHost, ToolHost};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let script = PathBuf::from(args.next().ok_or("usage: inspect_provider <script> [tool] [json-args]")?);

    println!("Connecting to {}", script.display());
    let host = McpToolHost::connect(&script, &Launchers::default(), DEFAULT_STARTUP_TIMEOUT).await?;

    let tools = host.list_tools().await?;
    println!("\n{} exposes {} tools:", host.server_name(), tools.len());
    for tool in &tools {
        println!("  - {}", tool.name);
        if !tool.description.is_empty() {
            println!("    {}", tool.description);
        }
    }

    if let Some(name) = args.next() {
        let arguments: serde_json::Value = match args.next() {
            Some(raw) => serde_json::from_str(&raw)?,
            None => serde_json::Value::Null,
        };
        match host.invoke(&name, &arguments).await {
            Ok(output) => println!("\n{name} returned:\n  {output}"),
            Err(e) => println!("\nError: {e}"),
        }
    }

    host.close().await;
    Ok(())
}
