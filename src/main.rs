//! pagebridge-mcp - browser automation bridge.
//!
//! Serves the tool catalog over stdio (MCP) or HTTP depending on the
//! configured mode, driving one shared headless-Chromium session.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pagebridge_mcp::config::{Config, ServerMode};
use pagebridge_mcp::server::{McpServer, SERVER_NAME, SERVER_VERSION};
use pagebridge_mcp::session::Session;
use pagebridge_mcp::tools::ToolRegistry;

/// Browser automation bridge serving MCP stdio and HTTP transports.
#[derive(Parser, Debug)]
#[command(name = "pagebridge-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Operating mode: "stdio" or "http". Overrides SERVER_MODE.
    #[arg(long)]
    mode: Option<String>,

    /// HTTP listening port. Overrides PORT.
    #[arg(long)]
    port: Option<u16>,

    /// Show the browser window (non-headless mode).
    #[arg(long)]
    visible: bool,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // Log to stderr; stdout belongs to the stdio protocol.
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting {} v{}", SERVER_NAME, SERVER_VERSION);

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(ref mode) = args.mode {
        config.mode = match mode.parse::<ServerMode>() {
            Ok(mode) => mode,
            Err(e) => {
                tracing::error!("invalid configuration: {e}");
                return ExitCode::FAILURE;
            }
        };
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if args.visible {
        tracing::info!("browser will be visible (non-headless mode)");
        config.headless = false;
    }

    let session = Arc::new(Session::new(config.headless));
    let registry = Arc::new(ToolRegistry::new(session.clone()));

    let outcome = match config.mode {
        ServerMode::Stdio => run_stdio(registry, session.clone()).await,
        ServerMode::Http => run_http(registry, session.clone(), &config).await,
    };

    match outcome {
        Ok(()) => {
            tracing::info!("server exited cleanly");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("server error: {e}");
            session.close().await;
            ExitCode::FAILURE
        }
    }
}

async fn run_stdio(registry: Arc<ToolRegistry>, session: Arc<Session>) -> anyhow::Result<()> {
    let server = McpServer::new(registry);

    tokio::select! {
        result = server.run_stdio() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    session.close().await;
    Ok(())
}

#[cfg(feature = "http")]
async fn run_http(
    registry: Arc<ToolRegistry>,
    session: Arc<Session>,
    config: &Config,
) -> anyhow::Result<()> {
    pagebridge_mcp::http::serve(registry, config).await?;
    session.close().await;
    Ok(())
}

#[cfg(not(feature = "http"))]
async fn run_http(
    _registry: Arc<ToolRegistry>,
    _session: Arc<Session>,
    _config: &Config,
) -> anyhow::Result<()> {
    anyhow::bail!("this binary was built without the 'http' feature")
}
