//! Jessica Mock Tool - CLI entry point.

use anyhow::{Context, Result};
use clap::Parser;
use jessica_mock_server::config::Config;
use jessica_mock_server::handler::{Dispatcher, APP_NAME};
use jessica_mock_server::server::MockServer;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "jessica-mock-server",
    about = "Configuration-driven HTTP mock server - request stubbing backed by static assets",
    version
)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "jessica.json")]
    config: PathBuf,

    /// Root directory for static assets and expected-body files
    #[arg(short, long, default_value = "static")]
    static_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: Level,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // A missing or broken configuration is fatal here, before serving
    // begins; once the server runs, configuration errors stay per-request.
    let config = Config::from_file(&args.config)
        .with_context(|| format!("ConfigurationError: {}", args.config.display()))?;

    if args.validate {
        config.validate()?;
        println!(
            "Configuration is valid ({} stubs defined)",
            config.stubs.len()
        );
        return Ok(());
    }

    info!(
        "=> {} {} application starting",
        APP_NAME,
        env!("CARGO_PKG_VERSION")
    );
    info!("* Mock version {}", config.version);

    let port = config.effective_port()?;
    let dispatcher = Dispatcher::new(args.config, args.static_dir);
    MockServer::new(dispatcher).run(port).await
}
