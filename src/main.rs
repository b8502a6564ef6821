//! storcli Gateway
//!
//! Serves the RAID inventory of this host over REST by driving the
//! storcli command line tool.

use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use storcli_gateway::config::split_command;
use storcli_gateway::{
    ApiServer, ApiServerConfig, DecodeMode, GatewayConfig, Inventory, StorcliRunner,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// storcli Gateway - REST access to RAID controller inventory
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(long, env = "STORREST_CONFIG")]
    config: Option<PathBuf>,

    /// REST API bind address
    #[arg(long, env = "STORREST_LISTEN_ADDR")]
    listen_addr: Option<SocketAddr>,

    /// storcli program and leading arguments, split on whitespace
    #[arg(long, env = "STORCLI_COMMAND")]
    storcli_command: Option<String>,

    /// Require the whole tool output to be JSON
    #[arg(long, env = "STORREST_STRICT_JSON")]
    strict_json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

impl Args {
    /// File settings overridden by command line settings
    fn resolve_config(&self) -> anyhow::Result<GatewayConfig> {
        let mut config = match &self.config {
            Some(path) => GatewayConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => GatewayConfig::default(),
        };

        if let Some(addr) = self.listen_addr {
            config.listen_addr = addr;
        }
        if let Some(command) = &self.storcli_command {
            config.storcli_command = split_command(command);
        }
        if self.strict_json {
            config.decode_mode = DecodeMode::Strict;
        }

        config.validate()?;
        Ok(config)
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args);

    let config = args.resolve_config()?;

    info!("Starting storcli gateway");
    info!("  Version: {}", storcli_gateway::VERSION);
    info!("  Listen address: {}", config.listen_addr);
    info!("  storcli command: {}", config.storcli_command.join(" "));
    info!("  Decode mode: {:?}", config.decode_mode);

    let runner = StorcliRunner::new(config.storcli_command.clone())?;
    let inventory = Arc::new(Inventory::new(Arc::new(runner), config.decode_mode));

    let server = ApiServer::new(
        ApiServerConfig {
            listen_addr: config.listen_addr,
        },
        inventory,
    );

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received interrupt, shutting down");
            let _ = shutdown.send(());
        }
    });

    server.run().await?;

    info!("Gateway shutdown complete");
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("tower=warn".parse().unwrap())
        .add_directive("axum=info".parse().unwrap());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
