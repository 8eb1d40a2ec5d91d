//! Vitals - container health reporter
//!
//! Reads load average, process CPU and memory, and cgroup throttling and
//! memory accounting, folds them into a 0-100 health score, and serves the
//! result as JSON over HTTP.

mod config;
mod error;
mod health;
mod integrations;
mod server;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{Config, LoggingConfig};
use crate::health::HealthCollector;

#[derive(Parser)]
#[command(name = "vitals")]
#[command(author = "Vitals Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Container health reporter", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Address to bind (overrides config)
    #[arg(long, env = "VITALS_HOST", global = true)]
    host: Option<IpAddr>,

    /// Port to listen on (overrides config)
    #[arg(short, long, env = "PORT", global = true)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the health report over HTTP (default)
    Serve,

    /// Collect one report and print it as JSON
    Report {
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Write a default configuration file
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

fn setup_logging(
    verbosity: u8,
    logging: &LoggingConfig,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());
    let console = fmt::layer().with_target(false).with_writer(std::io::stderr);

    if !logging.file {
        tracing_subscriber::registry().with(filter).with(console).init();
        return Ok(None);
    }

    std::fs::create_dir_all(&logging.directory).with_context(|| {
        format!("failed to create log directory {}", logging.directory.display())
    })?;

    let file_appender = tracing_appender::rolling::daily(&logging.directory, "vitals.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(Some(guard))
}

fn load_config(cli: &Cli) -> Result<Config> {
    let config_path = cli.config.clone().or_else(|| {
        let default_config = Config::default_path()?;
        if default_config.exists() {
            Some(default_config)
        } else {
            None
        }
    });

    let mut config = if let Some(path) = config_path {
        Config::load(&path)
            .with_context(|| format!("failed to load config from {}", path.display()))?
    } else {
        Config::default()
    };

    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init { force }) => {
            let path = cli
                .config
                .clone()
                .or_else(Config::default_path)
                .context("no config directory available; pass --config")?;
            config::init_config(&path, force)?;
        }
        Some(Commands::Report { pretty }) => {
            let config = load_config(&cli)?;
            let _logging_guard = setup_logging(cli.verbose, &config.logging)?;

            let collector = HealthCollector::from_config(&config);
            let report = collector.collect_report()?;
            let json = if pretty {
                serde_json::to_string_pretty(&report)?
            } else {
                serde_json::to_string(&report)?
            };
            println!("{}", json);
        }
        Some(Commands::Serve) | None => {
            let config = load_config(&cli)?;
            // Keep the guard alive for the duration of the program
            let _logging_guard = setup_logging(cli.verbose, &config.logging)?;

            let collector = Arc::new(HealthCollector::from_config(&config));
            server::serve(config.server.bind_addr(), collector).await?;
        }
    }

    Ok(())
}
