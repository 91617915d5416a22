// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Civic - a chat bot that walks residents through filing municipal reports.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod link;
mod serve;

use std::path::PathBuf;

use civic_config::CivicConfig;
use civic_core::CivicError;
use clap::{Parser, Subcommand};

/// Civic - municipal report intake over Telegram.
#[derive(Parser, Debug)]
#[command(name = "civic", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the bot and serve conversations until interrupted.
    Serve,
    /// Issue or redeem account link codes.
    Link {
        #[command(subcommand)]
        action: link::LinkCommand,
    },
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate configuration and the boundary file, then print a summary.
    Check,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => civic_config::load_and_validate_path(path),
        None => civic_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            civic_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => {
            init_tracing(&config.bot.log_level);
            serve::run_serve(config).await
        }
        Some(Commands::Link { action }) => {
            init_tracing(&config.bot.log_level);
            link::run_link(&config, action).await
        }
        Some(Commands::Config {
            action: ConfigCommand::Check,
        }) => check_config(&config).await,
        None => {
            println!("civic: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Loads the boundary (if any) and prints the effective settings.
async fn check_config(config: &CivicConfig) -> Result<(), CivicError> {
    serve::build_boundary(&config.boundary).await?;

    println!("configuration ok");
    println!("  bot.name              {}", config.bot.name);
    println!(
        "  telegram.bot_token    {}",
        if config.telegram.bot_token.is_some() {
            "set"
        } else {
            "missing (required by `civic serve`)"
        }
    );
    println!("  platform.api_base_url {}", config.platform.api_base_url);
    println!("  platform.frontend_url {}", config.platform.frontend_url);
    println!(
        "  boundary.geojson_path {}",
        config
            .boundary
            .geojson_path
            .as_deref()
            .unwrap_or("none (every location accepted)")
    );
    println!(
        "  geocoding             {}",
        if config.geocoding.enabled {
            config.geocoding.endpoint.as_str()
        } else {
            "disabled"
        }
    );
    println!(
        "  rate_limit            {} per {}s",
        config.rate_limit.max_requests, config.rate_limit.window_secs
    );
    println!("  storage.database_path {}", config.storage.database_path);
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("civic={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
