//! Glimt CLI entry point.

use anyhow::Result;
use clap::Parser;
use glimt::cli::{commands, Cli, Commands};
use glimt::config::Settings;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("glimt={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let config_path = cli.config.as_deref().map(PathBuf::from);
    let settings = Settings::load_from(config_path.as_ref())?;

    // Ensure data directories exist
    std::fs::create_dir_all(settings.data_dir())?;
    std::fs::create_dir_all(settings.temp_dir())?;

    // Execute command
    match &cli.command {
        Commands::Ingest { path } => {
            commands::run_ingest(path, settings).await?;
        }

        Commands::Ask {
            question,
            video,
            json,
        } => {
            commands::run_ask(question, *video, *json, settings).await?;
        }

        Commands::Search {
            query,
            modality,
            video,
        } => {
            commands::run_search(query, *modality, *video, settings).await?;
        }

        Commands::Summary { video } => {
            commands::run_summary(*video, settings).await?;
        }

        Commands::List => {
            commands::run_list(settings).await?;
        }

        Commands::Delete { video_id } => {
            commands::run_delete(*video_id, settings).await?;
        }

        Commands::Clear { yes } => {
            commands::run_clear(*yes, settings).await?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host, *port, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings, config_path)?;
        }
    }

    Ok(())
}
