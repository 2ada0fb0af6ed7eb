mod accent;
mod api;
mod cli;
mod config;
mod error;
mod jobs;
mod notifier;
mod scheduler;
mod synthesis;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use accent::Accentizer;
use api::AppState;
use cli::{Cli, Command};
use config::ServiceConfig;
use jobs::JobStore;
use notifier::HttpNotifier;
use scheduler::JobScheduler;
use synthesis::CommandSynthesizer;

#[tokio::main]
async fn main() -> ExitCode {
    let Cli {
        command,
        config,
        verbose,
    } = Cli::parse();

    init_tracing(verbose);

    let result = match command {
        Command::Serve { host, port } => serve(config, host, port).await,
        Command::Accent { text } => run_accent(config, text).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

// Logs go to stderr so `ruvox accent` output stays pipeable.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "ruvox=debug,tower_http=debug"
    } else {
        "ruvox=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn serve(config_path: Option<PathBuf>, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = ServiceConfig::load(config_path.as_deref())?;
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }

    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .with_context(|| format!("failed to create {}", config.output_dir.display()))?;

    let notifier = HttpNotifier::new(
        Duration::from_secs(config.callback_timeout_secs),
        config.public_base_url.clone(),
    )?;
    let scheduler = Arc::new(JobScheduler::start(
        JobStore::new(),
        CommandSynthesizer::from_config(&config),
        notifier,
        config.scheduler(),
    ));

    let app = api::router(AppState {
        scheduler: Arc::clone(&scheduler),
        public_base_url: config.public_base_url.clone(),
    });

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?;
    tracing::info!(
        addr = %listener.local_addr()?,
        engine = %config.engine_path.display(),
        output_dir = %config.output_dir.display(),
        upload_dir = %config.upload_dir.display(),
        "Synthesis service listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("Waiting for queued synthesis jobs to finish");
    scheduler.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

async fn run_accent(config_path: Option<PathBuf>, words: Vec<String>) -> Result<()> {
    let config = ServiceConfig::load(config_path.as_deref())?;
    let text = accent::input_text(&words, || std::io::read_to_string(std::io::stdin()))?;

    let accentizer = Accentizer::new(&config.accent_command, config.accent_args.clone());
    let accented = accentizer.accentuate(&text).await?;

    println!("{accented}");
    Ok(())
}
