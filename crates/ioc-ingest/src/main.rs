//! IOC Ingest - threat indicator ingestion tool

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ioc_common::logging::{init_logging, LogConfig, LogLevel};
use ioc_ingest::{config::IngestConfig, trigger};
use std::net::SocketAddr;
use tokio::signal;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "ioc-ingest")]
#[command(author, version, about = "Incremental threat indicator ingestion")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one ingestion invocation and print its outcome
    Run,

    /// Serve the HTTP trigger
    Serve {
        /// Address to listen on
        #[arg(long, env = "IOC_BIND", default_value = "0.0.0.0:8080")]
        bind: SocketAddr,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over the defaults set here
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("ioc-ingest")
        .filter_directives("hyper=info,reqwest=info,tower_http=debug")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    let config = IngestConfig::from_env().context("Failed to load configuration")?;
    info!(
        region = %config.region,
        checkpoint_key = %config.checkpoint_key,
        "Configuration loaded"
    );

    match cli.command {
        Command::Run => {
            let report = ioc_ingest::ingest(&config).await?;
            println!("{}", report.outcome);
        },
        Command::Serve { bind } => {
            let app = trigger::router(trigger::TriggerState::new(config));

            let listener = tokio::net::TcpListener::bind(bind)
                .await
                .with_context(|| format!("Failed to bind {}", bind))?;
            info!("Trigger listening on {}", bind);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            info!("Trigger shut down gracefully");
        },
    }

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }
}
