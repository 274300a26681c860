//! plantdoc-dx - Plant disease diagnosis service
//!
//! Accepts a plant photo (URL or base64), confirms it shows a plant, asks a
//! hosted disease classifier what is wrong with it and keeps a history of
//! diagnoses in SQLite.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use plantdoc_common::config::{self, TomlConfig};
use plantdoc_dx::db::{self, SqliteDiagnosisStore, DATABASE_FILE};
use plantdoc_dx::services::{DiagnosisService, ImageLoader, InferenceClient, ModelSet};
use plantdoc_dx::taxonomy::Taxonomy;
use plantdoc_dx::AppState;

/// Data folder environment variable, also read by clap
const DATA_FOLDER_ENV: &str = "PLANTDOC_DATA_FOLDER";

/// Command-line arguments for plantdoc-dx
#[derive(Parser, Debug)]
#[command(name = "plantdoc-dx")]
#[command(about = "Plant disease diagnosis service")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides [server] port)
    #[arg(short, long, env = "PLANTDOC_PORT")]
    port: Option<u16>,

    /// Folder holding the diagnosis database
    #[arg(short, long, env = DATA_FOLDER_ENV)]
    data_folder: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long, env = "PLANTDOC_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config decides the log level, so it is loaded under a temporary subscriber
    let bootstrap = tracing_subscriber::fmt().finish();
    let toml_config: TomlConfig = tracing::subscriber::with_default(bootstrap, || {
        config::load_or_default(args.config.as_deref())
    });

    let level = &toml_config.logging.level;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "plantdoc_dx={level},plantdoc_common={level},tower_http={level}",
                    level = level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting plantdoc-dx v{} ({}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("PLANTDOC_GIT_HASH"),
        env!("PLANTDOC_BUILD_PROFILE")
    );

    let data_folder =
        config::resolve_data_folder(args.data_folder.as_deref(), DATA_FOLDER_ENV, &toml_config);
    let db_path = data_folder.join(DATABASE_FILE);
    info!("Database: {}", db_path.display());

    let pool = db::init_database_pool(&db_path)
        .await
        .context("Failed to initialize database")?;

    let inference = &toml_config.inference;
    let token = config::resolve_inference_token(&toml_config)?;
    let classifier = InferenceClient::from_config(inference, token)
        .context("Failed to build inference client")?;
    info!(
        base_url = %inference.api_base_url,
        general = %inference.general_model,
        plant = %inference.plant_model,
        disease = %inference.disease_model,
        "Inference client configured"
    );

    let image_loader = ImageLoader::new(Duration::from_secs(inference.request_timeout_secs))
        .context("Failed to build image loader")?;

    let taxonomy = Arc::new(Taxonomy::builtin());
    info!("Taxonomy loaded: {} entries", taxonomy.len());

    let service = DiagnosisService::new(
        Arc::new(classifier),
        Arc::new(SqliteDiagnosisStore::new(pool)),
        taxonomy.clone(),
        ModelSet::from_config(inference),
    );

    let state = AppState::new(Arc::new(service), Arc::new(image_loader), taxonomy);
    let app = plantdoc_dx::build_router(state);

    let host: std::net::IpAddr = toml_config
        .server
        .host
        .parse()
        .with_context(|| format!("Invalid server host: {}", toml_config.server.host))?;
    let port = args.port.unwrap_or(toml_config.server.port);
    let addr = SocketAddr::new(host, port);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
