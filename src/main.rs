use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hrdesk::config::Config;
use hrdesk::engine::accounts;
use hrdesk::AppState;

#[derive(Parser, Debug)]
#[command(name = "hrdesk")]
#[command(author, version, about = "HR attendance, leave and messaging server", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "hrdesk.toml", env = "HRDESK_CONFIG")]
    config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)?;

    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting HRDesk v{}", env!("CARGO_PKG_VERSION"));

    hrdesk::utils::ensure_dir(&config.server.data_dir)?;

    let db = hrdesk::db::init(&config.server.data_dir).await?;
    hrdesk::db::seed_defaults(&db, &config.policy.leave_defaults).await?;

    accounts::ensure_admin_user(
        &db,
        &config.auth.admin_username,
        &config.auth.admin_email,
        config.auth.admin_password.as_deref(),
    )
    .await
    .context("Failed to create the bootstrap admin account")?;

    let state = Arc::new(AppState::new(config.clone(), db));

    let api_router = hrdesk::api::create_router(state);

    // React build with SPA fallback to index.html
    let static_dir = &config.server.static_dir;
    let serve_static =
        ServeDir::new(static_dir).not_found_service(ServeFile::new(static_dir.join("index.html")));

    let app = axum::Router::new()
        .merge(api_router)
        .fallback_service(serve_static);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
