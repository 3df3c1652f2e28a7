//! # Audio-to-URL Server - Main Application Entry Point
//!
//! Accepts audio uploads from the browser panel, forwards them to the media
//! host and logs the returned reference URL in the database.
//!
//! ## Application Architecture:
//! - **config**: settings from defaults, `config.toml` and environment variables
//! - **state**: shared config, metrics, database pool and media host
//! - **media**: the media host trait and its Cloudinary client
//! - **db**: the `audios` table of reference records
//! - **handlers**: upload, listing, config and the recorder panel
//! - **health**: health and metrics endpoints
//! - **middleware**: per-endpoint request metrics
//! - **error**: error types and their JSON responses
//!
//! ## Startup order:
//! 1. `.env`, tracing, configuration
//! 2. upload directory and database
//! 3. media host client
//! 4. HTTP server, then wait for SIGINT/SIGTERM

mod config;
mod db;
mod error;
mod handlers;
mod health;
mod media;
mod middleware;
mod state;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use config::AppConfig;
use media::CloudinaryHost;
use state::AppState;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: {}:{}", config.server.host, config.server.port);

    tokio::fs::create_dir_all(config.uploads.dir_path())
        .await
        .with_context(|| format!("Failed to create upload directory {}", config.uploads.dir))?;

    let pool = db::connect(&config.database).await?;

    if !config.media.is_configured() {
        warn!("Media host credentials missing; uploads will fail until CLOUDINARY_NAME, CLOUDINARY_API_KEY and CLOUDINARY_API_SECRET are set");
    }
    let media = CloudinaryHost::new(config.media.clone())
        .context("Failed to build media host client")?;

    let app_state = AppState::new(config.clone(), pool, Arc::new(media));
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        // The panel may also be served from another origin during development
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(middleware::MetricsMiddleware)
            .wrap(TracingLogger::default())
            .configure(handlers::configure_routes)
    })
    // Shutdown is driven by `wait_for_shutdown` below
    .disable_signals()
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind {}", bind_addr))?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(Err(e)) => error!("Server error: {}", e),
                Err(e) => error!("Server task error: {}", e),
                Ok(Ok(())) => {}
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Structured logging to stdout.
///
/// `RUST_LOG` controls the filter, defaulting to
/// `audio_to_url=debug,actix_web=info`.
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "audio_to_url=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .context("Failed to initialize tracing")?;

    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received SIGINT");
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
