use std::net::SocketAddr;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use clinic_desk_api::api::{create_application, AppState};
use clinic_desk_api::config::AppConfig;
use clinic_desk_domain::abdm::{AbdmClient, DisabledGateway};
use clinic_desk_domain::auth::token_blacklist;
use clinic_desk_domain::database::initialize_database_pool;
use clinic_desk_domain::health;

/// The main entry point for the ClinicDesk API server
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if dotenv().is_err() {
        eprintln!("Warning: .env file not found or couldn't be read. Using environment variables.");
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_span_events(FmtSpan::CLOSE)
                .with_target(false)
                .with_ansi(true)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stdout),
        )
        .with(env_filter)
        .init();

    info!("Starting ClinicDesk API server");
    health::mark_started();

    let pool = match initialize_database_pool() {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to initialize database pool: {}", e);
            std::process::exit(1);
        }
    };
    info!("Database pool initialized at {}", pool.location());

    let config = AppConfig::from_env();
    std::fs::create_dir_all(&config.uploads.upload_dir).with_context(|| {
        format!(
            "failed to create upload directory {}",
            config.uploads.upload_dir.display()
        )
    })?;

    let state = match AbdmClient::from_env() {
        Ok(client) => {
            info!("ABDM client configured");
            AppState::new(pool, config.uploads.clone(), client)
        }
        Err(e) => {
            warn!("ABHA integration disabled: {}", e);
            AppState::new(pool, config.uploads.clone(), DisabledGateway::new(e.to_string()))
        }
    };

    if let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) {
        match state.users.ensure_admin(username, password).await {
            Ok(true) => info!("Created bootstrap admin {}", username),
            Ok(false) => info!("Admin account already present, skipping bootstrap"),
            Err(e) => error!("Failed to bootstrap admin {}: {}", username, e),
        }
    }

    let _cleanup = token_blacklist::start_cleanup_task();

    let app = create_application(state, config.cors_allow_origin.as_deref());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutting down server...");
}
