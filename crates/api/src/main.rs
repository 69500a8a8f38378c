use std::sync::Arc;

use agency_api::config::AppConfig;
use agency_api::outbound::Outbound;
use agency_api::state::{AppState, Backend};
use agency_api::{bootstrap, build_router};
use agency_core::store::{MemoryStore, PgStore, ProfileStore};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience)
    let _ = dotenvy::dotenv();

    let config =
        AppConfig::from_env().map_err(|e| anyhow::anyhow!("Failed to load config: {e}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    tracing::info!("Starting agency site server");
    if config.uses_dev_secret() {
        tracing::warn!("JWT_SECRET is not set; using the development secret");
    }

    let backend = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .min_connections(config.db_min_connections)
                .connect(url)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to database: {e}"))?;
            tracing::info!("Connected to PostgreSQL");

            sqlx::migrate!("../../migrations")
                .run(&pool)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to run migrations: {e}"))?;
            tracing::info!("Database migrations applied");

            Backend::Postgres(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL is not set; content is kept in memory only");
            Backend::Memory(Arc::new(MemoryStore::new()))
        }
    };

    if let Some(admin) = &config.bootstrap_admin {
        let profiles: &dyn ProfileStore = match &backend {
            Backend::Memory(store) => store.as_ref(),
            Backend::Postgres(store) => store,
        };
        bootstrap::ensure_admin(profiles, admin)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create bootstrap admin: {e}"))?;
    }

    for (name, configured) in [
        ("email", config.email.is_some()),
        ("bot verification", config.verify.is_some()),
        ("careers API", config.careers.is_some()),
        ("contact log", config.contact_log.is_some()),
    ] {
        if !configured {
            tracing::warn!(integration = name, "Outbound integration not configured");
        }
    }
    let outbound = Outbound::http(&config)
        .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))?;

    let addr = config.addr();
    let state = AppState::new(config, backend, outbound);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { tracing::info!("Received Ctrl+C, shutting down..."); }
        _ = terminate => { tracing::info!("Received SIGTERM, shutting down..."); }
    }
}
