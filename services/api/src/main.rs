use anyhow::Result;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use api::{AppState, config::ServerConfig, routes, uploads::UploadStore};
use auth::{JwtConfig, JwtService};
use common::{
    database::{DatabaseConfig, init_pool},
    error::DatabaseError,
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting API service");

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .map_err(|e| DatabaseError::Migration(e.to_string()))?;
    info!("Database schema is up to date");

    let jwt = JwtService::new(JwtConfig::from_env()?);
    let server = ServerConfig::from_env()?;

    let uploads = UploadStore::new(&server.upload_dir, &server.public_base_url);
    uploads.ensure_dirs().await?;
    info!("Serving uploads from {}", uploads.root().display());

    let app = routes::create_router(AppState::new(pool.clone(), jwt, uploads));

    let address = server.bind_address();
    let listener = TcpListener::bind(&address).await?;
    info!("API service listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    info!("API service stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
