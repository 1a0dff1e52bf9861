mod config;
mod db;
mod rate_limit;
mod response;
mod routes;
mod services;
mod state;

use std::sync::Arc;
use std::time::Duration;

use crate::services::directory::{DirectoryApi, DirectoryConfig, HttpDirectory};
use crate::services::session;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = config::Config::from_env().expect("configuration invalid");

    let pool = db::init_pool(&config.database_url)
        .await
        .expect("database init failed");

    // Directory client (non-fatal: employee login disabled if config missing).
    let directory: Option<Arc<dyn DirectoryApi>> = match DirectoryConfig::from_env() {
        Some(dir_config) => match HttpDirectory::new(dir_config) {
            Ok(client) => {
                tracing::info!("employee directory client initialized");
                Some(Arc::new(client))
            }
            Err(e) => {
                tracing::warn!(error = %e, "directory client failed to initialize — employee login disabled");
                None
            }
        },
        None => {
            tracing::warn!("directory env vars not set — employee login disabled");
            None
        }
    };

    let port = config.port;
    let state = state::AppState::new(pool, config, directory);

    // Spawn background session sweeper.
    let _sweeper = spawn_session_sweeper(state.clone());

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "coursedeck listening");
    axum::serve(listener, app).await.expect("server failed");
}

const SESSION_SWEEP_INTERVAL_SECS: u64 = 3600;

/// Periodically purge expired sessions. Returns a handle for shutdown.
fn spawn_session_sweeper(state: state::AppState) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(SESSION_SWEEP_INTERVAL_SECS));
        loop {
            ticker.tick().await;
            match session::purge_expired_sessions(&state.pool).await {
                Ok(0) => {}
                Ok(purged) => tracing::info!(purged, "expired sessions removed"),
                Err(e) => tracing::warn!(error = %e, "session sweep failed"),
            }
        }
    })
}
