//! HTTP service in front of the vault, built on axum.
//!
//! Routes:
//! - `POST /api/auth/login`, `GET /api/health`, `GET /api/providers`,
//!   `POST /api/validate-key` (public)
//! - `POST /api/auth/logout`, `GET|POST /api/keys`,
//!   `GET|DELETE /api/keys/{provider}/{key_name}`, `GET /api/export/shell`
//!   (bearer session required)

pub mod auth;
pub mod error;
pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::errors::{KeyVaultError, Result};
use crate::session::SessionRegistry;
use crate::vault::VaultStore;

/// Shared state for axum request handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub store: Arc<VaultStore>,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    /// Build state around `store` with sessions living for `session_ttl`.
    pub fn new(store: VaultStore, session_ttl: Duration) -> Self {
        let store = Arc::new(store);
        let sessions = Arc::new(SessionRegistry::new(store.clone(), session_ttl));
        Self { store, sessions }
    }
}

/// Bind address and housekeeping cadence.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// How often expired sessions are purged.
    pub sweep_interval: Duration,
}

/// Assemble the full route table.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/auth/login", post(handlers::login))
        .route("/api/health", get(handlers::health))
        .route("/api/providers", get(handlers::list_providers))
        .route("/api/validate-key", post(handlers::validate_key))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/api/auth/logout", post(handlers::logout))
        .route("/api/keys", get(handlers::list_keys).post(handlers::add_key))
        .route(
            "/api/keys/{provider}/{key_name}",
            get(handlers::get_key).delete(handlers::delete_key),
        )
        .route("/api/export/shell", get(handlers::export_shell))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve until Ctrl+C or SIGTERM, then drop every session.
pub async fn serve(config: &ServerConfig, state: AppState) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| KeyVaultError::Server(format!("failed to bind to {addr}: {e}")))?;

    tracing::info!(
        vault = %state.store.path().display(),
        vault_exists = state.store.exists(),
        "listening on http://{addr}"
    );

    let sweeper = spawn_sweeper(state.sessions.clone(), config.sweep_interval);
    let sessions = state.sessions.clone();

    let result = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| KeyVaultError::Server(format!("server error: {e}")));

    sweeper.abort();
    sessions.clear();
    tracing::info!("server stopped, sessions cleared");
    result
}

/// Periodically purge expired sessions.
fn spawn_sweeper(
    sessions: Arc<SessionRegistry>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            sessions.sweep_expired();
        }
    })
}

/// Resolves on SIGINT (Ctrl+C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received SIGINT (Ctrl+C), shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_state_shares_one_store() {
        let tmp = tempfile::TempDir::new().unwrap();
        let state = AppState::new(
            VaultStore::new(tmp.path().join("keys.encrypted.json")),
            Duration::from_secs(60),
        );
        assert!(Arc::ptr_eq(&state.store, state.sessions.store()));
        assert_eq!(state.sessions.ttl(), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn sweeper_purges_expired_sessions() {
        let tmp = tempfile::TempDir::new().unwrap();
        let state = AppState::new(
            VaultStore::new(tmp.path().join("keys.encrypted.json")),
            Duration::ZERO,
        );
        tokio::task::spawn_blocking({
            let sessions = state.sessions.clone();
            move || sessions.login("pw")
        })
        .await
        .unwrap()
        .unwrap();

        let handle = spawn_sweeper(state.sessions.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();

        // Nothing left for a manual sweep to remove.
        assert_eq!(state.sessions.sweep_expired(), 0);
    }
}
