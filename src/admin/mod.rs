//! Admin HTTP API.
//!
//! ```text
//! GET  /admin/status  → version, key count, applied changes
//! GET  /admin/config  → live snapshot, sensitive keys masked
//! POST /admin/reload  → reload local layers now
//! ```
//!
//! Every route requires `Authorization: Bearer <api_key>`.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::lifecycle::{Reloader, ShutdownListener};
use self::auth::admin_auth_middleware;
use self::handlers::*;

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub reloader: Arc<Reloader>,
    pub api_key: Arc<str>,
}

impl AdminState {
    pub fn new(reloader: Arc<Reloader>, api_key: &str) -> Self {
        Self {
            reloader,
            api_key: Arc::from(api_key),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/config", get(get_config))
        .route("/admin/reload", post(post_reload))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the admin API until shutdown.
pub async fn serve(
    listener: TcpListener,
    state: AdminState,
    mut shutdown: ShutdownListener,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Admin API listening");

    axum::serve(listener, setup_admin_router(state))
        .with_graceful_shutdown(async move { shutdown.recv().await })
        .await?;

    tracing::info!("Admin API stopped");
    Ok(())
}
