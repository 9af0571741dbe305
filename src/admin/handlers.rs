use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::audit::redact_snapshot;
use crate::config::ConfigSnapshot;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub keys: usize,
    pub changes: u64,
}

#[derive(Serialize)]
pub struct ReloadResult {
    pub changed: usize,
}

#[derive(Serialize)]
pub struct ReloadFailure {
    pub error: String,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let store = state.reloader.store();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        keys: store.current().len(),
        changes: store.change_count(),
    })
}

pub async fn get_config(State(state): State<AdminState>) -> Json<ConfigSnapshot> {
    Json(redact_snapshot(&state.reloader.store().current()))
}

pub async fn post_reload(
    State(state): State<AdminState>,
) -> Result<Json<ReloadResult>, (StatusCode, Json<ReloadFailure>)> {
    tracing::info!("Reload requested via admin API");
    state
        .reloader
        .reload_local()
        .map(|changed| Json(ReloadResult { changed }))
        .map_err(|e| {
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ReloadFailure { error: e.to_string() }),
            )
        })
}
