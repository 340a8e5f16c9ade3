/// Liveness endpoint
///
/// `GET /health` answers as long as the process is up; the body reports
/// whether the database pool is reachable so load balancers can tell a
/// healthy instance from a degraded one.

use crate::app::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use taskipline_shared::db::pool;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database_connected: bool,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database_connected = pool::health_check(&state.db).await.is_ok();

    Json(HealthResponse {
        status: if database_connected {
            "healthy"
        } else {
            "degraded"
        },
        version: env!("CARGO_PKG_VERSION"),
        database_connected,
    })
}
