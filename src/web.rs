//! Read-only HTTP API over the coordinator snapshot

use crate::coordinator::StateSnapshot;
use crate::sensors::{SensorDescriptor, SensorKey, SensorValue};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub device_name: String,
    pub snapshot_rx: watch::Receiver<Arc<StateSnapshot>>,
}

impl AppState {
    fn snapshot(&self) -> Arc<StateSnapshot> {
        self.snapshot_rx.borrow().clone()
    }
}

/// One entry of `/api/sensors`
#[derive(Debug, Serialize)]
pub struct SensorView {
    #[serde(flatten)]
    pub descriptor: SensorDescriptor,
    pub value: Option<SensorValue>,
    pub available: bool,
}

pub(crate) async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub(crate) async fn current_state(State(state): State<AppState>) -> impl IntoResponse {
    let snap = state.snapshot();
    Json(serde_json::json!({
        "device_name": state.device_name,
        "available": snap.available,
        "last_update_success": snap.last_update_success,
        "last_error": snap.last_error,
        "last_success_at": snap.last_success_at,
        "consecutive_failures": snap.consecutive_failures,
        "total_ticks": snap.total_ticks,
        "data": snap.data,
    }))
}

pub(crate) async fn sensors(State(state): State<AppState>) -> impl IntoResponse {
    let snap = state.snapshot();
    let views: Vec<SensorView> = SensorKey::ALL
        .iter()
        .map(|key| {
            let value = snap.get(*key).cloned();
            SensorView {
                descriptor: key.descriptor(),
                available: snap.available && value.is_some(),
                value,
            }
        })
        .collect();
    Json(views)
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/state", get(current_state))
        .route("/api/sensors", get(sensors))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let router = build_router(state);
    let logger = crate::logging::get_logger("web");
    logger.info(&format!(
        "Starting web server; requested host={}, port={}",
        host, port
    ));

    let addr = match host.parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, port),
        Err(_) => {
            logger.warn(&format!("Invalid host '{}'; falling back to 127.0.0.1", host));
            ([127, 0, 0, 1], port).into()
        }
    };

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    logger.info(&format!(
        "Web server listening at http://{}:{} (API /api)",
        local_addr.ip(),
        local_addr.port()
    ));

    axum::serve(listener, router).await?;
    Ok(())
}
