use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;
use vaxtrack::vaccination::{vaccination_router, VaccinationRepository, VaccinationService};

const SESSION_TOKEN: &str = "vaxtrack-admin-session";

pub(crate) fn with_operational_routes<R>(service: Arc<VaccinationService<R>>) -> Router
where
    R: VaccinationRepository + 'static,
{
    vaccination_router(service)
        .route("/login", post(login_endpoint))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

/// Checks the single administrator credential. No session is enforced on other routes.
pub(crate) async fn login_endpoint(
    Extension(state): Extension<AppState>,
    Json(request): Json<LoginRequest>,
) -> impl IntoResponse {
    if state.admin.matches(&request.username, &request.password) {
        let payload = json!({ "token": SESSION_TOKEN, "role": "admin" });
        (StatusCode::OK, Json(payload))
    } else {
        warn!(username = %request.username, "rejected login");
        let payload = json!({ "error": "Invalid credentials" });
        (StatusCode::UNAUTHORIZED, Json(payload))
    }
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
