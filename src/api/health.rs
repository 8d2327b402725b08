//! Health check endpoints.

use actix_web::{HttpResponse, get, web};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::backend::Backend;
use crate::config::Config;
use crate::services::profiles::{SchemaState, probe};

/// Health check response.
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: &'static str,
    timestamp: String,
}

/// Readiness check response.
#[derive(Serialize, ToSchema)]
pub struct ReadyResponse {
    /// `ready`, or `degraded` when the profile table does not exist
    status: &'static str,
    /// `exists`, `empty` or `missing`
    profile_store: &'static str,
}

/// Server information response.
#[derive(Serialize, ToSchema)]
pub struct ServerInfoResponse {
    version: &'static str,
    environment: String,
    /// `hosted` or `memory`
    backend: &'static str,
}

/// Health check endpoint.
///
/// Returns 200 if the service is running.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check endpoint.
///
/// Probes the profile table. A missing table still serves (session-only
/// profiles), so it reports ready but degraded.
#[utoipa::path(
    get,
    path = "/api/v1/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "Profile backend unreachable")
    )
)]
#[get("/ready")]
pub async fn ready(backend: web::Data<Backend>) -> HttpResponse {
    let store = backend.profiles(None);
    let (status, profile_store) = match probe(store.as_ref()).await {
        SchemaState::Exists => ("ready", "exists"),
        SchemaState::Empty => ("ready", "empty"),
        SchemaState::Missing => ("degraded", "missing"),
        SchemaState::Error(_) => {
            return HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "error": "NOT_READY",
                "message": "Profile backend is unreachable"
            }));
        }
    };

    HttpResponse::Ok().json(ReadyResponse {
        status,
        profile_store,
    })
}

/// Server information endpoint.
#[utoipa::path(
    get,
    path = "/api/v1/info",
    tag = "Health",
    responses(
        (status = 200, description = "Server information", body = ServerInfoResponse)
    )
)]
#[get("/info")]
pub async fn info(config: web::Data<Config>, backend: web::Data<Backend>) -> HttpResponse {
    HttpResponse::Ok().json(ServerInfoResponse {
        version: env!("CARGO_PKG_VERSION"),
        environment: config.environment.to_string(),
        backend: backend.kind(),
    })
}

/// Configure health routes.
pub fn configure_health_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health).service(ready).service(info);
}
