use crate::models::*;
use utoipa::OpenApi;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Runtime status endpoint
#[utoipa::path(
    get,
    path = "/api/status",
    responses(
        (status = 200, description = "Uptime, session gauges, storage reachability and system stats", body = StatusResponse)
    )
)]
#[allow(dead_code)]
pub async fn status_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        status_doc,
    ),
    components(
        schemas(HealthResponse, StatusResponse)
    ),
    tags(
        (name = "api", description = "API endpoints")
    )
)]
pub struct ApiDoc;
