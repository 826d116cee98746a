use actix_web::HttpResponse;

/// GET /health_check
///
/// Liveness probe; not part of the RPC surface.
pub async fn health_check() -> HttpResponse {
    tracing::debug!("Health check endpoint called");
    HttpResponse::Ok().finish()
}
