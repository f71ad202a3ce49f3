use actix_web::HttpResponse;

/// GET /health_check
pub async fn health_check() -> HttpResponse {
    tracing::debug!("Health check endpoint called");
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("OK")
}
