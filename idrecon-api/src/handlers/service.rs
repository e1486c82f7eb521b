use actix_web::{get, web, HttpResponse, Responder};

use crate::database::IdentityBackend;

#[get("/")]
pub async fn index() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "message": "Identity Reconciliation Service",
        "endpoints": {
            "POST": "/identify - Submit email and/or phoneNumber to identify contacts",
            "GET": "/health - Service and database status"
        },
        "example": {
            "url": "POST /identify",
            "body": { "email": "user@example.com", "phoneNumber": "1234567890" }
        }
    }))
}

#[get("/health")]
pub async fn health(backend: web::Data<dyn IdentityBackend>) -> impl Responder {
    let backend = backend.into_inner();

    match web::block(move || backend.ping()).await {
        Ok(Ok(())) => HttpResponse::Ok().json(serde_json::json!({
            "status": "healthy",
            "database": "connected"
        })),
        Ok(Err(e)) => {
            tracing::warn!("Health check failed: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "status": "unhealthy",
                "database": "disconnected"
            }))
        }
        Err(e) => {
            tracing::warn!("Health check task failed: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "status": "unhealthy",
                "database": "unknown"
            }))
        }
    }
}
