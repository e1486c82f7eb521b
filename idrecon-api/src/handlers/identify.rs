use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use shared_types::{ErrorResponse, IdentifyRequest};

use crate::database::IdentityBackend;
use crate::identity::IdentityError;

#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    Internal(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Validation(msg) => write!(f, "{}", msg),
            ApiError::Internal(msg) => write!(f, "{}", msg),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Validation(msg) => ApiError::Validation(msg),
            other => {
                tracing::error!("Identity resolution failed: {}", other);
                ApiError::Internal("Failed to resolve identity".to_string())
            }
        }
    }
}

pub async fn identify(
    backend: web::Data<dyn IdentityBackend>,
    request: web::Json<IdentifyRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = request.into_inner();
    let backend = backend.into_inner();

    let response = web::block(move || backend.identify(&request))
        .await
        .map_err(|e| {
            tracing::error!("Identify task failed: {}", e);
            ApiError::Internal("Failed to resolve identity".to_string())
        })??;

    tracing::debug!(
        primary_contact_id = response.contact.primary_contact_id,
        secondaries = response.contact.secondary_contact_ids.len(),
        "Identity resolved"
    );

    Ok(HttpResponse::Ok().json(response))
}
