pub mod identify;
pub mod service;

use actix_web::{error::InternalError, web, HttpResponse};
use shared_types::ErrorResponse;

/// Register every route. Expects a `web::Data<dyn IdentityBackend>` in app
/// data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default().error_handler(|err, _req| {
        let response = HttpResponse::BadRequest().json(ErrorResponse {
            error: err.to_string(),
        });
        InternalError::from_response(err, response).into()
    });

    cfg.app_data(json_config)
        .service(service::index)
        .service(service::health)
        .route("/identify", web::post().to(identify::identify));
}
