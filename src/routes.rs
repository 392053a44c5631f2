//! Route table for the export service.

use actix_web::{error, web, HttpRequest};
use log::warn;

use crate::error::ExportError;
use crate::handlers;

/// Configure the export routes
///
/// - GET / - liveness probe
/// - POST /generate-excel - query to xlsx download
pub(crate) fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::hello)).service(
        web::resource("/generate-excel")
            .app_data(json_config())
            .route(web::post().to(handlers::generate_excel)),
    );
}

/// Body parsing ignores `Content-Type`; any parse failure is a 400.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .content_type_required(false)
        .error_handler(|err: error::JsonPayloadError, req: &HttpRequest| {
            warn!("Rejected body on {}: {}", req.path(), err);
            ExportError::InvalidRequest(err.to_string()).into()
        })
}
