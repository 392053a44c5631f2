//! CORS and request logging for the app.

use actix_cors::Cors;
use actix_web::http::{header, Method};
use actix_web::middleware;

const CORS_MAX_AGE_SECS: usize = 12 * 60 * 60;

/// Any origin; GET, POST and OPTIONS only.
pub(crate) fn build_cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec![Method::GET, Method::POST, Method::OPTIONS])
        .allowed_headers(vec![
            header::ORIGIN,
            header::CONTENT_LENGTH,
            header::CONTENT_TYPE,
        ])
        .max_age(CORS_MAX_AGE_SECS)
}

pub(crate) fn request_logger() -> middleware::Logger {
    middleware::Logger::default()
}
