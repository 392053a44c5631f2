use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use rust_xlsxwriter::XlsxError;
use thiserror::Error;

use crate::types::ErrorBody;

/// Every way an export can fail.
///
/// The `Display` text is what the client sees; the wrapped cause is only
/// logged.
#[derive(Debug, Error)]
pub(crate) enum ExportError {
    #[error("Invalid JSON data")]
    InvalidRequest(String),

    #[error("Failed to connect to the database")]
    Connection(#[source] sqlx::Error),

    #[error("Failed to execute the query")]
    Query(#[source] sqlx::Error),

    #[error("Failed to fetch column names")]
    Schema(String),

    #[error("Failed to scan row values")]
    RowScan(#[source] sqlx::Error),

    #[error("Failed to create Excel sheet")]
    SheetCreation(#[source] XlsxError),

    #[error("Failed to save Excel file")]
    Serialization(#[source] SaveError),
}

/// Cause of a failed document write.
#[derive(Debug, Error)]
pub(crate) enum SaveError {
    #[error("encoder: {0}")]
    Encode(#[from] XlsxError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("worker: {0}")]
    Blocking(String),
}

impl ExportError {
    /// Underlying cause, for the server log.
    pub fn detail(&self) -> String {
        match self {
            ExportError::InvalidRequest(detail) | ExportError::Schema(detail) => detail.clone(),
            ExportError::Connection(e) | ExportError::Query(e) | ExportError::RowScan(e) => {
                e.to_string()
            }
            ExportError::SheetCreation(e) => e.to_string(),
            ExportError::Serialization(e) => e.to_string(),
        }
    }
}

impl From<SaveError> for ExportError {
    fn from(e: SaveError) -> Self {
        ExportError::Serialization(e)
    }
}

impl ResponseError for ExportError {
    fn status_code(&self) -> StatusCode {
        match self {
            ExportError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}
