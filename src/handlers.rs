//! HTTP handlers.
//!
//! ## Export flow
//! 1. Parse the JSON body into an [`ExportRequest`] (400 on failure)
//! 2. Connect, run the query, collect the rows
//! 3. Build the workbook and write it to a request-unique temp file
//! 4. Send the file as an attachment; the temp file is removed on return

use actix_web::http::{header, StatusCode};
use actix_web::{web, HttpResponse};
use log::{debug, error, info};

use crate::artifact::TempArtifact;
use crate::config::ExportSettings;
use crate::database::{self, ConnectionDescriptor};
use crate::error::{ExportError, SaveError};
use crate::spreadsheet::SpreadsheetDocument;
use crate::types::{ExportRequest, HelloResponse, ResultSet};

/// GET / - liveness probe
pub(crate) async fn hello() -> HttpResponse {
    HttpResponse::build(StatusCode::ACCEPTED).json(HelloResponse {
        test: "Hello From App".to_string(),
    })
}

/// POST /generate-excel - run the query and return the result as xlsx
pub(crate) async fn generate_excel(
    body: web::Json<ExportRequest>,
    settings: web::Data<ExportSettings>,
) -> Result<HttpResponse, ExportError> {
    let request = body.into_inner();
    let descriptor = ConnectionDescriptor::from_request(&request);

    export(&request, &descriptor, &settings).await.map_err(|e| {
        error!("Export from {} failed: {}: {}", descriptor, e, e.detail());
        e
    })
}

async fn export(
    request: &ExportRequest,
    descriptor: &ConnectionDescriptor,
    settings: &ExportSettings,
) -> Result<HttpResponse, ExportError> {
    let result_set = database::fetch_result_set(descriptor, &request.query).await?;
    info!("Query on {} returned {} rows", descriptor, result_set.row_count());

    send_workbook(result_set, &request.db_name, settings).await
}

/// Builds the workbook for `result_set`, writes it to a temp file and answers
/// with the file as an attachment. The temp file is gone once this returns.
async fn send_workbook(
    result_set: ResultSet,
    db_name: &str,
    settings: &ExportSettings,
) -> Result<HttpResponse, ExportError> {
    // The blocking task owns the artifact until it returns; a dropped request
    // drops the task result and the file with it.
    let artifact = TempArtifact::new(&settings.temp_dir, db_name);
    let artifact = web::block(move || -> Result<TempArtifact, ExportError> {
        let mut document = SpreadsheetDocument::from_result_set(&result_set)?;
        document.save(artifact.path())?;
        debug!(
            "Wrote {} sheet rows to {}",
            document.row_count(),
            artifact.path().display()
        );
        Ok(artifact)
    })
    .await
    .map_err(|e| SaveError::Blocking(e.to_string()))??;

    let bytes = artifact.read().await.map_err(SaveError::from)?;
    info!("Sending {} ({} bytes)", artifact.download_name(), bytes.len());

    Ok(HttpResponse::Ok()
        .insert_header(("Content-Description", "File Transfer"))
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={}", artifact.download_name()),
        ))
        .content_type("application/octet-stream")
        .body(bytes))
}
