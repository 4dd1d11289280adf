//! Dashboard endpoints: model inspection, scoring and training
//!
//! Every route here requires an open session.

pub mod model;
pub mod predict;
pub mod train;

use axum::{
    extract::Multipart,
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tracing::debug;

use super::state::AppState;
use crate::api::types::ApiError;
use crate::domain::DataTable;
use crate::infrastructure::tabular;

pub fn create_dashboard_router() -> Router<AppState> {
    Router::new()
        .route("/model", get(model::get_model))
        .route("/model/activate", post(model::activate_model))
        .route("/predict", post(predict::predict))
        .route("/predict/report", post(predict::predict_report))
        .route("/predict/batch", post(predict::predict_batch))
        .route("/predict/batch/download", post(predict::download_batch))
        .route("/train", post(train::train_model))
}

/// Read the first non-empty file part of a multipart upload as a table
///
/// A header-only file is returned as is so column checks can name what is missing.
pub(crate) async fn read_csv_upload(multipart: &mut Multipart) -> Result<DataTable, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read multipart field: {}", e)))?
    {
        let name = field
            .file_name()
            .or(field.name())
            .unwrap_or("upload")
            .to_string();

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read file '{}': {}", name, e)))?;

        if bytes.is_empty() {
            continue;
        }

        debug!(file = %name, bytes = bytes.len(), "Received CSV upload");
        return Ok(tabular::parse_bytes(&bytes)?);
    }

    Err(ApiError::bad_request("No CSV file provided"))
}

pub(crate) fn non_empty(name: &str, table: DataTable) -> Result<DataTable, ApiError> {
    if table.is_empty() {
        return Err(ApiError::bad_request(format!("'{}' contains no data rows", name))
            .with_code("invalid_csv"));
    }
    Ok(table)
}

/// A `text/csv` response body, optionally offered as a download
pub(crate) fn csv_response(body: String, filename: Option<&str>) -> Response {
    let content_type = (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string());

    match filename {
        Some(filename) => (
            [
                content_type,
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", filename),
                ),
            ],
            body,
        )
            .into_response(),
        None => ([content_type], body).into_response(),
    }
}
