//! Single-record and batch scoring endpoints

use axum::{
    extract::{Multipart, Query, State},
    response::Response,
};
use tracing::info;

use super::{csv_response, read_csv_upload};
use crate::api::middleware::RequireSession;
use crate::api::state::AppState;
use crate::api::types::{ApiError, BatchQuery, Json, PredictRequest};
use crate::domain::scoring::clamp_top_n;
use crate::domain::{BatchSummary, RawRecord};
use crate::infrastructure::services::SinglePrediction;
use crate::infrastructure::tabular;

pub const DOWNLOAD_FILE_NAME: &str = "predictions.csv";

/// POST /predict
pub async fn predict(
    State(state): State<AppState>,
    _session: RequireSession,
    Json(request): Json<PredictRequest>,
) -> Result<Json<SinglePrediction>, ApiError> {
    let record = RawRecord::from(request.record);
    let prediction = state.prediction_service.predict_record(&record).await?;
    Ok(Json(prediction))
}

/// POST /predict/report
///
/// Same input as `/predict`; answers with the two-line CSV report.
pub async fn predict_report(
    State(state): State<AppState>,
    _session: RequireSession,
    Json(request): Json<PredictRequest>,
) -> Result<Response, ApiError> {
    let record = RawRecord::from(request.record);
    let prediction = state.prediction_service.predict_record(&record).await?;
    Ok(csv_response(prediction.result().report_csv(), None))
}

/// POST /predict/batch
///
/// Scores the uploaded CSV and returns the on-screen summary. The threshold
/// and top-N only shape the summary; every row is scored.
pub async fn predict_batch(
    State(state): State<AppState>,
    _session: RequireSession,
    Query(query): Query<BatchQuery>,
    mut multipart: Multipart,
) -> Result<Json<BatchSummary>, ApiError> {
    let threshold = query.threshold.unwrap_or(state.batch.default_threshold);
    if !(0.0..=100.0).contains(&threshold) {
        return Err(ApiError::bad_request("threshold must be between 0 and 100")
            .with_param("threshold"));
    }
    let top_n = clamp_top_n(
        query.top_n.unwrap_or(state.batch.default_top_n),
        state.batch.max_top_n,
    );

    let table = read_csv_upload(&mut multipart).await?;
    let batch = state.prediction_service.predict_table(&table).await?;
    let summary = BatchSummary::compute(&table, &batch.outcome, threshold, top_n);

    info!(
        rows = summary.rows,
        high_risk = summary.high_risk_count,
        threshold,
        "Scored batch upload"
    );
    Ok(Json(summary))
}

/// POST /predict/batch/download
///
/// The full scored table: original columns plus `prediction` and `risk_percent`.
pub async fn download_batch(
    State(state): State<AppState>,
    _session: RequireSession,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let table = read_csv_upload(&mut multipart).await?;
    let batch = state.prediction_service.predict_table(&table).await?;

    let body = tabular::to_csv_string(&batch.table, b',')?;
    Ok(csv_response(body, Some(DOWNLOAD_FILE_NAME)))
}
