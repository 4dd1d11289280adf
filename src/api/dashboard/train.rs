//! Training endpoint

use std::fmt::Display;
use std::str::FromStr;

use axum::extract::{Multipart, State};
use tracing::{debug, info};

use super::non_empty;
use crate::api::middleware::RequireSession;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::training::DEFAULT_TARGET;
use crate::domain::{TrainingOptions, TrainingReport};
use crate::infrastructure::tabular;
use crate::infrastructure::training::NamedTable;

/// POST /train
///
/// Multipart form: one or more CSV file parts plus optional text fields
/// overriding the configured training options. The new model is saved
/// but not activated.
pub async fn train_model(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    mut multipart: Multipart,
) -> Result<Json<TrainingReport>, ApiError> {
    let mut options = state.training.options(DEFAULT_TARGET);
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read multipart field: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if let Some(file_name) = field.file_name().map(str::to_string) {
            let bytes = field.bytes().await.map_err(|e| {
                ApiError::bad_request(format!("Failed to read file '{}': {}", file_name, e))
            })?;
            if bytes.is_empty() {
                continue;
            }
            let table = non_empty(&file_name, tabular::parse_bytes(&bytes)?)?;
            files.push(NamedTable::new(file_name, table));
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read field '{}': {}", name, e)))?;
        apply_option(&mut options, &name, value.trim())?;
    }

    if files.is_empty() {
        return Err(ApiError::bad_request("No CSV files provided"));
    }

    info!(
        username = %session.username,
        files = files.len(),
        algorithm = %options.algorithm,
        target = %options.target,
        "Training requested"
    );

    let report = state.training_service.train(files, options).await?;
    Ok(Json(report))
}

/// Apply one form field to the training options; blank values keep the default
pub(crate) fn apply_option(
    options: &mut TrainingOptions,
    name: &str,
    value: &str,
) -> Result<(), ApiError> {
    if value.is_empty() {
        return Ok(());
    }

    match name {
        "target" => options.target = value.to_string(),
        "algorithm" => options.algorithm = parse_field(name, value)?,
        "test_size" => options.test_size = parse_field(name, value)?,
        "random_state" => options.random_state = parse_field(name, value)?,
        "n_estimators" => options.n_estimators = parse_field(name, value)?,
        "max_depth" => options.max_depth = parse_field(name, value)?,
        "class_weight_balanced" => options.class_weight_balanced = parse_flag(name, value)?,
        "scale_features" => options.scale_features = parse_flag(name, value)?,
        other => debug!(field = %other, "Ignoring unknown training field"),
    }
    Ok(())
}

fn parse_field<T>(name: &str, value: &str) -> Result<T, ApiError>
where
    T: FromStr,
    T::Err: Display,
{
    value.parse().map_err(|e| {
        ApiError::bad_request(format!("Invalid value '{}' for '{}': {}", value, name, e))
            .with_param(name)
    })
}

fn parse_flag(name: &str, value: &str) -> Result<bool, ApiError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(
            ApiError::bad_request(format!("Invalid value '{}' for '{}': expected a boolean", value, name))
                .with_param(name),
        ),
    }
}
