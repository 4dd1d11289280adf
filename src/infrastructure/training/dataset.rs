//! Turning uploaded training files into a numeric design matrix

use std::collections::{BTreeMap, BTreeSet};

use ndarray::Array2;

use crate::domain::feature::is_missing_token;
use crate::domain::{DataTable, DomainError, FeatureSchema, TargetMapping};

/// An uploaded file and the name it was uploaded under
#[derive(Debug, Clone)]
pub struct NamedTable {
    pub name: String,
    pub table: DataTable,
}

impl NamedTable {
    pub fn new(name: impl Into<String>, table: DataTable) -> Self {
        Self {
            name: name.into(),
            table,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub features: FeatureSchema,
    pub x: Array2<f64>,
    pub y: Vec<u8>,
    pub target_mapping: Option<TargetMapping>,
    pub rows_dropped: usize,
}

/// Check every file, then concatenate the feature and target columns by name
pub fn combine(
    files: &[NamedTable],
    features: &FeatureSchema,
    target: &str,
) -> Result<DataTable, DomainError> {
    if files.is_empty() {
        return Err(DomainError::validation("no training files were provided"));
    }
    if features.contains(target) {
        return Err(DomainError::validation(format!(
            "target column '{}' is also a feature",
            target
        )));
    }

    let mut columns: Vec<String> = features.names().to_vec();
    columns.push(target.to_string());

    for file in files {
        let missing: Vec<String> = columns
            .iter()
            .filter(|c| !file.table.has_column(c))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(DomainError::SchemaMismatch {
                message: format!(
                    "{}: missing required columns: {}",
                    file.name,
                    missing.join(", ")
                ),
                missing,
            });
        }
    }

    let mut combined = DataTable::new(columns.clone());
    for file in files {
        let indices: Vec<usize> = columns
            .iter()
            .filter_map(|c| file.table.column_index(c))
            .collect();
        for row in file.table.rows() {
            combined.push_row(indices.iter().map(|&i| row[i].clone()).collect());
        }
    }

    Ok(combined)
}

/// Drop incomplete rows, parse features and encode the binary target
///
/// `table` must hold the features in schema order followed by the target.
pub fn prepare(table: &DataTable, features: &FeatureSchema) -> Result<PreparedDataset, DomainError> {
    let n_features = features.len();
    let target_index = n_features;

    let complete: Vec<&Vec<String>> = table
        .rows()
        .iter()
        .filter(|row| !row.iter().any(|cell| is_missing_token(cell)))
        .collect();
    let rows_dropped = table.n_rows() - complete.len();

    if complete.is_empty() {
        return Err(DomainError::training("no complete rows left after dropping empty values"));
    }

    let mut values = Vec::with_capacity(complete.len() * n_features);
    for (row_index, row) in complete.iter().enumerate() {
        for (col, name) in features.names().iter().enumerate() {
            let cell = row[col].trim();
            let value = cell.parse::<f64>().ok().filter(|v| v.is_finite()).ok_or_else(|| {
                DomainError::training(format!(
                    "feature '{}' has non-numeric value '{}' (complete row {})",
                    name, cell, row_index
                ))
            })?;
            values.push(value);
        }
    }

    let x = Array2::from_shape_vec((complete.len(), n_features), values)
        .map_err(|e| DomainError::internal(e.to_string()))?;

    let raw_targets: Vec<&str> = complete.iter().map(|row| row[target_index].trim()).collect();
    let (y, target_mapping) = encode_target(&raw_targets)?;

    Ok(PreparedDataset {
        features: features.clone(),
        x,
        y,
        target_mapping,
        rows_dropped,
    })
}

/// `{0, 1}` targets pass through; anything else is coded by sorted category
pub fn encode_target(values: &[&str]) -> Result<(Vec<u8>, Option<TargetMapping>), DomainError> {
    let numeric: Option<Vec<f64>> = values.iter().map(|v| v.parse::<f64>().ok()).collect();

    if let Some(numbers) = &numeric {
        if numbers.iter().all(|&v| v == 0.0 || v == 1.0) {
            let y: Vec<u8> = numbers.iter().map(|&v| u8::from(v == 1.0)).collect();
            if !(y.contains(&0) && y.contains(&1)) {
                return Err(DomainError::training(
                    "target must contain exactly two classes, found one",
                ));
            }
            return Ok((y, None));
        }
    }

    let categories: Vec<String> = match &numeric {
        Some(numbers) => {
            let mut distinct: Vec<f64> = numbers.clone();
            distinct.sort_by(f64::total_cmp);
            distinct.dedup();
            let names: BTreeMap<u64, &str> = numbers
                .iter()
                .zip(values)
                .map(|(n, v)| (n.to_bits(), *v))
                .collect();
            distinct.iter().map(|d| names[&d.to_bits()].to_string()).collect()
        }
        None => values
            .iter()
            .map(|v| v.to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect(),
    };

    if categories.len() != 2 {
        return Err(DomainError::training(format!(
            "target must contain exactly two classes, found {}: {}",
            categories.len(),
            categories.iter().take(10).cloned().collect::<Vec<_>>().join(", ")
        )));
    }

    let y = match &numeric {
        Some(numbers) => {
            let first = categories[0].parse::<f64>().unwrap_or_default();
            numbers.iter().map(|&v| u8::from(v != first)).collect()
        }
        None => values.iter().map(|v| u8::from(*v != categories[0])).collect(),
    };

    let mapping = categories
        .into_iter()
        .enumerate()
        .map(|(code, name)| (code as u8, name))
        .collect();

    Ok((y, Some(mapping)))
}
