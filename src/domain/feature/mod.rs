//! Feature domain - schemas, raw input records and reconciled model input
//!
//! A raw record (form fields, JSON payload or uploaded CSV) becomes a
//! `ReconciledInput` only by passing through the reconciler, which assigns
//! the model's column set and coerces every cell to a number.

mod plausibility;
mod reconciler;
mod table;

pub use plausibility::plausibility_warnings;
pub use reconciler::FeatureReconciler;
pub use table::{is_missing_token, DataTable};

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// The 13 clinical attributes the dashboard collects, in training order
pub const CANONICAL_FEATURES: [&str; 13] = [
    "age", "sex", "cp", "trtbps", "chol", "fbs", "restecg", "thalachh", "exng", "oldpeak", "slp",
    "caa", "thall",
];

/// Ordered list of feature names a trained model expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSchema(Vec<String>);

impl FeatureSchema {
    pub fn new(names: Vec<String>) -> Self {
        Self(names)
    }

    /// The hard-coded fallback list
    pub fn canonical() -> Self {
        Self(CANONICAL_FEATURES.iter().map(|s| s.to_string()).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|n| n == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// True when names and order equal the canonical list
    pub fn is_canonical(&self) -> bool {
        self.0.len() == CANONICAL_FEATURES.len()
            && self.0.iter().zip(CANONICAL_FEATURES).all(|(a, b)| a == b)
    }
}

impl From<Vec<String>> for FeatureSchema {
    fn from(names: Vec<String>) -> Self {
        Self::new(names)
    }
}

/// A single unvalidated input cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Missing,
}

impl RawValue {
    /// Numeric value of the cell, if it has one
    pub fn coerce(&self) -> Option<f64> {
        let value = match self {
            Self::Number(v) => *v,
            Self::Text(s) => {
                let trimmed = s.trim();
                if is_missing_token(trimmed) {
                    return None;
                }
                trimmed.parse::<f64>().ok()?
            }
            Self::Missing => return None,
        };

        value.is_finite().then_some(value)
    }

    pub fn display(&self) -> String {
        match self {
            Self::Number(v) => v.to_string(),
            Self::Text(s) => s.clone(),
            Self::Missing => String::new(),
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<serde_json::Value> for RawValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Missing,
            serde_json::Value::Number(n) => n.as_f64().map(Self::Number).unwrap_or(Self::Missing),
            serde_json::Value::String(s) => Self::Text(s),
            other => Self::Text(other.to_string()),
        }
    }
}

/// One or more rows of unvalidated values, either positional or keyed by name
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    columns: Option<Vec<String>>,
    rows: Vec<Vec<RawValue>>,
}

impl RawRecord {
    /// A single positional row
    pub fn positional(values: Vec<RawValue>) -> Self {
        Self {
            columns: None,
            rows: vec![values],
        }
    }

    pub fn positional_rows(rows: Vec<Vec<RawValue>>) -> Self {
        Self {
            columns: None,
            rows,
        }
    }

    /// A single row keyed by column name, in the caller's key order
    pub fn keyed<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, RawValue)>,
        K: Into<String>,
    {
        let (columns, values): (Vec<String>, Vec<RawValue>) =
            pairs.into_iter().map(|(k, v)| (k.into(), v)).unzip();

        Self {
            columns: Some(columns),
            rows: vec![values],
        }
    }

    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    pub fn rows(&self) -> &[Vec<RawValue>] {
        &self.rows
    }

    /// Number of input columns (keys, or values in the first row)
    pub fn column_count(&self) -> usize {
        match &self.columns {
            Some(columns) => columns.len(),
            None => self.rows.first().map(Vec::len).unwrap_or(0),
        }
    }
}

/// Rectangular, fully numeric input whose columns are exactly `schema`
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledInput {
    schema: FeatureSchema,
    matrix: Array2<f64>,
}

impl ReconciledInput {
    pub(crate) fn new(schema: FeatureSchema, matrix: Array2<f64>) -> Self {
        debug_assert_eq!(schema.len(), matrix.ncols());
        Self { schema, matrix }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    pub fn n_rows(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn row(&self, index: usize) -> ArrayView1<'_, f64> {
        self.matrix.row(index)
    }

    /// Value of a named feature in one row
    pub fn value(&self, row: usize, name: &str) -> Option<f64> {
        let col = self.schema.position(name)?;
        self.matrix.get((row, col)).copied()
    }
}
