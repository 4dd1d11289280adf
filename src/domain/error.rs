use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single cell that could not be coerced to a number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidCell {
    pub row: usize,
    pub column: String,
    pub value: String,
}

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Model artifact not found (searched: {})", .searched.join(", "))]
    ArtifactNotFound { searched: Vec<String> },

    #[error("Schema mismatch: {message}")]
    SchemaMismatch {
        message: String,
        missing: Vec<String>,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        cells: Vec<InvalidCell>,
    },

    #[error("Training failed: {message}")]
    Training { message: String },

    #[error("Artifact error: {message}")]
    Artifact { message: String },

    #[error("CSV error: {message}")]
    Csv { message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn artifact_not_found(searched: Vec<String>) -> Self {
        Self::ArtifactNotFound { searched }
    }

    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            message: message.into(),
            missing: Vec::new(),
        }
    }

    /// Schema mismatch caused by required columns absent from the input
    pub fn missing_columns(missing: Vec<String>) -> Self {
        Self::SchemaMismatch {
            message: format!("missing required columns: {}", missing.join(", ")),
            missing,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            cells: Vec::new(),
        }
    }

    pub fn invalid_values(cells: Vec<InvalidCell>) -> Self {
        let preview: Vec<String> = cells
            .iter()
            .take(5)
            .map(|c| format!("row {} column '{}' = '{}'", c.row, c.column, c.value))
            .collect();
        let suffix = if cells.len() > preview.len() {
            format!(" (and {} more)", cells.len() - preview.len())
        } else {
            String::new()
        };

        Self::Validation {
            message: format!(
                "input contains invalid (non-numeric or missing) values: {}{}",
                preview.join("; "),
                suffix
            ),
            cells,
        }
    }

    pub fn training(message: impl Into<String>) -> Self {
        Self::Training {
            message: message.into(),
        }
    }

    pub fn artifact(message: impl Into<String>) -> Self {
        Self::Artifact {
            message: message.into(),
        }
    }

    pub fn csv(message: impl Into<String>) -> Self {
        Self::Csv {
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_names_every_column() {
        let error = DomainError::missing_columns(vec!["chol".to_string(), "caa".to_string()]);
        assert_eq!(
            error.to_string(),
            "Schema mismatch: missing required columns: chol, caa"
        );

        match error {
            DomainError::SchemaMismatch { missing, .. } => assert_eq!(missing, vec!["chol", "caa"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_artifact_not_found_lists_paths() {
        let error = DomainError::artifact_not_found(vec![
            "/app/heart_model.json".to_string(),
            "/cwd/heart_model.json".to_string(),
        ]);
        assert_eq!(
            error.to_string(),
            "Model artifact not found (searched: /app/heart_model.json, /cwd/heart_model.json)"
        );
    }

    #[test]
    fn test_invalid_values_preview_is_truncated() {
        let cells: Vec<InvalidCell> = (0..8)
            .map(|row| InvalidCell {
                row,
                column: "age".to_string(),
                value: "x".to_string(),
            })
            .collect();

        let error = DomainError::invalid_values(cells);
        let message = error.to_string();
        assert!(message.contains("row 0 column 'age' = 'x'"));
        assert!(message.contains("(and 3 more)"));
    }
}
