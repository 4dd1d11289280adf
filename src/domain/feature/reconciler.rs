//! Feature reconciliation - aligning raw input with the model's feature schema

use ndarray::Array2;
use tracing::debug;

use super::{DataTable, FeatureSchema, RawRecord, RawValue, ReconciledInput, CANONICAL_FEATURES};
use crate::domain::error::{DomainError, InvalidCell};

/// Maps raw records and uploaded tables onto the column set a model was trained with
///
/// Single records are matched by column count: the declared schema when its
/// length matches, otherwise the canonical 13-name list when that length
/// matches, otherwise a schema mismatch. Uploaded tables are matched by name:
/// every canonical feature (and every declared feature) must be a header.
/// Either way, one non-numeric cell rejects the whole input.
#[derive(Debug, Clone, Copy)]
pub struct FeatureReconciler<'a> {
    declared: Option<&'a FeatureSchema>,
}

impl<'a> FeatureReconciler<'a> {
    pub fn new(declared: Option<&'a FeatureSchema>) -> Self {
        Self { declared }
    }

    /// Pick the column set for an input with `column_count` columns
    pub fn resolve_schema(&self, column_count: usize) -> Result<FeatureSchema, DomainError> {
        if let Some(declared) = self.declared {
            if declared.len() == column_count {
                return Ok(declared.clone());
            }
        }

        if CANONICAL_FEATURES.len() == column_count {
            return Ok(FeatureSchema::canonical());
        }

        let expected = match self.declared {
            Some(declared) if declared.len() != CANONICAL_FEATURES.len() => {
                format!("{} (declared) or {}", declared.len(), CANONICAL_FEATURES.len())
            }
            _ => CANONICAL_FEATURES.len().to_string(),
        };

        Err(DomainError::schema_mismatch(format!(
            "input has {} columns but the model expects {}; check the input against the model's features or retrain",
            column_count, expected
        )))
    }

    /// Reconcile a single record (or a small positional batch)
    pub fn reconcile(&self, record: &RawRecord) -> Result<ReconciledInput, DomainError> {
        if record.rows().is_empty() {
            return Err(DomainError::validation("input contains no rows"));
        }

        let column_count = record.column_count();
        if let Some((index, row)) = record
            .rows()
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != column_count)
        {
            return Err(DomainError::schema_mismatch(format!(
                "row {} has {} values, expected {}",
                index,
                row.len(),
                column_count
            )));
        }

        let schema = self.resolve_schema(column_count)?;
        let positions = match record.columns() {
            Some(columns) => Some(keyed_positions(columns, &schema)?),
            None => None,
        };

        debug!(columns = column_count, by_name = positions.is_some(), "Reconciling record");

        let rows = record.rows();
        let mut data = Vec::with_capacity(rows.len() * schema.len());
        let mut invalid = Vec::new();

        for (row_index, row) in rows.iter().enumerate() {
            for (col, name) in schema.names().iter().enumerate() {
                let source = positions.as_ref().map(|p| p[col]).unwrap_or(col);
                let raw = &row[source];
                match raw.coerce() {
                    Some(value) => data.push(value),
                    None => {
                        invalid.push(invalid_cell(row_index, name, raw));
                        data.push(f64::NAN);
                    }
                }
            }
        }

        build_input(schema, rows.len(), data, invalid)
    }

    /// Reconcile an uploaded table by header name
    pub fn reconcile_table(&self, table: &DataTable) -> Result<ReconciledInput, DomainError> {
        let schema = self
            .declared
            .cloned()
            .unwrap_or_else(FeatureSchema::canonical);

        let mut required: Vec<String> = CANONICAL_FEATURES.iter().map(|s| s.to_string()).collect();
        for name in schema.names() {
            if !required.contains(name) {
                required.push(name.clone());
            }
        }

        let missing: Vec<String> = required
            .into_iter()
            .filter(|name| !table.has_column(name))
            .collect();

        if !missing.is_empty() {
            return Err(DomainError::missing_columns(missing));
        }

        if table.is_empty() {
            return Err(DomainError::csv("uploaded table contains no data rows"));
        }

        let columns: Vec<usize> = schema
            .names()
            .iter()
            .filter_map(|name| table.column_index(name))
            .collect();

        let mut data = Vec::with_capacity(table.n_rows() * schema.len());
        let mut invalid = Vec::new();

        for (row_index, row) in table.rows().iter().enumerate() {
            for (name, &col) in schema.names().iter().zip(&columns) {
                let raw = RawValue::Text(row[col].clone());
                match raw.coerce() {
                    Some(value) => data.push(value),
                    None => {
                        invalid.push(invalid_cell(row_index, name, &raw));
                        data.push(f64::NAN);
                    }
                }
            }
        }

        build_input(schema, table.n_rows(), data, invalid)
    }
}

/// Source column for each schema position; a keyed record must name every feature
fn keyed_positions(columns: &[String], schema: &FeatureSchema) -> Result<Vec<usize>, DomainError> {
    let mut positions = Vec::with_capacity(schema.len());
    let mut missing = Vec::new();

    for name in schema.names() {
        match columns.iter().position(|c| c == name) {
            Some(index) => positions.push(index),
            None => missing.push(name.clone()),
        }
    }

    if !missing.is_empty() {
        return Err(DomainError::missing_columns(missing));
    }
    Ok(positions)
}

fn invalid_cell(row: usize, column: &str, raw: &RawValue) -> InvalidCell {
    InvalidCell {
        row,
        column: column.to_string(),
        value: raw.display(),
    }
}

fn build_input(
    schema: FeatureSchema,
    n_rows: usize,
    data: Vec<f64>,
    invalid: Vec<InvalidCell>,
) -> Result<ReconciledInput, DomainError> {
    if !invalid.is_empty() {
        return Err(DomainError::invalid_values(invalid));
    }

    let matrix = Array2::from_shape_vec((n_rows, schema.len()), data)
        .map_err(|e| DomainError::internal(format!("failed to shape input matrix: {}", e)))?;

    Ok(ReconciledInput::new(schema, matrix))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_row() -> Vec<RawValue> {
        [63.0, 1.0, 3.0, 145.0, 233.0, 1.0, 0.0, 150.0, 0.0, 2.3, 0.0, 0.0, 1.0]
            .into_iter()
            .map(RawValue::Number)
            .collect()
    }

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn canonical_headers() -> Vec<String> {
        names(&CANONICAL_FEATURES)
    }

    fn scenario_strings() -> Vec<String> {
        names(&["63", "1", "3", "145", "233", "1", "0", "150", "0", "2.3", "0", "0", "1"])
    }

    #[test]
    fn test_canonical_fallback_without_declared_schema() {
        let input = FeatureReconciler::new(None)
            .reconcile(&RawRecord::positional(scenario_row()))
            .unwrap();

        assert!(input.schema().is_canonical());
        assert_eq!(input.n_rows(), 1);
        assert_eq!(input.value(0, "oldpeak"), Some(2.3));
        assert_eq!(input.value(0, "chol"), Some(233.0));
    }

    #[test]
    fn test_declared_schema_of_equal_length_is_used_verbatim() {
        let declared = FeatureSchema::new((0..13).map(|i| format!("f{}", i)).collect());
        let input = FeatureReconciler::new(Some(&declared))
            .reconcile(&RawRecord::positional(scenario_row()))
            .unwrap();

        assert_eq!(input.schema(), &declared);
        assert_eq!(input.value(0, "f0"), Some(63.0));
    }

    #[test]
    fn test_declared_schema_of_other_length_matches_its_own_count() {
        let declared = FeatureSchema::new(names(&["a", "b", "c"]));
        let reconciler = FeatureReconciler::new(Some(&declared));

        let input = reconciler
            .reconcile(&RawRecord::positional(vec![1.0.into(), 2.0.into(), 3.0.into()]))
            .unwrap();
        assert_eq!(input.schema(), &declared);

        // 13 columns still fall back to the canonical list
        let input = reconciler.reconcile(&RawRecord::positional(scenario_row())).unwrap();
        assert!(input.schema().is_canonical());
    }

    #[test]
    fn test_wrong_feature_count_is_rejected_not_truncated() {
        let mut row = scenario_row();
        row.push(RawValue::Number(9.0));

        let err = FeatureReconciler::new(None)
            .reconcile(&RawRecord::positional(row))
            .unwrap_err();
        assert!(matches!(err, DomainError::SchemaMismatch { .. }));

        let short = scenario_row().into_iter().take(12).collect();
        let err = FeatureReconciler::new(None)
            .reconcile(&RawRecord::positional(short))
            .unwrap_err();
        assert!(matches!(err, DomainError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_any_invalid_cell_fails_atomically() {
        let mut row = scenario_row();
        row[4] = RawValue::from("high");
        row[9] = RawValue::Missing;

        let err = FeatureReconciler::new(None)
            .reconcile(&RawRecord::positional(row))
            .unwrap_err();

        match err {
            DomainError::Validation { cells, .. } => {
                let columns: Vec<&str> = cells.iter().map(|c| c.column.as_str()).collect();
                assert_eq!(columns, vec!["chol", "oldpeak"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let row = scenario_strings().into_iter().map(RawValue::Text).collect();
        let input = FeatureReconciler::new(None)
            .reconcile(&RawRecord::positional(row))
            .unwrap();
        assert_eq!(input.value(0, "trtbps"), Some(145.0));
    }

    #[test]
    fn test_reconciliation_is_idempotent() {
        let record = RawRecord::positional(scenario_row());
        let reconciler = FeatureReconciler::new(None);

        let first = reconciler.reconcile(&record).unwrap();
        let second = reconciler.reconcile(&record).unwrap();

        assert_eq!(first, second);
        let bits = |i: &ReconciledInput| i.matrix().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&first), bits(&second));
    }

    #[test]
    fn test_keyed_record_naming_every_feature_is_aligned_by_name() {
        let mut pairs: Vec<(String, RawValue)> = CANONICAL_FEATURES
            .iter()
            .map(|s| s.to_string())
            .zip(scenario_row())
            .collect();
        pairs.reverse();

        let input = FeatureReconciler::new(None)
            .reconcile(&RawRecord::keyed(pairs))
            .unwrap();

        assert_eq!(input.value(0, "age"), Some(63.0));
        assert_eq!(input.value(0, "thall"), Some(1.0));
    }

    #[test]
    fn test_keyed_record_with_partial_name_overlap_is_rejected() {
        let mut pairs: Vec<(String, RawValue)> = CANONICAL_FEATURES
            .iter()
            .map(|s| if *s == "chol" { "cholesterol".to_string() } else { s.to_string() })
            .zip(scenario_row())
            .collect();
        pairs.reverse();

        let err = FeatureReconciler::new(None)
            .reconcile(&RawRecord::keyed(pairs))
            .unwrap_err();

        match err {
            DomainError::SchemaMismatch { missing, .. } => assert_eq!(missing, vec!["chol"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_keyed_record_with_unknown_names_is_rejected() {
        let pairs: Vec<(String, RawValue)> = (0..13)
            .map(|i| format!("x{}", i))
            .zip(scenario_row())
            .collect();

        let err = FeatureReconciler::new(None)
            .reconcile(&RawRecord::keyed(pairs))
            .unwrap_err();

        assert!(matches!(err, DomainError::SchemaMismatch { ref missing, .. } if missing.len() == 13));
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        let record = RawRecord::positional_rows(vec![scenario_row(), vec![1.0.into()]]);
        let err = FeatureReconciler::new(None).reconcile(&record).unwrap_err();
        assert!(matches!(err, DomainError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_table_missing_chol_is_rejected_wholesale() {
        let headers: Vec<String> = canonical_headers().into_iter().filter(|h| h != "chol").collect();
        let table = DataTable::with_rows(headers, vec![scenario_strings()]);

        let err = FeatureReconciler::new(None).reconcile_table(&table).unwrap_err();
        match err {
            DomainError::SchemaMismatch { missing, message } => {
                assert_eq!(missing, vec!["chol"]);
                assert!(message.contains("chol"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_header_only_table_reports_missing_columns_first() {
        let headers: Vec<String> = canonical_headers().into_iter().filter(|h| h != "chol").collect();
        let err = FeatureReconciler::new(None)
            .reconcile_table(&DataTable::new(headers))
            .unwrap_err();
        assert!(matches!(err, DomainError::SchemaMismatch { ref missing, .. } if missing == &["chol"]));

        let err = FeatureReconciler::new(None)
            .reconcile_table(&DataTable::new(canonical_headers()))
            .unwrap_err();
        assert!(matches!(err, DomainError::Csv { .. }));
    }

    #[test]
    fn test_table_is_matched_by_name_in_any_order() {
        let mut headers = vec!["patient_id".to_string()];
        headers.extend(canonical_headers().into_iter().rev());

        let mut row = vec!["p-1".to_string()];
        row.extend(scenario_strings().into_iter().rev());

        let table = DataTable::with_rows(headers, vec![row]);
        let input = FeatureReconciler::new(None).reconcile_table(&table).unwrap();

        assert!(input.schema().is_canonical());
        assert_eq!(input.value(0, "age"), Some(63.0));
        assert_eq!(input.value(0, "oldpeak"), Some(2.3));
    }

    #[test]
    fn test_table_follows_declared_order() {
        let mut order = canonical_headers();
        order.reverse();
        let declared = FeatureSchema::new(order);

        let table = DataTable::with_rows(canonical_headers(), vec![scenario_strings()]);
        let input = FeatureReconciler::new(Some(&declared))
            .reconcile_table(&table)
            .unwrap();

        assert_eq!(input.schema(), &declared);
        assert_eq!(input.matrix()[[0, 0]], 1.0);
        assert_eq!(input.matrix()[[0, 12]], 63.0);
    }

    #[test]
    fn test_table_requires_declared_extras() {
        let mut declared = canonical_headers();
        declared.push("bmi".to_string());
        let declared = FeatureSchema::new(declared);

        let table = DataTable::with_rows(canonical_headers(), vec![scenario_strings()]);
        let err = FeatureReconciler::new(Some(&declared))
            .reconcile_table(&table)
            .unwrap_err();

        assert!(matches!(err, DomainError::SchemaMismatch { ref missing, .. } if missing == &["bmi"]));
    }

    #[test]
    fn test_table_with_empty_cell_is_rejected() {
        let mut row = scenario_strings();
        row[0] = String::new();
        let table = DataTable::with_rows(canonical_headers(), vec![scenario_strings(), row]);

        let err = FeatureReconciler::new(None).reconcile_table(&table).unwrap_err();
        match err {
            DomainError::Validation { cells, .. } => {
                assert_eq!(cells.len(), 1);
                assert_eq!(cells[0].row, 1);
                assert_eq!(cells[0].column, "age");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
