//! Random heart-disease style records for demos and training experiments

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::domain::feature::is_missing_token;
use crate::domain::{DataTable, DomainError};

#[derive(Debug, Clone, Copy)]
enum Column {
    /// Integer drawn from `low..=high`
    Integer { low: i64, high: i64 },
    /// Uniform float rounded to one decimal
    Decimal { low: f64, high: f64 },
}

/// Generated columns and their value ranges, in output order
const COLUMNS: [(&str, Column); 14] = [
    ("age", Column::Integer { low: 29, high: 76 }),
    ("sex", Column::Integer { low: 0, high: 1 }),
    ("cp", Column::Integer { low: 0, high: 3 }),
    ("trtbps", Column::Integer { low: 90, high: 199 }),
    ("chol", Column::Integer { low: 120, high: 569 }),
    ("fbs", Column::Integer { low: 0, high: 1 }),
    ("restecg", Column::Integer { low: 0, high: 1 }),
    ("thalachh", Column::Integer { low: 70, high: 209 }),
    ("exng", Column::Integer { low: 0, high: 1 }),
    ("oldpeak", Column::Decimal { low: 0.0, high: 6.2 }),
    ("slp", Column::Integer { low: 0, high: 2 }),
    ("caa", Column::Integer { low: 0, high: 4 }),
    ("thall", Column::Integer { low: 0, high: 3 }),
    ("output", Column::Integer { low: 0, high: 1 }),
];

/// Columns appended from the observed min..=max instead of the observed values
const RANGE_COLUMNS: [&str; 4] = ["age", "trtbps", "chol", "thalachh"];

fn rng_for(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn headers() -> Vec<String> {
    COLUMNS.iter().map(|(name, _)| name.to_string()).collect()
}

fn sample(rng: &mut StdRng, column: Column) -> String {
    match column {
        Column::Integer { low, high } => rng.gen_range(low..=high).to_string(),
        Column::Decimal { low, high } => {
            let value: f64 = if high > low { rng.gen_range(low..high) } else { low };
            format!("{:.1}", value)
        }
    }
}

/// `rows` fresh records in the default value ranges
pub fn generate(rows: usize, seed: Option<u64>) -> DataTable {
    let mut rng = rng_for(seed);
    let data = (0..rows)
        .map(|_| COLUMNS.iter().map(|(_, c)| sample(&mut rng, *c)).collect())
        .collect();

    info!(rows, "Generated synthetic records");
    DataTable::with_rows(headers(), data)
}

enum Sampler {
    Fixed(Column),
    Choice(Vec<String>),
}

/// Append `rows` records drawn from the value ranges observed in `existing`
pub fn append(existing: &DataTable, rows: usize, seed: Option<u64>) -> Result<DataTable, DomainError> {
    let missing: Vec<String> = COLUMNS
        .iter()
        .map(|(name, _)| name.to_string())
        .filter(|name| !existing.has_column(name))
        .collect();
    if !missing.is_empty() {
        return Err(DomainError::missing_columns(missing));
    }
    if existing.is_empty() {
        return Err(DomainError::validation("cannot derive value ranges from an empty file"));
    }

    let samplers = COLUMNS
        .iter()
        .map(|(name, default)| observed_sampler(existing, name, *default))
        .collect::<Result<Vec<_>, _>>()?;

    let mut rng = rng_for(seed);
    let positions: Vec<Option<usize>> = existing
        .headers()
        .iter()
        .map(|h| COLUMNS.iter().position(|(name, _)| name == h))
        .collect();

    let mut table = existing.clone();
    for _ in 0..rows {
        let generated: Vec<String> = samplers
            .iter()
            .map(|sampler| match sampler {
                Sampler::Fixed(column) => sample(&mut rng, *column),
                Sampler::Choice(values) => values.choose(&mut rng).cloned().unwrap_or_default(),
            })
            .collect();

        // extra columns in the existing file are left empty
        let row = positions
            .iter()
            .map(|p| p.map(|i| generated[i].clone()).unwrap_or_default())
            .collect();
        table.push_row(row);
    }

    info!(
        existing = existing.n_rows(),
        added = rows,
        total = table.n_rows(),
        "Appended synthetic records"
    );
    Ok(table)
}

fn observed_sampler(table: &DataTable, name: &str, default: Column) -> Result<Sampler, DomainError> {
    let Some(index) = table.column_index(name) else {
        return Ok(Sampler::Fixed(default));
    };

    let cells: Vec<&str> = (0..table.n_rows())
        .filter_map(|row| table.cell(row, index))
        .map(str::trim)
        .filter(|cell| !is_missing_token(cell))
        .collect();

    if cells.is_empty() {
        return Ok(Sampler::Fixed(default));
    }

    let numbers = || -> Result<Vec<f64>, DomainError> {
        cells
            .iter()
            .map(|cell| {
                cell.parse::<f64>().map_err(|_| {
                    DomainError::csv(format!("column '{}' has non-numeric value '{}'", name, cell))
                })
            })
            .collect()
    };

    if name == "oldpeak" {
        let values = numbers()?;
        let low = values.iter().copied().fold(f64::INFINITY, f64::min);
        let high = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        return Ok(Sampler::Fixed(Column::Decimal { low, high }));
    }

    if RANGE_COLUMNS.contains(&name) {
        let values = numbers()?;
        let low = values.iter().copied().fold(f64::INFINITY, f64::min).floor() as i64;
        let high = values.iter().copied().fold(f64::NEG_INFINITY, f64::max).floor() as i64;
        return Ok(Sampler::Fixed(Column::Integer { low, high }));
    }

    let distinct: BTreeSet<&str> = cells.into_iter().collect();
    Ok(Sampler::Choice(distinct.into_iter().map(str::to_string).collect()))
}
