//! Predict command - score a CSV file with the saved model

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tracing::info;

use crate::domain::BatchSummary;
use crate::infrastructure::artifact::FileArtifactRepository;
use crate::infrastructure::services::{ModelRegistry, PredictionService};
use crate::infrastructure::tabular;

#[derive(Args, Clone, Debug)]
pub struct PredictArgs {
    /// CSV file with the standard feature columns
    #[arg(short, long)]
    pub input: PathBuf,

    /// Where to write the scored CSV; stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Model artifact; defaults to the configured lookup
    #[arg(short, long)]
    pub model: Option<PathBuf>,
}

pub async fn run(args: PredictArgs) -> anyhow::Result<()> {
    let config = super::offline_config();

    let repository = match &args.model {
        Some(path) => FileArtifactRepository::at(path),
        None => FileArtifactRepository::from_config(&config.model),
    };
    let service = PredictionService::new(Arc::new(ModelRegistry::new(Arc::new(repository))));

    let table = tabular::read_table(&args.input)?;
    let batch = service.predict_table(&table).await?;

    let summary = BatchSummary::compute(
        &table,
        &batch.outcome,
        config.batch.default_threshold,
        config.batch.default_top_n,
    );
    info!(
        rows = summary.rows,
        mean_risk_percent = ?summary.mean_risk_percent,
        high_risk = summary.high_risk_count,
        threshold = summary.threshold,
        "Scored file"
    );

    match &args.output {
        Some(path) => {
            tabular::write_table(&batch.table, path, b',')?;
            info!(path = %path.display(), "Wrote predictions");
        }
        None => print!("{}", tabular::to_csv_string(&batch.table, b',')?),
    }

    Ok(())
}
