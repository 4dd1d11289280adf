//! Train command - fit a model from CSV files and save the artifact

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tracing::info;

use crate::domain::training::DEFAULT_TARGET;
use crate::domain::{Algorithm, TrainingOptions};
use crate::infrastructure::artifact::FileArtifactRepository;
use crate::infrastructure::services::TrainingService;
use crate::infrastructure::tabular;
use crate::infrastructure::training::NamedTable;

#[derive(Args, Clone, Debug)]
pub struct TrainArgs {
    /// Training CSV files; all must contain the standard features
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<PathBuf>,

    /// Binary target column
    #[arg(long, default_value = DEFAULT_TARGET)]
    pub target: String,

    /// Estimator to fit (overrides config)
    #[arg(long)]
    pub algorithm: Option<Algorithm>,

    /// Fraction of rows held out for evaluation (overrides config)
    #[arg(long)]
    pub test_size: Option<f64>,

    /// Seed for the split and the forest (overrides config)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Artifact path; defaults to the configured model location
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl TrainArgs {
    fn options(&self, mut options: TrainingOptions) -> TrainingOptions {
        if let Some(algorithm) = self.algorithm {
            options.algorithm = algorithm;
        }
        if let Some(test_size) = self.test_size {
            options.test_size = test_size;
        }
        if let Some(seed) = self.seed {
            options.random_state = seed;
        }
        options
    }
}

pub async fn run(args: TrainArgs) -> anyhow::Result<()> {
    let config = super::offline_config();

    let repository = match &args.output {
        Some(path) => FileArtifactRepository::at(path),
        None => FileArtifactRepository::from_config(&config.model),
    };
    let service = TrainingService::new(Arc::new(repository));

    let files = args
        .input
        .iter()
        .map(|path| {
            let name = path.display().to_string();
            tabular::read_table(path).map(|table| NamedTable::new(name, table))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let options = args.options(config.training.options(args.target.clone()));
    info!(files = files.len(), algorithm = %options.algorithm, "Training model");

    let report = service.train(files, options).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: TrainArgs,
    }

    #[test]
    fn test_flags_override_configured_options() {
        let cli = TestCli::parse_from([
            "train", "--input", "a.csv", "b.csv", "--algorithm", "svm", "--seed", "7",
        ]);

        assert_eq!(cli.args.input.len(), 2);
        assert_eq!(cli.args.target, DEFAULT_TARGET);

        let options = cli.args.options(TrainingOptions::default());
        assert_eq!(options.algorithm, Algorithm::LinearSvm);
        assert_eq!(options.random_state, 7);
        assert_eq!(options.test_size, TrainingOptions::default().test_size);
    }

    #[test]
    fn test_input_is_required() {
        assert!(TestCli::try_parse_from(["train"]).is_err());
    }
}
