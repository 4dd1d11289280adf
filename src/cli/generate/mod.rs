//! Generate command - write or extend a synthetic dataset

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use crate::infrastructure::{synthetic, tabular};

const DELIMITER: u8 = b';';

#[derive(Args, Clone, Debug)]
pub struct GenerateArgs {
    /// CSV file to write (or extend with --append)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Number of records to generate
    #[arg(short, long, default_value_t = 10_000)]
    pub rows: usize,

    /// Add records sampled from the ranges already in the file
    #[arg(long)]
    pub append: bool,

    /// Seed for reproducible output
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn run(args: GenerateArgs) -> anyhow::Result<()> {
    super::offline_config();
    execute(&args)
}

fn execute(args: &GenerateArgs) -> anyhow::Result<()> {
    let table = if args.append {
        let existing = tabular::read_table(&args.output)?;
        synthetic::append(&existing, args.rows, args.seed)?
    } else {
        synthetic::generate(args.rows, args.seed)
    };

    tabular::write_table(&table, &args.output, DELIMITER)?;
    info!(path = %args.output.display(), rows = table.n_rows(), "Wrote synthetic data");

    Ok(())
}
