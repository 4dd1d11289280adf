use clap::Parser;
use heart_risk::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cli::serve::run().await,
        Command::Train(args) => cli::train::run(args).await,
        Command::Predict(args) => cli::predict::run(args).await,
        Command::Generate(args) => cli::generate::run(args),
    }
}
