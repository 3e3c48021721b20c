//! foldwise - command-line entry point

use clap::Parser;
use foldwise::cli::{cmd_ensemble, cmd_folds, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "foldwise=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Folds { data } => {
            cmd_folds(&data)?;
        }
        Commands::Ensemble {
            data,
            models,
            aggregation,
            output,
        } => {
            cmd_ensemble(&data, models.as_deref(), &aggregation, output.as_deref())?;
        }
    }

    Ok(())
}
