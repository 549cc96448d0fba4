use clap::Parser;
use mfnet_graph::Severity;
use mfnet_io::cli::{run_rerank_command, run_validate_command, Cli, Commands, Overrides};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Rerank {
            input,
            config,
            chains,
            sweeps,
            burn_in,
            seed,
            workers,
            time_limit,
            cluster,
            out,
        } => {
            let overrides = Overrides {
                chains,
                sweeps,
                burn_in,
                seed,
                workers,
                time_limit,
                cluster,
            };
            run_rerank_command(&input, config.as_deref(), &overrides, &out)?;
        }
        Commands::Validate { input, config } => {
            if run_validate_command(&input, config.as_deref())? == Severity::Error {
                std::process::exit(2);
            }
        }
    }

    Ok(())
}
