use clap::Parser;
use tracing_subscriber::EnvFilter;

use candidate_regions::cli;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("candidate_regions=debug,info")
    } else {
        EnvFilter::new("candidate_regions=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        cli::Commands::Regions(args) => {
            cli::regions::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Contigs(args) => {
            cli::contigs::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::AlleleFrequency(args) => {
            cli::allele_frequency::run(args, cli.format, cli.verbose)?;
        }
    }

    Ok(())
}
