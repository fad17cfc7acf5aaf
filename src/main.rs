use anyhow::{Context, Result};
use bravetune::Bravetune;
use bravetune::cli::Cli;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise warnings only, or debug with -v.
    let default = if cli.verbose { "bravetune=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let json = cli.json;
    let beta = cli.beta;
    let action = cli.into_action();

    let report = Bravetune::builder().beta(beta).handle(&action)?;
    if json {
        let out = serde_json::to_string_pretty(&report).context("failed to encode report")?;
        println!("{out}");
    } else {
        println!("{report}");
    }
    Ok(())
}
