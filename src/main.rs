use anyhow::Result;
use clap::Parser;
use lumiscan::cli::Cli;
use lumiscan::output;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match (cli.verbose, cli.quiet) {
        (true, _) => "lumiscan=debug",
        (false, true) => "warn",
        (false, false) => "lumiscan=info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cli.execute().await {
        output::print_error(&e.to_string());
        std::process::exit(1);
    }
    Ok(())
}
