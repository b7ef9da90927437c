mod cli;
mod commands;
mod config;
mod host;
mod output;
mod paths;
mod protocol;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;

fn main() {
    // Parse CLI arguments early so we can configure logging/output.
    let cli = Cli::parse();

    crate::output::set_verbose(cli.verbose);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            if cli.verbose {
                EnvFilter::new("debug")
            } else {
                EnvFilter::new("info")
            }
        }))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cli.run() {
        crate::output::error_stderr(&e.to_string());
        std::process::exit(1);
    }
}
