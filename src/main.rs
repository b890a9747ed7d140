//! usaspend - answer federal spending questions from the USAspending API
//!
//! Results of API lookups are memoized in a JSON document on disk, so
//! repeated runs are answered without hitting the network.

use std::process::ExitCode;

use chrono::Local;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use usaspend::app::App;
use usaspend::cli::{Cli, Command};
use usaspend::config::Config;

/// Installs the tracing subscriber, writing to stderr
///
/// `RUST_LOG` takes precedence; otherwise only warnings are shown, or debug
/// output for this crate with `--verbose`.
fn setup_logging(verbose: bool) {
    let default_filter = if verbose { "usaspend=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolves configuration and runs the requested command
async fn run(cli: Cli) -> Result<String, Box<dyn std::error::Error>> {
    let strict_cache = cli.strict_cache_override();
    let config = Config::load(cli.config.as_deref())?.with_overrides(
        cli.base_url,
        cli.cache_file,
        strict_cache,
    );
    tracing::debug!(?config, "Configuration resolved");

    let app = App::new(&config, Local::now().date_naive());
    let output = app.execute(cli.command.unwrap_or(Command::Report)).await?;
    Ok(output)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match run(cli).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
