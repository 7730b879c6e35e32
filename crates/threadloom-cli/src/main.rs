#![allow(clippy::unwrap_used, clippy::expect_used)]

use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{export, fetch};

/// Operational tooling for the threadloom pipeline: the pull fetcher's
/// CLI surface, plus an export-packaging convenience.
#[derive(Parser)]
#[command(name = "threadloom")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Operational CLI for the threadloom extraction pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull discussions from a GitHub repository.
    Fetch(fetch::FetchArgs),
    /// Package visible articles for a scope as a signed JSONL dataset.
    Export(export::ExportArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let exit_code = match cli.command {
        Commands::Fetch(args) => fetch::run(args).await,
        Commands::Export(args) => export::run(args).await,
    };

    std::process::exit(exit_code);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clap_parses_known_subcommands() {
        let cli = Cli::try_parse_from(["threadloom", "fetch", "owner/repo"]).expect("parse fetch");
        assert!(matches!(cli.command, Commands::Fetch(_)));

        let cli = Cli::try_parse_from(["threadloom", "export", "server-1"]).expect("parse export");
        assert!(matches!(cli.command, Commands::Export(_)));
    }

    #[test]
    fn clap_enforces_required_args() {
        assert!(Cli::try_parse_from(["threadloom", "fetch"]).is_err());
        assert!(Cli::try_parse_from(["threadloom", "export"]).is_err());
    }

    #[test]
    fn fetch_rejects_limit_and_all_together() {
        let result = Cli::try_parse_from(["threadloom", "fetch", "o/r", "--limit", "5", "--all"]);
        assert!(result.is_err());
    }
}
